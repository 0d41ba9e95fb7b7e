use thiserror::Error;

use crate::protocol::codes::ErrorCode;

/// Operation-scoped failures surfaced to callers as wire error codes.
///
/// Every variant maps onto exactly one `ErrorCode`; the response frame
/// carries the code plus the human-readable message from `Display`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("sentence locked by {holder}")]
    FileLocked { holder: String },

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid command")]
    InvalidCommand,

    #[error("storage node unavailable")]
    StorageNodeDown,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("no storage nodes available")]
    NoStorageNodes,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::FileNotFound(_) => ErrorCode::FileNotFound,
            ServiceError::Unauthorized(_) => ErrorCode::Unauthorized,
            ServiceError::FileLocked { .. } => ErrorCode::FileLocked,
            ServiceError::InvalidIndex(_) => ErrorCode::InvalidIndex,
            ServiceError::FileExists(_) => ErrorCode::FileExists,
            ServiceError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            ServiceError::InvalidCommand => ErrorCode::InvalidCommand,
            ServiceError::StorageNodeDown => ErrorCode::StorageNodeDown,
            ServiceError::Internal(_) => ErrorCode::Internal,
            ServiceError::UserNotFound(_) => ErrorCode::UserNotFound,
            ServiceError::NoStorageNodes => ErrorCode::NoStorageNodes,
            ServiceError::InvalidParameters(_) => ErrorCode::InvalidParameters,
        }
    }

    /// Reconstructs an error from a response frame's code and message.
    /// Used by the client driver so remote failures read like local ones.
    pub fn from_wire(code: ErrorCode, detail: &str) -> ServiceError {
        let detail = detail.to_string();
        match code {
            ErrorCode::Success => ServiceError::Internal("success is not an error".to_string()),
            ErrorCode::FileNotFound => ServiceError::FileNotFound(detail),
            ErrorCode::Unauthorized => ServiceError::Unauthorized(detail),
            ErrorCode::FileLocked => ServiceError::FileLocked { holder: detail },
            ErrorCode::InvalidIndex => ServiceError::InvalidIndex(detail),
            ErrorCode::FileExists => ServiceError::FileExists(detail),
            ErrorCode::PermissionDenied => ServiceError::PermissionDenied(detail),
            ErrorCode::InvalidCommand => ServiceError::InvalidCommand,
            ErrorCode::StorageNodeDown => ServiceError::StorageNodeDown,
            ErrorCode::Internal => ServiceError::Internal(detail),
            ErrorCode::UserNotFound => ServiceError::UserNotFound(detail),
            ErrorCode::NoStorageNodes => ServiceError::NoStorageNodes,
            ErrorCode::InvalidParameters => ServiceError::InvalidParameters(detail),
            ErrorCode::ExecFailed => ServiceError::InvalidCommand,
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
