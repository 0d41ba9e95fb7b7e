use crate::error::ServiceError;

/// Role of a frame on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    RegisterNode = 1,
    RegisterUser = 2,
    Command = 3,
    Response = 4,
    /// Node-to-node control traffic (name node -> storage node ACL pushes,
    /// storage node -> name node lock validation).
    NodeCommand = 5,
    Heartbeat = 6,
    Ack = 7,
}

impl MessageKind {
    pub fn from_i32(v: i32) -> Result<Self, ServiceError> {
        match v {
            1 => Ok(MessageKind::RegisterNode),
            2 => Ok(MessageKind::RegisterUser),
            3 => Ok(MessageKind::Command),
            4 => Ok(MessageKind::Response),
            5 => Ok(MessageKind::NodeCommand),
            6 => Ok(MessageKind::Heartbeat),
            7 => Ok(MessageKind::Ack),
            other => Err(ServiceError::InvalidParameters(format!(
                "unknown message kind {}",
                other
            ))),
        }
    }
}

/// Operation selector inside command frames.
///
/// `None` is used by frames whose kind already determines their meaning
/// (registration, heartbeat, ack).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None = 0,
    View = 1,
    Read = 2,
    Create = 3,
    Write = 4,
    Delete = 5,
    Info = 6,
    List = 7,
    AddAccess = 8,
    RemAccess = 9,
    Stream = 10,
    Undo = 11,
    Copy = 12,
    FileInfo = 13,
    Exec = 14,
    WriteCommit = 15,
    LockAcquire = 16,
    LockRelease = 17,
    CreateFolder = 18,
    Move = 19,
    ViewFolder = 20,
    Checkpoint = 21,
    ViewCheckpoint = 22,
    Revert = 23,
    ListCheckpoints = 24,
    RequestAccess = 25,
    ViewRequests = 26,
    ApproveRequest = 27,
    DenyRequest = 28,
}

impl Command {
    pub fn from_i32(v: i32) -> Result<Self, ServiceError> {
        use Command::*;
        Ok(match v {
            0 => None,
            1 => View,
            2 => Read,
            3 => Create,
            4 => Write,
            5 => Delete,
            6 => Info,
            7 => List,
            8 => AddAccess,
            9 => RemAccess,
            10 => Stream,
            11 => Undo,
            12 => Copy,
            13 => FileInfo,
            14 => Exec,
            15 => WriteCommit,
            16 => LockAcquire,
            17 => LockRelease,
            18 => CreateFolder,
            19 => Move,
            20 => ViewFolder,
            21 => Checkpoint,
            22 => ViewCheckpoint,
            23 => Revert,
            24 => ListCheckpoints,
            25 => RequestAccess,
            26 => ViewRequests,
            27 => ApproveRequest,
            28 => DenyRequest,
            other => {
                return Err(ServiceError::InvalidParameters(format!(
                    "unknown command code {}",
                    other
                )))
            }
        })
    }
}

/// Structured result of every operation; 0 means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    FileNotFound = 1,
    Unauthorized = 2,
    FileLocked = 3,
    InvalidIndex = 4,
    FileExists = 5,
    PermissionDenied = 6,
    InvalidCommand = 7,
    StorageNodeDown = 8,
    Internal = 9,
    UserNotFound = 10,
    NoStorageNodes = 11,
    InvalidParameters = 12,
    ExecFailed = 13,
}

impl ErrorCode {
    pub fn from_i32(v: i32) -> Result<Self, ServiceError> {
        use ErrorCode::*;
        Ok(match v {
            0 => Success,
            1 => FileNotFound,
            2 => Unauthorized,
            3 => FileLocked,
            4 => InvalidIndex,
            5 => FileExists,
            6 => PermissionDenied,
            7 => InvalidCommand,
            8 => StorageNodeDown,
            9 => Internal,
            10 => UserNotFound,
            11 => NoStorageNodes,
            12 => InvalidParameters,
            13 => ExecFailed,
            other => {
                return Err(ServiceError::InvalidParameters(format!(
                    "unknown error code {}",
                    other
                )))
            }
        })
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}
