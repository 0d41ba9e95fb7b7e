use std::future::Future;
use std::pin::Pin;

use crate::error::{Result, ServiceError};
use crate::protocol::codes::{Command, ErrorCode};
use crate::protocol::frame::Frame;
use crate::protocol::transport;

pub type ValidationFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Confirms a committer still holds the sentence lease before a write is
/// applied. Injected into the dispatcher so handlers stay testable without
/// a live name node.
pub trait LockValidator: Send + Sync {
    fn validate(&self, user: &str, filename: &str, sentence_index: usize) -> ValidationFuture;
}

/// Production validator: asks the name node with a validation-only
/// lock-acquire query on the node-command channel. The query confirms an
/// existing hold and never creates a lock. Fails closed: if the name node
/// cannot confirm the hold, the commit is rejected.
pub struct RemoteLockValidator {
    name_node_addr: String,
}

impl RemoteLockValidator {
    pub fn new(name_node_addr: &str) -> RemoteLockValidator {
        RemoteLockValidator {
            name_node_addr: name_node_addr.to_string(),
        }
    }
}

impl LockValidator for RemoteLockValidator {
    fn validate(&self, user: &str, filename: &str, sentence_index: usize) -> ValidationFuture {
        let addr = self.name_node_addr.clone();
        let user = user.to_string();
        let filename = filename.to_string();

        Box::pin(async move {
            let query = Frame::node_command(
                Command::LockAcquire,
                &user,
                &filename,
                &sentence_index.to_string(),
            );

            let reply = transport::request(&addr, &query).await.map_err(|e| {
                tracing::warn!("Lock validation unreachable: {}", e);
                ServiceError::Internal("lock validation unavailable".to_string())
            })?;

            match reply.error {
                ErrorCode::Success => Ok(()),
                ErrorCode::FileLocked => Err(ServiceError::FileLocked {
                    holder: reply.data_str(),
                }),
                _ => Err(ServiceError::FileLocked {
                    holder: "nobody".to_string(),
                }),
            }
        })
    }
}

/// Used when lock enforcement is disabled in the node config; commits are
/// then cooperative exactly as at the coordinator.
pub struct AllowAllValidator;

impl LockValidator for AllowAllValidator {
    fn validate(&self, _user: &str, _filename: &str, _sentence_index: usize) -> ValidationFuture {
        Box::pin(async { Ok(()) })
    }
}
