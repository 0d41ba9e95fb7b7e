use std::sync::Arc;

use crate::edit::script::EditScript;
use crate::error::{Result, ServiceError};
use crate::protocol::codes::{Command, ErrorCode, MessageKind};
use crate::protocol::frame::Frame;

use super::store::FileStore;
use super::types::Permission;
use super::validate::LockValidator;

/// The storage-node dispatcher.
///
/// Client frames carry content operations; control frames from the name
/// node carry ACL pushes for the approval workflow. Everything else is the
/// injected store's business.
pub struct StorageNode {
    pub store: Arc<FileStore>,
    validator: Arc<dyn LockValidator>,
}

impl StorageNode {
    pub fn new(store: Arc<FileStore>, validator: Arc<dyn LockValidator>) -> Arc<StorageNode> {
        Arc::new(StorageNode { store, validator })
    }

    pub async fn handle_client(&self, frame: Frame) -> Frame {
        if frame.kind != MessageKind::Command {
            return respond(Err(ServiceError::InvalidCommand));
        }
        respond(self.dispatch(&frame).await)
    }

    /// Control channel for the name node: currently only ACL grants issued
    /// on approval.
    pub async fn handle_control(&self, frame: Frame) -> Frame {
        if frame.kind != MessageKind::NodeCommand {
            return respond(Err(ServiceError::InvalidCommand));
        }

        match frame.command {
            Command::AddAccess => respond(self.handle_add_access(&frame).await),
            _ => respond(Err(ServiceError::InvalidCommand)),
        }
    }

    async fn dispatch(&self, frame: &Frame) -> Result<String> {
        let user = frame.identity.as_str();
        let filename = frame.filename.as_str();

        match frame.command {
            Command::Create => self.store.create(filename, user).await,
            Command::Read => self.store.read(filename, user).await,
            Command::WriteCommit => self.handle_write_commit(frame).await,
            Command::Delete => self.store.delete(filename, user).await,
            Command::Undo => self.store.undo(filename, user).await,
            Command::Info => self.store.info(filename, user).await,
            Command::FileInfo => self.store.file_info(filename, user).await,
            Command::Stream => self.store.stream(filename, user).await,
            Command::AddAccess => self.handle_add_access(frame).await,
            Command::RemAccess => self.handle_rem_access(frame).await,

            Command::Copy => {
                let (source, destination) = split_pair(&frame.data_str())?;
                self.store.copy(&source, &destination, user).await
            }

            Command::Checkpoint => {
                let (filename, tag) = split_pair(&frame.data_str())?;
                self.store.checkpoint(&filename, &tag, user).await
            }
            Command::ViewCheckpoint => {
                let (filename, tag) = split_pair(&frame.data_str())?;
                self.store.view_checkpoint(&filename, &tag, user).await
            }
            Command::Revert => {
                let (filename, tag) = split_pair(&frame.data_str())?;
                self.store.revert(&filename, &tag, user).await
            }
            Command::ListCheckpoints => self.store.list_checkpoints(filename, user).await,

            Command::CreateFolder => self.store.create_folder(filename, user).await,
            Command::ViewFolder => self.store.view_folder(filename, user).await,
            Command::Move => {
                let (filename, folder) = split_pair(&frame.data_str())?;
                self.store.move_to_folder(&filename, &folder, user).await
            }

            _ => Err(ServiceError::InvalidCommand),
        }
    }

    /// Write commits revalidate the sentence lease with the coordinator
    /// before touching the body; an unconfirmed hold rejects the commit.
    async fn handle_write_commit(&self, frame: &Frame) -> Result<String> {
        let script = EditScript::parse(&frame.data_str())?;

        self.validator
            .validate(&frame.identity, &frame.filename, script.sentence_index)
            .await?;

        self.store
            .write_commit(&frame.filename, &frame.identity, &script)
            .await
    }

    async fn handle_add_access(&self, frame: &Frame) -> Result<String> {
        let (flag, target) = split_pair(&frame.data_str())?;
        let permission = Permission::from_flag(&flag)?;
        self.store
            .add_access(&frame.filename, &frame.identity, &target, permission)
            .await
    }

    async fn handle_rem_access(&self, frame: &Frame) -> Result<String> {
        let target = frame.data_str().trim().to_string();
        if target.is_empty() {
            return Err(ServiceError::InvalidParameters(
                "missing target user".to_string(),
            ));
        }
        self.store
            .rem_access(&frame.filename, &frame.identity, &target)
            .await
    }
}

fn respond(result: Result<String>) -> Frame {
    match result {
        Ok(data) => Frame::response(ErrorCode::Success, &data),
        Err(e) => Frame::response(e.code(), &e.to_string()),
    }
}

fn split_pair(data: &str) -> Result<(String, String)> {
    let fields: Vec<&str> = data.split('|').filter(|f| !f.is_empty()).collect();
    if fields.len() != 2 {
        return Err(ServiceError::InvalidParameters(
            "expected two |-delimited fields".to_string(),
        ));
    }
    Ok((fields[0].to_string(), fields[1].to_string()))
}
