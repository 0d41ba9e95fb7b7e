use std::sync::Arc;

use crate::config::NameNodeConfig;
use crate::error::{Result, ServiceError};
use crate::protocol::codes::{Command, ErrorCode, MessageKind};
use crate::protocol::frame::Frame;
use crate::protocol::transport;

use super::registry::{NameRegistry, NodeRegistration};

/// The name-node dispatcher: one frame in, one response frame out.
///
/// Directory operations are served directly; content operations resolve to
/// the home storage node and return its client endpoint. All state lives in
/// the injected registry, so handlers are pure over it.
pub struct NameNode {
    pub registry: Arc<NameRegistry>,
    config: NameNodeConfig,
}

impl NameNode {
    pub fn new(registry: Arc<NameRegistry>, config: NameNodeConfig) -> Arc<NameNode> {
        Arc::new(NameNode { registry, config })
    }

    pub async fn handle(&self, frame: Frame) -> Frame {
        match frame.kind {
            MessageKind::RegisterNode => self.handle_register_node(&frame).await,
            MessageKind::RegisterUser => self.handle_register_user(&frame).await,
            MessageKind::Heartbeat => self.handle_heartbeat(&frame).await,
            MessageKind::NodeCommand => respond(self.handle_node_command(&frame).await),
            MessageKind::Command => respond(self.handle_command(&frame).await),
            MessageKind::Response | MessageKind::Ack => {
                respond(Err(ServiceError::InvalidCommand))
            }
        }
    }

    async fn handle_register_node(&self, frame: &Frame) -> Frame {
        let data = frame.data_str();
        let fields: Vec<&str> = data.split('|').collect();
        if fields.len() != 4 {
            return respond(Err(ServiceError::InvalidParameters(
                "expected id|ip|control-port|client-port".to_string(),
            )));
        }

        let control_port = match fields[2].parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                return respond(Err(ServiceError::InvalidParameters(
                    "malformed control port".to_string(),
                )))
            }
        };
        let client_port = match fields[3].parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                return respond(Err(ServiceError::InvalidParameters(
                    "malformed client port".to_string(),
                )))
            }
        };

        let reg = NodeRegistration {
            node_id: fields[0].to_string(),
            address: fields[1].to_string(),
            control_port,
            client_port,
        };

        let node_id = reg.node_id.clone();
        let peer = self.registry.register_node(reg).await;
        tracing::info!(
            "Storage node registered: {} at {}:{} (replica peer: {})",
            node_id,
            fields[1],
            client_port,
            peer.as_deref().unwrap_or("none")
        );

        respond(Ok(format!("storage node {} registered", node_id)))
    }

    async fn handle_register_user(&self, frame: &Frame) -> Frame {
        if frame.identity.is_empty() {
            return respond(Err(ServiceError::InvalidParameters(
                "missing identity".to_string(),
            )));
        }

        self.registry
            .register_user(&frame.identity, &frame.data_str())
            .await;
        tracing::info!("User registered: {}", frame.identity);
        respond(Ok(format!("user {} registered", frame.identity)))
    }

    async fn handle_heartbeat(&self, frame: &Frame) -> Frame {
        let data = frame.data_str();
        let node_id = data.split('|').next().unwrap_or("");

        match self.registry.heartbeat(node_id).await {
            Ok(()) => {
                tracing::debug!("Heartbeat from {}", node_id);
                Frame::ack(node_id)
            }
            Err(e) => respond(Err(e)),
        }
    }

    /// Node-to-node control. Storage nodes use a validation-only
    /// lock-acquire query here before committing writes; it confirms the
    /// hold without ever creating a lock.
    async fn handle_node_command(&self, frame: &Frame) -> Result<String> {
        match frame.command {
            Command::LockAcquire => {
                let index = parse_sentence_index(&frame.data_str())?;
                self.registry
                    .locks
                    .validate(&frame.identity, &frame.filename, index)?;
                Ok("lock confirmed".to_string())
            }
            _ => Err(ServiceError::InvalidCommand),
        }
    }

    async fn handle_command(&self, frame: &Frame) -> Result<String> {
        match frame.command {
            Command::View => self.handle_view().await,
            Command::List => self.handle_list().await,
            Command::Create => self.handle_create(frame).await,
            Command::Delete => self.handle_delete(frame).await,
            Command::LockAcquire => self.handle_lock_acquire(frame).await,
            Command::LockRelease => self.handle_lock_release(frame).await,
            Command::RequestAccess => self.handle_request_access(frame).await,
            Command::ViewRequests => self.handle_view_requests(frame).await,
            Command::ApproveRequest => self.handle_approve_request(frame).await,
            Command::DenyRequest => self.handle_deny_request(frame).await,

            // The exec path of the ancestral design is a remote-code-execution
            // surface; the command code is recognised but never served.
            Command::Exec => {
                tracing::warn!("Exec requested by {} and refused", frame.identity);
                Err(ServiceError::InvalidCommand)
            }

            // Content-bearing operations redirect to the home node.
            Command::Read
            | Command::Write
            | Command::WriteCommit
            | Command::Info
            | Command::FileInfo
            | Command::Stream
            | Command::Copy
            | Command::AddAccess
            | Command::RemAccess
            | Command::Undo
            | Command::Checkpoint
            | Command::ViewCheckpoint
            | Command::Revert
            | Command::ListCheckpoints => self.handle_redirect(frame).await,

            // Folder operations are not homed on a file record.
            Command::Move => self.handle_redirect_move(frame).await,
            Command::CreateFolder | Command::ViewFolder => {
                let (address, port) = self.registry.first_connected().await?;
                Ok(format!("{}|{}", address, port))
            }

            Command::None => Err(ServiceError::InvalidCommand),
        }
    }

    async fn handle_view(&self) -> Result<String> {
        let records = self.registry.view().await;
        let mut out = String::new();
        for record in &records {
            out.push_str(&format!(
                "{}|{}|{}|{}|",
                record.filename, record.owner, record.word_count, record.char_count
            ));
        }
        tracing::info!("VIEW listed {} files", records.len());
        Ok(out)
    }

    async fn handle_list(&self) -> Result<String> {
        let users = self.registry.users().await;
        let mut out = String::new();
        for user in &users {
            out.push_str(user);
            out.push('|');
        }
        Ok(out)
    }

    async fn handle_create(&self, frame: &Frame) -> Result<String> {
        // The storage node does the full validation; the namespace only
        // needs names that survive its own row and line encodings.
        if frame.filename.is_empty() || frame.filename.contains('|') {
            return Err(ServiceError::InvalidParameters(format!(
                "invalid filename {:?}",
                frame.filename
            )));
        }

        let (address, port) = self
            .registry
            .create_file(&frame.filename, &frame.identity)
            .await?;
        tracing::info!(
            "File created: {} (owner: {}) placed at {}:{}",
            frame.filename,
            frame.identity,
            address,
            port
        );
        Ok(format!("{}|{}", address, port))
    }

    async fn handle_delete(&self, frame: &Frame) -> Result<String> {
        self.registry
            .delete_file(&frame.filename, &frame.identity)
            .await?;
        tracing::info!("File deleted: {} by {}", frame.filename, frame.identity);
        Ok(format!("file {} deleted", frame.filename))
    }

    async fn handle_redirect(&self, frame: &Frame) -> Result<String> {
        let (address, port) = self.registry.resolve(&frame.filename).await?;
        tracing::debug!(
            "Redirecting {} on {} to {}:{}",
            frame.identity,
            frame.filename,
            address,
            port
        );
        Ok(format!("{}|{}", address, port))
    }

    async fn handle_redirect_move(&self, frame: &Frame) -> Result<String> {
        // Move carries "file|folder" in the payload; resolve by the file.
        let data = frame.data_str();
        let filename = if frame.filename.is_empty() {
            data.split('|').next().unwrap_or("").to_string()
        } else {
            frame.filename.clone()
        };
        let (address, port) = self.registry.resolve(&filename).await?;
        Ok(format!("{}|{}", address, port))
    }

    async fn handle_lock_acquire(&self, frame: &Frame) -> Result<String> {
        let index = parse_sentence_index(&frame.data_str())?;

        if self.registry.file_record(&frame.filename).await.is_none() {
            return Err(ServiceError::FileNotFound(frame.filename.clone()));
        }

        self.registry
            .locks
            .acquire(&frame.identity, &frame.filename, index)?;

        // The commit hop needs the home node; a lock on an unreachable
        // file would only go stale, so undo the acquire on failure.
        match self.registry.resolve(&frame.filename).await {
            Ok((address, port)) => {
                tracing::info!(
                    "Lock acquired: {}:{} by {}",
                    frame.filename,
                    index,
                    frame.identity
                );
                Ok(format!("{}|{}", address, port))
            }
            Err(e) => {
                let _ = self
                    .registry
                    .locks
                    .release(&frame.identity, &frame.filename, index);
                Err(e)
            }
        }
    }

    async fn handle_lock_release(&self, frame: &Frame) -> Result<String> {
        let index = parse_sentence_index(&frame.data_str())?;
        self.registry
            .locks
            .release(&frame.identity, &frame.filename, index)?;
        tracing::info!(
            "Lock released: {}:{} by {}",
            frame.filename,
            index,
            frame.identity
        );
        Ok("lock released".to_string())
    }

    async fn handle_request_access(&self, frame: &Frame) -> Result<String> {
        let owner = self
            .registry
            .request_access(&frame.filename, &frame.identity)
            .await?;
        tracing::info!(
            "Access requested: {} by {} (owner {})",
            frame.filename,
            frame.identity,
            owner
        );
        Ok(format!("access request sent to {}", owner))
    }

    async fn handle_view_requests(&self, frame: &Frame) -> Result<String> {
        let pending = self.registry.pending_requests(&frame.identity).await;
        if pending.is_empty() {
            return Ok("no pending access requests".to_string());
        }

        let lines: Vec<String> = pending
            .iter()
            .map(|req| format!("{} requested access to {}", req.requester, req.filename))
            .collect();
        Ok(lines.join("\n"))
    }

    async fn handle_approve_request(&self, frame: &Frame) -> Result<String> {
        let (filename, requester) = parse_request_pair(&frame.data_str())?;

        self.registry
            .verify_pending_request(&filename, &requester, &frame.identity)
            .await?;

        let endpoint = self.registry.control_endpoint(&filename).await?;
        let grant = Frame::node_command(
            Command::AddAccess,
            &frame.identity,
            &filename,
            &format!("R|{}", requester),
        );
        let reply = transport::request(&endpoint, &grant).await?;

        // A requester already on the ACL means a re-run of an approval;
        // the node is the source of truth and the request is consumed.
        if !reply.error.is_success() && reply.error != ErrorCode::InvalidParameters {
            return Err(ServiceError::from_wire(reply.error, &reply.data_str()));
        }

        self.registry.complete_request(&filename, &requester).await;
        tracing::info!(
            "Access approved: {} for {} by {}",
            filename,
            requester,
            frame.identity
        );
        Ok(format!("access granted to {}", requester))
    }

    async fn handle_deny_request(&self, frame: &Frame) -> Result<String> {
        let (filename, requester) = parse_request_pair(&frame.data_str())?;

        self.registry
            .verify_pending_request(&filename, &requester, &frame.identity)
            .await?;
        self.registry.complete_request(&filename, &requester).await;

        tracing::info!(
            "Access denied: {} for {} by {}",
            filename,
            requester,
            frame.identity
        );
        Ok(format!("access denied to {}", requester))
    }

    pub fn config(&self) -> &NameNodeConfig {
        &self.config
    }
}

fn respond(result: Result<String>) -> Frame {
    match result {
        Ok(data) => Frame::response(ErrorCode::Success, &data),
        Err(e) => Frame::response(e.code(), &e.to_string()),
    }
}

fn parse_sentence_index(data: &str) -> Result<usize> {
    data.split('|')
        .next()
        .unwrap_or("")
        .trim()
        .parse::<usize>()
        .map_err(|_| ServiceError::InvalidParameters("malformed sentence index".to_string()))
}

fn parse_request_pair(data: &str) -> Result<(String, String)> {
    let fields: Vec<&str> = data.split('|').filter(|f| !f.is_empty()).collect();
    if fields.len() != 2 {
        return Err(ServiceError::InvalidParameters(
            "expected filename|requester".to_string(),
        ));
    }
    Ok((fields[0].to_string(), fields[1].to_string()))
}
