use tokio::net::TcpStream;

use crate::edit::script::EditScript;
use crate::error::{Result, ServiceError};
use crate::protocol::codes::{Command, ErrorCode, MessageKind};
use crate::protocol::frame::Frame;
use crate::protocol::transport;
use crate::storagenode::types::Permission;

/// One row of the name node's file listing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub filename: String,
    pub owner: String,
    pub word_count: u64,
    pub char_count: u64,
}

/// A connected client identity.
///
/// Holds the long-lived session to the name node; storage-node hops open
/// their own short-lived connections. Identity is asserted, not
/// authenticated.
pub struct Client {
    name_node: TcpStream,
    identity: String,
}

impl Client {
    /// Connects (three attempts, two seconds apart) and registers the
    /// user identity with the name node.
    pub async fn connect(name_node_addr: &str, identity: &str) -> Result<Client> {
        let stream = transport::connect_with_retry(name_node_addr).await?;
        let local = stream
            .local_addr()
            .map(|addr| format!("{}|{}", addr.ip(), addr.port()))
            .unwrap_or_default();

        let mut client = Client {
            name_node: stream,
            identity: identity.to_string(),
        };

        let frame = Frame {
            kind: MessageKind::RegisterUser,
            command: Command::None,
            error: ErrorCode::Success,
            identity: identity.to_string(),
            filename: String::new(),
            data: local.into_bytes(),
        };
        client.exchange(&frame).await?;

        Ok(client)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    // ------------------------------------------------------------
    // Directory operations (served by the name node)
    // ------------------------------------------------------------

    pub async fn view(&mut self) -> Result<Vec<FileEntry>> {
        let data = self.name_node_call(Command::View, "", "").await?;

        let fields: Vec<&str> = data.split('|').filter(|f| !f.is_empty()).collect();
        let mut entries = Vec::new();
        for row in fields.chunks(4) {
            if row.len() != 4 {
                break;
            }
            entries.push(FileEntry {
                filename: row[0].to_string(),
                owner: row[1].to_string(),
                word_count: row[2].parse().unwrap_or(0),
                char_count: row[3].parse().unwrap_or(0),
            });
        }
        Ok(entries)
    }

    pub async fn list_users(&mut self) -> Result<Vec<String>> {
        let data = self.name_node_call(Command::List, "", "").await?;
        Ok(data
            .split('|')
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
            .collect())
    }

    /// Removes the namespace entry, then instructs the home node to drop
    /// its artifacts (best effort: the namespace is the record).
    pub async fn delete(&mut self, filename: &str) -> Result<()> {
        let home = self.resolve(Command::Read, filename).await.ok();

        self.name_node_call(Command::Delete, filename, "").await?;

        if let Some(addr) = home {
            let frame = Frame::command(Command::Delete, &self.identity, filename, "");
            if let Err(e) = check(transport::request(&addr, &frame).await?) {
                tracing::warn!("Artifact cleanup on {} failed: {}", addr, e);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // Content operations (resolve, then operate)
    // ------------------------------------------------------------

    /// Creates the namespace entry, then the content on the chosen node.
    /// If the content hop fails the namespace entry is rolled back so the
    /// two sides cannot drift apart.
    pub async fn create(&mut self, filename: &str) -> Result<()> {
        let data = self.name_node_call(Command::Create, filename, "").await?;
        let addr = parse_endpoint(&data)?;

        let frame = Frame::command(Command::Create, &self.identity, filename, "");
        let result = transport::request(&addr, &frame).await.and_then(check);

        if let Err(e) = result {
            if let Err(rollback) = self.name_node_call(Command::Delete, filename, "").await {
                tracing::warn!("Namespace rollback for {} failed: {}", filename, rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn read(&mut self, filename: &str) -> Result<String> {
        self.content_op(Command::Read, filename, "").await
    }

    pub async fn info(&mut self, filename: &str) -> Result<String> {
        self.content_op(Command::Info, filename, "").await
    }

    pub async fn file_info(&mut self, filename: &str) -> Result<String> {
        self.content_op(Command::FileInfo, filename, "").await
    }

    pub async fn stream(&mut self, filename: &str) -> Result<Vec<String>> {
        let framed = self.content_op(Command::Stream, filename, "").await?;
        Ok(framed
            .split("|WORD|")
            .filter(|w| !w.is_empty())
            .map(|w| w.to_string())
            .collect())
    }

    pub async fn undo(&mut self, filename: &str) -> Result<String> {
        self.content_op(Command::Undo, filename, "").await
    }

    pub async fn copy(&mut self, source: &str, destination: &str) -> Result<String> {
        let payload = format!("{}|{}", source, destination);
        self.content_op(Command::Copy, source, &payload).await
    }

    pub async fn add_access(
        &mut self,
        filename: &str,
        target: &str,
        permission: Permission,
    ) -> Result<String> {
        let payload = format!("{}|{}", permission.as_char(), target);
        self.content_op(Command::AddAccess, filename, &payload).await
    }

    pub async fn rem_access(&mut self, filename: &str, target: &str) -> Result<String> {
        self.content_op(Command::RemAccess, filename, target).await
    }

    // ------------------------------------------------------------
    // The three-hop write
    // ------------------------------------------------------------

    /// Acquire at the coordinator, commit at the storage node, release at
    /// the coordinator. The release runs even when the commit failed; its
    /// own failure is logged, never surfaced over the commit result.
    pub async fn write(&mut self, filename: &str, script: &EditScript) -> Result<String> {
        let payload = script.encode()?;

        let addr = self.lock_acquire(filename, script.sentence_index).await?;

        let frame = Frame::command(Command::WriteCommit, &self.identity, filename, &payload);
        let commit = transport::request(&addr, &frame).await.and_then(check);

        if let Err(e) = self.lock_release(filename, script.sentence_index).await {
            tracing::warn!(
                "Lock release failed for {}:{}: {}",
                filename,
                script.sentence_index,
                e
            );
        }

        commit
    }

    /// Acquires the sentence lock; returns the home node's client
    /// endpoint for the commit hop.
    pub async fn lock_acquire(&mut self, filename: &str, sentence_index: usize) -> Result<String> {
        let data = self
            .name_node_call(
                Command::LockAcquire,
                filename,
                &sentence_index.to_string(),
            )
            .await?;
        parse_endpoint(&data)
    }

    pub async fn lock_release(&mut self, filename: &str, sentence_index: usize) -> Result<()> {
        self.name_node_call(
            Command::LockRelease,
            filename,
            &sentence_index.to_string(),
        )
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------

    pub async fn checkpoint(&mut self, filename: &str, tag: &str) -> Result<String> {
        let payload = format!("{}|{}", filename, tag);
        self.content_op(Command::Checkpoint, filename, &payload).await
    }

    pub async fn view_checkpoint(&mut self, filename: &str, tag: &str) -> Result<String> {
        let payload = format!("{}|{}", filename, tag);
        self.content_op(Command::ViewCheckpoint, filename, &payload)
            .await
    }

    pub async fn revert(&mut self, filename: &str, tag: &str) -> Result<String> {
        let payload = format!("{}|{}", filename, tag);
        self.content_op(Command::Revert, filename, &payload).await
    }

    pub async fn list_checkpoints(&mut self, filename: &str) -> Result<String> {
        self.content_op(Command::ListCheckpoints, filename, "").await
    }

    // ------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------

    pub async fn create_folder(&mut self, folder: &str) -> Result<String> {
        self.content_op(Command::CreateFolder, folder, "").await
    }

    pub async fn view_folder(&mut self, folder: &str) -> Result<String> {
        self.content_op(Command::ViewFolder, folder, "").await
    }

    pub async fn move_to_folder(&mut self, filename: &str, folder: &str) -> Result<String> {
        let payload = format!("{}|{}", filename, folder);
        self.content_op(Command::Move, filename, &payload).await
    }

    // ------------------------------------------------------------
    // Access-request workflow
    // ------------------------------------------------------------

    pub async fn request_access(&mut self, filename: &str) -> Result<String> {
        self.name_node_call(Command::RequestAccess, filename, "").await
    }

    pub async fn view_requests(&mut self) -> Result<String> {
        self.name_node_call(Command::ViewRequests, "", "").await
    }

    pub async fn approve_request(&mut self, filename: &str, requester: &str) -> Result<String> {
        let payload = format!("{}|{}", filename, requester);
        self.name_node_call(Command::ApproveRequest, "", &payload).await
    }

    pub async fn deny_request(&mut self, filename: &str, requester: &str) -> Result<String> {
        let payload = format!("{}|{}", filename, requester);
        self.name_node_call(Command::DenyRequest, "", &payload).await
    }

    // ------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------

    /// Resolve at the name node, then perform the same command at the
    /// returned storage node.
    async fn content_op(&mut self, command: Command, filename: &str, data: &str) -> Result<String> {
        let addr = self.resolve(command, filename).await?;
        let frame = Frame::command(command, &self.identity, filename, data);
        check(transport::request(&addr, &frame).await?)
    }

    async fn resolve(&mut self, command: Command, filename: &str) -> Result<String> {
        let data = self.name_node_call(command, filename, "").await?;
        parse_endpoint(&data)
    }

    async fn name_node_call(
        &mut self,
        command: Command,
        filename: &str,
        data: &str,
    ) -> Result<String> {
        let frame = Frame::command(command, &self.identity, filename, data);
        let reply = self.exchange(&frame).await?;
        check(reply)
    }

    async fn exchange(&mut self, frame: &Frame) -> Result<Frame> {
        transport::write_frame(&mut self.name_node, frame).await?;
        transport::read_frame(&mut self.name_node).await
    }
}

/// Converts an error-carrying response into a local error value.
fn check(frame: Frame) -> Result<String> {
    if frame.error.is_success() {
        Ok(frame.data_str())
    } else {
        Err(ServiceError::from_wire(frame.error, &frame.data_str()))
    }
}

/// Parses the `"<ip>|<port>"` redirection payload into a dialable address.
fn parse_endpoint(data: &str) -> Result<String> {
    let fields: Vec<&str> = data.split('|').filter(|f| !f.is_empty()).collect();
    if fields.len() != 2 {
        return Err(ServiceError::Internal(format!(
            "malformed endpoint payload {:?}",
            data
        )));
    }
    Ok(format!("{}:{}", fields[0], fields[1]))
}
