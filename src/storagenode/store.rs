use std::path::PathBuf;

use chrono::DateTime;

use crate::edit::engine;
use crate::edit::parser;
use crate::edit::script::EditScript;
use crate::error::{Result, ServiceError};
use crate::protocol::frame::DATA_CAP;

use super::locks::FileLockTable;
use super::persist::{validate_filename, StoreLayout};
use super::types::{now_secs, AclEntry, FileMetadata, Permission, MAX_ACL_ENTRIES};

/// The content subsystem of a storage node.
///
/// Every operation checks the per-file ACL, takes the file's keyed lock
/// (shared for reads, exclusive for anything that mutates body, metadata or
/// undo state) and works against the on-disk layout. Handlers stay pure
/// over an injected store, which keeps them testable without a network.
pub struct FileStore {
    layout: StoreLayout,
    locks: FileLockTable,
    node_id: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, node_id: &str) -> FileStore {
        FileStore {
            layout: StoreLayout::new(root),
            locks: FileLockTable::new(),
            node_id: node_id.to_string(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        self.layout.init().await
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    // ------------------------------------------------------------
    // Content operations
    // ------------------------------------------------------------

    pub async fn create(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.write(filename).await;

        if self.layout.body_exists(filename).await || self.layout.metadata_exists(filename).await {
            return Err(ServiceError::FileExists(filename.to_string()));
        }

        self.layout.save_body(filename, "").await?;
        self.layout
            .save_metadata(filename, &FileMetadata::new(user))
            .await?;

        tracing::info!("File created: {} by {}", filename, user);
        Ok(format!("file {} created", filename))
    }

    pub async fn read(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.read(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let body = self.layout.load_body(filename).await?;

        meta.touch_access(user);
        self.layout.save_metadata(filename, &meta).await?;

        tracing::info!("File read: {} by {}", filename, user);
        Ok(body)
    }

    /// Applies an edit script: snapshot the current body into the undo
    /// slot, mutate, save, recount. An empty insert list is a no-op on the
    /// body but still refreshes the undo slot.
    pub async fn write_commit(&self, filename: &str, user: &str, script: &EditScript) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.write(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Write) {
            return Err(ServiceError::Unauthorized("no write access".to_string()));
        }

        let body = match self.layout.load_body(filename).await {
            Ok(body) => body,
            Err(ServiceError::FileNotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };

        let new_body = engine::apply_edit(&body, script)?;

        // Snapshot only after the edit validated, so a rejected commit
        // leaves the undo slot untouched.
        self.layout.save_undo(filename, &body).await?;
        self.layout.save_body(filename, &new_body).await?;

        let stats = parser::text_stats(&new_body);
        meta.word_count = stats.words;
        meta.char_count = stats.chars;
        meta.touch_modified();
        self.layout.save_metadata(filename, &meta).await?;

        tracing::info!(
            "Write committed: {} by {} (sentence {})",
            filename,
            user,
            script.sentence_index
        );
        Ok("write committed".to_string())
    }

    pub async fn delete(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        {
            let _guard = self.locks.write(filename).await;

            let meta = self.layout.load_metadata(filename).await?;
            if meta.owner != user {
                return Err(ServiceError::Unauthorized(
                    "only the owner can delete".to_string(),
                ));
            }

            self.layout.delete_body(filename).await?;
            self.layout.delete_metadata(filename).await?;
            self.layout.delete_undo(filename).await?;
        }

        // Checkpoints deliberately survive deletion (see DESIGN notes).
        self.locks.drain(filename).await;

        tracing::info!("File deleted: {} by {}", filename, user);
        Ok(format!("file {} deleted", filename))
    }

    /// Depth-one undo: swaps the body with the undo slot. Repeated undo
    /// toggles between the two most recent states.
    pub async fn undo(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.write(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Write) {
            return Err(ServiceError::Unauthorized("no write access".to_string()));
        }

        let undo_body = self
            .layout
            .load_undo(filename)
            .await
            .ok_or_else(|| ServiceError::InvalidParameters("no undo history".to_string()))?;

        let current = match self.layout.load_body(filename).await {
            Ok(body) => body,
            Err(ServiceError::FileNotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };

        self.layout.save_undo(filename, &current).await?;
        self.layout.save_body(filename, &undo_body).await?;

        let stats = parser::text_stats(&undo_body);
        meta.word_count = stats.words;
        meta.char_count = stats.chars;
        meta.touch_modified();
        self.layout.save_metadata(filename, &meta).await?;

        tracing::info!("Undo applied: {} by {}", filename, user);
        Ok("undo applied".to_string())
    }

    pub async fn info(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.read(filename).await;

        let meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let body = self.layout.load_body(filename).await.unwrap_or_default();
        let sentences = parser::text_stats(&body).sentences;

        let mut out = format!(
            "File: {}\nOwner: {}\nCreated: {}\nModified: {}\nWords: {}\nCharacters: {}\nSentences: {}\nACL: ",
            filename,
            meta.owner,
            format_timestamp(meta.created),
            format_timestamp(meta.modified),
            meta.word_count,
            meta.char_count,
            sentences
        );
        out.push_str(&format_acl(&meta));
        Ok(out)
    }

    pub async fn file_info(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.read(filename).await;

        let meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let size = self.layout.body_size(filename).await;
        let body = self.layout.load_body(filename).await.unwrap_or_default();
        let sentences = parser::text_stats(&body).sentences;

        let mut out = format!(
            "=== File Information ===\n\
             Filename: {}\n\
             Owner: {}\n\
             Size: {} bytes\n\
             Created: {}\n\
             Modified: {}\n\
             Last Accessed: {} by {}\n\
             Words: {}\n\
             Characters: {}\n\
             Sentences: {}\n\
             Storage Node: {}\n\
             Access Control List: ",
            filename,
            meta.owner,
            size,
            format_timestamp(meta.created),
            format_timestamp(meta.modified),
            format_timestamp(meta.accessed),
            meta.last_accessed_by,
            meta.word_count,
            meta.char_count,
            sentences,
            self.node_id
        );
        out.push_str(&format_acl(&meta));
        Ok(out)
    }

    /// The body tokenised into words and framed for paced display.
    pub async fn stream(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.read(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let body = self.layout.load_body(filename).await?;

        let mut out = String::new();
        for word in parser::split_words(&body) {
            if out.len() + word.len() + 6 > DATA_CAP {
                break;
            }
            out.push_str("|WORD|");
            out.push_str(&word);
        }

        meta.touch_access(user);
        self.layout.save_metadata(filename, &meta).await?;
        Ok(out)
    }

    /// Clones content into a new file owned by the caller with an empty
    /// ACL. Guards are taken one at a time so crossed copies cannot
    /// deadlock; the destination existence check repeats under its guard.
    pub async fn copy(&self, source: &str, destination: &str, user: &str) -> Result<String> {
        validate_filename(source)?;
        validate_filename(destination)?;

        let (content, stats) = {
            let _guard = self.locks.read(source).await;

            let meta = self.layout.load_metadata(source).await?;
            if !meta.allows(user, Permission::Read) {
                return Err(ServiceError::Unauthorized(
                    "no read access to source".to_string(),
                ));
            }

            let content = self.layout.load_body(source).await?;
            (content, (meta.word_count, meta.char_count))
        };

        let _guard = self.locks.write(destination).await;
        if self.layout.metadata_exists(destination).await {
            return Err(ServiceError::FileExists(destination.to_string()));
        }

        let mut meta = FileMetadata::new(user);
        meta.word_count = stats.0;
        meta.char_count = stats.1;

        self.layout.save_body(destination, &content).await?;
        self.layout.save_metadata(destination, &meta).await?;

        tracing::info!("File copied: {} -> {} by {}", source, destination, user);
        Ok(format!("file copied: {} -> {}", source, destination))
    }

    // ------------------------------------------------------------
    // ACL management
    // ------------------------------------------------------------

    pub async fn add_access(
        &self,
        filename: &str,
        caller: &str,
        target: &str,
        permission: Permission,
    ) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.write(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if meta.owner != caller {
            return Err(ServiceError::Unauthorized(
                "only the owner can modify access".to_string(),
            ));
        }

        if meta.acl_contains(target) {
            return Err(ServiceError::InvalidParameters(format!(
                "{} already has access",
                target
            )));
        }
        if meta.acl.len() >= MAX_ACL_ENTRIES {
            return Err(ServiceError::InvalidParameters("ACL full".to_string()));
        }

        meta.acl.push(AclEntry {
            username: target.to_string(),
            permission,
        });
        self.layout.save_metadata(filename, &meta).await?;

        tracing::info!(
            "Access granted: {} to {} ({}) by {}",
            filename,
            target,
            permission.label(),
            caller
        );
        Ok(format!("access granted to {}", target))
    }

    pub async fn rem_access(&self, filename: &str, caller: &str, target: &str) -> Result<String> {
        validate_filename(filename)?;
        let _guard = self.locks.write(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if meta.owner != caller {
            return Err(ServiceError::Unauthorized(
                "only the owner can modify access".to_string(),
            ));
        }

        if !meta.acl_contains(target) {
            return Err(ServiceError::InvalidParameters(format!(
                "{} is not on the ACL",
                target
            )));
        }

        meta.acl.retain(|entry| entry.username != target);
        self.layout.save_metadata(filename, &meta).await?;

        tracing::info!("Access revoked: {} from {} by {}", filename, target, caller);
        Ok(format!("access revoked from {}", target))
    }

    // ------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------

    pub async fn checkpoint(&self, filename: &str, tag: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        validate_filename(tag)?;
        let _guard = self.locks.read(filename).await;

        let meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let body = self.layout.load_body(filename).await?;
        self.layout
            .save_checkpoint(filename, tag, now_secs(), &body)
            .await?;

        tracing::info!("Checkpoint created: {} tag={} by {}", filename, tag, user);
        Ok(format!("checkpoint {} created", tag))
    }

    pub async fn view_checkpoint(&self, filename: &str, tag: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        validate_filename(tag)?;
        let _guard = self.locks.read(filename).await;

        let meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let (_, content) = self.layout.load_checkpoint(filename, tag).await?;
        Ok(content)
    }

    /// Restores a checkpoint; the replaced body goes into the undo slot,
    /// so an immediate undo toggles back to the pre-revert state.
    pub async fn revert(&self, filename: &str, tag: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        validate_filename(tag)?;
        let _guard = self.locks.write(filename).await;

        let mut meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Write) {
            return Err(ServiceError::Unauthorized("no write access".to_string()));
        }

        let (_, checkpoint_body) = self.layout.load_checkpoint(filename, tag).await?;

        let current = match self.layout.load_body(filename).await {
            Ok(body) => body,
            Err(ServiceError::FileNotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };

        self.layout.save_undo(filename, &current).await?;
        self.layout.save_body(filename, &checkpoint_body).await?;

        let stats = parser::text_stats(&checkpoint_body);
        meta.word_count = stats.words;
        meta.char_count = stats.chars;
        meta.touch_modified();
        self.layout.save_metadata(filename, &meta).await?;

        tracing::info!("Reverted: {} to tag={} by {}", filename, tag, user);
        Ok(format!("reverted to checkpoint {}", tag))
    }

    pub async fn list_checkpoints(&self, filename: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;

        let meta = self.layout.load_metadata(filename).await?;
        if !meta.allows(user, Permission::Read) {
            return Err(ServiceError::Unauthorized("no read access".to_string()));
        }

        let tags = self.layout.list_checkpoints(filename).await?;
        if tags.is_empty() {
            return Ok("no checkpoints found".to_string());
        }
        Ok(tags.join("\n"))
    }

    // ------------------------------------------------------------
    // Single-level folders
    // ------------------------------------------------------------

    pub async fn create_folder(&self, folder: &str, user: &str) -> Result<String> {
        validate_filename(folder)?;

        let path = self.layout.folder_path(folder);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ServiceError::FileExists(folder.to_string()));
        }

        tokio::fs::create_dir(&path)
            .await
            .map_err(|e| ServiceError::Internal(format!("create folder: {}", e)))?;

        tracing::info!("Folder created: {} by {}", folder, user);
        Ok(format!("folder {} created", folder))
    }

    pub async fn view_folder(&self, folder: &str, _user: &str) -> Result<String> {
        validate_filename(folder)?;

        let path = self.layout.folder_path(folder);
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|_| ServiceError::FileNotFound(folder.to_string()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ServiceError::Internal(format!("folder read: {}", e)))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names.join("\n"))
    }

    pub async fn move_to_folder(&self, filename: &str, folder: &str, user: &str) -> Result<String> {
        validate_filename(filename)?;
        validate_filename(folder)?;
        let _guard = self.locks.write(filename).await;

        if !self.layout.body_exists(filename).await {
            return Err(ServiceError::FileNotFound(filename.to_string()));
        }

        let folder_path = self.layout.folder_path(folder);
        if !tokio::fs::try_exists(&folder_path).await.unwrap_or(false) {
            return Err(ServiceError::FileNotFound(folder.to_string()));
        }

        self.layout.move_into_folder(filename, folder).await?;

        tracing::info!("File moved: {} -> {}/ by {}", filename, folder, user);
        Ok(format!("file moved to folder {}", folder))
    }

    #[cfg(test)]
    pub(crate) fn lock_table(&self) -> &FileLockTable {
        &self.locks
    }

    #[cfg(test)]
    pub(crate) fn layout(&self) -> &StoreLayout {
        &self.layout
    }
}

fn format_timestamp(secs: u64) -> String {
    match DateTime::from_timestamp(secs as i64, 0) {
        Some(when) => when.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

fn format_acl(meta: &FileMetadata) -> String {
    if meta.acl.is_empty() {
        return "none".to_string();
    }
    meta.acl
        .iter()
        .map(|entry| format!("{} ({})", entry.username, entry.permission.label()))
        .collect::<Vec<_>>()
        .join(", ")
}
