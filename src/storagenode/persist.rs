use std::path::{Path, PathBuf};

use crate::error::{Result, ServiceError};

use super::types::{AclEntry, FileMetadata, Permission};

/// On-disk layout of a storage node's data directory:
/// bodies under `files/`, keyed-line metadata under `metadata/`, the
/// depth-one undo side-file under `undo/`, and `<file>_<tag>.ckpt`
/// snapshots under `checkpoints/`.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> StoreLayout {
        StoreLayout { root: root.into() }
    }

    pub async fn init(&self) -> Result<()> {
        for dir in ["files", "metadata", "undo", "checkpoints"] {
            tokio::fs::create_dir_all(self.root.join(dir))
                .await
                .map_err(|e| ServiceError::Internal(format!("create {} dir: {}", dir, e)))?;
        }
        Ok(())
    }

    pub fn body_path(&self, filename: &str) -> PathBuf {
        self.root.join("files").join(filename)
    }

    fn metadata_path(&self, filename: &str) -> PathBuf {
        self.root.join("metadata").join(format!("{}.meta", filename))
    }

    fn undo_path(&self, filename: &str) -> PathBuf {
        self.root.join("undo").join(format!("{}.undo", filename))
    }

    fn checkpoint_path(&self, filename: &str, tag: &str) -> PathBuf {
        self.root
            .join("checkpoints")
            .join(format!("{}_{}.ckpt", filename, tag))
    }

    pub fn folder_path(&self, folder: &str) -> PathBuf {
        self.root.join("files").join(folder)
    }

    /// Relocates a file's artifacts (body, metadata, undo) under a
    /// single-level folder. Metadata and undo move only if present.
    pub async fn move_into_folder(&self, filename: &str, folder: &str) -> Result<()> {
        let meta_dir = self.root.join("metadata").join(folder);
        let undo_dir = self.root.join("undo").join(folder);
        for dir in [&meta_dir, &undo_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ServiceError::Internal(format!("folder dirs: {}", e)))?;
        }

        let body_target = self.folder_path(folder).join(filename);
        tokio::fs::rename(self.body_path(filename), &body_target)
            .await
            .map_err(|e| ServiceError::Internal(format!("move body: {}", e)))?;

        let _ = tokio::fs::rename(
            self.metadata_path(filename),
            meta_dir.join(format!("{}.meta", filename)),
        )
        .await;
        let _ = tokio::fs::rename(
            self.undo_path(filename),
            undo_dir.join(format!("{}.undo", filename)),
        )
        .await;

        Ok(())
    }

    // ------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------

    pub async fn body_exists(&self, filename: &str) -> bool {
        tokio::fs::try_exists(self.body_path(filename))
            .await
            .unwrap_or(false)
    }

    pub async fn body_size(&self, filename: &str) -> u64 {
        match tokio::fs::metadata(self.body_path(filename)).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        }
    }

    pub async fn load_body(&self, filename: &str) -> Result<String> {
        read_text(&self.body_path(filename), "file").await
    }

    /// Atomic write: the body lands in a temp file that is renamed over the
    /// target, so a reader never observes a partially written commit.
    pub async fn save_body(&self, filename: &str, content: &str) -> Result<()> {
        write_atomic(&self.body_path(filename), content).await
    }

    pub async fn delete_body(&self, filename: &str) -> Result<()> {
        remove_quiet(&self.body_path(filename)).await
    }

    // ------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------

    pub async fn metadata_exists(&self, filename: &str) -> bool {
        tokio::fs::try_exists(self.metadata_path(filename))
            .await
            .unwrap_or(false)
    }

    pub async fn load_metadata(&self, filename: &str) -> Result<FileMetadata> {
        let contents = match tokio::fs::read_to_string(self.metadata_path(filename)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::FileNotFound(filename.to_string()))
            }
            Err(e) => return Err(ServiceError::Internal(format!("metadata read: {}", e))),
        };
        Ok(parse_metadata(&contents))
    }

    pub async fn save_metadata(&self, filename: &str, meta: &FileMetadata) -> Result<()> {
        write_atomic(&self.metadata_path(filename), &encode_metadata(meta)).await
    }

    pub async fn delete_metadata(&self, filename: &str) -> Result<()> {
        remove_quiet(&self.metadata_path(filename)).await
    }

    // ------------------------------------------------------------
    // Undo slot
    // ------------------------------------------------------------

    pub async fn load_undo(&self, filename: &str) -> Option<String> {
        tokio::fs::read_to_string(self.undo_path(filename)).await.ok()
    }

    pub async fn save_undo(&self, filename: &str, content: &str) -> Result<()> {
        write_atomic(&self.undo_path(filename), content).await
    }

    pub async fn delete_undo(&self, filename: &str) -> Result<()> {
        remove_quiet(&self.undo_path(filename)).await
    }

    // ------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------

    /// Snapshots are immutable: a timestamp line followed by the content.
    pub async fn save_checkpoint(
        &self,
        filename: &str,
        tag: &str,
        timestamp: u64,
        content: &str,
    ) -> Result<()> {
        let blob = format!("{}\n{}", timestamp, content);
        write_atomic(&self.checkpoint_path(filename, tag), &blob).await
    }

    pub async fn load_checkpoint(&self, filename: &str, tag: &str) -> Result<(u64, String)> {
        let contents = match tokio::fs::read_to_string(self.checkpoint_path(filename, tag)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServiceError::FileNotFound(format!(
                    "checkpoint {} of {}",
                    tag, filename
                )))
            }
            Err(e) => return Err(ServiceError::Internal(format!("checkpoint read: {}", e))),
        };

        match contents.split_once('\n') {
            Some((first, rest)) => {
                let timestamp = first.trim().parse::<u64>().unwrap_or(0);
                Ok((timestamp, rest.to_string()))
            }
            None => Ok((contents.trim().parse::<u64>().unwrap_or(0), String::new())),
        }
    }

    pub async fn list_checkpoints(&self, filename: &str) -> Result<Vec<String>> {
        let prefix = format!("{}_", filename);
        let mut tags = Vec::new();

        let mut entries = tokio::fs::read_dir(self.root.join("checkpoints"))
            .await
            .map_err(|e| ServiceError::Internal(format!("checkpoints dir: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ServiceError::Internal(format!("checkpoints dir: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(rest) = name.strip_prefix(&prefix) {
                if let Some(tag) = rest.strip_suffix(".ckpt") {
                    tags.push(tag.to_string());
                }
            }
        }

        tags.sort();
        Ok(tags)
    }
}

/// Rejects names that would escape the data directory or collide with the
/// wire format's `|` separators.
pub fn validate_filename(name: &str) -> Result<()> {
    const INVALID: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

    if name.is_empty() || name.len() >= 256 {
        return Err(ServiceError::InvalidParameters(
            "filename length out of range".to_string(),
        ));
    }
    if name.contains("..") || name.chars().any(|c| INVALID.contains(&c) || c.is_control()) {
        return Err(ServiceError::InvalidParameters(format!(
            "invalid filename {:?}",
            name
        )));
    }
    Ok(())
}

fn encode_metadata(meta: &FileMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!("owner:{}\n", meta.owner));
    out.push_str(&format!("created:{}\n", meta.created));
    out.push_str(&format!("modified:{}\n", meta.modified));
    out.push_str(&format!("accessed:{}\n", meta.accessed));
    out.push_str(&format!("accessed_by:{}\n", meta.last_accessed_by));
    out.push_str(&format!("words:{}\n", meta.word_count));
    out.push_str(&format!("chars:{}\n", meta.char_count));
    for entry in &meta.acl {
        out.push_str(&format!(
            "acl:{}:{}\n",
            entry.username,
            entry.permission.as_char()
        ));
    }
    out
}

fn parse_metadata(contents: &str) -> FileMetadata {
    let mut meta = FileMetadata::new("");

    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("owner:") {
            meta.owner = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("created:") {
            meta.created = value.trim().parse().unwrap_or(0);
        } else if let Some(value) = line.strip_prefix("modified:") {
            meta.modified = value.trim().parse().unwrap_or(0);
        } else if let Some(value) = line.strip_prefix("accessed_by:") {
            meta.last_accessed_by = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("accessed:") {
            meta.accessed = value.trim().parse().unwrap_or(0);
        } else if let Some(value) = line.strip_prefix("words:") {
            meta.word_count = value.trim().parse().unwrap_or(0);
        } else if let Some(value) = line.strip_prefix("chars:") {
            meta.char_count = value.trim().parse().unwrap_or(0);
        } else if let Some(value) = line.strip_prefix("acl:") {
            if let Some((user, flag)) = value.rsplit_once(':') {
                let permission = if flag.trim() == "W" {
                    Permission::Write
                } else {
                    Permission::Read
                };
                meta.acl.push(AclEntry {
                    username: user.trim().to_string(),
                    permission,
                });
            }
        }
    }

    meta
}

async fn read_text(path: &Path, what: &str) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ServiceError::FileNotFound(
            format!("{} {}", what, path.display()),
        )),
        Err(e) => Err(ServiceError::Internal(format!("{} read: {}", what, e))),
    }
}

async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|e| ServiceError::Internal(format!("write {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ServiceError::Internal(format!("rename {}: {}", path.display(), e)))
}

async fn remove_quiet(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ServiceError::Internal(format!(
            "remove {}: {}",
            path.display(),
            e
        ))),
    }
}
