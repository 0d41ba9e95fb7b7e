use std::path::Path;

use crate::error::{Result, ServiceError};

use super::types::FileRecord;

/// The persisted namespace: one `|`-delimited line per file record.
/// `filename|owner|ss-id|created|modified|accessed|last_accessed_by|words|chars`
pub fn encode_record(record: &FileRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        record.filename,
        record.owner,
        record.node_id,
        record.created,
        record.modified,
        record.accessed,
        record.last_accessed_by,
        record.word_count,
        record.char_count
    )
}

pub fn parse_record(line: &str) -> Option<FileRecord> {
    let fields: Vec<&str> = line.trim_end().split('|').collect();
    if fields.len() != 9 {
        return None;
    }

    Some(FileRecord {
        filename: fields[0].to_string(),
        owner: fields[1].to_string(),
        node_id: fields[2].to_string(),
        created: fields[3].parse().ok()?,
        modified: fields[4].parse().ok()?,
        accessed: fields[5].parse().ok()?,
        last_accessed_by: fields[6].to_string(),
        word_count: fields[7].parse().ok()?,
        char_count: fields[8].parse().ok()?,
    })
}

pub async fn save_registry(path: &Path, records: &[FileRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ServiceError::Internal(format!("registry dir: {}", e)))?;
    }

    let mut contents = String::new();
    for record in records {
        contents.push_str(&encode_record(record));
        contents.push('\n');
    }

    tokio::fs::write(path, contents)
        .await
        .map_err(|e| ServiceError::Internal(format!("registry write: {}", e)))
}

/// Loads the persisted namespace; a missing file is an empty namespace.
/// Malformed lines are skipped with a warning rather than failing startup.
pub async fn load_registry(path: &Path) -> Result<Vec<FileRecord>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ServiceError::Internal(format!("registry read: {}", e))),
    };

    let mut records = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line) {
            Some(record) => records.push(record),
            None => tracing::warn!("Skipping malformed registry line: {}", line),
        }
    }

    Ok(records)
}
