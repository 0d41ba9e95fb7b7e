/// Namespace entry for one file. The hosting node is referenced by id and
/// resolved through the node registry, never by pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub filename: String,
    pub owner: String,
    pub node_id: String,
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub last_accessed_by: String,
    pub word_count: u64,
    pub char_count: u64,
}

impl FileRecord {
    pub fn new(filename: &str, owner: &str, node_id: &str) -> FileRecord {
        let now = now_secs();
        FileRecord {
            filename: filename.to_string(),
            owner: owner.to_string(),
            node_id: node_id.to_string(),
            created: now,
            modified: now,
            accessed: now,
            last_accessed_by: owner.to_string(),
            word_count: 0,
            char_count: 0,
        }
    }
}

/// One registered storage node.
#[derive(Debug, Clone)]
pub struct StorageNodeRecord {
    pub node_id: String,
    pub address: String,
    pub control_port: u16,
    pub client_port: u16,
    pub connected: bool,
    pub last_heartbeat: u64,
    /// Number of files homed here; drives placement.
    pub file_count: u64,
    /// Best-effort mutual replica peer assigned at registration.
    pub replica_peer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub address: String,
    pub registered: u64,
}

/// Composite key of a sentence lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub filename: String,
    pub sentence_index: usize,
}

impl LockKey {
    pub fn new(filename: &str, sentence_index: usize) -> LockKey {
        LockKey {
            filename: filename.to_string(),
            sentence_index,
        }
    }
}

/// An in-memory sentence reservation. Carries a renewable lease so the
/// background scan can reclaim locks left behind by crashed clients.
#[derive(Debug, Clone)]
pub struct SentenceLock {
    pub holder: String,
    pub acquired_at: u64,
    pub lease_expires: u64,
}

/// Composite key of an access request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub filename: String,
    pub requester: String,
}

impl RequestKey {
    pub fn new(filename: &str, requester: &str) -> RequestKey {
        RequestKey {
            filename: filename.to_string(),
            requester: requester.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub filename: String,
    pub requester: String,
    pub owner: String,
    pub requested_at: u64,
    pub pending: bool,
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
