use crate::error::{Result, ServiceError};

/// ACL capacity per file.
pub const MAX_ACL_ENTRIES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    pub fn as_char(self) -> char {
        match self {
            Permission::Read => 'R',
            Permission::Write => 'W',
        }
    }

    pub fn from_flag(flag: &str) -> Result<Permission> {
        match flag {
            "R" => Ok(Permission::Read),
            "W" => Ok(Permission::Write),
            other => Err(ServiceError::InvalidParameters(format!(
                "unknown permission flag {:?}",
                other
            ))),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub username: String,
    pub permission: Permission,
}

/// Per-file metadata held by the hosting node. The owner is not stored in
/// the ACL and implicitly holds both permissions.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub owner: String,
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub last_accessed_by: String,
    pub word_count: u64,
    pub char_count: u64,
    pub acl: Vec<AclEntry>,
}

impl FileMetadata {
    pub fn new(owner: &str) -> FileMetadata {
        let now = now_secs();
        FileMetadata {
            owner: owner.to_string(),
            created: now,
            modified: now,
            accessed: now,
            last_accessed_by: owner.to_string(),
            word_count: 0,
            char_count: 0,
            acl: Vec::new(),
        }
    }

    /// Write permission implies read; the owner holds both.
    pub fn allows(&self, user: &str, wanted: Permission) -> bool {
        if self.owner == user {
            return true;
        }

        self.acl.iter().any(|entry| {
            entry.username == user
                && match wanted {
                    Permission::Read => true,
                    Permission::Write => entry.permission == Permission::Write,
                }
        })
    }

    pub fn acl_contains(&self, user: &str) -> bool {
        self.acl.iter().any(|entry| entry.username == user)
    }

    pub fn touch_access(&mut self, user: &str) {
        self.accessed = now_secs();
        self.last_accessed_by = user.to_string();
    }

    pub fn touch_modified(&mut self) {
        self.modified = now_secs();
    }
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
