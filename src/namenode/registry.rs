use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::NameNodeConfig;
use crate::error::{Result, ServiceError};

use super::cache::LruCache;
use super::locks::SentenceLockTable;
use super::persist;
use super::types::{
    now_secs, AccessRequest, FileRecord, RequestKey, StorageNodeRecord, UserRecord,
};

/// Registration payload of a storage node.
#[derive(Debug, Clone)]
pub struct NodeRegistration {
    pub node_id: String,
    pub address: String,
    pub control_port: u16,
    pub client_port: u16,
}

#[derive(Default)]
struct RegistryState {
    files: HashMap<String, FileRecord>,
    nodes: HashMap<String, StorageNodeRecord>,
    /// Registration order; placement iterates this so ties break
    /// deterministically by the order nodes joined.
    node_order: Vec<String>,
    users: HashMap<String, UserRecord>,
    requests: HashMap<RequestKey, AccessRequest>,
}

/// All name-node state, owned by the process and passed to handlers.
///
/// Mutating operations serialise through the state write lock, which makes
/// Create-vs-Create on one filename mutually exclusive and placement
/// increments atomic with record insertion. The LRU cache sits beside the
/// lock as a read-through courtesy.
pub struct NameRegistry {
    state: RwLock<RegistryState>,
    pub locks: SentenceLockTable,
    cache: Mutex<LruCache<FileRecord>>,
    registry_path: PathBuf,
}

impl NameRegistry {
    pub fn new(config: &NameNodeConfig) -> NameRegistry {
        NameRegistry {
            state: RwLock::new(RegistryState::default()),
            locks: SentenceLockTable::new(config.lock_lease_secs * 1000),
            cache: Mutex::new(LruCache::new(config.cache_capacity)),
            registry_path: config.registry_path.clone(),
        }
    }

    /// Loads the persisted namespace at startup.
    pub async fn load(&self) -> Result<usize> {
        let records = persist::load_registry(&self.registry_path).await?;
        let count = records.len();

        let mut state = self.state.write().await;
        for record in records {
            state.files.insert(record.filename.clone(), record);
        }
        Ok(count)
    }

    async fn persist(&self) -> Result<()> {
        let records: Vec<FileRecord> = {
            let state = self.state.read().await;
            state.files.values().cloned().collect()
        };
        persist::save_registry(&self.registry_path, &records).await
    }

    // ------------------------------------------------------------
    // Node and user registration
    // ------------------------------------------------------------

    /// Upserts a storage node. A brand-new node and the most recently
    /// registered existing node become mutual replica peers (best effort,
    /// no replication semantics attached). Reconnection resets `connected`
    /// and the heartbeat clock but keeps the file count.
    pub async fn register_node(&self, reg: NodeRegistration) -> Option<String> {
        let mut state = self.state.write().await;
        let now = now_secs();

        if let Some(existing) = state.nodes.get_mut(&reg.node_id) {
            existing.address = reg.address;
            existing.control_port = reg.control_port;
            existing.client_port = reg.client_port;
            existing.connected = true;
            existing.last_heartbeat = now;
            return existing.replica_peer.clone();
        }

        let peer_id = state.node_order.last().cloned();
        if let Some(peer_id) = &peer_id {
            if let Some(peer) = state.nodes.get_mut(peer_id) {
                peer.replica_peer = Some(reg.node_id.clone());
            }
        }

        let record = StorageNodeRecord {
            node_id: reg.node_id.clone(),
            address: reg.address,
            control_port: reg.control_port,
            client_port: reg.client_port,
            connected: true,
            last_heartbeat: now,
            file_count: 0,
            replica_peer: peer_id.clone(),
        };

        state.node_order.push(reg.node_id.clone());
        state.nodes.insert(reg.node_id, record);
        peer_id
    }

    pub async fn register_user(&self, username: &str, address: &str) {
        let mut state = self.state.write().await;
        state.users.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                address: address.to_string(),
                registered: now_secs(),
            },
        );
    }

    pub async fn heartbeat(&self, node_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        match state.nodes.get_mut(node_id) {
            Some(node) => {
                node.last_heartbeat = now_secs();
                node.connected = true;
                Ok(())
            }
            None => Err(ServiceError::InvalidParameters(format!(
                "unknown storage node {}",
                node_id
            ))),
        }
    }

    /// Marks nodes silent past the threshold disconnected. Returns the
    /// downed node ids with their replica-peer failover candidates.
    pub async fn mark_stale_nodes(&self, threshold: Duration) -> Vec<(String, Option<String>)> {
        let mut state = self.state.write().await;
        let now = now_secs();
        let mut downed = Vec::new();

        for node in state.nodes.values_mut() {
            if node.connected && now.saturating_sub(node.last_heartbeat) > threshold.as_secs() {
                node.connected = false;
                downed.push((node.node_id.clone(), node.replica_peer.clone()));
            }
        }
        downed
    }

    // ------------------------------------------------------------
    // Namespace operations
    // ------------------------------------------------------------

    pub async fn view(&self) -> Vec<FileRecord> {
        let state = self.state.read().await;
        let mut records: Vec<FileRecord> = state.files.values().cloned().collect();
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        records
    }

    pub async fn users(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut users: Vec<String> = state.users.keys().cloned().collect();
        users.sort();
        users
    }

    /// Creates the namespace entry and places the file on the connected
    /// node with the lowest file count. Returns the chosen node's client
    /// address for the content hop.
    pub async fn create_file(&self, filename: &str, owner: &str) -> Result<(String, u16)> {
        let endpoint = {
            let mut state = self.state.write().await;

            if state.files.contains_key(filename) {
                return Err(ServiceError::FileExists(filename.to_string()));
            }

            let node_id = select_home(&state)?;
            let record = FileRecord::new(filename, owner, &node_id);
            state.files.insert(filename.to_string(), record);

            let node = state
                .nodes
                .get_mut(&node_id)
                .expect("placement returned a known node");
            node.file_count += 1;
            (node.address.clone(), node.client_port)
        };

        self.persist().await?;
        Ok(endpoint)
    }

    /// Resolves a filename to its home node's client endpoint, or fails
    /// with not-found / storage-node-down.
    pub async fn resolve(&self, filename: &str) -> Result<(String, u16)> {
        let cached = self.cache.lock().unwrap().get(filename);

        let state = self.state.read().await;
        let record = match cached {
            Some(record) => record,
            None => {
                let record = state
                    .files
                    .get(filename)
                    .cloned()
                    .ok_or_else(|| ServiceError::FileNotFound(filename.to_string()))?;
                self.cache.lock().unwrap().put(filename, record.clone());
                record
            }
        };

        let node = state
            .nodes
            .get(&record.node_id)
            .ok_or(ServiceError::StorageNodeDown)?;
        if !node.connected {
            return Err(ServiceError::StorageNodeDown);
        }

        Ok((node.address.clone(), node.client_port))
    }

    /// The control endpoint (`ip:control-port`) of a file's home node,
    /// used for ACL pushes in the approval workflow.
    pub async fn control_endpoint(&self, filename: &str) -> Result<String> {
        let state = self.state.read().await;
        let record = state
            .files
            .get(filename)
            .ok_or_else(|| ServiceError::FileNotFound(filename.to_string()))?;

        let node = state
            .nodes
            .get(&record.node_id)
            .ok_or(ServiceError::StorageNodeDown)?;
        if !node.connected {
            return Err(ServiceError::StorageNodeDown);
        }

        Ok(format!("{}:{}", node.address, node.control_port))
    }

    /// The first connected node in registration order; used for folder
    /// operations that are not homed on a particular file.
    pub async fn first_connected(&self) -> Result<(String, u16)> {
        let state = self.state.read().await;
        for node_id in &state.node_order {
            if let Some(node) = state.nodes.get(node_id) {
                if node.connected {
                    return Ok((node.address.clone(), node.client_port));
                }
            }
        }
        Err(ServiceError::NoStorageNodes)
    }

    /// Removes the namespace entry. Only the owner may delete. The caller
    /// is expected to instruct the home node to delete its artifacts; the
    /// record removal here is the namespace-of-record.
    pub async fn delete_file(&self, filename: &str, requester: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;

            let record = state
                .files
                .get(filename)
                .ok_or_else(|| ServiceError::FileNotFound(filename.to_string()))?;
            if record.owner != requester {
                return Err(ServiceError::Unauthorized(
                    "only the owner can delete a file".to_string(),
                ));
            }

            let node_id = record.node_id.clone();
            state.files.remove(filename);
            if let Some(node) = state.nodes.get_mut(&node_id) {
                node.file_count = node.file_count.saturating_sub(1);
            }
        }

        self.cache.lock().unwrap().remove(filename);
        self.persist().await
    }

    pub async fn file_record(&self, filename: &str) -> Option<FileRecord> {
        let state = self.state.read().await;
        state.files.get(filename).cloned()
    }

    pub async fn node_record(&self, node_id: &str) -> Option<StorageNodeRecord> {
        let state = self.state.read().await;
        state.nodes.get(node_id).cloned()
    }

    /// Test hook: backdate a node's heartbeat so the failure scan can run
    /// without waiting out the wall clock.
    #[cfg(test)]
    pub(crate) async fn age_node_heartbeat(&self, node_id: &str, age_secs: u64) {
        let mut state = self.state.write().await;
        if let Some(node) = state.nodes.get_mut(node_id) {
            node.last_heartbeat = now_secs().saturating_sub(age_secs);
        }
    }

    // ------------------------------------------------------------
    // Access-request workflow
    // ------------------------------------------------------------

    /// Files a pending request; returns the file's owner so the caller can
    /// be told who will see it.
    pub async fn request_access(&self, filename: &str, requester: &str) -> Result<String> {
        let mut state = self.state.write().await;

        let owner = state
            .files
            .get(filename)
            .map(|record| record.owner.clone())
            .ok_or_else(|| ServiceError::FileNotFound(filename.to_string()))?;

        state.requests.insert(
            RequestKey::new(filename, requester),
            AccessRequest {
                filename: filename.to_string(),
                requester: requester.to_string(),
                owner: owner.clone(),
                requested_at: now_secs(),
                pending: true,
            },
        );

        Ok(owner)
    }

    /// Every pending request whose owner is the caller.
    pub async fn pending_requests(&self, owner: &str) -> Vec<AccessRequest> {
        let state = self.state.read().await;
        let mut pending: Vec<AccessRequest> = state
            .requests
            .values()
            .filter(|req| req.pending && req.owner == owner)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        pending
    }

    /// Verifies a pending request exists and the caller owns the file.
    /// Does not consume the request; approval completes it only after the
    /// ACL push succeeded.
    pub async fn verify_pending_request(
        &self,
        filename: &str,
        requester: &str,
        caller: &str,
    ) -> Result<()> {
        let state = self.state.read().await;

        let request = state
            .requests
            .get(&RequestKey::new(filename, requester))
            .filter(|req| req.pending)
            .ok_or_else(|| ServiceError::FileNotFound("request not found".to_string()))?;

        if request.owner != caller {
            return Err(ServiceError::Unauthorized(
                "not the file owner".to_string(),
            ));
        }

        let record = state
            .files
            .get(filename)
            .ok_or_else(|| ServiceError::FileNotFound(filename.to_string()))?;
        if record.owner != caller {
            return Err(ServiceError::Unauthorized(
                "not the file owner".to_string(),
            ));
        }

        Ok(())
    }

    /// Marks a request non-pending after approval or denial.
    pub async fn complete_request(&self, filename: &str, requester: &str) {
        let mut state = self.state.write().await;
        if let Some(request) = state.requests.get_mut(&RequestKey::new(filename, requester)) {
            request.pending = false;
        }
    }
}

fn select_home(state: &RegistryState) -> Result<String> {
    let mut best: Option<&StorageNodeRecord> = None;

    for node_id in &state.node_order {
        if let Some(node) = state.nodes.get(node_id) {
            if !node.connected {
                continue;
            }
            let better = match best {
                None => true,
                Some(current) => node.file_count < current.file_count,
            };
            if better {
                best = Some(node);
            }
        }
    }

    best.map(|node| node.node_id.clone())
        .ok_or(ServiceError::NoStorageNodes)
}
