#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::NameNodeConfig;
    use crate::error::ServiceError;
    use crate::namenode::cache::LruCache;
    use crate::namenode::locks::SentenceLockTable;
    use crate::namenode::persist::{encode_record, parse_record};
    use crate::namenode::registry::{NameRegistry, NodeRegistration};
    use crate::namenode::types::FileRecord;

    fn test_registry(dir: &tempfile::TempDir) -> NameRegistry {
        let config = NameNodeConfig {
            registry_path: dir.path().join("file_registry.txt"),
            ..NameNodeConfig::default()
        };
        NameRegistry::new(&config)
    }

    fn registration(id: &str, client_port: u16) -> NodeRegistration {
        NodeRegistration {
            node_id: id.to_string(),
            address: "127.0.0.1".to_string(),
            control_port: 6000,
            client_port,
        }
    }

    // ============================================================
    // LRU CACHE
    // ============================================================

    #[test]
    fn test_cache_put_get_remove() {
        let mut cache: LruCache<u32> = LruCache::new(10);
        cache.put("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache: LruCache<u32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("c", 3);

        assert_eq!(cache.get("a"), None, "oldest entry should be evicted");
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_cache_hit_promotes_entry() {
        let mut cache: LruCache<u32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);

        // Touch "a" so "b" becomes the cold entry.
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_cache_overwrite_keeps_single_entry() {
        let mut cache: LruCache<u32> = LruCache::new(2);
        cache.put("a", 1);
        cache.put("a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(2));
    }

    // ============================================================
    // PLACEMENT AND NAMESPACE
    // ============================================================

    #[tokio::test]
    async fn test_placement_prefers_lowest_file_count() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);

        registry.register_node(registration("A", 7001)).await;
        registry.register_node(registration("B", 7002)).await;

        // Both empty: first in registration order wins the tie.
        let (_, port) = registry.create_file("doc1", "u1").await.unwrap();
        assert_eq!(port, 7001);
        assert_eq!(registry.node_record("A").await.unwrap().file_count, 1);
        assert_eq!(registry.node_record("B").await.unwrap().file_count, 0);

        let record = registry.file_record("doc1").await.unwrap();
        assert_eq!(record.owner, "u1");
        assert_eq!(record.node_id, "A");

        // A now carries a file, so B takes the next one.
        let (_, port) = registry.create_file("doc2", "u1").await.unwrap();
        assert_eq!(port, 7002);
    }

    #[tokio::test]
    async fn test_create_existing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;

        registry.create_file("doc", "u1").await.unwrap();
        let err = registry.create_file("doc", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::FileExists(_)));
    }

    #[tokio::test]
    async fn test_create_without_nodes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);

        let err = registry.create_file("doc", "u1").await.unwrap_err();
        assert_eq!(err, ServiceError::NoStorageNodes);
    }

    #[tokio::test]
    async fn test_placement_skips_disconnected_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.register_node(registration("B", 7002)).await;

        // Silence A past the threshold.
        registry.age_node_heartbeat("A", 60).await;
        let downed = registry.mark_stale_nodes(Duration::from_secs(30)).await;
        assert_eq!(downed.len(), 1);
        assert_eq!(downed[0].0, "A");

        let (_, port) = registry.create_file("doc", "u1").await.unwrap();
        assert_eq!(port, 7002);
    }

    #[tokio::test]
    async fn test_delete_requires_owner_and_restores_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;

        registry.create_file("doc", "u1").await.unwrap();

        let err = registry.delete_file("doc", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        registry.delete_file("doc", "u1").await.unwrap();
        assert!(registry.file_record("doc").await.is_none());
        assert_eq!(registry.node_record("A").await.unwrap().file_count, 0);

        // The name is free again.
        registry.create_file("doc", "u2").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let err = registry.delete_file("ghost", "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_reports_down_node() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.create_file("doc", "u1").await.unwrap();

        registry.resolve("doc").await.unwrap();

        registry.age_node_heartbeat("A", 60).await;
        let downed = registry.mark_stale_nodes(Duration::from_secs(30)).await;
        assert_eq!(downed.len(), 1);
        let err = registry.resolve("doc").await.unwrap_err();
        assert_eq!(err, ServiceError::StorageNodeDown);

        // Re-registration brings the node back.
        registry.register_node(registration("A", 7001)).await;
        registry.resolve("doc").await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_unknown_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let err = registry.resolve("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_every_record_points_at_a_known_node() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.register_node(registration("B", 7002)).await;

        for i in 0..10 {
            registry
                .create_file(&format!("doc{}", i), "u1")
                .await
                .unwrap();
        }

        for record in registry.view().await {
            assert!(
                registry.node_record(&record.node_id).await.is_some(),
                "record {} references unknown node {}",
                record.filename,
                record.node_id
            );
        }
    }

    #[tokio::test]
    async fn test_replica_peers_are_mutual() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.register_node(registration("B", 7002)).await;

        let a = registry.node_record("A").await.unwrap();
        let b = registry.node_record("B").await.unwrap();
        assert_eq!(a.replica_peer.as_deref(), Some("B"));
        assert_eq!(b.replica_peer.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_reregistration_keeps_file_count() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.create_file("doc", "u1").await.unwrap();

        registry.register_node(registration("A", 7001)).await;
        assert_eq!(registry.node_record("A").await.unwrap().file_count, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_node_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        assert!(registry.heartbeat("ghost").await.is_err());
    }

    // ============================================================
    // SENTENCE LOCKS
    // ============================================================

    #[test]
    fn test_lock_acquire_and_release() {
        let locks = SentenceLockTable::new(60_000);

        locks.acquire("u1", "doc", 0).unwrap();
        assert_eq!(locks.holder_of("doc", 0).as_deref(), Some("u1"));

        locks.release("u1", "doc", 0).unwrap();
        assert!(locks.is_empty());
    }

    #[test]
    fn test_lock_reacquire_is_idempotent_and_renews_lease() {
        let locks = SentenceLockTable::new(60_000);

        locks.acquire("u1", "doc", 0).unwrap();
        let first_lease = locks.lease_of("doc", 0).unwrap();

        locks.acquire("u1", "doc", 0).unwrap();
        assert_eq!(locks.len(), 1, "re-acquire must not add an entry");
        assert!(locks.lease_of("doc", 0).unwrap() >= first_lease);
    }

    #[test]
    fn test_lock_contention() {
        let locks = SentenceLockTable::new(60_000);

        locks.acquire("u1", "doc", 0).unwrap();
        let err = locks.acquire("u2", "doc", 0).unwrap_err();
        assert_eq!(
            err,
            ServiceError::FileLocked {
                holder: "u1".to_string()
            }
        );
        assert_eq!(locks.holder_of("doc", 0).as_deref(), Some("u1"));

        // After the holder releases, the contender wins.
        locks.release("u1", "doc", 0).unwrap();
        locks.acquire("u2", "doc", 0).unwrap();
        assert_eq!(locks.holder_of("doc", 0).as_deref(), Some("u2"));
    }

    #[test]
    fn test_distinct_sentences_lock_independently() {
        let locks = SentenceLockTable::new(60_000);
        locks.acquire("u1", "doc", 0).unwrap();
        locks.acquire("u2", "doc", 1).unwrap();
        locks.acquire("u2", "other", 0).unwrap();
        assert_eq!(locks.len(), 3);
    }

    #[test]
    fn test_release_by_non_holder_fails() {
        let locks = SentenceLockTable::new(60_000);
        locks.acquire("u1", "doc", 0).unwrap();

        let err = locks.release("u2", "doc", 0).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert_eq!(locks.holder_of("doc", 0).as_deref(), Some("u1"));
    }

    #[test]
    fn test_release_absent_lock_fails() {
        let locks = SentenceLockTable::new(60_000);
        let err = locks.release("u1", "doc", 0).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParameters(_)));
    }

    #[test]
    fn test_expired_lease_is_acquirable_by_other_user() {
        let locks = SentenceLockTable::new(60_000);
        locks.acquire("u1", "doc", 0).unwrap();
        locks.expire_now("doc", 0);

        locks.acquire("u2", "doc", 0).unwrap();
        assert_eq!(locks.holder_of("doc", 0).as_deref(), Some("u2"));
    }

    #[test]
    fn test_reclaim_collects_only_expired_leases() {
        let locks = SentenceLockTable::new(60_000);
        locks.acquire("u1", "doc", 0).unwrap();
        locks.acquire("u1", "doc", 1).unwrap();
        locks.expire_now("doc", 1);

        let reclaimed = locks.reclaim_expired();
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].sentence_index, 1);
        assert_eq!(locks.len(), 1);
        assert_eq!(locks.holder_of("doc", 0).as_deref(), Some("u1"));
    }

    #[test]
    fn test_validate_confirms_holder_only() {
        let locks = SentenceLockTable::new(60_000);

        assert!(locks.validate("u1", "doc", 0).is_err());

        locks.acquire("u1", "doc", 0).unwrap();
        locks.validate("u1", "doc", 0).unwrap();

        let err = locks.validate("u2", "doc", 0).unwrap_err();
        assert!(matches!(err, ServiceError::FileLocked { .. }));

        // Validation never creates entries.
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_validate_rejects_expired_lease() {
        let locks = SentenceLockTable::new(60_000);
        locks.acquire("u1", "doc", 0).unwrap();
        locks.expire_now("doc", 0);
        assert!(locks.validate("u1", "doc", 0).is_err());
    }

    // ============================================================
    // FRAME DISPATCH
    // ============================================================

    #[tokio::test]
    async fn test_registration_and_heartbeat_frames() {
        use crate::namenode::handlers::NameNode;
        use crate::protocol::codes::{Command, ErrorCode, MessageKind};
        use crate::protocol::frame::Frame;

        let dir = tempfile::tempdir().unwrap();
        let config = NameNodeConfig {
            registry_path: dir.path().join("file_registry.txt"),
            ..NameNodeConfig::default()
        };
        let registry = std::sync::Arc::new(NameRegistry::new(&config));
        let node = NameNode::new(registry.clone(), config);

        let reg = Frame {
            kind: MessageKind::RegisterNode,
            command: Command::None,
            error: ErrorCode::Success,
            identity: "A".to_string(),
            filename: String::new(),
            data: b"A|127.0.0.1|6001|7001".to_vec(),
        };
        let reply = node.handle(reg).await;
        assert!(reply.error.is_success());
        assert!(registry.node_record("A").await.unwrap().connected);

        // A heartbeat is answered with an ack and refreshes liveness.
        let reply = node.handle(Frame::heartbeat("A")).await;
        assert_eq!(reply.kind, MessageKind::Ack);

        // Heartbeats from unregistered nodes are rejected.
        let reply = node.handle(Frame::heartbeat("ghost")).await;
        assert!(!reply.error.is_success());

        // A downed node comes back through re-registration.
        registry.age_node_heartbeat("A", 60).await;
        registry
            .mark_stale_nodes(std::time::Duration::from_secs(30))
            .await;
        assert!(!registry.node_record("A").await.unwrap().connected);

        let rereg = Frame {
            kind: MessageKind::RegisterNode,
            command: Command::None,
            error: ErrorCode::Success,
            identity: "A".to_string(),
            filename: String::new(),
            data: b"A|127.0.0.1|6001|7001".to_vec(),
        };
        node.handle(rereg).await;
        assert!(registry.node_record("A").await.unwrap().connected);
    }

    // ============================================================
    // ACCESS-REQUEST WORKFLOW
    // ============================================================

    #[tokio::test]
    async fn test_request_access_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.create_file("doc", "u1").await.unwrap();

        let owner = registry.request_access("doc", "u2").await.unwrap();
        assert_eq!(owner, "u1");

        let pending = registry.pending_requests("u1").await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].requester, "u2");

        // Nobody else sees it.
        assert!(registry.pending_requests("u2").await.is_empty());

        registry
            .verify_pending_request("doc", "u2", "u1")
            .await
            .unwrap();
        registry.complete_request("doc", "u2").await;

        // Once consumed, a second approval or denial finds nothing.
        let err = registry
            .verify_pending_request("doc", "u2", "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::FileNotFound(_)));
        assert!(registry.pending_requests("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_request_access_unknown_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        let err = registry.request_access("ghost", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_only_owner_may_approve() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(&dir);
        registry.register_node(registration("A", 7001)).await;
        registry.create_file("doc", "u1").await.unwrap();
        registry.request_access("doc", "u2").await.unwrap();

        let err = registry
            .verify_pending_request("doc", "u2", "u3")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    // ============================================================
    // PERSISTENCE
    // ============================================================

    #[test]
    fn test_record_line_roundtrip() {
        let mut record = FileRecord::new("doc.txt", "alice", "A");
        record.word_count = 12;
        record.char_count = 80;

        let line = encode_record(&record);
        let parsed = parse_record(&line).expect("line should parse");
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_malformed_record_line_rejected() {
        assert!(parse_record("too|few|fields").is_none());
        assert!(parse_record("a|b|c|x|0|0|u|0|0").is_none());
    }

    #[tokio::test]
    async fn test_registry_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        {
            let registry = test_registry(&dir);
            registry.register_node(registration("A", 7001)).await;
            registry.create_file("doc", "u1").await.unwrap();
        }

        let registry = test_registry(&dir);
        let loaded = registry.load().await.unwrap();
        assert_eq!(loaded, 1);

        let record = registry.file_record("doc").await.unwrap();
        assert_eq!(record.owner, "u1");
        assert_eq!(record.node_id, "A");
    }
}
