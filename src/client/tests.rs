#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::client::driver::Client;
    use crate::config::NameNodeConfig;
    use crate::edit::script::EditScript;
    use crate::error::ServiceError;
    use crate::namenode::handlers::NameNode;
    use crate::namenode::registry::NameRegistry;
    use crate::namenode::server as nn_server;
    use crate::protocol::codes::{Command, ErrorCode, MessageKind};
    use crate::protocol::frame::Frame;
    use crate::protocol::transport;
    use crate::storagenode::handlers::StorageNode;
    use crate::storagenode::server as sn_server;
    use crate::storagenode::store::FileStore;
    use crate::storagenode::validate::RemoteLockValidator;

    /// Boots a name node plus one storage node on ephemeral ports and
    /// registers the storage node, standing in for its heartbeat session.
    async fn start_cluster(dir: &tempfile::TempDir) -> String {
        let nn_config = NameNodeConfig {
            registry_path: dir.path().join("file_registry.txt"),
            ..NameNodeConfig::default()
        };
        let registry = Arc::new(NameRegistry::new(&nn_config));
        let name_node = NameNode::new(registry, nn_config);

        let nn_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let nn_addr = nn_listener.local_addr().unwrap().to_string();
        tokio::spawn(nn_server::run(name_node, nn_listener));

        let store = Arc::new(FileStore::new(dir.path().join("sn1"), "SN1"));
        store.init().await.unwrap();
        let validator = Arc::new(RemoteLockValidator::new(&nn_addr));
        let storage_node = StorageNode::new(store, validator);

        let client_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client_port = client_listener.local_addr().unwrap().port();
        let control_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let control_port = control_listener.local_addr().unwrap().port();

        tokio::spawn(sn_server::run_client(storage_node.clone(), client_listener));
        tokio::spawn(sn_server::run_control(storage_node, control_listener));

        let registration = Frame {
            kind: MessageKind::RegisterNode,
            command: Command::None,
            error: ErrorCode::Success,
            identity: "SN1".to_string(),
            filename: String::new(),
            data: format!("SN1|127.0.0.1|{}|{}", control_port, client_port).into_bytes(),
        };
        let mut stream = transport::connect(&nn_addr).await.unwrap();
        transport::write_frame(&mut stream, &registration).await.unwrap();
        let reply = transport::read_frame(&mut stream).await.unwrap();
        assert!(reply.error.is_success(), "registration must succeed");

        nn_addr
    }

    #[tokio::test]
    async fn test_create_write_read_undo_flow() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        u1.create("doc").await.unwrap();

        // Build "Hello world. Goodbye world." with two three-hop writes.
        let first = EditScript::new(0).insert(0, "Hello").insert(1, "world.");
        u1.write("doc", &first).await.unwrap();
        let second = EditScript::new(1).insert(0, "Goodbye").insert(1, "world.");
        u1.write("doc", &second).await.unwrap();
        assert_eq!(
            u1.read("doc").await.unwrap(),
            "Hello world. Goodbye world."
        );

        // The lock-scoped edit of a single sentence.
        let edit = EditScript::new(0).insert(1, "cruel");
        u1.write("doc", &edit).await.unwrap();
        assert_eq!(
            u1.read("doc").await.unwrap(),
            "Hello cruel world. Goodbye world."
        );

        // Undo restores the pre-commit body.
        u1.undo("doc").await.unwrap();
        assert_eq!(
            u1.read("doc").await.unwrap(),
            "Hello world. Goodbye world."
        );

        // The namespace tracks refreshed counts after each commit.
        let entries = u1.view().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "doc");
        assert_eq!(entries[0].owner, "u1");
    }

    #[tokio::test]
    async fn test_lock_contention_between_clients() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        let mut u2 = Client::connect(&nn_addr, "u2").await.unwrap();
        u1.create("doc").await.unwrap();

        u1.lock_acquire("doc", 0).await.unwrap();

        // Re-entry by the holder is idempotent.
        u1.lock_acquire("doc", 0).await.unwrap();

        let err = u2.lock_acquire("doc", 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::FileLocked { .. }));

        u1.lock_release("doc", 0).await.unwrap();
        u2.lock_acquire("doc", 0).await.unwrap();
        u2.lock_release("doc", 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_without_lock_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        u1.create("doc").await.unwrap();

        // Bypass the acquire hop and talk to the storage node directly:
        // the node revalidates with the coordinator and rejects.
        let endpoint = u1.lock_acquire("doc", 0).await.unwrap();
        u1.lock_release("doc", 0).await.unwrap();

        let rogue = Frame::command(Command::WriteCommit, "u1", "doc", "0|0|sneaky|");
        let reply = transport::request(&endpoint, &rogue).await.unwrap();
        assert_eq!(reply.error, ErrorCode::FileLocked);

        assert_eq!(u1.read("doc").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_access_request_approval_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        let mut u2 = Client::connect(&nn_addr, "u2").await.unwrap();
        u1.create("doc").await.unwrap();

        let err = u2.read("doc").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        u2.request_access("doc").await.unwrap();

        let pending = u1.view_requests().await.unwrap();
        assert!(pending.contains("u2"), "owner sees the pending request");

        u1.approve_request("doc", "u2").await.unwrap();
        u2.read("doc").await.unwrap();

        // The request was consumed; denying it now finds nothing.
        let err = u1.deny_request("doc", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_clears_namespace_and_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        u1.create("doc").await.unwrap();
        let edit = EditScript::new(0).insert(0, "Content.");
        u1.write("doc", &edit).await.unwrap();

        u1.delete("doc").await.unwrap();
        assert!(u1.view().await.unwrap().is_empty());
        assert!(matches!(
            u1.read("doc").await.unwrap_err(),
            ServiceError::FileNotFound(_)
        ));

        // Re-creating starts from scratch; no stale artifacts remain.
        u1.create("doc").await.unwrap();
        assert_eq!(u1.read("doc").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_copy_and_stream() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        u1.create("doc").await.unwrap();
        let edit = EditScript::new(0).insert(0, "Alpha").insert(1, "beta.");
        u1.write("doc", &edit).await.unwrap();

        assert_eq!(u1.stream("doc").await.unwrap(), vec!["Alpha", "beta."]);

        // The copy lives on the home node under the caller's ownership;
        // like the namespace, it is only reachable through that node.
        let endpoint = u1.lock_acquire("doc", 0).await.unwrap();
        u1.lock_release("doc", 0).await.unwrap();
        u1.copy("doc", "doc-copy").await.unwrap();

        let read = Frame::command(Command::Read, "u1", "doc-copy", "");
        let reply = transport::request(&endpoint, &read).await.unwrap();
        assert!(reply.error.is_success());
        assert_eq!(reply.data_str(), "Alpha beta.");
    }

    #[tokio::test]
    async fn test_exec_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        u1.create("doc").await.unwrap();

        let mut stream = transport::connect(&nn_addr).await.unwrap();
        let exec = Frame::command(Command::Exec, "u1", "doc", "");
        transport::write_frame(&mut stream, &exec).await.unwrap();
        let reply = transport::read_frame(&mut stream).await.unwrap();
        assert_eq!(reply.error, ErrorCode::InvalidCommand);
    }

    #[tokio::test]
    async fn test_checkpoint_revert_over_the_wire() {
        let dir = tempfile::tempdir().unwrap();
        let nn_addr = start_cluster(&dir).await;

        let mut u1 = Client::connect(&nn_addr, "u1").await.unwrap();
        u1.create("doc").await.unwrap();
        u1.write("doc", &EditScript::new(0).insert(0, "Zero.")).await.unwrap();

        u1.checkpoint("doc", "v1").await.unwrap();
        u1.write("doc", &EditScript::new(0).insert(0, "One")).await.unwrap();
        assert_eq!(u1.read("doc").await.unwrap(), "One Zero.");

        u1.revert("doc", "v1").await.unwrap();
        assert_eq!(u1.read("doc").await.unwrap(), "Zero.");
        assert_eq!(u1.view_checkpoint("doc", "v1").await.unwrap(), "Zero.");
        assert_eq!(u1.list_checkpoints("doc").await.unwrap(), "v1");

        // Undo after revert toggles with the replaced body.
        u1.undo("doc").await.unwrap();
        assert_eq!(u1.read("doc").await.unwrap(), "One Zero.");
    }
}
