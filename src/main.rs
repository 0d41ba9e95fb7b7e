use std::path::PathBuf;
use std::sync::Arc;

use document_cluster::config::Config;
use document_cluster::namenode;
use document_cluster::namenode::handlers::NameNode;
use document_cluster::namenode::registry::NameRegistry;
use document_cluster::storagenode;
use document_cluster::storagenode::handlers::StorageNode;
use document_cluster::storagenode::store::FileStore;
use document_cluster::storagenode::validate::{
    AllowAllValidator, LockValidator, RemoteLockValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut role: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut node_id: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--role" => {
                role = Some(args[i + 1].clone());
                i += 2;
            }
            "--config" => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--node-id" => {
                node_id = Some(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(role) = role else {
        eprintln!("Usage: {} --role <namenode|storagenode> [--config <path>] [--node-id <id>]", args[0]);
        eprintln!("Example: {} --role namenode", args[0]);
        eprintln!("Example: {} --role storagenode --node-id SN1", args[0]);
        std::process::exit(1);
    };

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(node_id) = node_id {
        config.storage_node.node_id = node_id;
    }

    match role.as_str() {
        "namenode" => run_name_node(config).await,
        "storagenode" => run_storage_node(config).await,
        other => {
            eprintln!("Unknown role: {}", other);
            std::process::exit(1);
        }
    }
}

async fn run_name_node(config: Config) -> anyhow::Result<()> {
    let nn_config = config.name_node;
    tracing::info!("Starting name node on {}", nn_config.bind);

    let registry = Arc::new(NameRegistry::new(&nn_config));
    match registry.load().await {
        Ok(count) if count > 0 => tracing::info!("Loaded {} file records", count),
        Ok(_) => tracing::info!("No existing file registry found"),
        Err(e) => tracing::warn!("Failed to load file registry: {}", e),
    }

    let node = NameNode::new(registry.clone(), nn_config.clone());

    tokio::spawn(namenode::monitor::run(registry, nn_config.clone()));

    let listener = tokio::net::TcpListener::bind(&nn_config.bind).await?;
    namenode::server::run(node, listener).await
}

async fn run_storage_node(config: Config) -> anyhow::Result<()> {
    let sn_config = config.storage_node;
    tracing::info!(
        "Starting storage node {} (data dir {:?})",
        sn_config.node_id,
        sn_config.data_dir
    );

    let store = Arc::new(FileStore::new(&sn_config.data_dir, &sn_config.node_id));
    store.init().await?;

    let validator: Arc<dyn LockValidator> = if sn_config.enforce_locks {
        Arc::new(RemoteLockValidator::new(&sn_config.name_node_addr))
    } else {
        tracing::warn!("Sentence-lock enforcement disabled; commits are cooperative");
        Arc::new(AllowAllValidator)
    };
    let node = StorageNode::new(store, validator);

    tokio::spawn(storagenode::heartbeat::run(sn_config.clone()));

    let client_listener =
        tokio::net::TcpListener::bind(("0.0.0.0", sn_config.client_port)).await?;
    let control_listener =
        tokio::net::TcpListener::bind(("0.0.0.0", sn_config.control_port)).await?;

    tokio::try_join!(
        storagenode::server::run_client(node.clone(), client_listener),
        storagenode::server::run_control(node, control_listener),
    )?;

    Ok(())
}
