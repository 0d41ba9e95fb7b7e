use std::sync::Arc;

use anyhow::Result;
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::transport;

use super::handlers::StorageNode;

/// Client-facing listener. Clients open a connection per request but the
/// session loop tolerates pipelined reuse until the peer closes.
pub async fn run_client(node: Arc<StorageNode>, listener: TcpListener) -> Result<()> {
    let local = listener.local_addr()?;
    tracing::info!("Storage node client listener on {}", local);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!("Client connected from {}", peer);

        let node = node.clone();
        tokio::spawn(async move {
            client_session(node, stream).await;
        });
    }
}

/// Control listener for the name node (ACL pushes).
pub async fn run_control(node: Arc<StorageNode>, listener: TcpListener) -> Result<()> {
    let local = listener.local_addr()?;
    tracing::info!("Storage node control listener on {}", local);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!("Control session from {}", peer);

        let node = node.clone();
        tokio::spawn(async move {
            control_session(node, stream).await;
        });
    }
}

async fn client_session(node: Arc<StorageNode>, mut stream: TcpStream) {
    loop {
        let frame = match transport::read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(_) => break,
        };

        let response = node.handle_client(frame).await;
        if transport::write_frame(&mut stream, &response).await.is_err() {
            break;
        }
    }
}

async fn control_session(node: Arc<StorageNode>, mut stream: TcpStream) {
    loop {
        let frame = match transport::read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(_) => break,
        };

        let response = node.handle_control(frame).await;
        if transport::write_frame(&mut stream, &response).await.is_err() {
            break;
        }
    }
}
