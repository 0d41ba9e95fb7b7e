use std::sync::Arc;

use anyhow::Result;
use tokio::net::{TcpListener, TcpStream};

use crate::protocol::transport;

use super::handlers::NameNode;

/// Accepts client and storage-node sessions. The primary hop is long
/// lived: each connection serves frames in arrival order until the peer
/// closes or a read fails.
pub async fn run(node: Arc<NameNode>, listener: TcpListener) -> Result<()> {
    let local = listener.local_addr()?;
    tracing::info!("Name node listening on {}", local);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!("Session opened from {}", peer);

        let node = node.clone();
        tokio::spawn(async move {
            session(node, stream).await;
            tracing::debug!("Session closed from {}", peer);
        });
    }
}

async fn session(node: Arc<NameNode>, mut stream: TcpStream) {
    loop {
        let frame = match transport::read_frame(&mut stream).await {
            Ok(frame) => frame,
            // EOF or a short read both end the session.
            Err(_) => break,
        };

        let response = node.handle(frame).await;

        if let Err(e) = transport::write_frame(&mut stream, &response).await {
            tracing::warn!("Failed to write response: {}", e);
            break;
        }
    }
}
