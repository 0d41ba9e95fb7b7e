use std::time::Duration;

use crate::config::StorageNodeConfig;
use crate::error::{Result, ServiceError};
use crate::protocol::codes::{Command, ErrorCode, MessageKind};
use crate::protocol::frame::Frame;
use crate::protocol::transport;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Long-lived liveness session with the name node.
///
/// Registers on connect, then heartbeats on the configured interval and
/// waits for the acknowledgement. Any failure tears the session down and
/// reconnects after a back-off, re-issuing registration so a restarted
/// name node relearns this node.
pub async fn run(config: StorageNodeConfig) {
    loop {
        match session(&config).await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!("Heartbeat session ended: {}", e);
            }
        }
        tokio::time::sleep(RECONNECT_BACKOFF).await;
    }
}

async fn session(config: &StorageNodeConfig) -> Result<()> {
    let mut stream = transport::connect(&config.name_node_addr).await?;
    tracing::info!("Connected to name node at {}", config.name_node_addr);

    let registration = Frame {
        kind: MessageKind::RegisterNode,
        command: Command::None,
        error: ErrorCode::Success,
        identity: config.node_id.clone(),
        filename: String::new(),
        data: format!(
            "{}|{}|{}|{}",
            config.node_id, config.advertise_ip, config.control_port, config.client_port
        )
        .into_bytes(),
    };

    transport::write_frame(&mut stream, &registration).await?;
    let reply = transport::read_frame(&mut stream).await?;
    if !reply.error.is_success() {
        return Err(ServiceError::Internal(format!(
            "registration rejected: {}",
            reply.data_str()
        )));
    }
    tracing::info!("Registered with name node as {}", config.node_id);

    let mut interval = tokio::time::interval(Duration::from_secs(config.heartbeat_interval_secs));
    // Consume the immediate first tick; registration just proved liveness.
    interval.tick().await;

    loop {
        interval.tick().await;

        transport::write_frame(&mut stream, &Frame::heartbeat(&config.node_id)).await?;

        let ack = transport::read_frame(&mut stream).await?;
        if ack.kind != MessageKind::Ack {
            return Err(ServiceError::Internal(
                "expected heartbeat ack".to_string(),
            ));
        }
        tracing::debug!("Heartbeat acknowledged");
    }
}
