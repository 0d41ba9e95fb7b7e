use std::sync::Arc;
use std::time::Duration;

use crate::config::NameNodeConfig;

use super::registry::NameRegistry;

/// Background failure detector and lease reaper.
///
/// Every scan interval: storage nodes whose heartbeat is older than the
/// failure threshold are marked disconnected (their replica peer is logged
/// as the failover candidate — files are not re-homed automatically), and
/// sentence-lock leases that expired without a release are reclaimed.
pub async fn run(registry: Arc<NameRegistry>, config: NameNodeConfig) {
    let threshold = Duration::from_secs(config.heartbeat_timeout_secs);
    let mut interval = tokio::time::interval(Duration::from_secs(config.scan_interval_secs));
    // The first tick fires immediately; skip it so a fresh start does not
    // scan before any node had a chance to heartbeat.
    interval.tick().await;

    loop {
        interval.tick().await;

        let downed = registry.mark_stale_nodes(threshold).await;
        for (node_id, peer) in &downed {
            tracing::warn!("Storage node {} marked as down", node_id);
            match peer {
                Some(peer) => tracing::info!("Failover candidate for {}: {}", node_id, peer),
                None => tracing::info!("No replica peer available for {}", node_id),
            }
        }

        let reclaimed = registry.locks.reclaim_expired();
        for key in &reclaimed {
            tracing::warn!(
                "Reclaimed expired sentence lease: {}:{}",
                key.filename,
                key.sentence_index
            );
        }
    }
}
