//! Name Node Module
//!
//! The single coordinator of the cluster. Holds the global registries
//! (files, storage nodes, users), arbitrates per-sentence locks, chooses
//! placement for new files, detects storage-node failures, and answers
//! directory-service requests directly while redirecting content-bearing
//! requests to the home storage node.
//!
//! ## Core Mechanisms
//! - **Redirection**: content operations resolve a filename to the home
//!   node's `(address, client port)`; the client performs the content hop
//!   itself, the name node never proxies bodies.
//! - **Placement**: on create, the connected node with the lowest file
//!   count wins; ties break by registration order.
//! - **Sentence locks**: in-memory leases keyed by `(filename, sentence
//!   index)`; expired leases are reclaimed by the background scan so a
//!   crashed client cannot wedge a sentence forever.
//! - **Failure detection**: storage nodes heartbeat every 30 s; a scan
//!   every 10 s marks silent nodes disconnected and names their replica
//!   peer as the failover candidate.

pub mod cache;
pub mod handlers;
pub mod locks;
pub mod monitor;
pub mod persist;
pub mod registry;
pub mod server;
pub mod types;

#[cfg(test)]
mod tests;
