//! Distributed Document Collaboration Cluster Library
//!
//! This library crate defines the core modules of a small distributed file
//! service for collaborative editing of plain-text documents decomposed
//! into sentences and words. It is the foundation for the role-switched
//! binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of loosely coupled subsystems:
//!
//! - **`protocol`**: The fixed-layout, versioned request/response frame
//!   every hop speaks, plus async transport helpers with the client retry
//!   policy.
//! - **`namenode`**: The coordinator. Global registries, load-balanced
//!   placement, redirection, the leased sentence-lock manager, heartbeat
//!   bookkeeping and the background failure scan.
//! - **`storagenode`**: The content layer. Bodies, metadata with ACLs, the
//!   depth-one undo slot and named checkpoints on disk, guarded by a keyed
//!   per-file read/write lock table.
//! - **`edit`**: The sentence/word edit engine: tokenisation, the wire
//!   edit-script format, structured insertion and derived statistics.
//! - **`client`**: A stateless typed driver for the resolve-then-operate
//!   and acquire-commit-release hop patterns.
//! - **`config`** / **`error`**: TOML + env configuration and the domain
//!   error enum mapped onto wire error codes.

pub mod client;
pub mod config;
pub mod edit;
pub mod error;
pub mod namenode;
pub mod protocol;
pub mod storagenode;
