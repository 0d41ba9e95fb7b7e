//! Client Driver Module
//!
//! A stateless typed driver for the multi-hop request patterns. The
//! interactive shell lives outside the core; this driver is the surface it
//! (and the integration tests) sit on.
//!
//! ## Hop patterns
//! - **Directory ops** are served by the name node directly over the
//!   long-lived primary session.
//! - **Content ops** resolve at the name node, then open a secondary
//!   connection-per-request session to the returned storage node.
//! - **Writes** are three hops: acquire the sentence lock at the name
//!   node, commit at the storage node, release at the name node.

pub mod driver;

#[cfg(test)]
mod tests;
