//! Wire Protocol Module
//!
//! Every hop in the system (client -> name node, client -> storage node,
//! storage node -> name node) speaks one fixed-layout request/response frame
//! over TCP. Frames are exchanged in full; a partial read is fatal to the
//! session. One request is outstanding per connection.
//!
//! ## Layout
//! `{version, kind, command, error, data_len}` as big-endian `i32`, followed
//! by a NUL-terminated identity (64 bytes), filename (256 bytes) and a
//! bounded payload (8 KiB). All payload sub-fields are `|`-delimited text.

pub mod codes;
pub mod frame;
pub mod transport;
