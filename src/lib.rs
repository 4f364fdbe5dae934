//! # Oxidis
//!
//! A minimal in-memory data server speaking a length-prefixed RESP-style
//! wire protocol: typed keys (string, list, set, hash), per-key expiration
//! with lazy enforcement, conditional/TTL write modifiers, publish/subscribe
//! messaging, and a pluggable transactional persistence backend (in-memory,
//! append-only log, or sled tree) selected at startup.

pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod options;
pub mod pubsub;
pub mod resp;
pub mod server;
pub mod storage;
pub mod store;
