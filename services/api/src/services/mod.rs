//! services/api/src/services/mod.rs
//!
//! Business operations that sit between the HTTP handlers and the ports.

pub mod conversation;
pub mod credentials;
pub mod ingestion;
pub mod password;
pub mod tokens;
