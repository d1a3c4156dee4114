//! services/api/src/lib.rs
//!
//! The DocChat API service: configuration, adapters behind the core ports,
//! business services and the HTTP layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod services;
pub mod web;
