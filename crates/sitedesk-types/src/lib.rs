//! Shared domain types for SiteDesk.
//!
//! This crate contains the types shared by the session gate and the dashboard
//! synchronization layer: credential payloads and states, route classes,
//! session decisions, data-source descriptors, the API response envelope,
//! configuration and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod client;
pub mod config;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod session;
pub mod source;
