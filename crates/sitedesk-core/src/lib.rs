//! Session gating and dashboard synchronization logic for SiteDesk.
//!
//! This crate defines the "ports" (client store backend, data source, logout
//! transport) that the infrastructure layer implements, and the logic that
//! runs on top of them. It depends only on `sitedesk-types` -- never on
//! `sitedesk-infra` or any HTTP/filesystem crate.

pub mod clock;
pub mod credential;
pub mod gate;
pub mod logout;
pub mod source;
pub mod sync;
