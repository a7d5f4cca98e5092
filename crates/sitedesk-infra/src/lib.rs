//! Infrastructure layer for SiteDesk.
//!
//! Contains implementations of the ports defined in `sitedesk-core`: the
//! reqwest-backed console API client (data sources and logout transport), the
//! file-backed client store, and config/data-dir resolution.

pub mod config;
pub mod filesystem;
pub mod http;
