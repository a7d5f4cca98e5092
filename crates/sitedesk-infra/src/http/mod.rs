//! Console API adapters over HTTP.

pub mod client;
pub mod logout;
pub mod source;

pub use client::ConsoleApiClient;
pub use logout::HttpLogout;
pub use source::{http_sources, HttpDataSource};
