//! CLI command definitions and dispatch for the `sdesk` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod dashboard;
pub mod session;
pub mod sources;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use sitedesk_types::client::Theme;

/// Manage your website console from the terminal.
#[derive(Parser)]
#[command(name = "sdesk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans to stdout via OpenTelemetry.
    #[arg(long, global = true, env = "SITEDESK_OTEL", hide = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a session credential issued by the console backend.
    Login {
        /// The bearer credential (three dot-separated segments).
        #[arg(long, env = "SITEDESK_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// End the session: notify the backend, then clear the stored credential.
    Logout,

    /// Show the stored session and configuration.
    Status,

    /// Evaluate the session gate for a navigation path.
    Gate {
        /// Path to navigate to (e.g. /admin/dashboard).
        path: String,
    },

    /// List configured dashboard sources.
    Sources,

    /// Live dashboard: initial load, then background polling.
    Dashboard {
        /// Load once and exit instead of polling.
        #[arg(long)]
        once: bool,
    },

    /// Show or set the theme preference.
    Theme {
        /// New theme (light, dark, system).
        theme: Option<Theme>,
    },

    /// Serve the console pages behind the session gate.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
