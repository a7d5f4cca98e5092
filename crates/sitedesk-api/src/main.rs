//! SiteDesk CLI and console server entry point.
//!
//! Binary name: `sdesk`
//!
//! Parses CLI arguments, loads configuration and the client store, then
//! dispatches to the command handler or starts the gated console server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = sitedesk_observe::verbosity_filter(cli.verbose, cli.quiet);
    sitedesk_observe::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    sitedesk_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "sdesk", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Login { token } => {
            cli::session::login(&state, &token, cli.json).await?;
        }

        Commands::Logout => {
            cli::session::logout(&state, cli.json).await?;
        }

        Commands::Status => {
            cli::session::status(&state, cli.json).await?;
        }

        Commands::Gate { path } => {
            cli::session::gate(&state, &path, cli.json).await?;
        }

        Commands::Sources => {
            cli::sources::list_sources(&state, cli.json).await?;
        }

        Commands::Dashboard { once } => {
            cli::dashboard::dashboard(&state, once, cli.json).await?;
        }

        Commands::Theme { theme } => {
            cli::session::theme(&state, theme, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} SiteDesk console listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state.gate.clone(), &state.config);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
