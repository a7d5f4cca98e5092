//! Session commands: login, logout, status, gate, theme.

use anyhow::{bail, Result};
use console::style;
use secrecy::{ExposeSecret, SecretString};

use sitedesk_core::clock::{Clock, SystemClock};
use sitedesk_core::credential::{classify, decode_live};
use sitedesk_core::logout::{logout as run_logout, LogoutCall};
use sitedesk_types::client::Theme;
use sitedesk_types::credential::CredentialState;
use sitedesk_types::error::CredentialError;
use sitedesk_types::session::SessionDecision;

use crate::state::AppState;

/// Store a credential after checking it is structurally valid and live.
pub async fn login(state: &AppState, token: &str, json: bool) -> Result<()> {
    let token = token.trim();
    let now = SystemClock.now_unix();
    let payload = match decode_live(token, now) {
        Ok(payload) => payload,
        Err(CredentialError::Expired { exp }) => {
            bail!("credential expired at {}", format_expiry(exp))
        }
        Err(err) => {
            bail!("{err} (expected three base64url segments with a JSON payload)")
        }
    };

    state
        .store
        .set_credential(SecretString::from(token.to_string()))
        .await?;
    tracing::info!(exp = payload.exp, "credential stored");

    if json {
        let out = serde_json::json!({
            "stored": true,
            "expires_at": payload.exp,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Session stored, valid until {}",
        style("✓").green().bold(),
        style(format_expiry(payload.exp)).cyan()
    );
    println!();
    Ok(())
}

/// Log out: backend call, local clear, then report where the console would go.
pub async fn logout(state: &AppState, json: bool) -> Result<()> {
    let had_credential = state.store.has_credential();
    let transport = state.logout_transport();
    let outcome = run_logout(
        &transport,
        &state.store,
        state.gate.routes(),
        state.config.logout_timeout(),
    )
    .await;

    if json {
        let call = match &outcome.call {
            LogoutCall::Completed => serde_json::json!({"result": "completed"}),
            LogoutCall::Failed(err) => serde_json::json!({"result": "failed", "error": err}),
            LogoutCall::TimedOut => serde_json::json!({"result": "timed_out"}),
        };
        let out = serde_json::json!({
            "had_credential": had_credential,
            "backend": call,
            "decision": outcome.decision,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    match &outcome.call {
        LogoutCall::Completed => {
            println!("  {} Backend session ended", style("✓").green().bold());
        }
        LogoutCall::Failed(err) => {
            println!(
                "  {} Backend logout failed: {}",
                style("!").yellow().bold(),
                style(err).dim()
            );
        }
        LogoutCall::TimedOut => {
            println!(
                "  {} Backend logout did not answer in time",
                style("!").yellow().bold()
            );
        }
    }
    println!("  {} Local credential cleared", style("✓").green().bold());
    if let Some(target) = outcome.decision.redirect_target() {
        println!("  {} {}", style("→").dim(), style(target).cyan());
    }
    println!();
    Ok(())
}

/// Show the stored session, theme, and where things live.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let now = SystemClock.now_unix();
    let raw = state.store.credential();
    // Read-only: status reports an expired credential but leaves clearing to
    // the gate.
    let credential = classify(raw.as_ref().map(|t| t.expose_secret()), now);
    let expires_at = match &credential {
        CredentialState::Live(p) | CredentialState::Expired(p) => Some(p.exp),
        _ => None,
    };

    if json {
        let out = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "api_base_url": state.config.api_base_url,
            "credential": credential.label(),
            "expires_at": expires_at,
            "theme": state.store.theme(),
            "sources": state.config.sources.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} SiteDesk v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Session ──").dim());
    let label = match &credential {
        CredentialState::Live(_) => style(credential.label()).green(),
        CredentialState::Expired(_) | CredentialState::Malformed => {
            style(credential.label()).yellow()
        }
        CredentialState::Absent => style(credential.label()).dim(),
    };
    println!("  Credential: {label}");
    if let Some(exp) = expires_at {
        println!("  Expires:    {}", format_expiry(exp));
    }
    println!("  Theme:      {}", state.store.theme());
    println!();

    println!("  {}", style("── Console ──").dim());
    println!("  API:        {}", style(&state.config.api_base_url).cyan());
    println!("  Sources:    {}", state.config.sources.len());
    println!("  Data dir:   {}", style(state.data_dir.display()).dim());
    println!();
    Ok(())
}

/// Evaluate the gate for `path`, clearing the credential when the gate says so.
pub async fn gate(state: &AppState, path: &str, json: bool) -> Result<()> {
    let evaluation = state.gate.evaluate_detailed(path, &state.store).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    let decision = match &evaluation.decision {
        SessionDecision::Allow => style("allow".to_string()).green().bold(),
        SessionDecision::AllowRedirect(target) => {
            style(format!("allow → {target}")).cyan().bold()
        }
        SessionDecision::DenyRedirect(target) => style(format!("deny → {target}")).red().bold(),
    };

    println!();
    println!("  {}  {}", style(&evaluation.path).bold(), decision);
    println!("  Route:      {}", evaluation.route);
    println!("  Credential: {}", evaluation.credential);
    if let Some(exp) = evaluation.expires_at {
        println!("  Expires:    {}", format_expiry(exp));
    }
    if evaluation.cleared {
        println!(
            "  {} Stored credential was cleared",
            style("!").yellow().bold()
        );
    }
    println!();
    Ok(())
}

/// Show or change the theme preference.
pub async fn theme(state: &AppState, theme: Option<Theme>, json: bool) -> Result<()> {
    if let Some(theme) = theme {
        state.store.set_theme(theme).await?;
    }
    let current = state.store.theme();

    if json {
        println!("{}", serde_json::json!({ "theme": current }));
    } else {
        println!("  Theme: {}", style(current).cyan());
    }
    Ok(())
}

fn format_expiry(exp: i64) -> String {
    match chrono::DateTime::from_timestamp(exp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => exp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitedesk_core::credential::parser::encode_unsigned;
    use sitedesk_core::credential::ClientStore;
    use sitedesk_infra::filesystem::session::FileClientBackend;
    use sitedesk_types::config::ConsoleConfig;

    async fn state_in(dir: &std::path::Path) -> AppState {
        let store = ClientStore::open(FileClientBackend::in_data_dir(dir))
            .await
            .unwrap();
        AppState::from_parts(ConsoleConfig::default(), store, dir.to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn login_stores_live_credential() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let token = encode_unsigned(&json!({"exp": SystemClock.now_unix() + 3600}));

        login(&state, &token, true).await.unwrap();
        assert_eq!(state.store.credential().unwrap().expose_secret(), token);
    }

    #[tokio::test]
    async fn login_rejects_expired_and_malformed_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path()).await;
        let expired = encode_unsigned(&json!({"exp": SystemClock.now_unix() - 60}));

        let err = login(&state, &expired, true).await.unwrap_err();
        assert!(err.to_string().contains("expired"));
        let err = login(&state, "not-a-token", true).await.unwrap_err();
        assert!(err.to_string().contains("malformed"));
        assert!(!state.store.has_credential());
    }

    #[test]
    fn expiry_formats_as_utc() {
        assert_eq!(format_expiry(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_expiry(i64::MAX), i64::MAX.to_string());
    }
}
