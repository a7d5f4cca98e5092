//! `sdesk dashboard` -- the live dashboard view in the terminal.
//!
//! Navigating to the dashboard goes through the session gate first. The view
//! is then mounted (initial load, background polling) and re-rendered on every
//! state change until Ctrl+C unmounts it.

use anyhow::{bail, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::{style, Term};

use sitedesk_core::sync::{MountedView, SourceSnapshot, ViewState, ViewStatus};
use sitedesk_types::source::LoadPhase;

use crate::state::AppState;

/// Longest value preview shown in a table cell.
const PREVIEW_CHARS: usize = 60;

pub async fn dashboard(state: &AppState, once: bool, json: bool) -> Result<()> {
    let home = state.config.protected_home.clone();
    let decision = state.gate.evaluate(&home, &state.store).await;
    if !decision.is_allowed() {
        bail!("no live session; log in with `sdesk login --token <credential>`");
    }

    let mounted = MountedView::mount(state.sources(), state.config.request_timeout()).await;

    if once || json {
        if json {
            let out = serde_json::json!({
                "view": mounted.view().id(),
                "status": mounted.view().status(),
                "sources": mounted.view().snapshots(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            print_view(mounted.view());
        }
        mounted.unmount();
        return Ok(());
    }

    let term = Term::stdout();
    let mut changes = mounted.view().subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        term.clear_screen()?;
        print_view(mounted.view());
        println!("  {}", style("Press Ctrl+C to stop").dim());

        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    mounted.unmount();
    println!("\n  Dashboard closed.");
    Ok(())
}

fn print_view(view: &ViewState) {
    println!();
    println!("  {}  {}", style("Dashboard").bold(), status_line(&view.status()));
    println!();
    println!("{}", render_table(&view.snapshots()));
    println!();
}

fn status_line(status: &ViewStatus) -> String {
    match status {
        ViewStatus::Loading => style("loading…").dim().to_string(),
        ViewStatus::Ready => style("● live").green().to_string(),
        ViewStatus::Partial(ids) => style(format!("◐ partial ({} unavailable)", ids.len()))
            .yellow()
            .to_string(),
        ViewStatus::Degraded(ids) => {
            let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            style(format!("○ degraded ({})", names.join(", ")))
                .red()
                .to_string()
        }
    }
}

fn render_table(snapshots: &[SourceSnapshot]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Source").fg(Color::White),
        Cell::new("Value").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
        Cell::new("Error").fg(Color::White),
    ]);

    for snapshot in snapshots {
        let value = match &snapshot.value {
            Some(value) => Cell::new(preview(value)),
            None => Cell::new("—").fg(Color::DarkGrey),
        };
        let updated = match snapshot.last_updated {
            Some(at) => Cell::new(at.format("%H:%M:%S").to_string()),
            None => Cell::new("never").fg(Color::DarkGrey),
        };
        let error = match &snapshot.last_error {
            Some(err) if err.phase == LoadPhase::Initial => Cell::new(&err.error).fg(Color::Red),
            // Poll failures are kept quiet; the last good value stays on screen.
            Some(err) => Cell::new(format!("stale: {}", err.error.kind())).fg(Color::DarkGrey),
            None => Cell::new(""),
        };
        table.add_row(vec![
            Cell::new(&snapshot.id).fg(Color::Cyan),
            value,
            updated,
            error,
        ]);
    }

    table
}

fn preview(value: &serde_json::Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= PREVIEW_CHARS {
        return text;
    }
    let cut: String = text.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitedesk_types::error::FetchError;
    use sitedesk_types::source::{Criticality, SourceId};

    #[test]
    fn preview_truncates_long_values() {
        let long = json!("x".repeat(200));
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
        assert!(shown.ends_with('…'));
        assert_eq!(preview(&json!({"visits": 3})), r#"{"visits":3}"#);
    }

    #[test]
    fn table_shows_initial_errors_and_hides_poll_errors() {
        let view = ViewState::new();
        let stats = SourceId::new("visitor-stats");
        let active = SourceId::new("active-visitors");
        view.register(&stats, Criticality::Critical);
        view.apply(
            &stats,
            Err(FetchError::Transport("HTTP 503".to_string())),
            LoadPhase::Initial,
        );
        view.apply(&active, Ok(json!({"active": 2})), LoadPhase::Initial);
        view.apply(
            &active,
            Err(FetchError::Transport("reset".to_string())),
            LoadPhase::Poll,
        );

        let rendered = render_table(&view.snapshots()).to_string();
        assert!(rendered.contains("HTTP 503"));
        assert!(rendered.contains("stale: transport"));
        assert!(!rendered.contains("reset"));
        assert!(rendered.contains(r#"{"active":2}"#));
    }

    #[test]
    fn status_line_names_degraded_sources() {
        let line = status_line(&ViewStatus::Degraded(vec![SourceId::new("visitor-stats")]));
        assert!(line.contains("visitor-stats"));
    }
}
