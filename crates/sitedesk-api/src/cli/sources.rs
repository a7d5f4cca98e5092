//! `sdesk sources` -- list configured dashboard sources.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use sitedesk_types::source::Criticality;

use crate::state::AppState;

pub async fn list_sources(state: &AppState, json: bool) -> Result<()> {
    let sources = &state.config.sources;

    if json {
        println!("{}", serde_json::to_string_pretty(sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!();
        println!(
            "  {} No sources configured. Add [[sources]] entries to {}",
            style("i").blue().bold(),
            style(state.data_dir.join("config.toml").display()).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Source").fg(Color::White),
        Cell::new("Endpoint").fg(Color::White),
        Cell::new("Refresh").fg(Color::White),
        Cell::new("Critical").fg(Color::White),
    ]);

    for source in sources {
        let critical = match source.criticality() {
            Criticality::Critical => Cell::new("yes").fg(Color::Yellow),
            Criticality::Optional => Cell::new("no").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&source.id).fg(Color::Cyan),
            Cell::new(format!("GET {}{}", state.config.api_base_url, source.path)),
            Cell::new(source.refresh().to_string()),
            critical,
        ]);
    }

    println!("{table}");
    Ok(())
}
