//! `rostersync roster` — offline roster preview for one group.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use rostersync_core::rules::RuleRegistry;
use rostersync_engine::roster::build_roster;

/// Arguments for `rostersync roster`.
#[derive(Args, Debug)]
pub struct RosterArgs {
    /// Remote group address.
    pub group: String,

    /// Path to the sync config (default: ~/.rostersync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON export of source members from the membership database.
    #[arg(long)]
    pub members: PathBuf,

    /// Emit machine-readable JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct RosterRow {
    #[tabled(rename = "address")]
    address: String,
    #[tabled(rename = "role")]
    role: String,
    #[tabled(rename = "contributors")]
    contributors: String,
}

impl RosterArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.config)?;
        let registry = RuleRegistry::builtin();
        config.validate(&registry).context("invalid config")?;
        let members = super::load_members(&self.members)?;

        let spec = config
            .find_group(&self.group)
            .with_context(|| format!("no such group in config: {}", self.group))?;
        let roster = build_roster(&members, spec, &registry)
            .with_context(|| format!("failed to build roster for '{}'", self.group))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&roster).context("failed to serialize roster")?
            );
            return Ok(());
        }

        println!(
            "{} '{}' — {} roster entr{}",
            "✓".green(),
            spec.group,
            roster.len(),
            if roster.len() == 1 { "y" } else { "ies" }
        );
        if roster.is_empty() {
            return Ok(());
        }

        let rows: Vec<RosterRow> = roster
            .iter()
            .map(|entry| RosterRow {
                address: entry.email.clone(),
                role: entry.role().to_string(),
                contributors: entry.contributor_names(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
