//! `rostersync groups` — list configured groups and their match rules.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

/// Arguments for `rostersync groups`.
#[derive(Args, Debug)]
pub struct GroupsArgs {
    /// Path to the sync config (default: ~/.rostersync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "group")]
    group: String,
    #[tabled(rename = "rules")]
    rules: String,
    #[tabled(rename = "notify")]
    notify: String,
}

impl GroupsArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.config)?;

        if config.groups.is_empty() {
            println!("No groups configured.");
            return Ok(());
        }

        println!("{} group(s) configured", config.groups.len());
        let rows: Vec<GroupRow> = config
            .groups
            .iter()
            .map(|spec| GroupRow {
                group: spec.group.to_string(),
                rules: spec
                    .rules
                    .iter()
                    .map(|rule| rule.describe())
                    .collect::<Vec<_>>()
                    .join("; "),
                notify: spec.notify.join(", "),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
