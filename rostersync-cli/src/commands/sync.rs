//! `rostersync sync` — reconcile remote groups with computed rosters.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use rostersync_core::rules::RuleRegistry;
use rostersync_core::types::GroupSpec;
use rostersync_directory::DirectoryClient;
use rostersync_engine::pipeline::{self, GroupOutcome, Notifier, SyncScope};
use rostersync_engine::{SyncError, SyncRunContext};

/// Arguments for `rostersync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Remote group address to sync (omit when using `--all`).
    pub group: Option<String>,

    /// Sync every configured group.
    #[arg(long, conflicts_with = "group")]
    pub all: bool,

    /// Compute and report the full action set without mutating anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the sync config (default: ~/.rostersync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON export of source members from the membership database.
    #[arg(long)]
    pub members: PathBuf,

    /// File holding the OAuth bearer token for the directory APIs.
    #[arg(long)]
    pub token_file: PathBuf,

    /// Emit machine-readable JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

/// Hands outcomes to the office mailer's log; delivery itself happens
/// outside this tool.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, spec: &GroupSpec, outcome: &GroupOutcome) {
        log::info!(
            "notify {}: {} change(s) to {}",
            spec.notify.join(", "),
            outcome.rows.len(),
            outcome.group
        );
    }
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = super::load_config(self.config)?;
        let registry = RuleRegistry::builtin();
        config.validate(&registry).context("invalid config")?;

        let members = super::load_members(&self.members)?;
        let token = super::read_token(&self.token_file)?;
        let directory = DirectoryClient::new(token);

        let scope = if self.all {
            SyncScope::All
        } else {
            let group = self
                .group
                .clone()
                .context("provide a group address or use --all")?;
            SyncScope::Group(group)
        };

        let ctx = SyncRunContext::new(self.dry_run);
        let results = pipeline::run(
            &directory,
            &config,
            &registry,
            &members,
            scope,
            &ctx,
            &LogNotifier,
        )
        .context("sync failed")?;

        if self.json {
            print_json(&results)?;
        } else {
            for result in &results {
                match result {
                    Ok(outcome) => print_outcome(outcome, self.dry_run),
                    Err(err) => println!("{} {err:#}", "✗".red()),
                }
            }
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            anyhow::bail!("{failed} group(s) failed to sync");
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "action")]
    action: &'static str,
    #[tabled(rename = "address")]
    address: String,
    #[tabled(rename = "result")]
    result: String,
}

fn print_outcome(outcome: &GroupOutcome, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    if outcome.actions.is_empty() {
        println!(
            "{prefix}{} '{}' — membership in sync",
            "✓".green(),
            outcome.group
        );
        return;
    }

    println!(
        "{prefix}{} '{}' ({}) — {} action(s), {} applied",
        "✓".green(),
        outcome.group,
        outcome.permission_mode,
        outcome.actions.len(),
        outcome.rows.len()
    );

    let messages: HashMap<&str, &str> = outcome
        .rows
        .iter()
        .map(|row| (row.email.as_str(), row.message.as_str()))
        .collect();
    let rows: Vec<ActionRow> = outcome
        .actions
        .iter()
        .map(|action| ActionRow {
            action: action.kind(),
            address: action.email().to_string(),
            result: match messages.get(action.email()) {
                Some(message) => (*message).to_string(),
                None if dry_run => "planned".to_string(),
                None => "no change".to_string(),
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_json(results: &[Result<GroupOutcome, SyncError>]) -> Result<()> {
    let payload: Vec<serde_json::Value> = results
        .iter()
        .map(|result| match result {
            Ok(outcome) => serde_json::json!({ "status": "ok", "outcome": outcome }),
            Err(err) => serde_json::json!({ "status": "error", "error": err.to_string() }),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync JSON")?
    );
    Ok(())
}
