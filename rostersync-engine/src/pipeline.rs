//! Per-group sync pipeline.
//!
//! For each group spec: fetch the posting policy, fetch the current
//! membership, build the target roster, diff, apply, and (optionally)
//! notify. One group's failure never aborts the remaining groups — the
//! caller gets a per-group `Result` and the run always completes.

use chrono::Utc;
use serde::Serialize;

use rostersync_core::config::SyncConfig;
use rostersync_core::rules::RuleRegistry;
use rostersync_core::types::{GroupId, GroupSpec, MatchRule, PermissionMode, SourceMember};

use crate::apply::{apply_actions, ChangeLogRow, SyncRunContext};
use crate::diff::{compute_sync, Action};
use crate::error::{remote_err, SyncError};
use crate::identity::IdentityFolder;
use crate::remote::GroupDirectory;
use crate::retry::with_retry;
use crate::roster::build_roster;

// ---------------------------------------------------------------------------
// Scope and outcome
// ---------------------------------------------------------------------------

/// Scope for a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Sync every configured group.
    All,
    /// Sync a single group by its remote address.
    Group(String),
}

/// Everything the run learned and did for one group. Handed to the
/// notifier; formatting and delivery are external concerns.
#[derive(Debug, Clone, Serialize)]
pub struct GroupOutcome {
    pub group: GroupId,
    pub permission_mode: PermissionMode,
    /// Human-readable description of the matched predicates.
    pub rationale: Vec<String>,
    /// The full planned action set (dry-run reports this with zero rows).
    pub actions: Vec<Action>,
    /// Applied mutations; empty on dry runs.
    pub rows: Vec<ChangeLogRow>,
}

/// Receives the outcome of a live run that changed a group.
pub trait Notifier {
    fn notify(&self, spec: &GroupSpec, outcome: &GroupOutcome);
}

/// Discards every notification.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _spec: &GroupSpec, _outcome: &GroupOutcome) {}
}

// ---------------------------------------------------------------------------
// sync_group
// ---------------------------------------------------------------------------

/// Run the full pipeline for one group spec.
pub fn sync_group(
    directory: &dyn GroupDirectory,
    folder: &IdentityFolder,
    spec: &GroupSpec,
    registry: &RuleRegistry,
    members: &[SourceMember],
    ctx: &SyncRunContext,
) -> Result<GroupOutcome, SyncError> {
    let mode = with_retry(&ctx.retry, "fetch permission mode", || {
        directory.permission_mode(&spec.group)
    })
    .map_err(|e| remote_err(&spec.group, e))?;
    tracing::info!("synchronizing group {} ({mode})", spec.group);

    let remote = with_retry(&ctx.retry, "list members", || {
        directory.list_members(&spec.group)
    })
    .map_err(|e| remote_err(&spec.group, e))?;

    let roster = build_roster(members, spec, registry)?;
    let actions = compute_sync(&roster, &remote, folder);
    if actions.is_empty() {
        tracing::info!("{}: membership already in sync", spec.group);
    } else {
        tracing::info!("{}: {} action(s) to apply", spec.group, actions.len());
    }

    let rows = apply_actions(directory, spec, mode, &roster, &actions, ctx);

    Ok(GroupOutcome {
        group: spec.group.clone(),
        permission_mode: mode,
        rationale: spec.rules.iter().map(MatchRule::describe).collect(),
        actions,
        rows,
    })
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run the sync pipeline for a scope.
///
/// Groups are processed strictly in config order, one at a time. The outer
/// `Err` only occurs when the scope names an unconfigured group; per-group
/// failures land in the inner results.
pub fn run(
    directory: &dyn GroupDirectory,
    config: &SyncConfig,
    registry: &RuleRegistry,
    members: &[SourceMember],
    scope: SyncScope,
    ctx: &SyncRunContext,
    notifier: &dyn Notifier,
) -> Result<Vec<Result<GroupOutcome, SyncError>>, SyncError> {
    let folder = IdentityFolder::new(config.folding_domains.clone());
    let specs: Vec<&GroupSpec> = match &scope {
        SyncScope::All => config.groups.iter().collect(),
        SyncScope::Group(name) => vec![config
            .find_group(name)
            .ok_or_else(|| SyncError::UnknownGroup(name.clone()))?],
    };

    let mut results = Vec::new();
    for spec in specs {
        match sync_group(directory, &folder, spec, registry, members, ctx) {
            Ok(outcome) => {
                if !outcome.rows.is_empty() && !ctx.dry_run {
                    notifier.notify(spec, &outcome);
                }
                results.push(Ok(outcome));
            }
            Err(err) => {
                tracing::error!("group {} failed, continuing with the rest: {err}", spec.group);
                results.push(Err(err));
            }
        }
    }

    let elapsed = Utc::now().signed_duration_since(ctx.started_at);
    tracing::info!(
        "synchronization complete: {} group(s) in {}s",
        results.len(),
        elapsed.num_seconds()
    );
    Ok(results)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
