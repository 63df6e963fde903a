//! Action application and the per-run changelog.
//!
//! One handler per action kind; each returns a report message or `None`
//! ("nothing to report"). Dry-run skips every mutation but still walks the
//! full action list, so the logs show exactly what a live run would do.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use rostersync_core::types::{GroupId, GroupSpec, PermissionMode, Role};

use crate::diff::Action;
use crate::remote::{ErrorClass, GroupDirectory, RemoteError};
use crate::retry::{with_retry, RetryPolicy};
use crate::roster::RosterEntry;

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// State for one orchestrator run, threaded explicitly through the
/// pipeline. There is no process-wide mutable state.
#[derive(Debug, Clone)]
pub struct SyncRunContext {
    /// When true, compute and report everything but mutate nothing.
    pub dry_run: bool,
    pub retry: RetryPolicy,
    pub started_at: DateTime<Utc>,
}

impl SyncRunContext {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            retry: RetryPolicy::default(),
            started_at: Utc::now(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// One applied mutation, keyed by the contributing display names. Consumed
/// by the notifier; only live runs produce rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeLogRow {
    /// 1-based position in this group's changelog.
    pub index: usize,
    /// Joined display names of the contributing source members; empty for
    /// deletes (the address is no longer backed by any source record).
    pub names: String,
    pub email: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Handlers — one per action kind
// ---------------------------------------------------------------------------

fn apply_promote(
    directory: &dyn GroupDirectory,
    group: &GroupId,
    mode: PermissionMode,
    email: &str,
    names: &str,
    ctx: &SyncRunContext,
) -> Result<Option<String>, RemoteError> {
    tracing::info!("{group}: changing {names} ({email}) from member to owner");

    // The provider refuses to make a group an owner of another group; that
    // rejection surfaces here like any other fatal remote error.
    if !ctx.dry_run {
        with_retry(&ctx.retry, "update role", || {
            directory.update_role(group, email, Role::Owner)
        })?;
    }

    Ok(Some(match mode {
        PermissionMode::Broadcast => "changed to owner (can post to this group)".to_string(),
        PermissionMode::Discussion => "changed to owner".to_string(),
    }))
}

fn apply_demote(
    directory: &dyn GroupDirectory,
    group: &GroupId,
    mode: PermissionMode,
    email: &str,
    names: &str,
    ctx: &SyncRunContext,
) -> Result<Option<String>, RemoteError> {
    tracing::info!("{group}: changing {names} ({email}) from owner to member");

    if !ctx.dry_run {
        with_retry(&ctx.retry, "update role", || {
            directory.update_role(group, email, Role::Member)
        })?;
    }

    Ok(Some(match mode {
        PermissionMode::Broadcast => {
            "changed to member (can no longer post to this group)".to_string()
        }
        PermissionMode::Discussion => "changed to member".to_string(),
    }))
}

fn apply_add(
    directory: &dyn GroupDirectory,
    group: &GroupId,
    mode: PermissionMode,
    email: &str,
    role: Role,
    names: &str,
    ctx: &SyncRunContext,
) -> Result<Option<String>, RemoteError> {
    tracing::info!("{group}: adding {names} ({email}) as {role}");

    if !ctx.dry_run {
        let result = with_retry(&ctx.retry, "insert member", || {
            directory.insert(group, email, role)
        });
        match result {
            Ok(()) => {}
            Err(err) if err.class == ErrorClass::Duplicate => {
                // The provider already knows this membership; nothing to do
                // and nothing to report.
                tracing::warn!("{group}: {email} is already in the group; ignoring: {err}");
                return Ok(None);
            }
            Err(err) if err.class == ErrorClass::NotFound => {
                tracing::warn!("{group}: {email} is not a known address; skipping: {err}");
                return Ok(Some(format!("not added: {email} is not a known address")));
            }
            Err(err) => return Err(err),
        }
    }

    Ok(Some(match (mode, role) {
        (PermissionMode::Broadcast, Role::Owner) => {
            "added to group (can post to this group)".to_string()
        }
        (PermissionMode::Broadcast, Role::Member) => {
            "added to group (cannot post to this group)".to_string()
        }
        (PermissionMode::Discussion, _) => "added to group".to_string(),
    }))
}

fn apply_delete(
    directory: &dyn GroupDirectory,
    group: &GroupId,
    id: &str,
    email: &str,
    ctx: &SyncRunContext,
) -> Result<Option<String>, RemoteError> {
    tracing::info!("{group}: removing {email} (id {id})");

    if !ctx.dry_run {
        with_retry(&ctx.retry, "delete member", || directory.delete(group, id))?;
    }

    Ok(Some("removed from the group".to_string()))
}

// ---------------------------------------------------------------------------
// apply_actions
// ---------------------------------------------------------------------------

/// Apply a diff's actions in emission order and collect the changelog.
///
/// A failed action is logged with the group, action, and address, then
/// abandoned; subsequent actions still run. Dry-run produces no rows.
pub fn apply_actions(
    directory: &dyn GroupDirectory,
    spec: &GroupSpec,
    mode: PermissionMode,
    roster: &[RosterEntry],
    actions: &[Action],
    ctx: &SyncRunContext,
) -> Vec<ChangeLogRow> {
    let by_email: HashMap<&str, &RosterEntry> =
        roster.iter().map(|e| (e.email.as_str(), e)).collect();

    let mut rows = Vec::new();
    for action in actions {
        let names = by_email
            .get(action.email())
            .map(|e| e.contributor_names())
            .unwrap_or_default();
        tracing::debug!(
            "{}: processing {} / {}",
            spec.group,
            action.kind(),
            action.email()
        );

        let result = match action {
            Action::Promote { email } => {
                apply_promote(directory, &spec.group, mode, email, &names, ctx)
            }
            Action::Demote { email } => {
                apply_demote(directory, &spec.group, mode, email, &names, ctx)
            }
            Action::Add { email, role } => {
                apply_add(directory, &spec.group, mode, email, *role, &names, ctx)
            }
            Action::Delete { id, email } => apply_delete(directory, &spec.group, id, email, ctx),
        };

        match result {
            Ok(Some(message)) if !ctx.dry_run => rows.push(ChangeLogRow {
                index: rows.len() + 1,
                names,
                email: action.email().to_string(),
                message,
            }),
            Ok(_) => {}
            Err(err) => {
                tracing::error!(
                    "{}: abandoning {} for {}: {err}",
                    spec.group,
                    action.kind(),
                    action.email()
                );
            }
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use rostersync_core::types::GroupId;

    use crate::remote::RemoteMember;

    use super::*;

    /// Records every call; insert results can be scripted per call.
    #[derive(Default)]
    struct ScriptedDirectory {
        calls: RefCell<Vec<String>>,
        insert_results: RefCell<VecDeque<Result<(), RemoteError>>>,
    }

    impl ScriptedDirectory {
        fn script_insert(&self, results: Vec<Result<(), RemoteError>>) {
            *self.insert_results.borrow_mut() = results.into();
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl GroupDirectory for ScriptedDirectory {
        fn permission_mode(&self, _group: &GroupId) -> Result<PermissionMode, RemoteError> {
            Ok(PermissionMode::Discussion)
        }

        fn list_members(&self, _group: &GroupId) -> Result<Vec<RemoteMember>, RemoteError> {
            Ok(vec![])
        }

        fn insert(&self, _group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(format!("insert {email} {role}"));
            self.insert_results.borrow_mut().pop_front().unwrap_or(Ok(()))
        }

        fn update_role(&self, _group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(format!("update {email} {role}"));
            Ok(())
        }

        fn delete(&self, _group: &GroupId, id: &str) -> Result<(), RemoteError> {
            self.calls.borrow_mut().push(format!("delete {id}"));
            Ok(())
        }
    }

    fn spec() -> GroupSpec {
        GroupSpec {
            group: GroupId::from("choir@example.org"),
            rules: vec![],
            notify: vec![],
        }
    }

    fn roster_entry(email: &str, elevated: bool, name: &str) -> RosterEntry {
        RosterEntry {
            email: email.to_string(),
            elevated,
            sources: vec![rostersync_core::types::SourceMember {
                id: 1,
                display_name: name.to_string(),
                email: Some(email.to_string()),
                ministries: vec![],
                keywords: vec![],
            }],
        }
    }

    fn live_ctx() -> SyncRunContext {
        SyncRunContext::new(false).with_retry_policy(RetryPolicy::none())
    }

    #[test]
    fn add_produces_row_keyed_by_contributor_names() {
        let directory = ScriptedDirectory::default();
        let roster = vec![roster_entry("a@x.org", false, "Jane Doe")];
        let actions = vec![Action::Add {
            email: "a@x.org".to_string(),
            role: Role::Member,
        }];

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &roster,
            &actions,
            &live_ctx(),
        );

        assert_eq!(directory.calls(), vec!["insert a@x.org member"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].names, "Jane Doe");
        assert_eq!(rows[0].message, "added to group");
    }

    #[test]
    fn duplicate_add_is_a_silent_no_op() {
        // Scenario: the provider reports the membership already exists.
        let directory = ScriptedDirectory::default();
        directory.script_insert(vec![Err(RemoteError::duplicate("already a member"))]);
        let actions = vec![Action::Add {
            email: "c@x.org".to_string(),
            role: Role::Member,
        }];

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &[],
            &actions,
            &live_ctx(),
        );

        // One attempt, no retry, no changelog row.
        assert_eq!(directory.calls(), vec!["insert c@x.org member"]);
        assert!(rows.is_empty());
    }

    #[test]
    fn unknown_address_is_reported_without_retry() {
        let directory = ScriptedDirectory::default();
        directory.script_insert(vec![Err(RemoteError::not_found("no such mailbox"))]);
        let actions = vec![Action::Add {
            email: "ghost@x.org".to_string(),
            role: Role::Member,
        }];

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &[],
            &actions,
            &live_ctx(),
        );

        assert_eq!(directory.calls().len(), 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "not added: ghost@x.org is not a known address");
    }

    #[test]
    fn transient_insert_retries_then_succeeds() {
        let directory = ScriptedDirectory::default();
        directory.script_insert(vec![Err(RemoteError::transient("rate limited")), Ok(())]);
        let actions = vec![Action::Add {
            email: "a@x.org".to_string(),
            role: Role::Member,
        }];
        let ctx = SyncRunContext::new(false).with_retry_policy(RetryPolicy {
            max_attempts: 3,
            initial_backoff: std::time::Duration::ZERO,
            multiplier: 1,
        });

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &[],
            &actions,
            &ctx,
        );

        assert_eq!(directory.calls().len(), 2);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn exhausted_retries_abandon_only_that_action() {
        let directory = ScriptedDirectory::default();
        directory.script_insert(vec![
            Err(RemoteError::transient("down")),
            Err(RemoteError::transient("still down")),
        ]);
        let actions = vec![
            Action::Add {
                email: "fails@x.org".to_string(),
                role: Role::Member,
            },
            Action::Delete {
                id: "9".to_string(),
                email: "gone@x.org".to_string(),
            },
        ];
        let ctx = SyncRunContext::new(false).with_retry_policy(RetryPolicy {
            max_attempts: 2,
            initial_backoff: std::time::Duration::ZERO,
            multiplier: 1,
        });

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &[],
            &actions,
            &ctx,
        );

        // Two insert attempts, then the sibling delete still ran.
        assert_eq!(
            directory.calls(),
            vec!["insert fails@x.org member", "insert fails@x.org member", "delete 9"]
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, "removed from the group");
        assert_eq!(rows[0].index, 1);
    }

    #[test]
    fn fatal_errors_are_abandoned_without_retry() {
        let directory = ScriptedDirectory::default();
        directory.script_insert(vec![Err(RemoteError::fatal("forbidden"))]);
        let actions = vec![Action::Add {
            email: "a@x.org".to_string(),
            role: Role::Member,
        }];

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &[],
            &actions,
            &live_ctx(),
        );

        assert_eq!(directory.calls().len(), 1);
        assert!(rows.is_empty());
    }

    #[test]
    fn dry_run_mutates_nothing_and_logs_no_rows() {
        let directory = ScriptedDirectory::default();
        let actions = vec![
            Action::Promote {
                email: "a@x.org".to_string(),
            },
            Action::Add {
                email: "b@x.org".to_string(),
                role: Role::Owner,
            },
            Action::Delete {
                id: "3".to_string(),
                email: "c@x.org".to_string(),
            },
        ];

        let ctx = SyncRunContext::new(true);
        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Broadcast,
            &[],
            &actions,
            &ctx,
        );

        assert!(directory.calls().is_empty(), "dry-run must not touch the remote");
        assert!(rows.is_empty());
    }

    #[test]
    fn broadcast_messages_mention_posting_ability() {
        let directory = ScriptedDirectory::default();
        let roster = vec![roster_entry("a@x.org", true, "Jane Doe")];
        let actions = vec![Action::Promote {
            email: "a@x.org".to_string(),
        }];

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Broadcast,
            &roster,
            &actions,
            &live_ctx(),
        );

        assert_eq!(directory.calls(), vec!["update a@x.org owner"]);
        assert_eq!(rows[0].message, "changed to owner (can post to this group)");
    }

    #[test]
    fn delete_goes_through_the_opaque_id() {
        let directory = ScriptedDirectory::default();
        let actions = vec![Action::Delete {
            id: "remote-id-42".to_string(),
            email: "old@x.org".to_string(),
        }];

        let rows = apply_actions(
            &directory,
            &spec(),
            PermissionMode::Discussion,
            &[],
            &actions,
            &live_ctx(),
        );

        assert_eq!(directory.calls(), vec!["delete remote-id-42"]);
        assert_eq!(rows[0].email, "old@x.org");
        assert_eq!(rows[0].names, "");
    }
}
