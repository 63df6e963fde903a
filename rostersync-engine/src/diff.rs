//! Membership diff engine.
//!
//! [`compute_sync`] is a pure function of (roster, remote membership): it
//! decides what has to change without touching the network, so a dry run
//! reports exactly what a live run would do.

use serde::Serialize;

use rostersync_core::types::Role;

use crate::identity::IdentityFolder;
use crate::remote::RemoteMember;
use crate::roster::RosterEntry;

/// One remote mutation derived from the diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Raise an existing membership to the elevated role.
    Promote { email: String },
    /// Lower an existing membership to the standard role.
    Demote { email: String },
    /// Insert a new membership.
    Add { email: String, role: Role },
    /// Remove a membership by its opaque remote id. The address is carried
    /// for logging only; the mutation uses the id.
    Delete { id: String, email: String },
}

impl Action {
    /// The address this action concerns.
    pub fn email(&self) -> &str {
        match self {
            Action::Promote { email }
            | Action::Demote { email }
            | Action::Add { email, .. }
            | Action::Delete { email, .. } => email,
        }
    }

    /// Short verb for logs and report tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Promote { .. } => "promote",
            Action::Demote { .. } => "demote",
            Action::Add { .. } => "add",
            Action::Delete { .. } => "delete",
        }
    }
}

/// Compute the minimal action list that reconciles `remote` with `roster`.
///
/// Every roster entry yields exactly one of {no-op, promote, demote, add};
/// every remote member not matched by any entry yields exactly one delete.
/// Actions come out grouped: role changes, then adds, then deletes.
pub fn compute_sync(
    roster: &[RosterEntry],
    remote: &[RemoteMember],
    folder: &IdentityFolder,
) -> Vec<Action> {
    let mut matched = vec![false; remote.len()];
    let mut role_changes = Vec::new();
    let mut adds = Vec::new();

    for entry in roster {
        // The provider may expose several display forms that resolve to one
        // mailbox; mark every match so none becomes a spurious delete.
        let mut found = false;
        let mut currently_elevated = false;
        for (i, member) in remote.iter().enumerate() {
            if folder.identical(&entry.email, &member.email) {
                found = true;
                matched[i] = true;
                if member.role.is_elevated() {
                    currently_elevated = true;
                }
            }
        }

        if !found {
            adds.push(Action::Add {
                email: entry.email.clone(),
                role: entry.role(),
            });
        } else if entry.elevated && !currently_elevated {
            role_changes.push(Action::Promote {
                email: entry.email.clone(),
            });
        } else if !entry.elevated && currently_elevated {
            role_changes.push(Action::Demote {
                email: entry.email.clone(),
            });
        }
    }

    let deletes = remote
        .iter()
        .zip(&matched)
        .filter(|(_, was_matched)| !**was_matched)
        .map(|(member, _)| Action::Delete {
            id: member.id.clone(),
            email: member.email.clone(),
        });

    let mut actions = role_changes;
    actions.extend(adds);
    actions.extend(deletes);
    actions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
