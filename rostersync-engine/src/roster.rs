//! Target roster computation.
//!
//! Filters source members through a group's match rules and coalesces the
//! survivors by delivery address into [`RosterEntry`] values — the unit the
//! diff engine compares against the remote membership.

use std::collections::HashMap;

use serde::Serialize;

use rostersync_core::rules::{self, MatchOutcome, RuleRegistry};
use rostersync_core::types::{GroupSpec, MatchRule, Role, SourceMember};

use crate::error::SyncError;

/// One coalesced roster entry: everyone who shares this delivery address.
///
/// `elevated` is the OR over all contributors — several source members can
/// share one address with different roles, and the provider treats the
/// address as a single account, so the most permissive role wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    /// Lower-cased delivery address.
    pub email: String,
    pub elevated: bool,
    /// Contributing source records, in input order. Never empty.
    pub sources: Vec<SourceMember>,
}

impl RosterEntry {
    pub fn role(&self) -> Role {
        if self.elevated {
            Role::Owner
        } else {
            Role::Member
        }
    }

    /// Display names of all contributors, joined for reporting.
    pub fn contributor_names(&self) -> String {
        let names: Vec<&str> = self
            .sources
            .iter()
            .map(|m| m.display_name.as_str())
            .collect();
        names.join(", ")
    }
}

fn evaluate_rule(
    member: &SourceMember,
    rule: &MatchRule,
    registry: &RuleRegistry,
) -> Result<MatchOutcome, SyncError> {
    match rule {
        MatchRule::Ministries(names) => Ok(rules::member_in_ministries(member, names)),
        MatchRule::Keywords(names) => Ok(rules::member_has_keywords(member, names)),
        MatchRule::Custom { rule, params } => match registry.get(rule) {
            Some(f) => Ok(f(member, params)),
            None => Err(SyncError::UnknownRule { rule: rule.clone() }),
        },
    }
}

/// Compute the target roster for one group.
///
/// Entries come out in first-seen member order; members without a delivery
/// address are dropped.
pub fn build_roster(
    members: &[SourceMember],
    spec: &GroupSpec,
    registry: &RuleRegistry,
) -> Result<Vec<RosterEntry>, SyncError> {
    let mut entries: Vec<RosterEntry> = Vec::new();
    let mut by_email: HashMap<String, usize> = HashMap::new();

    for member in members {
        let mut outcome = MatchOutcome::NONE;
        for rule in &spec.rules {
            outcome = outcome.or(evaluate_rule(member, rule, registry)?);
        }

        // Elevation implies membership regardless of the plain signal.
        if outcome.is_elevated {
            outcome.is_member = true;
        }
        if !outcome.is_member {
            continue;
        }

        let Some(email) = member.email.as_deref() else {
            tracing::debug!(
                "dropping {}: matched group {} but has no email address",
                member.display_name,
                spec.group
            );
            continue;
        };
        let email = email.to_lowercase();

        match by_email.get(&email) {
            Some(&index) => {
                let entry = &mut entries[index];
                entry.elevated = entry.elevated || outcome.is_elevated;
                entry.sources.push(member.clone());
            }
            None => {
                by_email.insert(email.clone(), entries.len());
                entries.push(RosterEntry {
                    email,
                    elevated: outcome.is_elevated,
                    sources: vec![member.clone()],
                });
            }
        }
    }

    tracing::debug!(
        "roster for {}: {} entries from {} source members",
        spec.group,
        entries.len(),
        members.len()
    );
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
