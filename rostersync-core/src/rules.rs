//! Match-rule evaluation and the custom rule registry.
//!
//! Rules answer two questions per member: does this member belong in the
//! group, and should they hold the elevated (owner) role. Group specs
//! OR-combine several rules; elevation always implies membership, which is
//! enforced by the roster builder, not here.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::SourceMember;

// ---------------------------------------------------------------------------
// Match outcome
// ---------------------------------------------------------------------------

/// Result of evaluating one rule against one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    pub is_member: bool,
    pub is_elevated: bool,
}

impl MatchOutcome {
    pub const NONE: MatchOutcome = MatchOutcome {
        is_member: false,
        is_elevated: false,
    };

    pub const MEMBER: MatchOutcome = MatchOutcome {
        is_member: true,
        is_elevated: false,
    };

    pub const ELEVATED: MatchOutcome = MatchOutcome {
        is_member: true,
        is_elevated: true,
    };

    /// OR-combine with another outcome.
    pub fn or(self, other: MatchOutcome) -> MatchOutcome {
        MatchOutcome {
            is_member: self.is_member || other.is_member,
            is_elevated: self.is_elevated || other.is_elevated,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in rule kinds
// ---------------------------------------------------------------------------

/// Is the member in any of the named ministries, and do they lead one of
/// them?
pub fn member_in_ministries(member: &SourceMember, names: &[String]) -> MatchOutcome {
    let mut outcome = MatchOutcome::NONE;
    for ministry in &member.ministries {
        if names.iter().any(|n| n == &ministry.name) {
            outcome.is_member = true;
            if ministry.role.is_leader() {
                outcome.is_elevated = true;
            }
        }
    }
    outcome
}

/// Does the member carry any of the named keywords?
///
/// A `<name> Ldr` or `<name> Leader` keyword counts as the base keyword AND
/// grants the elevated role.
pub fn member_has_keywords(member: &SourceMember, names: &[String]) -> MatchOutcome {
    let mut outcome = MatchOutcome::NONE;
    for name in names {
        let leader_short = format!("{name} Ldr");
        let leader_long = format!("{name} Leader");
        for keyword in &member.keywords {
            if keyword == name {
                outcome.is_member = true;
            } else if keyword == &leader_short || keyword == &leader_long {
                outcome.is_member = true;
                outcome.is_elevated = true;
            }
        }
    }
    outcome
}

// ---------------------------------------------------------------------------
// Custom rule registry
// ---------------------------------------------------------------------------

/// A custom rule: pure function of the member and the rule's parameters.
pub type CustomRule = fn(&SourceMember, &BTreeMap<String, String>) -> MatchOutcome;

/// Registry of named custom rules referenced by `MatchRule::Custom`.
///
/// Keeps group specs pure data: the YAML names a rule, the registry holds
/// the code.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: BTreeMap<String, CustomRule>,
}

impl RuleRegistry {
    /// Registry with the built-in rules:
    ///
    /// - `ministry-chairs` — members who lead ANY ministry (not elevated:
    ///   the chairs' group is a plain distribution list).
    /// - `ministry-chair` — members who lead a ministry whose name starts
    ///   with the `prefix` parameter; elevated.
    pub fn builtin() -> Self {
        let mut registry = Self {
            rules: BTreeMap::new(),
        };
        registry.register("ministry-chairs", ministry_chairs);
        registry.register("ministry-chair", ministry_chair);
        registry
    }

    pub fn register(&mut self, name: &str, rule: CustomRule) {
        self.rules.insert(name.to_owned(), rule);
    }

    pub fn get(&self, name: &str) -> Option<CustomRule> {
        self.rules.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn ministry_chairs(member: &SourceMember, _params: &BTreeMap<String, String>) -> MatchOutcome {
    for ministry in &member.ministries {
        if ministry.role.is_leader() {
            return MatchOutcome::MEMBER;
        }
    }
    MatchOutcome::NONE
}

fn ministry_chair(member: &SourceMember, params: &BTreeMap<String, String>) -> MatchOutcome {
    let Some(prefix) = params.get("prefix") else {
        return MatchOutcome::NONE;
    };
    for ministry in &member.ministries {
        if ministry.role.is_leader() && ministry.name.starts_with(prefix.as_str()) {
            return MatchOutcome::ELEVATED;
        }
    }
    MatchOutcome::NONE
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
