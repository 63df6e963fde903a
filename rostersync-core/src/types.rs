//! Domain types for roster synchronization.
//!
//! All types are serializable via serde: [`GroupSpec`] and [`MatchRule`]
//! come from the YAML config, [`SourceMember`] from the membership-database
//! export (JSON).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed remote group identifier (the group's email address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Membership role inside the remote group.
///
/// `Owner` is the elevated role: in a broadcast group, only owners can post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Owner,
}

impl Role {
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

/// Posting policy of the remote group.
///
/// Broadcast groups only accept posts from owners; discussion groups accept
/// posts from any member. Only affects report wording, never the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionMode {
    Broadcast,
    Discussion,
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionMode::Broadcast => write!(f, "broadcast"),
            PermissionMode::Discussion => write!(f, "discussion"),
        }
    }
}

/// A member's role within one ministry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MinistryRole {
    #[default]
    Member,
    Chairperson,
    Staff,
}

impl MinistryRole {
    /// Chairpersons and staff lead the ministry and get the elevated group
    /// role.
    pub fn is_leader(self) -> bool {
        matches!(self, MinistryRole::Chairperson | MinistryRole::Staff)
    }
}

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// One ministry a source member belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryMembership {
    pub name: String,
    #[serde(default)]
    pub role: MinistryRole,
}

/// A member record from the membership database, as exported by the loader.
///
/// `email` is nullable at the source; members without one are dropped during
/// roster building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMember {
    pub id: u64,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ministries: Vec<MinistryMembership>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// Group specification
// ---------------------------------------------------------------------------

/// One membership predicate. A member belongs in a group when ANY of the
/// group's rules matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    /// Members of any of the named ministries. Chairperson/staff roles imply
    /// the elevated group role.
    Ministries(Vec<String>),

    /// Members carrying any of the named keywords. A `<name> Ldr` or
    /// `<name> Leader` keyword implies membership AND the elevated role.
    Keywords(Vec<String>),

    /// A named rule dispatched through the rule registry, with string
    /// parameters. Keeps the group table pure data.
    Custom {
        rule: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        params: BTreeMap<String, String>,
    },
}

impl MatchRule {
    /// Human-readable rationale line for reports.
    pub fn describe(&self) -> String {
        match self {
            MatchRule::Ministries(names) => {
                format!("members of ministry: {}", names.join(", "))
            }
            MatchRule::Keywords(names) => {
                format!("members with keyword: {}", names.join(", "))
            }
            MatchRule::Custom { rule, params } => {
                if params.is_empty() {
                    format!("members matching rule \"{rule}\"")
                } else {
                    let args: Vec<String> =
                        params.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    format!("members matching rule \"{rule}\" ({})", args.join(", "))
                }
            }
        }
    }
}

/// Static description of one group to synchronize. Read-only at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Remote group address, e.g. `choir@example.org`.
    pub group: GroupId,

    /// Match rules, OR-combined.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub rules: Vec<MatchRule>,

    /// Addresses to notify after a live run that changed the group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
