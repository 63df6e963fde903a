//! End-to-end reconciliation against a stateful in-memory directory:
//! a live run converges, and a second run finds nothing to do.

use std::cell::RefCell;
use std::collections::HashMap;

use rostersync_core::config::SyncConfig;
use rostersync_core::rules::RuleRegistry;
use rostersync_core::types::{
    GroupId, GroupSpec, MatchRule, MinistryMembership, MinistryRole, PermissionMode, Role,
    SourceMember,
};
use rostersync_engine::pipeline::{run, NoopNotifier, SyncScope};
use rostersync_engine::retry::RetryPolicy;
use rostersync_engine::{GroupDirectory, RemoteError, RemoteMember, SyncRunContext};

// ---------------------------------------------------------------------------
// In-memory directory
// ---------------------------------------------------------------------------

/// Mutable fake of the remote service. Keeps real membership state so a
/// second sync run observes the first run's mutations.
struct InMemoryDirectory {
    groups: RefCell<HashMap<String, Vec<RemoteMember>>>,
    next_id: RefCell<u32>,
}

impl InMemoryDirectory {
    fn new(seed: Vec<(&str, Vec<RemoteMember>)>) -> Self {
        Self {
            groups: RefCell::new(
                seed.into_iter()
                    .map(|(g, members)| (g.to_string(), members))
                    .collect(),
            ),
            next_id: RefCell::new(100),
        }
    }

    fn members_of(&self, group: &str) -> Vec<RemoteMember> {
        self.groups.borrow().get(group).cloned().unwrap_or_default()
    }
}

impl GroupDirectory for InMemoryDirectory {
    fn permission_mode(&self, _group: &GroupId) -> Result<PermissionMode, RemoteError> {
        Ok(PermissionMode::Broadcast)
    }

    fn list_members(&self, group: &GroupId) -> Result<Vec<RemoteMember>, RemoteError> {
        Ok(self.members_of(&group.0))
    }

    fn insert(&self, group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError> {
        let mut groups = self.groups.borrow_mut();
        let members = groups.entry(group.0.clone()).or_default();
        if members.iter().any(|m| m.email == email) {
            return Err(RemoteError::duplicate(format!("{email} already a member")));
        }
        let mut next_id = self.next_id.borrow_mut();
        members.push(RemoteMember {
            email: email.to_string(),
            role,
            id: next_id.to_string(),
        });
        *next_id += 1;
        Ok(())
    }

    fn update_role(&self, group: &GroupId, email: &str, role: Role) -> Result<(), RemoteError> {
        let mut groups = self.groups.borrow_mut();
        let members = groups.entry(group.0.clone()).or_default();
        for member in members.iter_mut() {
            if member.email == email {
                member.role = role;
                return Ok(());
            }
        }
        Err(RemoteError::not_found(format!("{email} is not a member")))
    }

    fn delete(&self, group: &GroupId, id: &str) -> Result<(), RemoteError> {
        let mut groups = self.groups.borrow_mut();
        let members = groups.entry(group.0.clone()).or_default();
        let before = members.len();
        members.retain(|m| m.id != id);
        if members.len() == before {
            return Err(RemoteError::not_found(format!("no member with id {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn remote(email: &str, role: Role, id: &str) -> RemoteMember {
    RemoteMember {
        email: email.to_string(),
        role,
        id: id.to_string(),
    }
}

fn source(id: u64, name: &str, email: Option<&str>, role: MinistryRole) -> SourceMember {
    SourceMember {
        id,
        display_name: name.to_string(),
        email: email.map(str::to_string),
        ministries: vec![MinistryMembership {
            name: "310-Adult Choir".to_string(),
            role,
        }],
        keywords: vec![],
    }
}

fn choir_config() -> SyncConfig {
    SyncConfig {
        folding_domains: rostersync_core::config::default_folding_domains(),
        groups: vec![GroupSpec {
            group: GroupId::from("choir@example.org"),
            rules: vec![MatchRule::Ministries(vec!["310-Adult Choir".to_string()])],
            notify: vec!["director-worship@example.org".to_string()],
        }],
    }
}

fn ctx(dry_run: bool) -> SyncRunContext {
    SyncRunContext::new(dry_run).with_retry_policy(RetryPolicy::none())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn live_run_converges_and_second_run_is_empty() {
    let _ = env_logger::builder().is_test(true).try_init();

    let directory = InMemoryDirectory::new(vec![(
        "choir@example.org",
        vec![
            // Wrong role: the chair shares this address, so it must be owner.
            remote("doe@example.org", Role::Member, "1"),
            // Display form of the director's gmail address; must survive.
            remote("music.director@gmail.com", Role::Owner, "2"),
            // No longer in the ministry; must be removed.
            remote("left@example.org", Role::Member, "3"),
        ],
    )]);

    let members = vec![
        source(1, "Pat Doe", Some("doe@example.org"), MinistryRole::Chairperson),
        source(2, "Sam Doe", Some("DOE@example.org"), MinistryRole::Member),
        source(3, "Music Director", Some("musicdirector@gmail.com"), MinistryRole::Staff),
        source(4, "New Singer", Some("new@example.org"), MinistryRole::Member),
        source(5, "No Email", None, MinistryRole::Member),
    ];

    let config = choir_config();
    let registry = RuleRegistry::builtin();

    let results = run(
        &directory,
        &config,
        &registry,
        &members,
        SyncScope::All,
        &ctx(false),
        &NoopNotifier,
    )
    .expect("first run");
    let outcome = results[0].as_ref().expect("first outcome");

    // Promote doe, add new singer, delete the departed member.
    assert_eq!(outcome.actions.len(), 3);
    assert_eq!(outcome.rows.len(), 3);
    assert_eq!(outcome.permission_mode, PermissionMode::Broadcast);

    let state = directory.members_of("choir@example.org");
    assert_eq!(state.len(), 3);
    let doe = state.iter().find(|m| m.email == "doe@example.org").expect("doe");
    assert_eq!(doe.role, Role::Owner);
    assert!(state.iter().all(|m| m.email != "left@example.org"));
    assert!(state.iter().any(|m| m.email == "new@example.org"));
    // The display form was matched, not deleted and not re-added.
    assert!(state.iter().any(|m| m.email == "music.director@gmail.com"));

    // Second run: nothing left to do.
    let results = run(
        &directory,
        &config,
        &registry,
        &members,
        SyncScope::All,
        &ctx(false),
        &NoopNotifier,
    )
    .expect("second run");
    let outcome = results[0].as_ref().expect("second outcome");
    assert!(
        outcome.actions.is_empty(),
        "second run should find nothing: {:?}",
        outcome.actions
    );
    assert!(outcome.rows.is_empty());
}

#[test]
fn dry_run_plans_the_same_actions_without_mutating() {
    let directory = InMemoryDirectory::new(vec![(
        "choir@example.org",
        vec![remote("left@example.org", Role::Member, "3")],
    )]);
    let members = vec![source(1, "New Singer", Some("new@example.org"), MinistryRole::Member)];
    let config = choir_config();
    let registry = RuleRegistry::builtin();

    let results = run(
        &directory,
        &config,
        &registry,
        &members,
        SyncScope::Group("choir@example.org".to_string()),
        &ctx(true),
        &NoopNotifier,
    )
    .expect("dry run");
    let outcome = results[0].as_ref().expect("outcome");

    assert_eq!(outcome.actions.len(), 2, "one add and one delete planned");
    assert!(outcome.rows.is_empty());

    let state = directory.members_of("choir@example.org");
    assert_eq!(state.len(), 1, "dry run must not mutate the remote");
    assert_eq!(state[0].email, "left@example.org");
}
