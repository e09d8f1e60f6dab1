//! End-to-end authorization tests: principal resolution through roles and
//! groups, pattern matching, and decision combination.

use iamcore::{AuthEngine, Effect, EngineConfig, IamError, Manager, Policy, User};
use tempfile::TempDir;

fn test_engine() -> (TempDir, AuthEngine) {
    let dir = TempDir::new().expect("temp dir");
    let manager = Manager::open(dir.path()).expect("open store");
    (dir, AuthEngine::new(manager, EngineConfig::default()))
}

/// Users, a role with an allow policy, and the role attached to one user
fn seed_reader(engine: &AuthEngine) {
    let system = Manager::system_user();
    let db = engine.manager();

    db.add_user(&system, User::new("alice"), "p").unwrap();
    db.add_user(&system, User::new("bob"), "p").unwrap();
    db.add_role(&system, "Reader", "read-only access").unwrap();
    db.add_policy(
        &system,
        Policy::new("read-orders", Effect::Allow)
            .with_resource(r"orders/<\d+>")
            .with_resource("orders")
            .with_action("read"),
    )
    .unwrap();
    db.attach_policies_to_role(&system, "Reader", &["read-orders"]).unwrap();
    db.attach_role_to_users(&system, "Reader", &["alice"]).unwrap();
}

#[test]
fn test_allow_through_role_policy() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);

    let decision = engine.authorize("alice", "read", "orders/42").unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.policy, "read-orders");

    let literal = engine.authorize("alice", "read", "orders").unwrap();
    assert!(literal.allowed);
}

#[test]
fn test_default_deny_without_policies() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);

    // bob has no roles at all
    let decision = engine.authorize("bob", "read", "orders/42").unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.policy, "default");
}

#[test]
fn test_deny_on_non_matching_request() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);

    // Wrong action
    assert!(!engine.authorize("alice", "delete", "orders/42").unwrap().allowed);
    // Pattern is anchored, not a substring match
    assert!(!engine.authorize("alice", "read", "orders/42/items").unwrap().allowed);
    assert!(!engine.authorize("alice", "read", "order").unwrap().allowed);
}

#[test]
fn test_deny_overrides_allow() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);
    let system = Manager::system_user();
    let db = engine.manager();

    db.add_policy(
        &system,
        Policy::new("deny-orders", Effect::Deny)
            .with_resource(r"orders/<\d+>")
            .with_action("read"),
    )
    .unwrap();
    db.attach_policies_to_role(&system, "Reader", &["deny-orders"]).unwrap();

    let decision = engine.authorize("alice", "read", "orders/42").unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.policy, "deny-orders");
}

#[test]
fn test_allow_through_group_membership() {
    let (_dir, engine) = test_engine();
    let system = Manager::system_user();
    let db = engine.manager();

    db.add_user(&system, User::new("carol"), "p").unwrap();
    db.add_group(&system, "Accounting", "").unwrap();
    db.add_role(&system, "InvoiceReader", "").unwrap();
    db.add_policy(
        &system,
        Policy::new("read-invoices", Effect::Allow)
            .with_resource("invoices")
            .with_action("read"),
    )
    .unwrap();
    db.attach_policies_to_role(&system, "InvoiceReader", &["read-invoices"]).unwrap();
    db.attach_role_to_groups(&system, "InvoiceReader", &["Accounting"]).unwrap();

    // carol is not yet a member
    assert!(!engine.authorize("carol", "read", "invoices").unwrap().allowed);

    // Group membership grants the role's policies
    let mut group = db.get_group(&system, "Accounting").unwrap();
    group.users.insert("carol".to_string());
    db.update_group(&system, group).unwrap();

    assert!(engine.authorize("carol", "read", "invoices").unwrap().allowed);
}

#[test]
fn test_disabled_group_grants_nothing() {
    let (_dir, engine) = test_engine();
    let system = Manager::system_user();
    let db = engine.manager();

    db.add_user(&system, User::new("carol"), "p").unwrap();
    db.add_group(&system, "Accounting", "").unwrap();
    db.add_role(&system, "InvoiceReader", "").unwrap();
    db.add_policy(
        &system,
        Policy::new("read-invoices", Effect::Allow)
            .with_resource("invoices")
            .with_action("read"),
    )
    .unwrap();
    db.attach_policies_to_role(&system, "InvoiceReader", &["read-invoices"]).unwrap();
    db.attach_role_to_groups(&system, "InvoiceReader", &["Accounting"]).unwrap();

    let mut group = db.get_group(&system, "Accounting").unwrap();
    group.users.insert("carol".to_string());
    group.enabled = false;
    db.update_group(&system, group).unwrap();

    assert!(!engine.authorize("carol", "read", "invoices").unwrap().allowed);
}

#[test]
fn test_disabled_principal_is_denied_without_evaluation() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);
    let system = Manager::system_user();
    let db = engine.manager();

    let mut alice = db.get_user(&system, "alice").unwrap();
    alice.enabled = false;
    db.update_user(&system, alice).unwrap();

    let decision = engine.authorize("alice", "read", "orders/42").unwrap();
    assert!(!decision.allowed);
    assert_eq!(decision.policy, "default");
}

#[test]
fn test_soft_deleted_principal_is_denied() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);
    let system = Manager::system_user();

    engine.manager().delete_user(&system, "alice").unwrap();

    let decision = engine.authorize("alice", "read", "orders/42").unwrap();
    assert!(!decision.allowed);
}

#[test]
fn test_unknown_principal_is_not_found() {
    let (_dir, engine) = test_engine();

    let err = engine.authorize("nobody", "read", "orders").unwrap_err();
    assert!(matches!(err, IamError::NotFound { kind: "User", .. }));
}

#[test]
fn test_detach_revokes_access() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);
    let system = Manager::system_user();

    assert!(engine.authorize("alice", "read", "orders/42").unwrap().allowed);

    engine
        .manager()
        .detach_role_from_users(&system, "Reader", &["alice"])
        .unwrap();

    assert!(!engine.authorize("alice", "read", "orders/42").unwrap().allowed);
}

#[test]
fn test_default_allow_configuration() {
    let dir = TempDir::new().unwrap();
    let manager = Manager::open(dir.path()).unwrap();
    let system = Manager::system_user();
    manager.add_user(&system, User::new("alice"), "p").unwrap();

    let engine = AuthEngine::new(
        manager,
        EngineConfig {
            default_decision: Effect::Allow,
            ..EngineConfig::default()
        },
    );

    let decision = engine.authorize("alice", "read", "anything").unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.policy, "default");
}

#[test]
fn test_repeated_authorization_reuses_compiled_patterns() {
    let (_dir, engine) = test_engine();
    seed_reader(&engine);

    for i in 0..20 {
        let resource = format!("orders/{i}");
        assert!(engine.authorize("alice", "read", &resource).unwrap().allowed);
    }

    // One pattern in play, one cache entry; results stayed consistent
    assert_eq!(engine.matcher().cached_patterns(), 1);
}
