//! Fact loading tests
//!
//! Session resolution, partial provider failure, and validation of records.

use wakti_access::*;

fn provider() -> MemoryFacts {
    let facts = MemoryFacts::new();
    facts.add_session("tok-owner", "biz-1");
    facts.set_account_type("biz-1", AccountType::Business);

    facts.add_session("tok-staff", "u1");
    facts.set_account_type("u1", AccountType::Individual);
    facts.put_relation(
        &StaffRelation::new("u1", "biz-1", StaffRole::CoAdmin)
            .with_permission(BOOKING_SYSTEM, PermissionLevel::None),
    );

    facts.add_session("tok-root", "root");
    facts.add_super_admin("root");
    facts
}

#[tokio::test]
async fn loads_business_owner() {
    let p = load_principal(&provider(), "tok-owner").await.unwrap();
    assert_eq!(p.id, "biz-1");
    assert_eq!(resolve_effective_role(&p), EffectiveRole::Business);
}

#[tokio::test]
async fn loads_staff_with_explicit_permissions() {
    let p = load_principal(&provider(), "tok-staff").await.unwrap();
    assert_eq!(resolve_effective_role(&p), EffectiveRole::CoAdmin);
    assert_eq!(
        p.active_relation().unwrap().explicit(BOOKING_SYSTEM),
        Some(PermissionLevel::None)
    );
    assert!(!Guard::default().permits(&p, BOOKING_SYSTEM, PermissionLevel::Read));
}

#[tokio::test]
async fn loads_super_admin_without_profile() {
    let p = load_principal(&provider(), "tok-root").await.unwrap();
    assert_eq!(p.account_type, AccountType::Free);
    assert_eq!(resolve_effective_role(&p), EffectiveRole::SuperAdmin);
}

#[tokio::test]
async fn unknown_session_is_unauthenticated() {
    let err = load_principal(&provider(), "tok-nobody").await.unwrap_err();
    assert!(matches!(err, AccessError::Unauthenticated(_)));
}

#[tokio::test]
async fn revoked_session_is_unauthenticated() {
    let facts = provider();
    assert!(facts.revoke_session("tok-owner"));
    assert!(load_principal(&facts, "tok-owner").await.is_err());
}

// ============================================================================
// Partial failure
// ============================================================================

#[tokio::test]
async fn session_lookup_failure_is_fatal() {
    let facts = provider();
    facts.fail_lookup(Lookup::Session);
    let err = load_principal(&facts, "tok-owner").await.unwrap_err();
    assert!(matches!(err, AccessError::Unauthenticated(_)));
}

#[tokio::test]
async fn failed_lookup_is_named_in_error() {
    let facts = provider();
    facts.fail_lookup(Lookup::StaffRelation);
    let err = facts.staff_relations("u1").await.unwrap_err();
    assert!(matches!(err, AccessError::Lookup { lookup: "staff_relation", .. }));
}

#[tokio::test]
async fn profile_failure_defaults_to_free() {
    let facts = provider();
    facts.fail_lookup(Lookup::Profile);
    let p = load_principal(&facts, "tok-owner").await.unwrap();
    assert_eq!(p.account_type, AccountType::Free);
    assert!(!Guard::default().permits(&p, STAFF_MANAGEMENT, PermissionLevel::Admin));

    facts.restore_lookup(Lookup::Profile);
    let p = load_principal(&facts, "tok-owner").await.unwrap();
    assert_eq!(p.account_type, AccountType::Business);
}

#[tokio::test]
async fn registry_failure_defaults_to_not_super_admin() {
    let facts = provider();
    facts.fail_lookup(Lookup::SuperAdmin);
    let p = load_principal(&facts, "tok-root").await.unwrap();
    assert!(!p.is_super_admin);
    assert_eq!(resolve_effective_role(&p), EffectiveRole::Free);
}

#[tokio::test]
async fn staff_relation_failure_defaults_to_absent() {
    let facts = provider();
    facts.fail_lookup(Lookup::StaffRelation);
    let p = load_principal(&facts, "tok-staff").await.unwrap();
    assert!(p.staff_relation.is_none());
    assert_eq!(resolve_effective_role(&p), EffectiveRole::Individual);
}

#[tokio::test]
async fn every_optional_lookup_failing_leaves_free_principal() {
    let facts = provider();
    for lookup in Lookup::ALL.into_iter().filter(|l| *l != Lookup::Session) {
        facts.fail_lookup(lookup);
    }
    let p = load_principal(&facts, "tok-root").await.unwrap();
    assert_eq!(p, Principal::new("root", AccountType::Free));
}

// ============================================================================
// Record validation through the loader
// ============================================================================

#[tokio::test]
async fn two_active_relations_surface_integrity_error() {
    let facts = provider();
    facts.put_relation(&StaffRelation::new("u1", "biz-2", StaffRole::Staff));
    let err = load_principal(&facts, "tok-staff").await.unwrap_err();
    assert!(err.is_integrity());
}

#[tokio::test]
async fn suspended_second_relation_is_fine() {
    let facts = provider();
    facts.put_relation(
        &StaffRelation::new("u1", "biz-2", StaffRole::Staff).with_status(StaffStatus::Suspended),
    );
    let p = load_principal(&facts, "tok-staff").await.unwrap();
    assert_eq!(p.active_relation().unwrap().business_id, "biz-1");
}

#[tokio::test]
async fn record_with_missing_status_surfaces_integrity_error() {
    let facts = provider();
    facts.put_record(StaffRelationRecord {
        staff_id: "u1".into(),
        business_id: "biz-1".into(),
        role: Some("staff".into()),
        status: None,
        ..Default::default()
    });
    assert!(load_principal(&facts, "tok-staff").await.unwrap_err().is_integrity());
}

#[tokio::test]
async fn stored_json_record_round_trips_through_loader() {
    let facts = provider();
    facts.put_record(
        StaffRelationRecord::from_json(
            r#"{"staff_id":"u1","business_id":"biz-1","role":"staff","status":"active",
                "explicit_permissions":{"tasks_management":true}}"#,
        )
        .unwrap(),
    );
    let p = load_principal(&facts, "tok-staff").await.unwrap();
    assert_eq!(resolve_effective_role(&p), EffectiveRole::Staff);
    assert!(Guard::default().permits(&p, TASKS_MANAGEMENT, PermissionLevel::Write));
}

#[tokio::test]
async fn load_facts_keeps_raw_records() {
    let facts = provider();
    let raw = load_facts(&facts, "tok-staff").await.unwrap();
    assert_eq!(raw.staff_relations.len(), 1);
    assert_eq!(raw.staff_relations[0].role.as_deref(), Some("co-admin"));
    assert_eq!(
        raw.staff_relations[0].explicit_permissions[BOOKING_SYSTEM],
        PermissionValue::Level("none".into())
    );
}
