//! Fail-closed tests
//!
//! Unknown features, unknown levels, inconsistent facts and spoofing attempts
//! must never produce an allow.

use wakti_access::*;

fn staff_member() -> Principal {
    Principal::new("u1", AccountType::Individual)
        .with_staff_relation(StaffRelation::new("u1", "biz-1", StaffRole::Staff))
}

/// ATTACK: feature key typo or feature missing from the table
#[test]
fn attack_unknown_feature() {
    let guard = Guard::default();
    let owner = Principal::new("biz-1", AccountType::Business);

    let d = guard.authorize(&owner, "staff_managment", PermissionLevel::Read).unwrap();

    // Expected: DENIED even for the business owner
    let denial = d.denial().unwrap();
    assert_eq!(denial.kind, DenyKind::UnknownFeature);
    assert!(denial.reason().contains("staff_managment"));
    assert!(denial.reason().contains("'business'"));
}

/// ATTACK: super-admin on a feature the table does not know
#[test]
fn attack_unknown_feature_super_admin() {
    let root = Principal::new("root", AccountType::Free).with_super_admin(true);
    assert!(!Guard::default().permits(&root, "drop_all_tables", PermissionLevel::Read));
}

/// ATTACK: unknown feature requested at level none
#[test]
fn attack_unknown_feature_at_none() {
    let p = Principal::new("u2", AccountType::Free);
    assert!(!Guard::default().permits(&p, "anything", PermissionLevel::None));
}

/// ATTACK: requirement string that does not parse
#[test]
fn attack_unknown_requirement() {
    let owner = Principal::new("biz-1", AccountType::Business);
    let d = Guard::default().authorize_str(&owner, BOOKING_SYSTEM, "superuser").unwrap();

    // Expected: DENIED - an unreadable requirement is never treated as none
    let denial = d.denial().unwrap();
    assert_eq!(denial.kind, DenyKind::UnknownRequirement);
    assert_eq!(denial.need, None);
    assert!(denial.reason().contains("unrecognized required level"));
}

#[test]
fn requirement_string_parses_when_valid() {
    let owner = Principal::new("biz-1", AccountType::Business);
    assert!(Guard::default()
        .authorize_str(&owner, BOOKING_SYSTEM, "Admin")
        .unwrap()
        .is_allowed());
}

/// ATTACK: stored explicit permission with an invented level
#[test]
fn attack_unknown_stored_level() {
    let mut rec = StaffRelationRecord {
        staff_id: "u1".into(),
        business_id: "biz-1".into(),
        role: Some("co-admin".into()),
        status: Some("active".into()),
        ..Default::default()
    };
    rec.explicit_permissions.insert(STAFF_MANAGEMENT.into(), PermissionValue::Level("owner".into()));
    let p = Principal::from_facts(PrincipalFacts {
        id: "u1".into(),
        staff_relations: vec![rec],
        ..Default::default()
    })
    .unwrap();

    assert!(!Guard::default().permits(&p, STAFF_MANAGEMENT, PermissionLevel::Read));
}

/// ATTACK: relation record copied onto another principal
#[test]
fn attack_borrowed_relation() {
    let p = Principal::new("mallory", AccountType::Free).with_staff_relation(
        StaffRelation::new("u1", "biz-1", StaffRole::CoAdmin)
            .with_permission(BOOKING_SYSTEM, PermissionLevel::Admin),
    );
    let guard = Guard::default();

    // Expected: integrity error, and the boolean form fails closed
    assert!(guard.authorize(&p, BOOKING_SYSTEM, PermissionLevel::Read).unwrap_err().is_integrity());
    assert!(!guard.permits(&p, BOOKING_SYSTEM, PermissionLevel::Read));
    assert!(guard.effective_level(&p, BOOKING_SYSTEM).is_err());
}

/// ATTACK: owner listed as staff of their own business
#[test]
fn attack_self_staffing() {
    let p = Principal::new("u1", AccountType::Individual).with_staff_relation(
        StaffRelation::new("u1", "u1", StaffRole::CoAdmin),
    );
    assert!(Guard::default().authorize(&p, BOOKING_SYSTEM, PermissionLevel::Read).is_err());
}

/// ATTACK: staff member self-grants through a role they do not hold
#[test]
fn attack_staff_cannot_reach_owner_features() {
    let guard = Guard::default();
    let p = staff_member();
    for feature in [STAFF_MANAGEMENT, BILLING, BUSINESS_PAGE, BOOKING_SYSTEM, PLATFORM_ADMIN] {
        assert!(!guard.permits(&p, feature, PermissionLevel::Read), "{}", feature);
    }
}

/// ATTACK: profile says business, but the registry is the only super-admin source
#[test]
fn attack_super_admin_not_from_account_type() {
    let p = Principal::new("biz-1", AccountType::Business);
    assert_eq!(resolve_effective_role(&p), EffectiveRole::Business);
    assert!(!Guard::default().permits(&p, PLATFORM_ADMIN, PermissionLevel::Read));
}

/// ATTACK: empty capability table
#[test]
fn attack_empty_table_denies_everything() {
    let guard = Guard::new(CapabilityTable::empty());
    let root = Principal::new("root", AccountType::Business).with_super_admin(true);
    for feature in ALL_FEATURES {
        assert!(!guard.permits(&root, feature, PermissionLevel::Read));
    }
}
