//! Staff relation lifecycle, driven by the business owner
//!
//! Every action is checked through the guard (`staff_management` at `admin`)
//! and against the relation's tenant. Relations are never deleted; they are
//! suspended and may be reactivated.

use tracing::{info, warn};

use crate::constants::STAFF_MANAGEMENT;
use crate::error::{AccessError, Result};
use crate::guard::Guard;
use crate::level::PermissionLevel;
use crate::principal::{Principal, StaffRelation, StaffRole, StaffStatus};
use crate::role::{resolve_effective_role, EffectiveRole};

/// Check that `owner` may manage staff of `business_id`
fn require_manager(guard: &Guard, owner: &Principal, business_id: &str) -> Result<()> {
    guard.require(owner, STAFF_MANAGEMENT, PermissionLevel::Admin)?;
    if resolve_effective_role(owner) != EffectiveRole::SuperAdmin && owner.id != business_id {
        return Err(AccessError::NotOwner {
            principal: owner.id.clone(),
            business: business_id.to_string(),
        });
    }
    Ok(())
}

/// Add a staff member to a business. The relation starts active.
pub fn add_staff(
    guard: &Guard,
    owner: &Principal,
    business_id: &str,
    staff_id: impl Into<String>,
    role: StaffRole,
) -> Result<StaffRelation> {
    let staff_id = staff_id.into();
    require_manager(guard, owner, business_id)?;
    if staff_id == business_id {
        return Err(AccessError::InvalidTransition("a business cannot be its own staff".into()));
    }
    info!(business = %business_id, staff = %staff_id, role = %role, "staff added");
    Ok(StaffRelation::new(staff_id, business_id, role))
}

/// Set an explicit permission, replacing the role default for `feature`.
/// The feature must be in the guard's capability table.
pub fn set_permission(
    guard: &Guard,
    owner: &Principal,
    relation: &mut StaffRelation,
    feature: impl Into<String>,
    level: PermissionLevel,
) -> Result<()> {
    require_manager(guard, owner, &relation.business_id)?;
    let feature = feature.into();
    if !guard.table().contains(&feature) {
        warn!(business = %relation.business_id, feature = %feature, "configuration gap: explicit permission for unknown feature");
        return Err(AccessError::config(format!("unknown feature '{}'", feature)));
    }
    info!(business = %relation.business_id, staff = %relation.staff_id, feature = %feature, %level, "explicit permission set");
    relation.explicit_permissions.insert(feature, level);
    Ok(())
}

/// Remove an explicit permission so the role default applies again.
/// Returns whether one was present.
pub fn clear_permission(
    guard: &Guard,
    owner: &Principal,
    relation: &mut StaffRelation,
    feature: &str,
) -> Result<bool> {
    require_manager(guard, owner, &relation.business_id)?;
    Ok(relation.explicit_permissions.remove(feature).is_some())
}

/// Change between `staff` and `co-admin`
pub fn set_role(guard: &Guard, owner: &Principal, relation: &mut StaffRelation, role: StaffRole) -> Result<()> {
    require_manager(guard, owner, &relation.business_id)?;
    if relation.role == role {
        return Err(AccessError::InvalidTransition(format!("relation is already '{}'", role)));
    }
    info!(business = %relation.business_id, staff = %relation.staff_id, from = %relation.role, to = %role, "staff role changed");
    relation.role = role;
    Ok(())
}

/// `active -> suspended`
pub fn suspend(guard: &Guard, owner: &Principal, relation: &mut StaffRelation) -> Result<()> {
    transition(guard, owner, relation, StaffStatus::Active, StaffStatus::Suspended)
}

/// `suspended -> active`
pub fn reactivate(guard: &Guard, owner: &Principal, relation: &mut StaffRelation) -> Result<()> {
    transition(guard, owner, relation, StaffStatus::Suspended, StaffStatus::Active)
}

fn transition(
    guard: &Guard,
    owner: &Principal,
    relation: &mut StaffRelation,
    from: StaffStatus,
    to: StaffStatus,
) -> Result<()> {
    require_manager(guard, owner, &relation.business_id)?;
    if relation.status != from {
        return Err(AccessError::InvalidTransition(format!(
            "cannot move staff relation from '{}' to '{}'",
            relation.status, to
        )));
    }
    info!(business = %relation.business_id, staff = %relation.staff_id, %from, %to, "staff status changed");
    relation.status = to;
    Ok(())
}
