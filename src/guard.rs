//! Guard decision: the single entry point route guards and action buttons use
//!
//! `authorize` resolves the role, looks up the default level, lets an active
//! staff relation's explicit permission replace it, and compares against the
//! requirement. Denials are ordinary results that name the feature and role.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::cache::table_digest;
use crate::error::{AccessError, Result};
use crate::level::{satisfies, PermissionLevel};
use crate::principal::Principal;
use crate::role::{resolve_effective_role, EffectiveRole};
use crate::table::CapabilityTable;

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyKind {
    /// Role default is below the requirement
    Insufficient,
    /// Owner's explicit permission is below the requirement
    RestrictedByOwner,
    /// Feature key missing from the capability table
    UnknownFeature,
    /// Required level could not be parsed
    UnknownRequirement,
}

/// Details of a denied request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub kind: DenyKind,
    pub role: EffectiveRole,
    pub feature: String,
    pub have: PermissionLevel,
    /// `None` when the requirement itself was unrecognized
    pub need: Option<PermissionLevel>,
    /// Message suitable for a restricted-access screen
    pub message: String,
}

impl Denial {
    /// Developer-facing reason naming the role, feature and levels
    pub fn reason(&self) -> String {
        match (self.kind, self.need) {
            (DenyKind::UnknownFeature, Some(need)) => format!(
                "feature '{}' is not configured, role '{}' has 'none', required '{}'",
                self.feature, self.role, need
            ),
            (_, None) => format!(
                "unrecognized required level for '{}', role '{}' denied",
                self.feature, self.role
            ),
            (_, Some(need)) => format!(
                "role '{}' has '{}' for '{}', required '{}'",
                self.role, self.have, self.feature, need
            ),
        }
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool { matches!(self, Self::Allow) }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Allow => None,
            Self::Deny(d) => Some(d),
        }
    }

    /// Convert a denial into `AccessError::Forbidden`
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(d) => Err(AccessError::forbidden(d)),
        }
    }
}

impl Serialize for Decision {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Allow => {
                let mut s = serializer.serialize_struct("Decision", 1)?;
                s.serialize_field("allow", &true)?;
                s.end()
            }
            Self::Deny(d) => {
                let mut s = serializer.serialize_struct("Decision", 8)?;
                s.serialize_field("allow", &false)?;
                s.serialize_field("reason", &d.reason())?;
                s.serialize_field("message", &d.message)?;
                s.serialize_field("kind", &d.kind)?;
                s.serialize_field("role", &d.role)?;
                s.serialize_field("feature", &d.feature)?;
                s.serialize_field("have", &d.have)?;
                s.serialize_field("need", &d.need)?;
                s.end()
            }
        }
    }
}

/// Authorization engine over a capability table. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct Guard {
    table: CapabilityTable,
    digest: [u8; 32],
}

impl Default for Guard {
    fn default() -> Self {
        Self::new(CapabilityTable::builtin())
    }
}

impl Guard {
    pub fn new(table: CapabilityTable) -> Self {
        let digest = table_digest(&table);
        Self { table, digest }
    }

    pub fn table(&self) -> &CapabilityTable { &self.table }

    pub(crate) fn table_digest(&self) -> &[u8; 32] { &self.digest }

    pub fn default_level(&self, role: EffectiveRole, feature: &str) -> PermissionLevel {
        self.table.default_level(role, feature)
    }

    /// Level the principal holds on a feature after explicit overrides
    pub fn effective_level(&self, principal: &Principal, feature: &str) -> Result<PermissionLevel> {
        check_integrity(principal)?;
        let role = resolve_effective_role(principal);
        Ok(self.level_for(principal, role, feature).0)
    }

    /// Decide whether `principal` may use `feature` at `required` level.
    ///
    /// Errors only when the principal's facts are inconsistent.
    pub fn authorize(
        &self,
        principal: &Principal,
        feature: &str,
        required: PermissionLevel,
    ) -> Result<Decision> {
        check_integrity(principal)?;
        let role = resolve_effective_role(principal);
        let (have, overridden) = self.level_for(principal, role, feature);
        let known = self.table.contains(feature);

        // Unknown features deny even a `none` requirement
        if known && satisfies(have, required) {
            debug!(principal = %principal.id, role = %role, feature, %have, %required, "allow");
            return Ok(Decision::Allow);
        }

        let kind = if !known {
            DenyKind::UnknownFeature
        } else if overridden {
            DenyKind::RestrictedByOwner
        } else {
            DenyKind::Insufficient
        };
        let message = self.user_message(kind, role, feature, Some(required));
        let denial = Denial {
            kind,
            role,
            feature: feature.to_string(),
            have: if known { have } else { PermissionLevel::None },
            need: Some(required),
            message,
        };
        debug!(principal = %principal.id, reason = %denial.reason(), "deny");
        Ok(Decision::Deny(denial))
    }

    /// Like [`authorize`](Self::authorize) with the requirement given as a
    /// string. An unrecognized requirement denies.
    pub fn authorize_str(&self, principal: &Principal, feature: &str, required: &str) -> Result<Decision> {
        match PermissionLevel::parse(required) {
            Some(level) => self.authorize(principal, feature, level),
            None => {
                check_integrity(principal)?;
                warn!(feature, required, "unrecognized required level, denying");
                let role = resolve_effective_role(principal);
                let kind = DenyKind::UnknownRequirement;
                Ok(Decision::Deny(Denial {
                    kind,
                    role,
                    feature: feature.to_string(),
                    have: self.level_for(principal, role, feature).0,
                    need: None,
                    message: self.user_message(kind, role, feature, None),
                }))
            }
        }
    }

    /// Boolean form for UI checks. Errors count as deny.
    pub fn permits(&self, principal: &Principal, feature: &str, required: PermissionLevel) -> bool {
        match self.authorize(principal, feature, required) {
            Ok(decision) => decision.is_allowed(),
            Err(e) => {
                warn!(principal = %principal.id, feature, error = %e, "authorization failed closed");
                false
            }
        }
    }

    /// Like `authorize`, but a denial becomes `AccessError::Forbidden`
    pub fn require(&self, principal: &Principal, feature: &str, required: PermissionLevel) -> Result<()> {
        self.authorize(principal, feature, required)?.into_result()
    }

    fn level_for(&self, principal: &Principal, role: EffectiveRole, feature: &str) -> (PermissionLevel, bool) {
        let base = self.table.default_level(role, feature);
        // Overrides come from the relation the role was resolved from. A
        // business owner or super-admin never acts through a staff relation.
        if !role.is_staff() {
            return (base, false);
        }
        match principal.active_relation().and_then(|r| r.explicit(feature)) {
            Some(level) => (level, true),
            None => (base, false),
        }
    }

    fn user_message(
        &self,
        kind: DenyKind,
        role: EffectiveRole,
        feature: &str,
        need: Option<PermissionLevel>,
    ) -> String {
        let label = self.table.label(feature);
        match kind {
            DenyKind::UnknownFeature | DenyKind::UnknownRequirement => {
                "This feature is not available".to_string()
            }
            DenyKind::RestrictedByOwner => {
                format!("{} access has been restricted by your business owner", label)
            }
            DenyKind::Insufficient if role.is_staff() => format!(
                "{} is not enabled for your staff account. Ask the business owner for access",
                label
            ),
            DenyKind::Insufficient => {
                let roles = need
                    .map(|n| self.table.account_roles_granting(feature, n))
                    .unwrap_or_default();
                if roles.is_empty() {
                    format!("{} is not available for your account", label)
                } else {
                    format!("{} is only available for {} accounts", label, join_labels(&roles))
                }
            }
        }
    }
}

/// Resolve role and decide with the built-in table
pub fn authorize(principal: &Principal, feature: &str, required: PermissionLevel) -> Result<Decision> {
    Guard::default().authorize(principal, feature, required)
}

fn check_integrity(principal: &Principal) -> Result<()> {
    if let Some(rel) = &principal.staff_relation {
        if rel.staff_id != principal.id {
            return Err(AccessError::integrity(
                &principal.id,
                format!("staff relation belongs to '{}'", rel.staff_id),
            ));
        }
        if rel.business_id == principal.id {
            return Err(AccessError::integrity(&principal.id, "listed as staff of own business"));
        }
    }
    Ok(())
}

/// ["Individual", "Business"] -> "Individual and Business"
fn join_labels(roles: &[EffectiveRole]) -> String {
    let labels: Vec<&str> = roles.iter().map(EffectiveRole::label).collect();
    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_labels() {
        assert_eq!(join_labels(&[EffectiveRole::Business]), "Business");
        assert_eq!(
            join_labels(&[EffectiveRole::Individual, EffectiveRole::Business]),
            "Individual and Business"
        );
        assert_eq!(
            join_labels(&[EffectiveRole::Free, EffectiveRole::Individual, EffectiveRole::Business]),
            "Free, Individual and Business"
        );
    }

    #[test]
    fn test_decision_into_result() {
        assert!(Decision::Allow.into_result().is_ok());
        let denial = Denial {
            kind: DenyKind::Insufficient,
            role: EffectiveRole::Free,
            feature: "billing".into(),
            have: PermissionLevel::None,
            need: Some(PermissionLevel::Read),
            message: "Billing is only available for Business accounts".into(),
        };
        let err = Decision::Deny(denial).into_result().unwrap_err();
        assert!(err.to_string().contains("role 'free' has 'none' for 'billing', required 'read'"));
    }
}
