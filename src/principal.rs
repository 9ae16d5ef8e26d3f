//! Principals, staff relations, and validation of raw facts
//!
//! Fact providers return loosely typed records ([`PrincipalFacts`],
//! [`StaffRelationRecord`]). [`Principal::from_facts`] turns them into the
//! typed model and rejects anything ambiguous instead of guessing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{AccessError, Result};
use crate::level::PermissionLevel;
use crate::role::AccountType;

/// Role of a staff member inside the business they work for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    #[serde(rename = "staff")]
    Staff,
    #[serde(rename = "co-admin")]
    CoAdmin,
}

impl StaffRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "staff" => Some(Self::Staff),
            "co-admin" | "coadmin" => Some(Self::CoAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::CoAdmin => "co-admin",
        }
    }

    pub fn is_co_admin(&self) -> bool { *self == Self::CoAdmin }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff relation status. Only `Active` confers permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    Active,
    Suspended,
}

impl StaffStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    pub fn is_active(&self) -> bool { *self == Self::Active }
}

impl fmt::Display for StaffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Principal `staff_id` works for business `business_id`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRelation {
    pub staff_id: String,
    pub business_id: String,
    pub role: StaffRole,
    pub status: StaffStatus,
    /// Owner-set overrides, replacing the role default for a feature.
    /// Stored flags and unknown level names decode as in [`PermissionValue`].
    #[serde(default, deserialize_with = "lenient_levels")]
    pub explicit_permissions: BTreeMap<String, PermissionLevel>,
}

fn lenient_levels<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, PermissionLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, PermissionValue>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(feature, value)| (feature, value.level())).collect())
}

impl StaffRelation {
    pub fn new(staff_id: impl Into<String>, business_id: impl Into<String>, role: StaffRole) -> Self {
        Self {
            staff_id: staff_id.into(),
            business_id: business_id.into(),
            role,
            status: StaffStatus::Active,
            explicit_permissions: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: StaffStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_permission(mut self, feature: impl Into<String>, level: PermissionLevel) -> Self {
        self.explicit_permissions.insert(feature.into(), level);
        self
    }

    pub fn is_active(&self) -> bool { self.status.is_active() }

    /// Explicit override for a feature, if the owner set one
    pub fn explicit(&self, feature: &str) -> Option<PermissionLevel> {
        self.explicit_permissions.get(feature).copied()
    }
}

/// The acting identity for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub account_type: AccountType,
    /// Set only from the super-admin registry, never from the profile
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub staff_relation: Option<StaffRelation>,
}

impl Principal {
    pub fn new(id: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: id.into(),
            account_type,
            is_super_admin: false,
            staff_relation: None,
        }
    }

    pub fn with_super_admin(mut self, is_super_admin: bool) -> Self {
        self.is_super_admin = is_super_admin;
        self
    }

    pub fn with_staff_relation(mut self, relation: StaffRelation) -> Self {
        self.staff_relation = Some(relation);
        self
    }

    pub fn active_relation(&self) -> Option<&StaffRelation> {
        self.staff_relation.as_ref().filter(|r| r.is_active())
    }

    /// Build a principal from raw provider facts.
    ///
    /// Fails with [`AccessError::DataIntegrity`] when relation records are
    /// malformed, belong to someone else, or more than one is active.
    pub fn from_facts(facts: PrincipalFacts) -> Result<Self> {
        let id = facts.id;
        let mut active: Vec<StaffRelation> = Vec::new();
        let mut inactive: Option<StaffRelation> = None;

        for record in facts.staff_relations {
            let rel = record.validate(&id)?;
            if rel.is_active() {
                active.push(rel);
            } else if inactive.is_none() {
                inactive = Some(rel);
            }
        }

        if active.len() > 1 {
            let businesses: Vec<&str> = active.iter().map(|r| r.business_id.as_str()).collect();
            return Err(AccessError::integrity(
                &id,
                format!(
                    "{} active staff relations (businesses: {})",
                    active.len(),
                    businesses.join(", ")
                ),
            ));
        }

        Ok(Self {
            id,
            account_type: facts.account_type,
            is_super_admin: facts.is_super_admin,
            staff_relation: active.pop().or(inactive),
        })
    }
}

/// Stored explicit permission value: a flag or a level name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionValue {
    Flag(bool),
    Level(String),
}

impl PermissionValue {
    /// `true` grants use of the feature (`write`), `false` revokes it.
    /// Unknown level names fail closed to `none`.
    pub fn level(&self) -> PermissionLevel {
        match self {
            Self::Flag(true) => PermissionLevel::Write,
            Self::Flag(false) => PermissionLevel::None,
            Self::Level(s) => PermissionLevel::parse_or_none(s),
        }
    }
}

impl From<bool> for PermissionValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<PermissionLevel> for PermissionValue {
    fn from(v: PermissionLevel) -> Self {
        Self::Level(v.as_str().to_string())
    }
}

/// Staff relation as returned by a fact provider, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRelationRecord {
    pub staff_id: String,
    pub business_id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub explicit_permissions: BTreeMap<String, PermissionValue>,
}

impl StaffRelationRecord {
    /// Decode a record from its stored JSON form
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| AccessError::lookup("staff_relation", format!("malformed record: {}", e)))
    }

    fn validate(self, principal: &str) -> Result<StaffRelation> {
        if self.staff_id != principal {
            return Err(AccessError::integrity(
                principal,
                format!("staff relation belongs to '{}'", self.staff_id),
            ));
        }
        if self.business_id == principal {
            return Err(AccessError::integrity(principal, "listed as staff of own business"));
        }
        let status = match self.status.as_deref() {
            None => return Err(AccessError::integrity(principal, "staff relation status missing")),
            Some(s) => StaffStatus::parse(s).ok_or_else(|| {
                AccessError::integrity(principal, format!("invalid staff relation status '{}'", s))
            })?,
        };
        let role = match self.role.as_deref() {
            None => return Err(AccessError::integrity(principal, "staff relation role missing")),
            Some(s) => StaffRole::parse(s).ok_or_else(|| {
                AccessError::integrity(principal, format!("invalid staff relation role '{}'", s))
            })?,
        };

        let explicit_permissions = self
            .explicit_permissions
            .into_iter()
            .map(|(feature, value)| {
                let level = value.level();
                if let PermissionValue::Level(raw) = &value {
                    if PermissionLevel::parse(raw).is_none() {
                        warn!(
                            principal,
                            business = %self.business_id,
                            feature = %feature,
                            "explicit permission has unknown level, stored as none"
                        );
                    }
                }
                (feature, level)
            })
            .collect();

        Ok(StaffRelation {
            staff_id: self.staff_id,
            business_id: self.business_id,
            role,
            status,
            explicit_permissions,
        })
    }
}

impl From<&StaffRelation> for StaffRelationRecord {
    fn from(rel: &StaffRelation) -> Self {
        Self {
            staff_id: rel.staff_id.clone(),
            business_id: rel.business_id.clone(),
            role: Some(rel.role.as_str().to_string()),
            status: Some(rel.status.as_str().to_string()),
            explicit_permissions: rel
                .explicit_permissions
                .iter()
                .map(|(k, v)| (k.clone(), PermissionValue::from(*v)))
                .collect(),
        }
    }
}

/// Everything the fact providers returned for one principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalFacts {
    pub id: String,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub staff_relations: Vec<StaffRelationRecord>,
}
