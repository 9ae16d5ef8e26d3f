//! Account types, effective roles, and the role resolver
//!
//! The effective role is never stored. It is derived fresh from the
//! principal's facts on every check, first match wins:
//!
//! 1. registered super-admin
//! 2. business account (owner of its own tenant)
//! 3. active staff relation (`co-admin` or `staff`)
//! 4. individual account
//! 5. free account

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Plan-level account type, assigned at signup
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Free,
    Individual,
    Business,
}

impl AccountType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "individual" => Some(Self::Individual),
            "business" => Some(Self::Business),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Individual => "individual",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a principal acts under for a single decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectiveRole {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "individual")]
    Individual,
    #[serde(rename = "business")]
    Business,
    #[serde(rename = "staff")]
    Staff,
    #[serde(rename = "co-admin")]
    CoAdmin,
    #[serde(rename = "super-admin")]
    SuperAdmin,
}

impl EffectiveRole {
    pub const ALL: [EffectiveRole; 6] = [
        Self::Free,
        Self::Individual,
        Self::Business,
        Self::Staff,
        Self::CoAdmin,
        Self::SuperAdmin,
    ];

    /// Parse a role name.
    ///
    /// Only for display and configuration. Role strings held by a client are
    /// hints and never feed an authorization decision.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "free" => Some(Self::Free),
            "individual" => Some(Self::Individual),
            "business" => Some(Self::Business),
            "staff" => Some(Self::Staff),
            "co-admin" | "coadmin" => Some(Self::CoAdmin),
            "super-admin" | "superadmin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Individual => "individual",
            Self::Business => "business",
            Self::Staff => "staff",
            Self::CoAdmin => "co-admin",
            Self::SuperAdmin => "super-admin",
        }
    }

    /// Human label used in UI messages ("Business accounts")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Individual => "Individual",
            Self::Business => "Business",
            Self::Staff => "Staff",
            Self::CoAdmin => "Co-admin",
            Self::SuperAdmin => "Super admin",
        }
    }

    /// Acting on behalf of a business they do not own
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Staff | Self::CoAdmin)
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectiveRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Resolve the single effective role for a principal.
///
/// Pure and total: no I/O, same facts give the same role.
pub fn resolve_effective_role(principal: &Principal) -> EffectiveRole {
    if principal.is_super_admin {
        return EffectiveRole::SuperAdmin;
    }
    if principal.account_type == AccountType::Business {
        return EffectiveRole::Business;
    }
    if let Some(rel) = principal.active_relation() {
        return if rel.role.is_co_admin() {
            EffectiveRole::CoAdmin
        } else {
            EffectiveRole::Staff
        };
    }
    match principal.account_type {
        AccountType::Individual => EffectiveRole::Individual,
        _ => EffectiveRole::Free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(EffectiveRole::parse("co-admin"), Some(EffectiveRole::CoAdmin));
        assert_eq!(EffectiveRole::parse("co_admin"), Some(EffectiveRole::CoAdmin));
        assert_eq!(EffectiveRole::parse("Super-Admin"), Some(EffectiveRole::SuperAdmin));
        assert_eq!(EffectiveRole::parse("staff"), Some(EffectiveRole::Staff));
        assert_eq!(EffectiveRole::parse("owner"), None);
    }

    #[test]
    fn test_role_round_trip_names() {
        for role in EffectiveRole::ALL {
            assert_eq!(EffectiveRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_account_type_parsing() {
        assert_eq!(AccountType::parse("business"), Some(AccountType::Business));
        assert_eq!(AccountType::parse("INDIVIDUAL"), Some(AccountType::Individual));
        assert_eq!(AccountType::parse("enterprise"), None);
    }

    #[test]
    fn test_is_staff() {
        assert!(EffectiveRole::Staff.is_staff());
        assert!(EffectiveRole::CoAdmin.is_staff());
        assert!(!EffectiveRole::Business.is_staff());
    }
}
