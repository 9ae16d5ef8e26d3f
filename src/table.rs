//! Capability table: default permission level per (role, feature)
//!
//! The built-in WAKTI table needs no configuration. Deployments can layer a
//! TOML file on top of it:
//!
//! ```toml
//! [features.booking_system]
//! label = "Booking system"
//!
//! [features.booking_system.defaults]
//! co-admin = "read"
//! staff = "read"
//! ```
//!
//! Super-admins always get `admin`. Business owners get `admin` on every
//! tenant-scoped feature. Roles without an entry get `none`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::*;
use crate::error::{AccessError, Result};
use crate::level::PermissionLevel;
use crate::role::EffectiveRole;

/// Defaults for one feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRule {
    pub label: String,
    /// Feature lives inside a business tenant (owners always get `admin`)
    pub tenant_scoped: bool,
    pub defaults: BTreeMap<EffectiveRole, PermissionLevel>,
}

impl FeatureRule {
    fn configured(&self, role: EffectiveRole) -> PermissionLevel {
        match role {
            EffectiveRole::SuperAdmin => PermissionLevel::Admin,
            EffectiveRole::Business if self.tenant_scoped => PermissionLevel::Admin,
            _ => self.defaults.get(&role).copied().unwrap_or_default(),
        }
    }
}

use EffectiveRole::{CoAdmin, Free, Individual, Staff};
use PermissionLevel::{Read, Write};

type BuiltinRule = (&'static str, &'static str, bool, &'static [(EffectiveRole, PermissionLevel)]);

const BUILTIN: &[BuiltinRule] = &[
    (TASKS_MANAGEMENT, "Task management", true, &[(Individual, Write), (CoAdmin, Write)]),
    (BOOKING_SYSTEM, "Booking system", true, &[(CoAdmin, Write)]),
    (STAFF_MANAGEMENT, "Staff management", true, &[]),
    (APPOINTMENTS, "Appointments", true, &[(Individual, Write), (Staff, Read), (CoAdmin, Write)]),
    (
        MESSAGING,
        "Messaging",
        true,
        &[(Free, Read), (Individual, Write), (Staff, Write), (CoAdmin, Write)],
    ),
    (AI_ASSISTANT, "AI assistant", true, &[(Individual, Write), (CoAdmin, Write)]),
    (BUSINESS_PAGE, "Business page", true, &[(CoAdmin, Write)]),
    (JOB_CARDS, "Job cards", true, &[(Staff, Write), (CoAdmin, PermissionLevel::Admin)]),
    (WORK_LOGS, "Work logs", true, &[(Staff, Write), (CoAdmin, PermissionLevel::Admin)]),
    (BILLING, "Billing", true, &[]),
    (PLATFORM_ADMIN, "Platform administration", false, &[]),
];

/// Maps (role, feature) to a default permission level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    features: HashMap<String, FeatureRule>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CapabilityTable {
    /// Table with no features; every lookup is a configuration gap
    pub fn empty() -> Self {
        Self { features: HashMap::new() }
    }

    pub fn builtin() -> Self {
        let features = BUILTIN
            .iter()
            .map(|(key, label, tenant_scoped, defaults)| {
                let rule = FeatureRule {
                    label: (*label).to_string(),
                    tenant_scoped: *tenant_scoped,
                    defaults: defaults.iter().copied().collect(),
                };
                ((*key).to_string(), rule)
            })
            .collect();
        Self { features }
    }

    /// Built-in table with a TOML file layered on top
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| AccessError::io(path.display().to_string(), e))?;
        content.parse()
    }

    pub fn insert(&mut self, key: impl Into<String>, rule: FeatureRule) {
        self.features.insert(key.into(), rule);
    }

    /// Layer TOML overrides onto this table
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let raw: RawTable = toml::from_str(content).map_err(|e| AccessError::config(e.to_string()))?;

        for (key, feature) in raw.features {
            let key = key.trim().to_string();
            if key.is_empty() {
                return Err(AccessError::config("empty feature key"));
            }
            let existing = self.features.get(&key);
            let tenant_scoped = feature
                .tenant_scoped
                .or(existing.map(|r| r.tenant_scoped))
                .unwrap_or(true);

            let mut defaults = BTreeMap::new();
            for (role, level) in &feature.defaults {
                let role = EffectiveRole::parse(role).ok_or_else(|| {
                    AccessError::config(format!("feature '{}': unknown role '{}'", key, role))
                })?;
                let level = PermissionLevel::parse(level).ok_or_else(|| {
                    AccessError::config(format!("feature '{}': unknown level '{}'", key, level))
                })?;
                fixed_role_check(&key, role, tenant_scoped)?;
                defaults.insert(role, level);
            }
            if tenant_scoped && existing.is_some_and(|r| r.defaults.contains_key(&EffectiveRole::Business)) {
                fixed_role_check(&key, EffectiveRole::Business, true)?;
            }

            let rule = self.features.entry(key.clone()).or_insert_with(|| FeatureRule {
                label: default_label(&key),
                tenant_scoped: true,
                defaults: BTreeMap::new(),
            });
            if let Some(label) = feature.label {
                rule.label = label;
            }
            if let Some(tenant_scoped) = feature.tenant_scoped {
                rule.tenant_scoped = tenant_scoped;
            }
            rule.defaults.extend(defaults);
        }
        Ok(())
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureRule> {
        self.features.get(feature)
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    pub fn feature_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.features.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Default level for a role on a feature. Unknown features resolve to
    /// `none` and are logged as a configuration gap.
    pub fn default_level(&self, role: EffectiveRole, feature: &str) -> PermissionLevel {
        match self.features.get(feature) {
            Some(rule) => rule.configured(role),
            None => {
                warn!(feature, role = %role, "configuration gap: feature not in capability table");
                PermissionLevel::None
            }
        }
    }

    /// Account roles whose defaults meet `need` on `feature`, lowest first
    pub fn account_roles_granting(&self, feature: &str, need: PermissionLevel) -> Vec<EffectiveRole> {
        let Some(rule) = self.features.get(feature) else {
            return Vec::new();
        };
        [Free, Individual, EffectiveRole::Business]
            .into_iter()
            .filter(|role| rule.configured(*role).satisfies(need))
            .collect()
    }

    /// UI label for a feature (the key itself when unknown)
    pub fn label<'a>(&'a self, feature: &'a str) -> &'a str {
        self.features.get(feature).map(|r| r.label.as_str()).unwrap_or(feature)
    }
}

impl FromStr for CapabilityTable {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self> {
        let mut table = Self::builtin();
        table.merge_toml(s)?;
        Ok(table)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTable {
    features: BTreeMap<String, RawFeature>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawFeature {
    label: Option<String>,
    tenant_scoped: Option<bool>,
    defaults: BTreeMap<String, String>,
}

/// Super-admin and tenant-owner levels are fixed at `admin` and cannot be configured
fn fixed_role_check(key: &str, role: EffectiveRole, tenant_scoped: bool) -> Result<()> {
    match role {
        EffectiveRole::SuperAdmin => Err(AccessError::config(format!(
            "feature '{}': super-admin defaults are fixed at admin",
            key
        ))),
        EffectiveRole::Business if tenant_scoped => Err(AccessError::config(format!(
            "feature '{}': business defaults are fixed at admin on tenant features",
            key
        ))),
        _ => Ok(()),
    }
}

/// "job_cards" -> "Job cards"
fn default_label(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
