//! Opt-in decision cache for callers
//!
//! Entries are keyed by a SHA-256 fingerprint of every fact a decision
//! depends on plus a digest of the guard's capability table, so a changed
//! account type, relation status, explicit permission or table never hits a
//! stale entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::error::Result;
use crate::guard::{Decision, Guard};
use crate::level::PermissionLevel;
use crate::principal::Principal;
use crate::table::CapabilityTable;

/// Digest of the decision-relevant facts of a principal
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(principal: &Principal) -> Self {
        let mut h = Sha256::new();
        field(&mut h, principal.id.as_bytes());
        field(&mut h, principal.account_type.as_str().as_bytes());
        field(&mut h, &[principal.is_super_admin as u8]);
        match &principal.staff_relation {
            None => field(&mut h, b"-"),
            Some(rel) => {
                field(&mut h, b"+");
                field(&mut h, rel.staff_id.as_bytes());
                field(&mut h, rel.business_id.as_bytes());
                field(&mut h, rel.role.as_str().as_bytes());
                field(&mut h, rel.status.as_str().as_bytes());
                // BTreeMap iterates in key order
                for (feature, level) in &rel.explicit_permissions {
                    field(&mut h, feature.as_bytes());
                    field(&mut h, &[level.ordinal()]);
                }
            }
        }
        Self(h.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

/// Length-prefixed so adjacent fields cannot run together
fn field(h: &mut Sha256, bytes: &[u8]) {
    h.update((bytes.len() as u64).to_be_bytes());
    h.update(bytes);
}

/// Digest of every rule in a table, in sorted key order
pub(crate) fn table_digest(table: &CapabilityTable) -> [u8; 32] {
    let mut h = Sha256::new();
    for key in table.feature_keys() {
        field(&mut h, key.as_bytes());
        let Some(rule) = table.get(key) else { continue };
        field(&mut h, rule.label.as_bytes());
        field(&mut h, &[rule.tenant_scoped as u8]);
        for (role, level) in &rule.defaults {
            field(&mut h, role.as_str().as_bytes());
            field(&mut h, &[level.ordinal()]);
        }
    }
    h.finalize().into()
}

fn entry_key(table: &[u8; 32], fp: &Fingerprint, feature: &str, required: PermissionLevel) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(table);
    h.update(fp.as_bytes());
    field(&mut h, feature.as_bytes());
    h.update([required.ordinal()]);
    h.finalize().into()
}

/// Bounded cache of guard decisions. Flushes entirely when full.
#[derive(Debug)]
pub struct DecisionCache {
    capacity: usize,
    entries: Mutex<HashMap<[u8; 32], Decision>>,
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl DecisionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached decision, computing and storing it on a miss. Guards with
    /// different tables never share entries. Errors are never cached.
    pub fn authorize(
        &self,
        guard: &Guard,
        principal: &Principal,
        feature: &str,
        required: PermissionLevel,
    ) -> Result<Decision> {
        let key = entry_key(guard.table_digest(), &Fingerprint::of(principal), feature, required);
        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit.clone());
        }

        let decision = guard.authorize(principal, feature, required)?;
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            debug!(capacity = self.capacity, "decision cache full, flushing");
            entries.clear();
        }
        entries.insert(key, decision.clone());
        Ok(decision)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<[u8; 32], Decision>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}
