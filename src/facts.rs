//! Fact providers and principal loading
//!
//! Identity, profile, super-admin registry and staff relations are separate
//! lookups, each possibly a network round trip. Only the identity lookup is
//! mandatory; the others degrade to the least-privileged fact on failure.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AccessError, Result};
use crate::principal::{Principal, PrincipalFacts, StaffRelation, StaffRelationRecord};
use crate::role::AccountType;

/// Source of the facts a decision is computed from
#[async_trait]
pub trait FactProvider: Send + Sync {
    /// Principal id behind a session token, `None` for unknown sessions
    async fn identity(&self, session_token: &str) -> Result<Option<String>>;

    /// Account type from the principal's profile, `None` when no profile exists
    async fn account_type(&self, principal_id: &str) -> Result<Option<AccountType>>;

    /// Whether the principal is listed in the super-admin registry
    async fn is_super_admin(&self, principal_id: &str) -> Result<bool>;

    /// Every staff relation record naming the principal as staff
    async fn staff_relations(&self, principal_id: &str) -> Result<Vec<StaffRelationRecord>>;
}

/// Gather raw facts for the session's principal.
///
/// Fails only when the session cannot be resolved.
pub async fn load_facts(provider: &dyn FactProvider, session_token: &str) -> Result<PrincipalFacts> {
    let id = match provider.identity(session_token).await {
        Ok(Some(id)) => id,
        Ok(None) => return Err(AccessError::Unauthenticated("unknown session".into())),
        Err(e) => {
            warn!(error = %e, "identity lookup failed");
            return Err(AccessError::Unauthenticated(e.to_string()));
        }
    };

    let account_type = match provider.account_type(&id).await {
        Ok(t) => t.unwrap_or_default(),
        Err(e) => {
            warn!(principal = %id, error = %e, "profile lookup failed, assuming free account");
            AccountType::Free
        }
    };

    let is_super_admin = provider.is_super_admin(&id).await.unwrap_or_else(|e| {
        warn!(principal = %id, error = %e, "super-admin registry lookup failed, assuming not listed");
        false
    });

    let staff_relations = provider.staff_relations(&id).await.unwrap_or_else(|e| {
        warn!(principal = %id, error = %e, "staff relation lookup failed, assuming none");
        Vec::new()
    });

    debug!(principal = %id, %account_type, is_super_admin, relations = staff_relations.len(), "facts loaded");
    Ok(PrincipalFacts {
        id,
        account_type,
        is_super_admin,
        staff_relations,
    })
}

/// Load and validate the principal behind a session token
pub async fn load_principal(provider: &dyn FactProvider, session_token: &str) -> Result<Principal> {
    Principal::from_facts(load_facts(provider, session_token).await?)
}

/// One of the four fact lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Session,
    Profile,
    SuperAdmin,
    StaffRelation,
}

impl Lookup {
    pub const ALL: [Lookup; 4] = [Self::Session, Self::Profile, Self::SuperAdmin, Self::StaffRelation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Profile => "profile",
            Self::SuperAdmin => "super_admin",
            Self::StaffRelation => "staff_relation",
        }
    }
}

/// In-process fact provider for tests and local development
#[derive(Debug, Default)]
pub struct MemoryFacts {
    sessions: RwLock<HashMap<String, String>>,
    profiles: RwLock<HashMap<String, AccountType>>,
    super_admins: RwLock<HashSet<String>>,
    relations: RwLock<HashMap<String, Vec<StaffRelationRecord>>>,
    failing: RwLock<HashSet<Lookup>>,
}

impl MemoryFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, token: impl Into<String>, principal_id: impl Into<String>) {
        write(&self.sessions).insert(token.into(), principal_id.into());
    }

    pub fn revoke_session(&self, token: &str) -> bool {
        write(&self.sessions).remove(token).is_some()
    }

    pub fn set_account_type(&self, principal_id: impl Into<String>, account_type: AccountType) {
        write(&self.profiles).insert(principal_id.into(), account_type);
    }

    pub fn add_super_admin(&self, principal_id: impl Into<String>) {
        write(&self.super_admins).insert(principal_id.into());
    }

    pub fn remove_super_admin(&self, principal_id: &str) -> bool {
        write(&self.super_admins).remove(principal_id)
    }

    /// Store a raw record, replacing any record for the same staff/business pair
    pub fn put_record(&self, record: StaffRelationRecord) {
        let mut relations = write(&self.relations);
        let list = relations.entry(record.staff_id.clone()).or_default();
        list.retain(|r| r.business_id != record.business_id);
        list.push(record);
    }

    pub fn put_relation(&self, relation: &StaffRelation) {
        self.put_record(StaffRelationRecord::from(relation));
    }

    /// Make a lookup fail until [`restore_lookup`](Self::restore_lookup)
    pub fn fail_lookup(&self, lookup: Lookup) {
        write(&self.failing).insert(lookup);
    }

    pub fn restore_lookup(&self, lookup: Lookup) {
        write(&self.failing).remove(&lookup);
    }

    fn check(&self, lookup: Lookup) -> Result<()> {
        if read(&self.failing).contains(&lookup) {
            Err(AccessError::lookup(lookup.as_str(), "unavailable"))
        } else {
            Ok(())
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

#[async_trait]
impl FactProvider for MemoryFacts {
    async fn identity(&self, session_token: &str) -> Result<Option<String>> {
        self.check(Lookup::Session)?;
        Ok(read(&self.sessions).get(session_token).cloned())
    }

    async fn account_type(&self, principal_id: &str) -> Result<Option<AccountType>> {
        self.check(Lookup::Profile)?;
        Ok(read(&self.profiles).get(principal_id).copied())
    }

    async fn is_super_admin(&self, principal_id: &str) -> Result<bool> {
        self.check(Lookup::SuperAdmin)?;
        Ok(read(&self.super_admins).contains(principal_id))
    }

    async fn staff_relations(&self, principal_id: &str) -> Result<Vec<StaffRelationRecord>> {
        self.check(Lookup::StaffRelation)?;
        Ok(read(&self.relations).get(principal_id).cloned().unwrap_or_default())
    }
}
