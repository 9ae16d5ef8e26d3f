//! WAKTI access - role and permission resolution
//!
//! A pure decision engine: given a principal's facts (account type, staff
//! relation, super-admin registry membership) it resolves one effective role
//! and decides whether a feature may be used at a required level.
//!
//! ```
//! use wakti_access::{AccountType, Guard, PermissionLevel, Principal, STAFF_MANAGEMENT};
//!
//! let guard = Guard::default();
//! let owner = Principal::new("biz-1", AccountType::Business);
//! assert!(guard.permits(&owner, STAFF_MANAGEMENT, PermissionLevel::Admin));
//! ```

mod cache;
mod constants;
mod error;
mod facts;
mod guard;
mod level;
mod principal;
mod role;
pub mod staff;
mod table;

pub use cache::{DecisionCache, Fingerprint};
pub use constants::*;
pub use error::{AccessError, Result};
pub use facts::{load_facts, load_principal, FactProvider, Lookup, MemoryFacts};
pub use guard::{authorize, Decision, Denial, DenyKind, Guard};
pub use level::{satisfies, PermissionLevel};
pub use principal::{
    PermissionValue, Principal, PrincipalFacts, StaffRelation, StaffRelationRecord, StaffRole, StaffStatus,
};
pub use role::{resolve_effective_role, AccountType, EffectiveRole};
pub use table::{CapabilityTable, FeatureRule};
