//! Permission lattice
//!
//! Four levels with a total order: `none < read < write < admin`.
//! A level satisfies a requirement when it is at least as high.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Permission level (ordered lattice)
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    None = 0,
    Read = 1,
    Write = 2,
    Admin = 3,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [Self::None, Self::Read, Self::Write, Self::Admin];

    #[inline]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Parse a level name. Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Parse a stored level, falling back to `none` for anything unknown.
    pub fn parse_or_none(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            warn!(level = s, "unknown permission level, treating as none");
            Self::None
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }

    #[inline]
    pub const fn satisfies(self, need: PermissionLevel) -> bool {
        self.ordinal() >= need.ordinal()
    }
}

/// Does `have` meet the requirement `need`
#[inline]
pub const fn satisfies(have: PermissionLevel, need: PermissionLevel) -> bool {
    have.satisfies(need)
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown permission level '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PermissionLevel::Admin > PermissionLevel::Write);
        assert!(PermissionLevel::Write > PermissionLevel::Read);
        assert!(PermissionLevel::Read > PermissionLevel::None);
        assert_eq!(PermissionLevel::default(), PermissionLevel::None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(PermissionLevel::parse("read"), Some(PermissionLevel::Read));
        assert_eq!(PermissionLevel::parse(" WRITE "), Some(PermissionLevel::Write));
        assert_eq!(PermissionLevel::parse("Admin"), Some(PermissionLevel::Admin));
        assert_eq!(PermissionLevel::parse("owner"), None);
        assert_eq!(PermissionLevel::parse(""), None);
    }

    #[test]
    fn test_parse_or_none() {
        assert_eq!(PermissionLevel::parse_or_none("write"), PermissionLevel::Write);
        assert_eq!(PermissionLevel::parse_or_none("superuser"), PermissionLevel::None);
    }

    #[test]
    fn test_from_str_error() {
        let err = "root".parse::<PermissionLevel>().unwrap_err();
        assert!(err.contains("root"));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PermissionLevel::Write).unwrap();
        assert_eq!(json, "\"write\"");
        let lvl: PermissionLevel = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(lvl, PermissionLevel::Admin);
    }
}
