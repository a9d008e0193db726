//! Ranked access levels for tree grants.
//!
//! Levels form a total order by rank: `Nothing < Viewer < Editor < Owner`.
//! Comparisons go through [`AccessLevel::rank`], never through the string form.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

const VALID_LEVELS: &str = "nothing, viewer, editor, owner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AccessLevel {
    #[default]
    Nothing,
    Viewer,
    Editor,
    Owner,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 4] = [
        AccessLevel::Nothing,
        AccessLevel::Viewer,
        AccessLevel::Editor,
        AccessLevel::Owner,
    ];

    /// Parse a stored or user-supplied level.
    ///
    /// `None`, empty and whitespace-only input resolve to [`AccessLevel::Nothing`].
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let Some(raw) = raw else {
            return Ok(AccessLevel::Nothing);
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "nothing" => Ok(AccessLevel::Nothing),
            "viewer" => Ok(AccessLevel::Viewer),
            "editor" => Ok(AccessLevel::Editor),
            "owner" => Ok(AccessLevel::Owner),
            _ => Err(ValidationError::InvalidAccessLevel {
                value: raw.to_string(),
                expected: VALID_LEVELS,
            }),
        }
    }

    pub const fn rank(self) -> u8 {
        match self {
            AccessLevel::Nothing => 0,
            AccessLevel::Viewer => 1,
            AccessLevel::Editor => 2,
            AccessLevel::Owner => 3,
        }
    }

    pub const fn at_least(self, other: AccessLevel) -> bool {
        self.rank() >= other.rank()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Nothing => "nothing",
            AccessLevel::Viewer => "viewer",
            AccessLevel::Editor => "editor",
            AccessLevel::Owner => "owner",
        }
    }
}

impl PartialOrd for AccessLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccessLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for AccessLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

impl TryFrom<String> for AccessLevel {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(Some(&value))
    }
}

impl From<AccessLevel> for String {
    fn from(level: AccessLevel) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_matches_rank_for_every_pair() {
        for a in AccessLevel::ALL {
            for b in AccessLevel::ALL {
                assert_eq!(a.at_least(b), a.rank() >= b.rank(), "{} vs {}", a, b);
            }
        }
        assert!(AccessLevel::Nothing.at_least(AccessLevel::Nothing));
        assert!(!AccessLevel::Viewer.at_least(AccessLevel::Editor));
    }

    #[test]
    fn ranks_strictly_increase() {
        let ranks: Vec<u8> = AccessLevel::ALL.iter().map(|l| l.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(AccessLevel::Nothing < AccessLevel::Viewer);
        assert!(AccessLevel::Editor < AccessLevel::Owner);
        assert_eq!(AccessLevel::ALL.iter().max(), Some(&AccessLevel::Owner));
    }

    #[test]
    fn parse_is_case_and_whitespace_insensitive() {
        assert_eq!(AccessLevel::parse(None), Ok(AccessLevel::Nothing));
        assert_eq!(AccessLevel::parse(Some("")), Ok(AccessLevel::Nothing));
        assert_eq!(AccessLevel::parse(Some("   ")), Ok(AccessLevel::Nothing));
        assert_eq!(AccessLevel::parse(Some("Owner")), Ok(AccessLevel::Owner));
        assert_eq!(AccessLevel::parse(Some("  EDITOR\n")), Ok(AccessLevel::Editor));
        assert_eq!("viewer".parse::<AccessLevel>(), Ok(AccessLevel::Viewer));
    }

    #[test]
    fn parse_rejects_unknown_levels_and_names_the_valid_set() {
        let err = AccessLevel::parse(Some("sultan")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAccessLevel { .. }));
        let message = err.to_string();
        assert!(message.contains("sultan"));
        assert!(message.contains("nothing, viewer, editor, owner"));
    }

    #[test]
    fn serde_uses_the_lowercase_storage_form() {
        let json = serde_json::to_value(AccessLevel::Editor).unwrap();
        assert_eq!(json, serde_json::json!("editor"));

        let parsed: AccessLevel = serde_json::from_value(serde_json::json!("Viewer")).unwrap();
        assert_eq!(parsed, AccessLevel::Viewer);

        assert!(serde_json::from_value::<AccessLevel>(serde_json::json!("admin")).is_err());
    }
}
