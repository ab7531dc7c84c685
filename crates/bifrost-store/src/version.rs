//! Semantic version attached to package metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Semantic version with string components.
///
/// Only `major` takes part in table naming; minor and patch are kept for
/// display and comparison of registrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl Version {
    /// Parse a dotted version string.
    ///
    /// `"1"` becomes `1.0.0`, `"1.2"` becomes `1.2.0`, and components past
    /// the third are ignored. Blank input or an empty component is rejected.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StoreError::Validation(
                "cannot create version from blank string".to_string(),
            ));
        }

        let parts: Vec<&str> = s.split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(StoreError::Validation(format!(
                "version {s:?} has an empty component"
            )));
        }

        let component = |i: usize| parts.get(i).map_or("0", |p| p.trim()).to_string();
        Ok(Self {
            major: component(0),
            minor: component(1),
            patch: component(2),
        })
    }
}

impl FromStr for Version {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn full_version() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!((v.major.as_str(), v.minor.as_str(), v.patch.as_str()), ("1", "2", "3"));
        assert_eq!(v.to_string(), "1.2.3");
    }

    #[test]
    fn missing_components_default_to_zero() {
        assert_eq!(Version::parse("4").unwrap().to_string(), "4.0.0");
        assert_eq!(Version::parse("4.1").unwrap().to_string(), "4.1.0");
    }

    #[test]
    fn extra_components_are_ignored() {
        assert_eq!(Version::parse("1.2.3.4").unwrap().to_string(), "1.2.3");
    }

    #[test]
    fn blank_is_rejected() {
        assert!(matches!(Version::parse(""), Err(StoreError::Validation(_))));
        assert!(matches!(Version::parse("   "), Err(StoreError::Validation(_))));
    }

    #[test]
    fn empty_component_is_rejected() {
        assert!(matches!(Version::parse("1..2"), Err(StoreError::Validation(_))));
        assert!(matches!(Version::parse("1."), Err(StoreError::Validation(_))));
    }

    #[test]
    fn from_str_matches_parse() {
        let v: Version = "2.0".parse().unwrap();
        assert_eq!(v, Version::parse("2.0.0").unwrap());
    }
}
