//! Data Dictionary version identifiers
//!
//! Versions are `major.minor.patch`; missing trailing components count as 0,
//! so `3.39` and `3.39.0` name the same dictionary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::SchemaError;

/// Totally ordered Data Dictionary version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DdVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl DdVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parses a version string
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(SchemaError::invalid_version(s));
        }

        let mut parts = [0u32; 3];
        for (i, component) in trimmed.split('.').enumerate() {
            if i >= parts.len() {
                return Err(SchemaError::invalid_version(s));
            }
            parts[i] = component
                .parse()
                .map_err(|_| SchemaError::invalid_version(s))?;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl FromStr for DdVersion {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DdVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for DdVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DdVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DdVersion::parse(&s).map_err(|e| serde::de::Error::custom(e.message().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_partial() {
        assert_eq!(DdVersion::parse("3.39.0").unwrap(), DdVersion::new(3, 39, 0));
        assert_eq!(DdVersion::parse("4").unwrap(), DdVersion::new(4, 0, 0));
        assert_eq!(DdVersion::parse("3.39").unwrap(), DdVersion::parse("3.39.0").unwrap());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let a = DdVersion::parse("3.9.0").unwrap();
        let b = DdVersion::parse("3.10.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_invalid_versions() {
        assert!(DdVersion::parse("").is_err());
        assert!(DdVersion::parse("3.x.0").is_err());
        assert!(DdVersion::parse("1.2.3.4").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DdVersion::new(3, 39, 0).to_string(), "3.39.0");
    }
}
