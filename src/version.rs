//! Contract versioning utilities
//!
//! The comparison verdict decides the smallest semantic-version bump a
//! release may take: breaking changes need MAJOR, additive changes need
//! MINOR, anything else is a PATCH.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::Classification;
use crate::error::{CompatError, Result};

/// Size of a semantic-version increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BumpLevel {
    Patch,
    Minor,
    Major,
}

impl BumpLevel {
    /// Smallest bump allowed for a set of changes
    pub fn required_for(classification: &Classification) -> Self {
        if classification.has_breaking {
            BumpLevel::Major
        } else if !classification.non_breaking.is_empty() {
            BumpLevel::Minor
        } else {
            BumpLevel::Patch
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BumpLevel::Patch => "PATCH",
            BumpLevel::Minor => "MINOR",
            BumpLevel::Major => "MAJOR",
        };
        f.write_str(label)
    }
}

/// Version of a released contract set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractVersion {
    pub version: Version,
}

impl ContractVersion {
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Parse "1.2.3" or "v1.2.3"
    pub fn parse(version_str: &str) -> std::result::Result<Self, semver::Error> {
        let version_str = version_str.strip_prefix('v').unwrap_or(version_str);
        Ok(Self::new(Version::parse(version_str)?))
    }

    /// Get the version string (e.g., "1.2.3")
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    /// Get the tag string (e.g., "v1.2.3")
    pub fn tag_string(&self) -> String {
        format!("v{}", self.version)
    }

    pub fn bump(&self, level: BumpLevel) -> Self {
        let v = &self.version;
        let version = match level {
            BumpLevel::Major => Version::new(v.major + 1, 0, 0),
            BumpLevel::Minor => Version::new(v.major, v.minor + 1, 0),
            BumpLevel::Patch => Version::new(v.major, v.minor, v.patch + 1),
        };
        Self::new(version)
    }

    /// Which bump leads from `previous` to this version; `None` unless it moves forward
    pub fn level_from(&self, previous: &ContractVersion) -> Option<BumpLevel> {
        if self.version <= previous.version {
            return None;
        }
        let (new, old) = (&self.version, &previous.version);
        if new.major > old.major {
            Some(BumpLevel::Major)
        } else if new.major == old.major && new.minor > old.minor {
            Some(BumpLevel::Minor)
        } else {
            Some(BumpLevel::Patch)
        }
    }
}

impl fmt::Display for ContractVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)
    }
}

/// Validate a proposed release version against the detected changes
pub fn check_bump(
    current: &ContractVersion,
    proposed: &ContractVersion,
    classification: &Classification,
) -> Result<BumpLevel> {
    let required = BumpLevel::required_for(classification);
    let proposed_level = proposed.level_from(current).ok_or_else(|| {
        CompatError::InvalidVersion(format!("{} is not newer than {}", proposed, current))
    })?;

    if proposed_level < required {
        return Err(CompatError::InsufficientBump {
            required,
            proposed: proposed_level,
        });
    }
    Ok(proposed_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{ChangeKind, ChangeRecord};
    use crate::classify::classify;

    fn classification_of(kinds: &[ChangeKind]) -> Classification {
        let changes: Vec<_> = kinds.iter().map(|k| ChangeRecord::new(*k, "a.json")).collect();
        classify(&changes)
    }

    #[test]
    fn test_version_parsing() {
        let v = ContractVersion::parse("v1.2.3").unwrap();
        assert_eq!(v.version_string(), "1.2.3");
        assert_eq!(v.tag_string(), "v1.2.3");
        assert!(ContractVersion::parse("1.2").is_err());
    }

    #[test]
    fn test_version_bumps() {
        let v = ContractVersion::parse("1.2.3").unwrap();
        assert_eq!(v.bump(BumpLevel::Major).version_string(), "2.0.0");
        assert_eq!(v.bump(BumpLevel::Minor).version_string(), "1.3.0");
        assert_eq!(v.bump(BumpLevel::Patch).version_string(), "1.2.4");
    }

    #[test]
    fn test_level_from() {
        let base = ContractVersion::parse("1.2.3").unwrap();
        let level = |s: &str| ContractVersion::parse(s).unwrap().level_from(&base);
        assert_eq!(level("2.0.0"), Some(BumpLevel::Major));
        assert_eq!(level("1.3.0"), Some(BumpLevel::Minor));
        assert_eq!(level("1.2.4"), Some(BumpLevel::Patch));
        assert_eq!(level("1.2.3"), None);
        assert_eq!(level("1.0.0"), None);
    }

    #[test]
    fn test_required_bump() {
        assert_eq!(
            BumpLevel::required_for(&classification_of(&[ChangeKind::FieldRemoved, ChangeKind::SchemaAdded])),
            BumpLevel::Major
        );
        assert_eq!(
            BumpLevel::required_for(&classification_of(&[ChangeKind::EnumValueAdded])),
            BumpLevel::Minor
        );
        assert_eq!(
            BumpLevel::required_for(&classification_of(&[ChangeKind::DescriptionChanged])),
            BumpLevel::Patch
        );
        assert_eq!(BumpLevel::required_for(&classification_of(&[])), BumpLevel::Patch);
    }

    #[test]
    fn test_check_bump() {
        let current = ContractVersion::parse("1.4.0").unwrap();
        let breaking = classification_of(&[ChangeKind::FieldMadeRequired]);

        let minor = ContractVersion::parse("1.5.0").unwrap();
        match check_bump(&current, &minor, &breaking) {
            Err(CompatError::InsufficientBump { required, proposed }) => {
                assert_eq!(required, BumpLevel::Major);
                assert_eq!(proposed, BumpLevel::Minor);
            }
            other => panic!("expected InsufficientBump, got {:?}", other),
        }

        let major = ContractVersion::parse("2.0.0").unwrap();
        assert_eq!(check_bump(&current, &major, &breaking).unwrap(), BumpLevel::Major);

        // a larger bump than needed is allowed
        let additive = classification_of(&[ChangeKind::SchemaAdded]);
        assert_eq!(check_bump(&current, &major, &additive).unwrap(), BumpLevel::Major);

        assert!(matches!(
            check_bump(&current, &current, &additive),
            Err(CompatError::InvalidVersion(_))
        ));
    }
}
