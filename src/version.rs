//! Version identity for schema snapshots

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::date::DateOnly;

/// Which grammar a version string matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Semver,
    Date,
    Custom,
}

/// Ordered identity of a versioned schema.
///
/// Ordering puts every semver before every date, and every date before every
/// custom label. Within a kind the natural order applies. Two versions are
/// equal when they have the same kind and value, so `v1.2.3` equals `1.2.3`,
/// while each still encodes back to its own original string.
#[derive(Debug, Clone)]
pub enum Version {
    Semver { value: semver::Version, original: String },
    Date { value: DateOnly, original: String },
    Custom { value: String },
}

impl Version {
    /// Decode a version string. Never fails: anything that is neither semver
    /// nor a `YYYY-MM-DD` date becomes a custom label.
    pub fn decode(input: &str) -> Self {
        // Semver wins even when a string could also be read as a date token.
        let semver_str = input.strip_prefix('v').unwrap_or(input);
        if let Ok(value) = semver::Version::parse(semver_str) {
            return Version::Semver {
                value,
                original: input.to_string(),
            };
        }
        if let Some(value) = DateOnly::parse(input) {
            return Version::Date {
                value,
                original: input.to_string(),
            };
        }
        Version::Custom {
            value: input.to_string(),
        }
    }

    /// The original string this version was decoded from
    pub fn encode(&self) -> &str {
        match self {
            Version::Semver { original, .. } | Version::Date { original, .. } => original,
            Version::Custom { value } => value,
        }
    }

    pub fn kind(&self) -> VersionKind {
        match self {
            Version::Semver { .. } => VersionKind::Semver,
            Version::Date { .. } => VersionKind::Date,
            Version::Custom { .. } => VersionKind::Custom,
        }
    }

    /// The calendar date of a date version
    pub fn as_date(&self) -> Option<DateOnly> {
        match self {
            Version::Date { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_semver(&self) -> Option<&semver::Version> {
        match self {
            Version::Semver { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Total order used for sorting versions
pub fn order(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Semver { value: a, .. }, Version::Semver { value: b, .. }) => a.cmp(b),
            (Version::Date { value: a, .. }, Version::Date { value: b, .. }) => a.cmp(b),
            (Version::Custom { value: a }, Version::Custom { value: b }) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Version::Semver { value, .. } => value.hash(state),
            Version::Date { value, .. } => value.hash(state),
            Version::Custom { value } => value.hash(state),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::decode(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.encode())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Version::decode(&s))
    }
}
