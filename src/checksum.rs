//! Content hashing for cache keys

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// SHA256 checksum, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum from a string
    pub fn of_str(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Compute checksum over several parts, each length-prefixed so that
    /// `["ab", "c"]` and `["a", "bc"]` hash differently.
    pub fn of_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Key for an introspection request. Headers are hashed in sorted order.
    pub fn of_request(url: &str, headers: &BTreeMap<String, String>) -> Self {
        let mut parts = vec![url];
        for (name, value) in headers {
            parts.push(name);
            parts.push(value);
        }
        Self::of_parts(parts)
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let a = Checksum::of_str("type Query { hello: String }");
        let b = Checksum::of_str("type Query { hello: String }");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_parts_are_delimited() {
        assert_ne!(Checksum::of_parts(["ab", "c"]), Checksum::of_parts(["a", "bc"]));
    }

    #[test]
    fn test_request_key_depends_on_headers() {
        let url = "https://api.example.com/graphql";
        let mut headers = BTreeMap::new();
        let bare = Checksum::of_request(url, &headers);
        headers.insert("Authorization".to_string(), "Bearer x".to_string());
        let authed = Checksum::of_request(url, &headers);
        assert_ne!(bare, authed);
        assert_eq!(authed, Checksum::of_request(url, &headers));
    }
}
