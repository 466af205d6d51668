//! Canonical Key Mapper.
//!
//! Domain ids are mapped to name-based UUIDs (version 5) under a fixed
//! namespace, so the same id always lands on the same key in both indexes,
//! across calls and across process restarts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::DomainId;

/// Namespace every key is derived under. Changing it re-keys every index.
pub const KEY_NAMESPACE: Uuid = Uuid::NAMESPACE_DNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(Uuid);

impl CanonicalKey {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for CanonicalKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Map a domain id to its canonical key.
pub fn canonical_key(domain_id: DomainId) -> CanonicalKey {
    CanonicalKey(Uuid::new_v5(&KEY_NAMESPACE, domain_id.to_string().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_same_key() {
        for id in [0, 1, 42, -7, i64::MAX] {
            assert_eq!(canonical_key(id), canonical_key(id));
        }
    }

    #[test]
    fn distinct_ids_distinct_keys() {
        assert_ne!(canonical_key(1), canonical_key(2));
        assert_ne!(canonical_key(10), canonical_key(-10));
    }

    #[test]
    fn key_is_name_based_v5() {
        let key = canonical_key(1);
        assert_eq!(key.as_uuid().get_version_num(), 5);
        assert_eq!(key.to_string(), "b04965e6-a9bb-591f-8f8a-1adcb2c8dc39");
        assert_eq!(canonical_key(-42).to_string(), "b41e191b-e8cb-5618-8746-a4a30d568e1f");
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let key = canonical_key(123);
        let parsed: CanonicalKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }
}
