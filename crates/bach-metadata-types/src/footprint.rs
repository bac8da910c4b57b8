//! Resource footprints and the conflict rule used by the scheduler

use crate::address::Address;
use crate::metadata::FunctionMetadata;
use crate::resource::{AccessMode, Resource, ResourceSet};
use std::collections::BTreeMap;

/// Resources a pending transaction may touch, together with its sender
///
/// The account partitioning of `AccountSpecific` resources is applied here,
/// from the sender identity supplied by the caller. It is never stored in the
/// resource itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceFootprint {
    /// Transaction sender
    pub sender: Address,
    /// Resources reachable from the entry function
    pub resources: ResourceSet,
}

impl ResourceFootprint {
    /// Create a new footprint
    pub fn new(sender: Address, resources: ResourceSet) -> Self {
        Self { sender, resources }
    }

    /// Footprint of a transaction entering through a function
    pub fn from_metadata(sender: Address, metadata: &FunctionMetadata) -> Self {
        Self::new(sender, metadata.full_resource_set.clone())
    }

    /// Check if two touches of the same key conflict
    fn touches_conflict(&self, a: &Resource, other: &Self, b: &Resource) -> bool {
        match (a.mode, b.mode) {
            (AccessMode::ReadOnlyAccountSharing, AccessMode::ReadOnlyAccountSharing) => false,
            (AccessMode::AccountSpecific, AccessMode::AccountSpecific) => {
                self.sender == other.sender
            }
            _ => true,
        }
    }

    /// Keys on which the two footprints conflict
    pub fn conflicting_keys<'a>(&'a self, other: &Self) -> Vec<&'a str> {
        let mut by_key: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
        for r in &other.resources {
            by_key.entry(r.key.as_str()).or_default().push(r);
        }

        let mut keys: Vec<&'a str> = self
            .resources
            .iter()
            .filter(|a| {
                by_key
                    .get(a.key.as_str())
                    .map(|bs| bs.iter().any(|b| self.touches_conflict(a, other, b)))
                    .unwrap_or(false)
            })
            .map(|a| a.key.as_str())
            .collect();
        keys.dedup();
        keys
    }

    /// Check if the two transactions must be serialized
    pub fn conflicts_with(&self, other: &Self) -> bool {
        !self.conflicting_keys(other).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn footprint(s: u8, resources: &[(&str, AccessMode)]) -> ResourceFootprint {
        ResourceFootprint::new(
            sender(s),
            resources
                .iter()
                .map(|(k, m)| Resource::new(*k, *m))
                .collect(),
        )
    }

    #[test]
    fn test_disjoint_keys_never_conflict() {
        let a = footprint(1, &[("x", AccessMode::ReadWriteAccountSharing)]);
        let b = footprint(1, &[("y", AccessMode::ReadWriteAccountSharing)]);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_read_only_sharing_never_conflicts() {
        let a = footprint(1, &[("x", AccessMode::ReadOnlyAccountSharing)]);
        let b = footprint(1, &[("x", AccessMode::ReadOnlyAccountSharing)]);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_read_write_sharing_always_conflicts() {
        let a = footprint(1, &[("x", AccessMode::ReadWriteAccountSharing)]);
        let b = footprint(2, &[("x", AccessMode::ReadWriteAccountSharing)]);
        assert!(a.conflicts_with(&b));
        assert_eq!(a.conflicting_keys(&b), vec!["x"]);
    }

    #[test]
    fn test_account_specific_conflicts_only_for_same_sender() {
        let a = footprint(1, &[("bal", AccessMode::AccountSpecific)]);
        let b = footprint(2, &[("bal", AccessMode::AccountSpecific)]);
        let c = footprint(1, &[("bal", AccessMode::AccountSpecific)]);
        assert!(!a.conflicts_with(&b));
        assert!(a.conflicts_with(&c));
    }

    #[test]
    fn test_conflict_is_symmetric() {
        let a = footprint(
            1,
            &[
                ("bal", AccessMode::AccountSpecific),
                ("cfg", AccessMode::ReadOnlyAccountSharing),
            ],
        );
        let b = footprint(
            2,
            &[
                ("bal", AccessMode::AccountSpecific),
                ("supply", AccessMode::ReadWriteAccountSharing),
            ],
        );
        assert_eq!(a.conflicts_with(&b), b.conflicts_with(&a));
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn test_from_metadata_uses_full_set() {
        let meta = FunctionMetadata {
            full_resource_set: [Resource::new("x", AccessMode::ReadWriteAccountSharing)]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let fp = ResourceFootprint::from_metadata(sender(9), &meta);
        assert_eq!(fp.resources.len(), 1);
        assert_eq!(fp.sender, sender(9));
    }
}
