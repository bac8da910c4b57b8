//! Resources and their sharing modes

use crate::address::Address;
use crate::reference::THIS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sharing mode of a resource
///
/// The mode is attached to the resource at declaration time, not to an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessMode {
    /// Partitioned per calling account; touches under different accounts never conflict
    AccountSpecific,
    /// Globally shared and read-only; never conflicts with other reads
    ReadOnlyAccountSharing,
    /// Globally shared and mutable; any two touches conflict
    ReadWriteAccountSharing,
}

impl AccessMode {
    /// Check if the resource is shared between accounts
    pub fn is_shared(&self) -> bool {
        !matches!(self, AccessMode::AccountSpecific)
    }

    /// Check if the resource is read-only
    pub fn is_read_only(&self) -> bool {
        matches!(self, AccessMode::ReadOnlyAccountSharing)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessMode::AccountSpecific => "AccountSpecific",
            AccessMode::ReadOnlyAccountSharing => "ReadOnlyAccountSharing",
            AccessMode::ReadWriteAccountSharing => "ReadWriteAccountSharing",
        };
        f.write_str(name)
    }
}

/// An addressable unit of persistent contract state
///
/// Identity is the `(key, mode)` pair. Keys are conventionally
/// `<contract-address-hex>.<field-name>`. Ordering is by key first, so a
/// [`ResourceSet`] iterates lexicographically by key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    /// Globally unique resource key
    pub key: String,
    /// Sharing mode fixed at declaration
    pub mode: AccessMode,
}

impl Resource {
    /// Create a new resource
    pub fn new(key: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            key: key.into(),
            mode,
        }
    }

    /// Create the resource for a field of a deployed contract
    pub fn field(address: &Address, field: &str, mode: AccessMode) -> Self {
        Self::new(format!("{}.{}", address, field), mode)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.mode)
    }
}

/// Canonically ordered set of resources
pub type ResourceSet = BTreeSet<Resource>;

/// A resource declared against `this` inside a contract template
///
/// Becomes a [`Resource`] once the contract address is known.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateResource {
    /// Declared field name
    pub field: String,
    /// Sharing mode of the field
    pub mode: AccessMode,
}

impl TemplateResource {
    /// Create a new template resource
    pub fn new(field: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            field: field.into(),
            mode,
        }
    }

    /// Substitute `this` with a concrete contract address
    pub fn resolve(&self, address: &Address) -> Resource {
        Resource::field(address, &self.field, self.mode)
    }
}

impl fmt::Display for TemplateResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}.{}:{}", THIS, self.field, self.mode)
    }
}
