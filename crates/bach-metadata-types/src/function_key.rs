//! Absolute keys of deployed contract functions

use crate::address::{Address, AddressError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Function key parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FunctionKeyError {
    /// Missing `.` between address and signature
    #[error("function key {0:?} has no address separator")]
    MissingSeparator(String),
    /// Empty function signature
    #[error("function key {0:?} has an empty signature")]
    EmptySignature(String),
    /// Invalid address part
    #[error("invalid address in function key: {0}")]
    Address(#[from] AddressError),
}

/// Globally unique key of a function of a deployed contract
///
/// Textual form is `<contract-address-hex>.<function-signature>`. Overloads
/// are distinct keys (`Func0` and `Func0(int)` never collide).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionKey {
    address: Address,
    signature: String,
}

impl FunctionKey {
    /// Create a new function key
    pub fn new(address: Address, signature: impl Into<String>) -> Self {
        Self {
            address,
            signature: signature.into(),
        }
    }

    /// Contract address part
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Function signature part
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.signature)
    }
}

impl fmt::Debug for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionKey({})", self)
    }
}

impl FromStr for FunctionKey {
    type Err = FunctionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, signature) = s
            .split_once('.')
            .ok_or_else(|| FunctionKeyError::MissingSeparator(s.to_string()))?;
        if signature.is_empty() {
            return Err(FunctionKeyError::EmptySignature(s.to_string()));
        }
        Ok(Self::new(Address::from_hex(address)?, signature))
    }
}

impl TryFrom<String> for FunctionKey {
    type Error = FunctionKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FunctionKey> for String {
    fn from(key: FunctionKey) -> Self {
        key.to_string()
    }
}
