//! Call targets inside contract templates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder name of the contract being described
pub const THIS: &str = "this";

/// Reference parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceParseError {
    /// Missing `${...}` location prefix
    #[error("reference {0:?} has no location placeholder (${{this}} or ${{alias}})")]
    MissingLocation(String),
    /// Placeholder name is not an identifier
    #[error("reference {0:?} has an invalid placeholder name")]
    InvalidLocation(String),
    /// Missing `.signature` after the placeholder
    #[error("reference {0:?} has no function signature")]
    MissingSignature(String),
}

/// A call target of a template function
///
/// Textual form is `${this}.Func()` for local calls and `${alias}.Func()` for
/// calls through a named reference to another contract type. The tagged form
/// is resolved explicitly at deployment time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Reference {
    /// Call to a function of the same contract
    Local(String),
    /// Call to a function of the contract bound to `alias`
    Foreign {
        /// Reference alias declared by the calling contract type
        alias: String,
        /// Signature of the called function
        signature: String,
    },
}

impl Reference {
    /// Create a local reference
    pub fn local(signature: impl Into<String>) -> Self {
        Reference::Local(signature.into())
    }

    /// Create a foreign reference
    pub fn foreign(alias: impl Into<String>, signature: impl Into<String>) -> Self {
        Reference::Foreign {
            alias: alias.into(),
            signature: signature.into(),
        }
    }

    /// Signature of the called function
    pub fn signature(&self) -> &str {
        match self {
            Reference::Local(signature) => signature,
            Reference::Foreign { signature, .. } => signature,
        }
    }

    /// Alias used by a foreign reference
    pub fn alias(&self) -> Option<&str> {
        match self {
            Reference::Local(_) => None,
            Reference::Foreign { alias, .. } => Some(alias),
        }
    }

    /// Check if this is a local reference
    pub fn is_local(&self) -> bool {
        matches!(self, Reference::Local(_))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for Reference {
    type Err = ReferenceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("${")
            .ok_or_else(|| ReferenceParseError::MissingLocation(s.to_string()))?;
        let (location, rest) = rest
            .split_once('}')
            .ok_or_else(|| ReferenceParseError::MissingLocation(s.to_string()))?;
        if !is_identifier(location) {
            return Err(ReferenceParseError::InvalidLocation(s.to_string()));
        }
        let signature = rest
            .strip_prefix('.')
            .filter(|sig| !sig.is_empty())
            .ok_or_else(|| ReferenceParseError::MissingSignature(s.to_string()))?;

        if location == THIS {
            Ok(Reference::local(signature))
        } else {
            Ok(Reference::foreign(location, signature))
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Local(signature) => write!(f, "${{{}}}.{}", THIS, signature),
            Reference::Foreign { alias, signature } => write!(f, "${{{}}}.{}", alias, signature),
        }
    }
}

impl TryFrom<String> for Reference {
    type Error = ReferenceParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reference> for String {
    fn from(reference: Reference) -> Self {
        reference.to_string()
    }
}
