//! Contract declarations and validated templates
//!
//! A [`ContractDeclaration`] is the raw, unvalidated output of the template
//! extractor for one contract type. Registration turns it into a
//! [`ContractMetadataTemplate`], which is address-free and immutable.

use crate::reference::Reference;
use crate::resource::{AccessMode, TemplateResource};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A state field declared by a contract type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    /// Field (resource) name
    pub name: String,
    /// Sharing mode of the field
    pub mode: AccessMode,
}

/// A named reference to another contract type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDeclaration {
    /// Alias used as `${alias}` in calling sets
    pub alias: String,
    /// Referenced contract type
    pub contract_type: String,
}

/// A function declared by a contract type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Function signature, unique within the contract type
    pub signature: String,
    /// Call targets
    #[serde(default)]
    pub calls: Vec<Reference>,
    /// Names of fields this function touches directly
    #[serde(default)]
    pub resources: Vec<String>,
}

impl FunctionDeclaration {
    /// Create a function declaration with no calls and no resources
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            calls: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Add a call target
    pub fn call(mut self, reference: Reference) -> Self {
        self.calls.push(reference);
        self
    }

    /// Add a touched field
    pub fn resource(mut self, field: impl Into<String>) -> Self {
        self.resources.push(field.into());
        self
    }
}

/// Raw description of one contract type as produced by the template extractor
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDeclaration {
    /// Declared state fields
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
    /// Declared references to other contract types
    #[serde(default)]
    pub references: Vec<ReferenceDeclaration>,
    /// Declared functions
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,
}

impl ContractDeclaration {
    /// Create an empty declaration
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state field
    pub fn field(mut self, name: impl Into<String>, mode: AccessMode) -> Self {
        self.fields.push(FieldDeclaration {
            name: name.into(),
            mode,
        });
        self
    }

    /// Declare a reference alias to another contract type
    pub fn reference(mut self, alias: impl Into<String>, contract_type: impl Into<String>) -> Self {
        self.references.push(ReferenceDeclaration {
            alias: alias.into(),
            contract_type: contract_type.into(),
        });
        self
    }

    /// Declare a function
    pub fn function(mut self, function: FunctionDeclaration) -> Self {
        self.functions.push(function);
        self
    }
}

/// Validated, address-free metadata of one template function
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadataTemplate {
    /// Call targets, local or through an alias
    pub calling_set: BTreeSet<Reference>,
    /// Resources declared against `this`
    pub local_resource_set: BTreeSet<TemplateResource>,
}

/// Validated template of one contract type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadataTemplate {
    /// Contract type name
    pub contract_type: String,
    /// Function signature -> function template
    pub function_templates: BTreeMap<String, FunctionMetadataTemplate>,
    /// Alias -> referenced contract type
    pub reference_aliases: BTreeMap<String, String>,
    /// Local signatures ordered callees first
    pub process_order: Vec<String>,
}

impl ContractMetadataTemplate {
    /// Get the template of a function
    pub fn function(&self, signature: &str) -> Option<&FunctionMetadataTemplate> {
        self.function_templates.get(signature)
    }

    /// Check if the contract type declares a function
    pub fn has_function(&self, signature: &str) -> bool {
        self.function_templates.contains_key(signature)
    }

    /// Aliases actually used by any calling set
    pub fn used_aliases(&self) -> BTreeSet<&str> {
        self.function_templates
            .values()
            .flat_map(|f| f.calling_set.iter())
            .filter_map(Reference::alias)
            .collect()
    }

    /// Number of declared functions
    pub fn len(&self) -> usize {
        self.function_templates.len()
    }

    /// Check if the template declares no functions
    pub fn is_empty(&self) -> bool {
        self.function_templates.is_empty()
    }
}
