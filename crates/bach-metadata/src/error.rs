//! Error types for registration, deployment and recovery

use bach_metadata_store::StorageError;
use bach_metadata_types::{ChainId, FunctionKey};
use thiserror::Error;

/// Template registration errors
///
/// Variants are listed in the order validation checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Contract type registered before
    #[error("contract type {0} is already registered")]
    DuplicateContractType(String),

    /// Two fields share a name
    #[error("field {field} declared twice in {contract_type}")]
    DuplicateFieldName {
        /// Contract type being registered
        contract_type: String,
        /// Offending field
        field: String,
    },

    /// Two references share an alias, or an alias shadows `this` or a field
    #[error("reference alias {alias} declared twice in {contract_type}")]
    DuplicateReferenceAlias {
        /// Contract type being registered
        contract_type: String,
        /// Offending alias
        alias: String,
    },

    /// Function touches a field that is not declared
    #[error("function {function} touches undeclared field {field}")]
    UnknownLocalField {
        /// Declaring function
        function: String,
        /// Offending field
        field: String,
    },

    /// Two functions share a signature
    #[error("function {signature} declared twice in {contract_type}")]
    DuplicateFunctionAttribute {
        /// Contract type being registered
        contract_type: String,
        /// Offending signature
        signature: String,
    },

    /// Declaration has no functions
    #[error("contract type {0} declares no functions")]
    NoFunctions(String),

    /// `${this}` call to a function the type does not declare
    #[error("function {function} calls undeclared local function {target}")]
    UnknownLocalFunctionReference {
        /// Calling function
        function: String,
        /// Missing local signature
        target: String,
    },

    /// Call through an alias the type does not declare
    #[error("function {function} calls through undeclared alias {alias}")]
    UnknownForeignReferenceAlias {
        /// Calling function
        function: String,
        /// Missing alias
        alias: String,
    },

    /// Alias points at a contract type that is not registered yet
    #[error("alias {alias} refers to unregistered contract type {target}")]
    UnregisteredForeignContract {
        /// Alias used by the call
        alias: String,
        /// Referenced contract type
        target: String,
    },

    /// Call to a function the aliased contract type does not declare
    #[error("{contract_type} (via {alias}) has no function {signature}")]
    UnknownForeignFunction {
        /// Alias used by the call
        alias: String,
        /// Referenced contract type
        contract_type: String,
        /// Missing signature
        signature: String,
    },

    /// Calls of the type, together with known foreign types, form a cycle
    #[error("call cycle in {contract_type} through {vertex}")]
    NonDagTemplate {
        /// Contract type being registered
        contract_type: String,
        /// A `type::signature` on the cycle
        vertex: String,
    },
}

/// Result type for template registration
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Closure computation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClosureError {
    /// Callee neither in the batch nor resolved before
    #[error("{caller} calls unresolved function {callee}")]
    UnresolvedCallee {
        /// Calling function
        caller: FunctionKey,
        /// Missing callee
        callee: FunctionKey,
    },

    /// Batch functions call each other in a cycle
    #[error("call cycle through {0}")]
    Cycle(FunctionKey),
}

/// Deployment errors
#[derive(Debug, Error)]
pub enum DeploymentError {
    /// Template uses an alias without an address
    #[error("alias {alias} has no address")]
    UnresolvedAlias {
        /// Alias used by the template
        alias: String,
    },

    /// Call target has no persisted metadata
    #[error("foreign function {function} is not deployed")]
    ForeignFunctionNotDeployed {
        /// Missing function
        function: FunctionKey,
    },

    /// Inserting the contract would close a cycle in the chain's call graph
    #[error("deployment would create a call cycle through {function}")]
    NonDagDeployment {
        /// A function on the cycle
        function: FunctionKey,
    },

    /// The address already holds a deployed contract
    #[error("address of {function} already holds a deployed contract")]
    AlreadyDeployed {
        /// A function already deployed at the address
        function: FunctionKey,
    },

    /// Deploying a contract type that is not registered
    #[error("contract type {0} is not registered")]
    UnknownContractType(String),

    /// Closure could not be computed
    #[error("closure error: {0}")]
    Closure(#[from] ClosureError),

    /// Store error while reading foreign metadata
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for deployment
pub type DeploymentResult<T> = Result<T, DeploymentError>;

/// Errors of the metadata context
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Template registration rejected
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Deployment rejected
    #[error("deployment error: {0}")]
    Deployment(#[from] DeploymentError),

    /// Store error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Persisted call graph is not a DAG
    #[error("corrupted call graph on chain {chain}: cycle through {vertex}")]
    CorruptedCallGraph {
        /// Chain being recovered
        chain: ChainId,
        /// A function on the cycle
        vertex: FunctionKey,
    },

    /// Function has no metadata
    #[error("function {0} not found")]
    FunctionNotFound(FunctionKey),
}

/// Result type for the metadata context
pub type MetadataResult<T> = Result<T, MetadataError>;
