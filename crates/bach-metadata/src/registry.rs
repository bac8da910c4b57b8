//! Contract template registry
//!
//! Holds one validated [`ContractMetadataTemplate`] per contract type.
//! Registration either adds the whole template or changes nothing.

use crate::error::{TemplateError, TemplateResult};
use crate::graph::CallGraph;
use bach_metadata_store::TemplateMap;
use bach_metadata_types::{
    AccessMode, ContractDeclaration, ContractMetadataTemplate, FunctionMetadataTemplate,
    Reference, TemplateResource, THIS,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Vertex of the template-level graph: `(contract type, signature)`
type TemplateVertex = (String, String);

/// Validated templates of one chain, by contract type
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateRegistry {
    templates: TemplateMap,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted templates
    pub fn from_templates(templates: TemplateMap) -> Self {
        Self { templates }
    }

    /// All templates
    pub fn templates(&self) -> &TemplateMap {
        &self.templates
    }

    /// Get the template of a contract type
    pub fn get(&self, contract_type: &str) -> Option<&ContractMetadataTemplate> {
        self.templates.get(contract_type)
    }

    /// Check if a contract type is registered
    pub fn contains(&self, contract_type: &str) -> bool {
        self.templates.contains_key(contract_type)
    }

    /// Number of registered contract types
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if no contract type is registered
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Validate and add the template of a contract type
    pub fn register_template(
        &mut self,
        contract_type: &str,
        declaration: &ContractDeclaration,
    ) -> TemplateResult<&ContractMetadataTemplate> {
        let template = self.validate(contract_type, declaration)?;
        Ok(self.insert_validated(template))
    }

    pub(crate) fn insert_validated(
        &mut self,
        template: ContractMetadataTemplate,
    ) -> &ContractMetadataTemplate {
        self.templates
            .entry(template.contract_type.clone())
            .or_insert(template)
    }

    /// Build the template of a declaration against the current registry
    ///
    /// Checks run in a fixed order and the first failure is reported. The
    /// registry is not modified.
    pub fn validate(
        &self,
        contract_type: &str,
        declaration: &ContractDeclaration,
    ) -> TemplateResult<ContractMetadataTemplate> {
        if self.contains(contract_type) {
            return Err(TemplateError::DuplicateContractType(contract_type.to_string()));
        }

        let fields = check_fields(contract_type, declaration)?;
        let aliases = check_aliases(contract_type, declaration, &fields)?;
        check_local_resources(declaration, &fields)?;
        let signatures = check_signatures(contract_type, declaration)?;
        if signatures.is_empty() {
            return Err(TemplateError::NoFunctions(contract_type.to_string()));
        }
        check_local_calls(declaration, &signatures)?;
        check_foreign_aliases(declaration, &aliases)?;
        self.check_foreign_functions(declaration, &aliases)?;

        let function_templates: BTreeMap<String, FunctionMetadataTemplate> = declaration
            .functions
            .iter()
            .map(|function| {
                let template = FunctionMetadataTemplate {
                    calling_set: function.calls.iter().cloned().collect(),
                    local_resource_set: function
                        .resources
                        .iter()
                        .filter_map(|field| {
                            fields
                                .get(field.as_str())
                                .map(|mode| TemplateResource::new(field.clone(), *mode))
                        })
                        .collect(),
                };
                (function.signature.clone(), template)
            })
            .collect();

        let mut template = ContractMetadataTemplate {
            contract_type: contract_type.to_string(),
            function_templates,
            reference_aliases: aliases,
            process_order: Vec::new(),
        };
        template.process_order = self.process_order(&template)?;
        Ok(template)
    }

    fn check_foreign_functions(
        &self,
        declaration: &ContractDeclaration,
        aliases: &BTreeMap<String, String>,
    ) -> TemplateResult<()> {
        for function in &declaration.functions {
            for call in &function.calls {
                let Reference::Foreign { alias, signature } = call else {
                    continue;
                };
                let target = aliases.get(alias).ok_or_else(|| {
                    TemplateError::UnknownForeignReferenceAlias {
                        function: function.signature.clone(),
                        alias: alias.clone(),
                    }
                })?;
                let foreign = self.templates.get(target).ok_or_else(|| {
                    TemplateError::UnregisteredForeignContract {
                        alias: alias.clone(),
                        target: target.clone(),
                    }
                })?;
                if !foreign.has_function(signature) {
                    return Err(TemplateError::UnknownForeignFunction {
                        alias: alias.clone(),
                        contract_type: target.clone(),
                        signature: signature.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Local signatures ordered callees first
    ///
    /// Builds the graph of the new type plus every registered type reachable
    /// from it and fails if that graph has a cycle.
    fn process_order(&self, template: &ContractMetadataTemplate) -> TemplateResult<Vec<String>> {
        let mut graph: CallGraph<TemplateVertex> = CallGraph::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&ContractMetadataTemplate> = VecDeque::from([template]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.contract_type.as_str()) {
                continue;
            }
            let (vertices, edges) = template_edges(current);
            graph.insert_batch(vertices, edges).map_err(|cycle| {
                TemplateError::NonDagTemplate {
                    contract_type: template.contract_type.clone(),
                    vertex: format!("{}::{}", cycle.vertex.0, cycle.vertex.1),
                }
            })?;
            for target in current.reference_aliases.values() {
                if let Some(foreign) = self.templates.get(target) {
                    queue.push_back(foreign);
                }
            }
        }

        let order = graph.topological_order().map_err(|cycle| TemplateError::NonDagTemplate {
            contract_type: template.contract_type.clone(),
            vertex: format!("{}::{}", cycle.vertex.0, cycle.vertex.1),
        })?;

        Ok(order
            .into_iter()
            .filter(|(ty, _)| *ty == template.contract_type)
            .map(|(_, signature)| signature)
            .collect())
    }
}

/// Vertices and edges contributed by one template
fn template_edges(
    template: &ContractMetadataTemplate,
) -> (Vec<TemplateVertex>, Vec<(TemplateVertex, TemplateVertex)>) {
    let ty = &template.contract_type;
    let mut vertices = Vec::with_capacity(template.len());
    let mut edges = Vec::new();

    for (signature, function) in &template.function_templates {
        let from = (ty.clone(), signature.clone());
        vertices.push(from.clone());
        for call in &function.calling_set {
            let to = match call {
                Reference::Local(callee) => (ty.clone(), callee.clone()),
                Reference::Foreign { alias, signature } => match template.reference_aliases.get(alias) {
                    Some(target) => (target.clone(), signature.clone()),
                    None => continue,
                },
            };
            edges.push((from.clone(), to));
        }
    }
    (vertices, edges)
}

fn check_fields<'a>(
    contract_type: &str,
    declaration: &'a ContractDeclaration,
) -> TemplateResult<BTreeMap<&'a str, AccessMode>> {
    let mut fields = BTreeMap::new();
    for field in &declaration.fields {
        if fields.insert(field.name.as_str(), field.mode).is_some() {
            return Err(TemplateError::DuplicateFieldName {
                contract_type: contract_type.to_string(),
                field: field.name.clone(),
            });
        }
    }
    Ok(fields)
}

fn check_aliases(
    contract_type: &str,
    declaration: &ContractDeclaration,
    fields: &BTreeMap<&str, AccessMode>,
) -> TemplateResult<BTreeMap<String, String>> {
    let mut aliases = BTreeMap::new();
    for reference in &declaration.references {
        let alias = reference.alias.as_str();
        // `this` is the implicit local location
        if alias == THIS
            || fields.contains_key(alias)
            || aliases
                .insert(reference.alias.clone(), reference.contract_type.clone())
                .is_some()
        {
            return Err(TemplateError::DuplicateReferenceAlias {
                contract_type: contract_type.to_string(),
                alias: reference.alias.clone(),
            });
        }
    }
    Ok(aliases)
}

fn check_local_resources(
    declaration: &ContractDeclaration,
    fields: &BTreeMap<&str, AccessMode>,
) -> TemplateResult<()> {
    for function in &declaration.functions {
        if let Some(field) = function
            .resources
            .iter()
            .find(|field| !fields.contains_key(field.as_str()))
        {
            return Err(TemplateError::UnknownLocalField {
                function: function.signature.clone(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

fn check_signatures<'a>(
    contract_type: &str,
    declaration: &'a ContractDeclaration,
) -> TemplateResult<BTreeSet<&'a str>> {
    let mut signatures = BTreeSet::new();
    for function in &declaration.functions {
        if !signatures.insert(function.signature.as_str()) {
            return Err(TemplateError::DuplicateFunctionAttribute {
                contract_type: contract_type.to_string(),
                signature: function.signature.clone(),
            });
        }
    }
    Ok(signatures)
}

fn check_local_calls(
    declaration: &ContractDeclaration,
    signatures: &BTreeSet<&str>,
) -> TemplateResult<()> {
    for function in &declaration.functions {
        for call in &function.calls {
            if let Reference::Local(target) = call {
                if !signatures.contains(target.as_str()) {
                    return Err(TemplateError::UnknownLocalFunctionReference {
                        function: function.signature.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_foreign_aliases(
    declaration: &ContractDeclaration,
    aliases: &BTreeMap<String, String>,
) -> TemplateResult<()> {
    for function in &declaration.functions {
        for alias in function.calls.iter().filter_map(Reference::alias) {
            if !aliases.contains_key(alias) {
                return Err(TemplateError::UnknownForeignReferenceAlias {
                    function: function.signature.clone(),
                    alias: alias.to_string(),
                });
            }
        }
    }
    Ok(())
}
