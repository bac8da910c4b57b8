//! Call graph with acyclicity guard
//!
//! A directed graph from caller to callee. Vertices and edges are only ever
//! added, and a batch is accepted only if the grown graph is still a DAG. The
//! same structure backs the per-chain function graph and the template-level
//! check done at registration.

use bach_metadata_types::{FunctionKey, SerializedCallGraph};
use std::collections::{BTreeMap, BTreeSet};

/// Cycle found while checking or ordering a graph
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleError<V> {
    /// A vertex on the cycle
    pub vertex: V,
}

/// Directed call graph over ordered vertices
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallGraph<V: Ord + Clone> {
    /// Caller -> callees; every vertex has an entry
    callees: BTreeMap<V, BTreeSet<V>>,
}

impl<V: Ord + Clone> Default for CallGraph<V> {
    fn default() -> Self {
        Self {
            callees: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone> CallGraph<V> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph without checking acyclicity
    ///
    /// Edge endpoints missing from `vertices` are added as vertices.
    pub fn from_parts(
        vertices: impl IntoIterator<Item = V>,
        edges: impl IntoIterator<Item = (V, V)>,
    ) -> Self {
        let mut graph = Self::new();
        graph.extend(vertices, edges);
        graph
    }

    fn extend(&mut self, vertices: impl IntoIterator<Item = V>, edges: impl IntoIterator<Item = (V, V)>) {
        for v in vertices {
            self.callees.entry(v).or_default();
        }
        for (from, to) in edges {
            self.callees.entry(to.clone()).or_default();
            self.callees.entry(from).or_default().insert(to);
        }
    }

    /// Graph grown by a batch, if it stays acyclic
    ///
    /// `self` is left untouched either way.
    pub fn with_batch(
        &self,
        vertices: impl IntoIterator<Item = V>,
        edges: impl IntoIterator<Item = (V, V)>,
    ) -> Result<Self, CycleError<V>> {
        let mut overlay = self.clone();
        overlay.extend(vertices, edges);
        overlay.check_acyclic()?;
        Ok(overlay)
    }

    /// Add a batch of vertices and edges
    ///
    /// On a cycle the graph is unchanged.
    pub fn insert_batch(
        &mut self,
        vertices: impl IntoIterator<Item = V>,
        edges: impl IntoIterator<Item = (V, V)>,
    ) -> Result<(), CycleError<V>> {
        *self = self.with_batch(vertices, edges)?;
        Ok(())
    }

    /// Check the graph has no cycle
    pub fn check_acyclic(&self) -> Result<(), CycleError<V>> {
        self.topological_order().map(|_| ())
    }

    /// All vertices, callees before callers
    ///
    /// Kahn's algorithm over out-degrees. Ties are broken by vertex order, so
    /// the result is deterministic.
    pub fn topological_order(&self) -> Result<Vec<V>, CycleError<V>> {
        let mut callers: BTreeMap<&V, Vec<&V>> = BTreeMap::new();
        let mut out_degree: BTreeMap<&V, usize> = BTreeMap::new();
        for (from, tos) in &self.callees {
            out_degree.insert(from, tos.len());
            for to in tos {
                callers.entry(to).or_default().push(from);
            }
        }

        let mut ready: BTreeSet<&V> = out_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&v, _)| v)
            .collect();

        let mut order = Vec::with_capacity(self.callees.len());
        while let Some(v) = ready.pop_first() {
            order.push(v.clone());
            for caller in callers.get(v).into_iter().flatten() {
                if let Some(deg) = out_degree.get_mut(caller) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(*caller);
                    }
                }
            }
        }

        let remaining: BTreeSet<&V> = out_degree
            .iter()
            .filter(|(_, &deg)| deg > 0)
            .map(|(&v, _)| v)
            .collect();
        if let Some(&start) = remaining.iter().next() {
            return Err(CycleError {
                vertex: self.cycle_member(start, &remaining),
            });
        }

        Ok(order)
    }

    /// Walk unprocessed edges long enough to end up on a cycle
    fn cycle_member(&self, start: &V, remaining: &BTreeSet<&V>) -> V {
        let mut current = start;
        for _ in 0..remaining.len() {
            let next = self
                .callees
                .get(current)
                .and_then(|tos| tos.iter().find(|to| remaining.contains(to)));
            match next {
                Some(v) => current = v,
                None => break,
            }
        }
        current.clone()
    }

    /// Check if a vertex exists
    pub fn contains(&self, vertex: &V) -> bool {
        self.callees.contains_key(vertex)
    }

    /// Direct callees of a vertex
    pub fn callees_of(&self, vertex: &V) -> impl Iterator<Item = &V> {
        self.callees.get(vertex).into_iter().flatten()
    }

    /// Direct callers of a vertex
    pub fn callers_of(&self, vertex: &V) -> Vec<&V> {
        self.callees
            .iter()
            .filter(|(_, tos)| tos.contains(vertex))
            .map(|(from, _)| from)
            .collect()
    }

    /// All vertices in order
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.callees.keys()
    }

    /// All `(caller, callee)` edges in order
    pub fn edges(&self) -> impl Iterator<Item = (&V, &V)> {
        self.callees
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from, to)))
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.callees.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.callees.values().map(BTreeSet::len).sum()
    }
}

impl CallGraph<FunctionKey> {
    /// Canonical persisted form
    pub fn to_serialized(&self) -> SerializedCallGraph {
        SerializedCallGraph::new(
            self.vertices().cloned(),
            self.edges().map(|(a, b)| (a.clone(), b.clone())),
        )
    }

    /// Rebuild from the persisted form without checking acyclicity
    pub fn from_serialized(serialized: &SerializedCallGraph) -> Self {
        Self::from_parts(serialized.vertices.iter().cloned(), serialized.edges.iter().cloned())
    }
}
