//! Type Graph Analysis
//!
//! Computes strongly connected components over descriptor edges so callers
//! can see which types are mutually recursive.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{TypeGraph, TypeId};

// =============================================================================
// Reference Cycles
// =============================================================================

/// A group of types that reach each other through references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleGroup {
    /// Concrete (non-`Reference`) members, sorted
    pub members: Vec<TypeId>,
    /// Whether the group is a single type referring to itself
    pub is_self_referential: bool,
}

impl TypeGraph {
    /// Dependency graph over concrete types; `Reference` hops are collapsed
    fn dependency_graph(&self) -> (DiGraph<TypeId, ()>, Vec<NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.len(), self.len() * 2);
        let nodes: Vec<NodeIndex> = (0..self.len()).map(|i| graph.add_node(TypeId(i))).collect();

        for (id, descriptor) in self.iter() {
            if self.deref(id) != id {
                continue;
            }
            for child in descriptor.children() {
                let target = self.deref(child);
                graph.add_edge(nodes[id.0], nodes[target.0], ());
            }
        }

        (graph, nodes)
    }

    /// Groups of mutually recursive types
    pub fn reference_cycles(&self) -> Vec<CycleGroup> {
        let (graph, nodes) = self.dependency_graph();

        let mut groups: Vec<CycleGroup> = kosaraju_scc(&graph)
            .into_iter()
            .filter_map(|scc| {
                let mut members: Vec<TypeId> = scc
                    .iter()
                    .filter_map(|idx| graph.node_weight(*idx).copied())
                    .filter(|id| self.deref(*id) == *id)
                    .collect();
                members.sort();

                let is_self_referential = match members.as_slice() {
                    [only] => graph.contains_edge(nodes[only.0], nodes[only.0]),
                    _ => false,
                };

                (members.len() > 1 || is_self_referential).then_some(CycleGroup {
                    members,
                    is_self_referential,
                })
            })
            .collect();

        groups.sort_by(|a, b| a.members.cmp(&b.members));
        groups
    }

    /// Whether `id` takes part in any reference cycle
    pub fn is_recursive(&self, id: TypeId) -> bool {
        let id = self.deref(id);
        self.reference_cycles()
            .iter()
            .any(|group| group.members.contains(&id))
    }
}
