//! The graph model (C2): an immutable, validated view over a
//! [`ProductionGraph`], backed by a [`petgraph::graph::DiGraph`] so edges are
//! stored as index pairs rather than reference cycles.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::catalog::BuildingKind;
use crate::error::SolverError;

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MachineNode {
    pub id: String,
    pub label: String,
    pub kind: BuildingKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MaterialEdge {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub item: String,
    pub belts: NonZeroUsize,
}

#[derive(Clone, Debug, Default)]
#[derive(Serialize, Deserialize)]
pub struct ProductionGraph {
    pub id: String,
    pub target_product: String,
    pub target_belts: usize,
    pub nodes: Vec<MachineNode>,
    pub edges: Vec<MaterialEdge>,
}

/// The validated, index-backed graph the rest of the engine operates on.
///
/// Construction enforces spec.md §4.2: node/edge id uniqueness and
/// referential integrity of edge endpoints. The graph need not be acyclic
/// (spec.md §9) — cycles are permitted and are not checked for here.
#[derive(Clone, Debug)]
pub struct ValidatedGraph {
    graph: DiGraph<MachineNode, MaterialEdge, usize>,
    node_by_id: HashMap<String, NodeIndex<usize>>,
    edge_by_id: HashMap<String, EdgeIndex<usize>>,
}

impl ValidatedGraph {
    pub fn new(source: &ProductionGraph) -> Result<Self, SolverError> {
        if source.nodes.iter().any(|n| n.kind == BuildingKind::Conveyor) {
            return Err(SolverError::invalid_input(
                "a machine node may not use the Conveyor building kind",
            ));
        }

        let mut graph = DiGraph::<MachineNode, MaterialEdge, usize>::default();
        let mut node_by_id = HashMap::with_capacity(source.nodes.len());

        for node in &source.nodes {
            if node_by_id.contains_key(&node.id) {
                return Err(SolverError::invalid_input(format!(
                    "duplicate machine node id {:?}",
                    node.id
                )));
            }
            let ix = graph.add_node(node.clone());
            node_by_id.insert(node.id.clone(), ix);
        }

        let mut edge_by_id = HashMap::with_capacity(source.edges.len());
        for edge in &source.edges {
            if edge_by_id.contains_key(&edge.id) {
                return Err(SolverError::invalid_input(format!(
                    "duplicate material edge id {:?}",
                    edge.id
                )));
            }
            if edge.from_id == edge.to_id {
                return Err(SolverError::invalid_input(format!(
                    "material edge {:?} has the same source and destination {:?}",
                    edge.id, edge.from_id
                )));
            }
            let &from_ix = node_by_id.get(&edge.from_id).ok_or_else(|| {
                SolverError::invalid_input(format!(
                    "material edge {:?} references unknown node {:?}",
                    edge.id, edge.from_id
                ))
            })?;
            let &to_ix = node_by_id.get(&edge.to_id).ok_or_else(|| {
                SolverError::invalid_input(format!(
                    "material edge {:?} references unknown node {:?}",
                    edge.id, edge.to_id
                ))
            })?;

            let edge_ix = graph.add_edge(from_ix, to_ix, edge.clone());
            edge_by_id.insert(edge.id.clone(), edge_ix);
        }

        if petgraph::algo::is_cyclic_directed(&graph) {
            log::debug!(target: "graph", "production graph contains at least one cycle");
        }

        Ok(ValidatedGraph { graph, node_by_id, edge_by_id })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex<usize>, &MachineNode)> {
        self.graph.node_indices().map(|ix| (ix, &self.graph[ix]))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex<usize>, &MaterialEdge)> {
        self.graph.edge_indices().map(|ix| (ix, &self.graph[ix]))
    }

    pub fn edge_endpoints(&self, edge: EdgeIndex<usize>) -> Option<(NodeIndex<usize>, NodeIndex<usize>)> {
        self.graph.edge_endpoints(edge)
    }

    pub fn node(&self, ix: NodeIndex<usize>) -> &MachineNode {
        &self.graph[ix]
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex<usize>> {
        self.node_by_id.get(id).copied()
    }

    pub fn edge_index(&self, id: &str) -> Option<EdgeIndex<usize>> {
        self.edge_by_id.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: BuildingKind) -> MachineNode {
        MachineNode { id: id.to_string(), label: id.to_string(), kind }
    }

    fn edge(id: &str, from: &str, to: &str) -> MaterialEdge {
        MaterialEdge {
            id: id.to_string(),
            from_id: from.to_string(),
            to_id: to.to_string(),
            item: "x".to_string(),
            belts: new_zealand::nz!(1),
        }
    }

    #[test]
    fn accepts_a_valid_graph_with_parallel_edges() {
        let source = ProductionGraph {
            nodes: vec![node("a", BuildingKind::Crusher), node("b", BuildingKind::Crusher)],
            edges: vec![edge("e1", "a", "b"), edge("e2", "a", "b")],
            ..Default::default()
        };
        let g = ValidatedGraph::new(&source).unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn rejects_dangling_edge_endpoint() {
        let source = ProductionGraph {
            nodes: vec![node("a", BuildingKind::Crusher)],
            edges: vec![edge("e1", "a", "missing")],
            ..Default::default()
        };
        assert!(ValidatedGraph::new(&source).is_err());
    }

    #[test]
    fn rejects_duplicate_node_id() {
        let source = ProductionGraph {
            nodes: vec![node("a", BuildingKind::Crusher), node("a", BuildingKind::Refinery)],
            edges: vec![],
            ..Default::default()
        };
        assert!(ValidatedGraph::new(&source).is_err());
    }

    #[test]
    fn rejects_duplicate_edge_id() {
        let source = ProductionGraph {
            nodes: vec![
                node("a", BuildingKind::Crusher),
                node("b", BuildingKind::Crusher),
                node("c", BuildingKind::Crusher),
            ],
            edges: vec![edge("e1", "a", "b"), edge("e1", "b", "c")],
            ..Default::default()
        };
        assert!(ValidatedGraph::new(&source).is_err());
    }

    #[test]
    fn rejects_self_loop_edge() {
        let source = ProductionGraph {
            nodes: vec![node("a", BuildingKind::Crusher)],
            edges: vec![edge("e1", "a", "a")],
            ..Default::default()
        };
        assert!(ValidatedGraph::new(&source).is_err());
    }

    #[test]
    fn rejects_conveyor_kind_machine_node() {
        let source = ProductionGraph {
            nodes: vec![node("a", BuildingKind::Conveyor)],
            edges: vec![],
            ..Default::default()
        };
        assert!(ValidatedGraph::new(&source).is_err());
    }

    #[test]
    fn empty_graph_is_valid() {
        let g = ValidatedGraph::new(&ProductionGraph::default()).unwrap();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
    }
}
