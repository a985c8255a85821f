//! Flat task graph representation.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::vertex::{EdgeData, Vertex};
use crate::error::{DagError, DagResult};

/// A directed graph of task vertices keyed by reference name.
///
/// Internally uses petgraph's `DiGraph`. Vertices are iterated in insertion
/// order, which follows a depth-first walk of the task tree.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// The underlying directed graph.
    graph: DiGraph<Vertex, EdgeData>,
    /// Mapping from reference name to petgraph's NodeIndex.
    node_indices: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of vertices in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Inserts a vertex, replacing the data of an existing vertex with the
    /// same reference. Edges of a replaced vertex are kept.
    pub fn set_node(&mut self, vertex: Vertex) {
        match self.node_indices.get(vertex.reference()) {
            Some(&index) => self.graph[index] = vertex,
            None => {
                let reference = vertex.reference().to_owned();
                let index = self.graph.add_node(vertex);
                self.node_indices.insert(reference, index);
            }
        }
    }

    /// Removes a vertex and all its connected edges.
    pub fn remove_node(&mut self, reference: &str) -> Option<Vertex> {
        let index = self.node_indices.remove(reference)?;
        let removed = self.graph.remove_node(index)?;

        // petgraph moves the last vertex into the freed slot.
        if let Some(moved) = self.graph.node_weight(index) {
            self.node_indices.insert(moved.reference().to_owned(), index);
        }
        Some(removed)
    }

    /// Inserts an edge, replacing the data of an existing edge between the
    /// same vertices.
    pub fn set_edge(&mut self, from: &str, to: &str, data: EdgeData) -> DagResult<()> {
        let from_index = self.index(from)?;
        let to_index = self.index(to)?;
        self.graph.update_edge(from_index, to_index, data);
        Ok(())
    }

    /// Returns a vertex by reference name.
    pub fn node(&self, reference: &str) -> Option<&Vertex> {
        let index = self.node_indices.get(reference)?;
        self.graph.node_weight(*index)
    }

    /// Returns whether a vertex exists.
    pub fn contains(&self, reference: &str) -> bool {
        self.node_indices.contains_key(reference)
    }

    /// Returns an iterator over all vertices in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Vertex> {
        self.graph.node_weights()
    }

    /// Returns an iterator over all edges as `(from, to, data)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeData)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].reference(),
                self.graph[edge.target()].reference(),
                edge.weight(),
            )
        })
    }

    /// Returns the edge between two vertices.
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeData> {
        let from_index = self.node_indices.get(from)?;
        let to_index = self.node_indices.get(to)?;
        let edge = self.graph.find_edge(*from_index, *to_index)?;
        self.graph.edge_weight(edge)
    }

    /// Returns the references of a vertex's successors in insertion order.
    pub fn successors(&self, reference: &str) -> Vec<&str> {
        self.neighbors(reference, Direction::Outgoing)
    }

    /// Returns the references of a vertex's predecessors in insertion order.
    pub fn predecessors(&self, reference: &str) -> Vec<&str> {
        self.neighbors(reference, Direction::Incoming)
    }

    /// Returns the number of edges entering a vertex.
    pub fn in_degree(&self, reference: &str) -> usize {
        self.node_indices.get(reference).map_or(0, |index| {
            self.graph
                .edges_directed(*index, Direction::Incoming)
                .count()
        })
    }

    fn index(&self, reference: &str) -> DagResult<NodeIndex> {
        self.node_indices
            .get(reference)
            .copied()
            .ok_or_else(|| DagError::not_found("vertex", reference))
    }

    fn neighbors(&self, reference: &str, direction: Direction) -> Vec<&str> {
        let Some(&index) = self.node_indices.get(reference) else {
            return Vec::new();
        };

        let mut neighbors: Vec<NodeIndex> =
            self.graph.neighbors_directed(index, direction).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
            .into_iter()
            .map(|neighbor| self.graph[neighbor].reference())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{SequencePath, TaskConfig, TaskKind};

    fn vertex(reference: &str) -> Vertex {
        Vertex {
            task_config: TaskConfig::named(reference, TaskKind::Simple),
            parent: SequencePath::root(),
            position: None,
            task_results: Vec::new(),
            status: None,
            tally: None,
            contains_task_refs: None,
        }
    }

    fn graph(references: &[&str]) -> TaskGraph {
        let mut graph = TaskGraph::new();
        for reference in references {
            graph.set_node(vertex(reference));
        }
        graph
    }

    #[test]
    fn test_set_node_replaces_data() {
        let mut graph = graph(&["a", "b"]);
        graph.set_edge("a", "b", EdgeData::default()).unwrap();

        let mut replacement = vertex("a");
        replacement.position = Some(7);
        graph.set_node(replacement);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node("a").unwrap().position, Some(7));
        assert_eq!(graph.successors("a"), vec!["b"]);
    }

    #[test]
    fn test_set_edge_replaces_data() {
        let mut graph = graph(&["a", "b"]);
        graph.set_edge("a", "b", EdgeData::default()).unwrap();
        graph
            .set_edge(
                "a",
                "b",
                EdgeData {
                    executed: true,
                    case_value: None,
                },
            )
            .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert!(graph.edge("a", "b").unwrap().executed);
    }

    #[test]
    fn test_edge_to_missing_vertex() {
        let mut graph = graph(&["a"]);
        let result = graph.set_edge("a", "ghost", EdgeData::default());
        assert!(matches!(result, Err(DagError::NotFound { .. })));
    }

    #[test]
    fn test_neighbors_in_insertion_order() {
        let mut graph = graph(&["s", "x", "y", "z", "t"]);
        for target in ["x", "y", "z"] {
            graph.set_edge("s", target, EdgeData::default()).unwrap();
            graph.set_edge(target, "t", EdgeData::default()).unwrap();
        }

        assert_eq!(graph.successors("s"), vec!["x", "y", "z"]);
        assert_eq!(graph.predecessors("t"), vec!["x", "y", "z"]);
        assert_eq!(graph.in_degree("t"), 3);
        assert!(graph.successors("ghost").is_empty());
    }

    #[test]
    fn test_remove_node_keeps_index_consistent() {
        let mut graph = graph(&["a", "b", "c"]);
        graph.set_edge("a", "c", EdgeData::default()).unwrap();

        let removed = graph.remove_node("a").unwrap();
        assert_eq!(removed.reference(), "a");
        assert!(!graph.contains("a"));
        assert_eq!(graph.node("c").unwrap().reference(), "c");
        assert_eq!(graph.node("b").unwrap().reference(), "b");
        assert_eq!(graph.edge_count(), 0);
    }
}
