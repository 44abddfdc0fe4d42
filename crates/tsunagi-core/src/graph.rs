//! Undirected component graph keyed by [`AnimeId`].
//!
//! Nodes are indexed in the order they are first mentioned by an edge, and
//! components are discovered by walking node indices in that order. Cluster
//! numbering downstream depends on this order.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Dfs, VisitMap};

use crate::types::AnimeId;

/// Insertion-ordered undirected graph used for connected components.
#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    graph: UnGraph<AnimeId, ()>,
    nodes: HashMap<AnimeId, NodeIndex>,
}

impl ComponentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &AnimeId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), idx);
        idx
    }

    /// Connects `a` and `b`. A self-loop only registers the node.
    pub fn add_edge(&mut self, a: &AnimeId, b: &AnimeId) {
        let ia = self.node(a);
        let ib = self.node(b);
        if ia != ib {
            self.graph.update_edge(ia, ib, ());
        }
    }

    #[must_use]
    pub fn contains(&self, id: &AnimeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Connected components in discovery order.
    ///
    /// Traversal is iterative, so deep chains cannot overflow the stack.
    #[must_use]
    pub fn components(&self) -> Vec<Vec<AnimeId>> {
        let mut components = Vec::new();
        let mut dfs = Dfs::empty(&self.graph);

        for start in self.graph.node_indices() {
            if dfs.discovered.is_visited(&start) {
                continue;
            }
            dfs.move_to(start);
            let mut component = Vec::new();
            while let Some(idx) = dfs.next(&self.graph) {
                component.push(self.graph[idx].clone());
            }
            components.push(component);
        }

        components
    }
}
