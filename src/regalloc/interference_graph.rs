//! # Interference Graph
//!
//! One undirected graph per register category. Nodes are operand numbers,
//! registers and variables share the same dense index space.
//!
//! - Removing a node returns a snapshot of its edges, which is what the
//!   simplify phase pushes on its stack.
//! - Re-adding a node with a snapshot only connects it to nodes that are
//!   currently in the graph.

use core::fmt;

use super::interval::Intervals;

#[derive(Debug, Clone)]
pub struct InterferenceGraph {
    category: usize,
    /// Edge lists indexed by operand number, `None` if not in the graph.
    adjacency: Vec<Option<Vec<usize>>>,
    size: usize,
}

impl InterferenceGraph {
    pub fn new(category: usize) -> Self {
        Self {
            category,
            adjacency: Vec::new(),
            size: 0,
        }
    }

    pub fn category(&self) -> usize { self.category }

    /// The number of nodes in the graph.
    pub fn size(&self) -> usize { self.size }

    pub fn contains(&self, node: usize) -> bool {
        matches!(self.adjacency.get(node), Some(Some(_)))
    }

    pub fn add_node(&mut self, node: usize) {
        if self.adjacency.len() <= node {
            let len = (node + 1).max(self.adjacency.len() * 2);
            self.adjacency.resize_with(len, || None);
        }
        if self.adjacency[node].is_none() {
            self.adjacency[node] = Some(Vec::new());
            self.size += 1;
        }
    }

    pub fn add_edge(&mut self, u: usize, v: usize) {
        self.add_node(u);
        self.add_node(v);
        if u == v {
            return;
        }
        for (a, b) in [(u, v), (v, u)] {
            if let Some(edges) = self.adjacency[a].as_mut() {
                if !edges.contains(&b) {
                    edges.push(b);
                }
            }
        }
    }

    pub fn adjacent(&self, node: usize) -> &[usize] {
        match self.adjacency.get(node) {
            Some(Some(edges)) => edges,
            _ => &[],
        }
    }

    pub fn degree(&self, node: usize) -> usize { self.adjacent(node).len() }

    /// Remove a node and return its edges at the time of removal.
    pub fn remove_node(&mut self, node: usize) -> Vec<usize> {
        let edges = match self.adjacency.get_mut(node).and_then(Option::take) {
            Some(edges) => edges,
            None => return Vec::new(),
        };
        self.size -= 1;
        for &other in edges.iter() {
            if let Some(Some(other_edges)) = self.adjacency.get_mut(other) {
                other_edges.retain(|&n| n != node);
            }
        }
        edges
    }

    /// Put a removed node back, reconnecting the snapshot edges whose other
    /// end is still in the graph.
    pub fn add_node_with_edges(&mut self, node: usize, edges: &[usize]) {
        self.add_node(node);
        for &other in edges {
            if self.contains(other) {
                self.add_edge(node, other);
            }
        }
    }

    /// All nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .filter_map(|(node, edges)| edges.as_ref().map(|_| node))
    }
}

impl fmt::Display for InterferenceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph #{} ({} nodes)", self.category, self.size)?;
        for node in self.nodes() {
            write!(f, "  {} --", node)?;
            for other in self.adjacent(node) {
                write!(f, " {}", other)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Build the interference graphs of all categories from the current
/// intervals.
///
/// Every interval is a node of the graph of its category, two intervals are
/// connected if any range of the one with the smaller number interferes
/// with the other.
pub fn build_graphs(intervals: &Intervals, num_categories: usize) -> Vec<InterferenceGraph> {
    let mut graphs = (0..num_categories)
        .map(InterferenceGraph::new)
        .collect::<Vec<_>>();

    let nodes = intervals
        .iter()
        .filter_map(|interval| interval.category().map(|c| (c, interval)))
        .collect::<Vec<_>>();

    for (i, &(category, interval)) in nodes.iter().enumerate() {
        let graph = &mut graphs[category];
        graph.add_node(interval.number());

        for &(other_category, other) in nodes.iter().skip(i + 1) {
            if other_category != category {
                continue;
            }
            let interferes = interval
                .ranges()
                .iter()
                .any(|range| other.has_interference(range, interval.is_spilled()));
            if interferes {
                graph.add_edge(interval.number(), other.number());
            }
        }
    }

    graphs
}
