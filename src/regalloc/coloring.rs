//! # Simplify and Select
//!
//! Chaitin-Briggs coloring of the interference graphs, one category at a
//! time.
//!
//! - Simplify removes variable nodes with fewer than `k` neighbours, or a
//!   spill candidate when every remaining node has at least `k`, until only
//!   the precolored register nodes are left.
//! - Select pops the removed nodes, puts each back with its snapshot edges
//!   and gives it the first color none of its neighbours has. A node that
//!   finds no color is taken out again and goes on the spill stack.

use log::{debug, trace};

use super::{interference_graph::InterferenceGraph, interval::Intervals};
use crate::lir::PReg;

/// A node removed by simplify.
#[derive(Debug, Clone)]
pub struct StackEntry {
    pub node: usize,
    /// The neighbours at the time of removal.
    pub edges: Vec<usize>,
    /// Removed as a potential spill, i.e. with at least `k` neighbours.
    pub spill_candidate: bool,
}

#[derive(Debug)]
pub struct GraphColoring {
    first_variable_number: usize,
    /// The allocatable registers of each category, in preference order. A
    /// color is an index into this list.
    palettes: Vec<Vec<PReg>>,
    /// Colors of each category, indexed by operand number.
    colors: Vec<Vec<Option<usize>>>,
    stacks: Vec<Vec<StackEntry>>,
    spill_stacks: Vec<Vec<StackEntry>>,
    /// Variables that got no color in the last select.
    uncolored: Vec<usize>,
    found_color: bool,
}

impl GraphColoring {
    pub fn new(first_variable_number: usize, palettes: Vec<Vec<PReg>>) -> Self {
        let n = palettes.len();
        Self {
            first_variable_number,
            palettes,
            colors: vec![Vec::new(); n],
            stacks: (0..n).map(|_| Vec::new()).collect(),
            spill_stacks: (0..n).map(|_| Vec::new()).collect(),
            uncolored: Vec::new(),
            found_color: false,
        }
    }

    pub fn palette(&self, category: usize) -> &[PReg] { &self.palettes[category] }

    /// The number of colors of a category.
    pub fn k(&self, category: usize) -> usize { self.palettes[category].len() }

    pub fn found_color(&self) -> bool { self.found_color }

    pub fn color(&self, category: usize, node: usize) -> Option<usize> {
        self.colors[category].get(node).copied().flatten()
    }

    pub fn stack(&self, category: usize) -> &[StackEntry] { &self.stacks[category] }

    pub fn uncolored(&self) -> &[usize] { &self.uncolored }

    pub fn is_spill_stack_empty(&self) -> bool { self.spill_stacks.iter().all(Vec::is_empty) }

    /// Drain the spill stacks, category by category, most recent first.
    pub fn take_spill_candidates(&mut self) -> Vec<usize> {
        self.spill_stacks
            .iter_mut()
            .flat_map(|stack| stack.drain(..).rev().map(|entry| entry.node).collect::<Vec<_>>())
            .collect()
    }

    fn set_color(&mut self, category: usize, node: usize, color: Option<usize>) {
        let colors = &mut self.colors[category];
        if colors.len() <= node {
            let len = (node + 1).max(colors.len() * 2);
            colors.resize(len, None);
        }
        colors[node] = color;
    }

    /// Color all the graphs, resetting the result of any previous round.
    pub fn color_graphs(&mut self, graphs: &mut [InterferenceGraph], intervals: &mut Intervals) {
        for colors in self.colors.iter_mut() {
            colors.clear();
        }
        for stack in self.stacks.iter_mut() {
            stack.clear();
        }
        self.uncolored.clear();
        self.found_color = true;

        self.simplify(graphs, intervals);
        self.select(graphs, intervals);
    }

    pub fn simplify(&mut self, graphs: &mut [InterferenceGraph], intervals: &Intervals) {
        for graph in graphs.iter_mut() {
            let category = graph.category();
            let k = self.k(category);

            let registers = graph
                .nodes()
                .take_while(|&node| node < self.first_variable_number)
                .collect::<Vec<_>>();
            let n_regs = registers.len();
            for node in registers {
                let color = intervals
                    .get(node)
                    .and_then(|interval| interval.operand().as_reg())
                    .and_then(|reg| self.palettes[category].iter().position(|&r| r == reg));
                if color.is_none() {
                    trace!("fixed register {} is not allocatable", node);
                }
                self.set_color(category, node, color);
            }

            debug!(
                "simplify graph #{}: {} nodes, {} registers, k = {}",
                category,
                graph.size(),
                n_regs,
                k
            );

            while graph.size() > n_regs {
                self.remove_nodes(graph, k);
                if graph.size() > n_regs && !self.choose_spill_candidate(graph, intervals) {
                    break;
                }
            }
        }
    }

    /// Remove every variable node with less than `k` neighbours until no
    /// more can be removed.
    fn remove_nodes(&mut self, graph: &mut InterferenceGraph, k: usize) {
        let category = graph.category();
        let mut removed = true;
        while removed {
            removed = false;
            let nodes = graph
                .nodes()
                .filter(|&node| node >= self.first_variable_number)
                .collect::<Vec<_>>();
            for node in nodes {
                if graph.degree(node) < k {
                    let edges = graph.remove_node(node);
                    self.stacks[category].push(StackEntry {
                        node,
                        edges,
                        spill_candidate: false,
                    });
                    removed = true;
                }
            }
        }
    }

    /// Remove the node with the least uses per neighbour, preferring nodes
    /// that were not spilled before. Ties go to the lowest number.
    fn choose_spill_candidate(&mut self, graph: &mut InterferenceGraph, intervals: &Intervals) -> bool {
        let category = graph.category();
        let candidates = graph
            .nodes()
            .filter(|&node| node >= self.first_variable_number)
            .filter_map(|node| intervals.get(node).map(|interval| (node, interval)))
            .map(|(node, interval)| {
                let ratio = interval.use_positions().len() / graph.degree(node).max(1);
                (node, ratio, interval.is_spilled())
            })
            .collect::<Vec<_>>();

        let pick = |allow_spilled: bool| {
            let mut best: Option<(usize, usize)> = None;
            for &(node, ratio, spilled) in candidates.iter() {
                if spilled && !allow_spilled {
                    continue;
                }
                if best.map_or(true, |(_, min)| ratio < min) {
                    best = Some((node, ratio));
                }
            }
            best.map(|(node, _)| node)
        };

        let Some(node) = pick(false).or_else(|| pick(true)) else {
            return false;
        };

        trace!("spill candidate {} in graph #{}", node, category);
        let edges = graph.remove_node(node);
        self.stacks[category].push(StackEntry {
            node,
            edges,
            spill_candidate: true,
        });
        true
    }

    pub fn select(&mut self, graphs: &mut [InterferenceGraph], intervals: &mut Intervals) {
        for graph in graphs.iter_mut() {
            let category = graph.category();
            let k = self.k(category);

            while let Some(entry) = self.stacks[category].pop() {
                graph.add_node_with_edges(entry.node, &entry.edges);
                if entry.node < self.first_variable_number {
                    continue;
                }

                let color = (0..k).find(|&c| {
                    graph
                        .adjacent(entry.node)
                        .iter()
                        .all(|&other| self.color(category, other) != Some(c))
                });

                let Some(interval) = intervals.get_mut(entry.node) else {
                    continue;
                };

                match color {
                    Some(c) => {
                        let reg = self.palettes[category][c];
                        trace!("color {} with {}", interval.operand(), reg);
                        interval.set_location(Some(reg));
                        self.set_color(category, entry.node, Some(c));
                    }
                    None => {
                        debug!(
                            "no color for {} with {} neighbours",
                            interval.operand(),
                            entry.edges.len()
                        );
                        self.found_color = false;
                        graph.remove_node(entry.node);
                        self.uncolored.push(entry.node);
                        if !interval.is_spilled() {
                            self.spill_stacks[category].push(entry);
                        }
                    }
                }
            }
        }
    }
}
