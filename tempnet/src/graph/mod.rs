/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The temporal-network graph model.
//!
//! A [`TNGraph`] owns its [`Node`]s and [`Edge`]s. Nodes are addressed by
//! [`NodeId`] and by name; at most one edge exists for each ordered pair of
//! nodes, so propagators can merge derived values into `find_or_add_edge`
//! results. Nodes are never destroyed; edges are added freely but removed
//! only during clean-up passes.

mod edge;
mod node;

pub use edge::{ConstraintType, Edge, LowerCaseValue};
pub use node::Node;

use crate::arith::Weight;
use crate::labels::{ALetter, Proposition};
use std::collections::HashMap;
use thiserror::Error;

/// The index of a node in its graph.
pub type NodeId = usize;

/// The index of an edge in its graph.
pub type EdgeId = usize;

/// The conventional name of the zero time-point.
pub const ZERO_NODE_NAME: &str = "Z";

/// An error raised by graph mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("a node named {0:?} is already present")]
    DuplicateNodeName(String),
    #[error("proposition {0} is already observed by node {1:?}")]
    DuplicateObserver(char, String),
    #[error("an edge {0:?} → {1:?} is already present")]
    DuplicateEdge(String, String),
    #[error("no node named {0:?}")]
    UnknownNode(String),
}

/// A contingent link `(activation, contingent, [lower, upper])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContingentLink {
    pub activation: NodeId,
    pub contingent: NodeId,
    pub letter: ALetter,
    pub lower: Weight,
    pub upper: Weight,
}

/// A directed graph of time-points and labeled constraints.
#[derive(Debug, Clone, Default)]
pub struct TNGraph {
    nodes: Vec<Node>,
    node_by_name: HashMap<String, NodeId>,
    edges: Vec<Option<Edge>>,
    adjacency: HashMap<(NodeId, NodeId), EdgeId>,
    out: Vec<Vec<EdgeId>>,
    inc: Vec<Vec<EdgeId>>,
    observers: HashMap<Proposition, NodeId>,
    z: Option<NodeId>,
}

impl TNGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of nodes.
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The number of live edges.
    pub fn num_edges(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    /// Adds a node, indexing its name and observed proposition.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.node_by_name.contains_key(node.name()) {
            return Err(GraphError::DuplicateNodeName(node.name().into()));
        }
        if let Some(p) = node.observed() {
            if let Some(&other) = self.observers.get(&p) {
                return Err(GraphError::DuplicateObserver(
                    p.to_char(),
                    self.nodes[other].name().into(),
                ));
            }
        }
        let id = self.nodes.len();
        self.node_by_name.insert(node.name().into(), id);
        if let Some(p) = node.observed() {
            self.observers.insert(p, id);
        }
        if node.name() == ZERO_NODE_NAME {
            self.z = Some(id);
        }
        self.nodes.push(node);
        self.out.push(Vec::new());
        self.inc.push(Vec::new());
        Ok(id)
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline(always)]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// Looks a node up by name.
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_by_name.get(name).copied()
    }

    /// Iterates over the node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.nodes.len()
    }

    /// The zero time-point, if present.
    #[inline(always)]
    pub fn z(&self) -> Option<NodeId> {
        self.z
    }

    /// Declares `id` to be the zero time-point.
    pub fn set_z(&mut self, id: NodeId) {
        self.z = Some(id);
    }

    /// The observer of `proposition`, if any.
    pub fn observer(&self, proposition: Proposition) -> Option<NodeId> {
        self.observers.get(&proposition).copied()
    }

    /// Iterates over `(proposition, observer)` pairs.
    pub fn observers(&self) -> impl Iterator<Item = (Proposition, NodeId)> + '_ {
        self.observers.iter().map(|(&p, &id)| (p, id))
    }

    /// Re-indexes the observed proposition of `id` after a node mutation.
    pub fn reindex_observer(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.observers.retain(|_, &mut n| n != id);
        if let Some(p) = self.nodes[id].observed() {
            if let Some(&other) = self.observers.get(&p) {
                return Err(GraphError::DuplicateObserver(
                    p.to_char(),
                    self.nodes[other].name().into(),
                ));
            }
            self.observers.insert(p, id);
        }
        Ok(())
    }

    /// Adds an edge. At most one edge may exist per ordered node pair.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let (u, v) = (edge.source(), edge.target());
        if self.adjacency.contains_key(&(u, v)) {
            return Err(GraphError::DuplicateEdge(
                self.nodes[u].name().into(),
                self.nodes[v].name().into(),
            ));
        }
        let id = self.edges.len();
        self.adjacency.insert((u, v), id);
        self.out[u].push(id);
        self.inc[v].push(id);
        self.edges.push(Some(edge));
        Ok(id)
    }

    /// The edge from `u` to `v`, if present.
    pub fn find_edge(&self, u: NodeId, v: NodeId) -> Option<EdgeId> {
        self.adjacency.get(&(u, v)).copied()
    }

    /// The edge from `u` to `v`, creating a derived one if absent.
    pub fn find_or_add_edge(&mut self, u: NodeId, v: NodeId) -> EdgeId {
        if let Some(id) = self.find_edge(u, v) {
            return id;
        }
        let name = format!("e{}-{}", self.nodes[u].name(), self.nodes[v].name());
        let mut edge = Edge::new(name, u, v);
        edge.set_constraint_type(ConstraintType::Derived);
        self.add_edge(edge).unwrap()
    }

    #[inline(always)]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        self.edges[id].as_ref().expect("edge was removed")
    }

    #[inline(always)]
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        self.edges[id].as_mut().expect("edge was removed")
    }

    /// Whether edge `id` is still live.
    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.get(id).is_some_and(Option::is_some)
    }

    /// Removes an edge. Only clean-up passes may call this.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.get_mut(id)?.take()?;
        let (u, v) = (edge.source(), edge.target());
        self.adjacency.remove(&(u, v));
        self.out[u].retain(|&e| e != id);
        self.inc[v].retain(|&e| e != id);
        Some(edge)
    }

    /// The live outgoing edges of `u`.
    pub fn out_edges(&self, u: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.out[u].iter().copied()
    }

    /// The live incoming edges of `v`.
    pub fn in_edges(&self, v: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.inc[v].iter().copied()
    }

    /// Iterates over the live edge ids.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(id, _)| id)
    }

    /// The contingent links of the graph, derived from lower-case values.
    ///
    /// Returns `(activation, contingent, letter, lower)` quadruples; bounds
    /// are completed by the caller from the companion values.
    pub fn lower_case_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_ids()
            .filter(move |&id| self.edge(id).lower_case().is_some())
    }

    /// The maximal absolute finite value over all edges, or 0 if none.
    pub fn max_absolute_value(&self) -> Weight {
        let mut max = 0;
        for id in self.edge_ids() {
            for (_, _, v) in self.edge(id).values().iter() {
                if crate::arith::is_finite(v) {
                    max = max.max(v.abs());
                }
            }
            if let Some(lc) = self.edge(id).lower_case() {
                max = max.max(lc.value.abs());
            }
        }
        max
    }

    /// The set of propositions used by node labels, observers and edge
    /// labels.
    pub fn propositions(&self) -> Vec<Proposition> {
        let mut seen = [false; crate::labels::MAX_PROPOSITIONS];
        for node in &self.nodes {
            if let Some(p) = node.observed() {
                seen[p.index()] = true;
            }
            for p in node.label().propositions() {
                seen[p.index()] = true;
            }
        }
        for id in self.edge_ids() {
            for (_, l, _) in self.edge(id).values().iter() {
                for p in l.propositions() {
                    seen[p.index()] = true;
                }
            }
        }
        seen.iter()
            .enumerate()
            .filter(|&(_, &s)| s)
            .map(|(i, _)| Proposition::from_index(i))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duplicate_node() {
        let mut g = TNGraph::new();
        g.add_node(Node::new("X")).unwrap();
        assert!(matches!(
            g.add_node(Node::new("X")),
            Err(GraphError::DuplicateNodeName(_))
        ));
    }

    #[test]
    fn test_find_or_add() {
        let mut g = TNGraph::new();
        let z = g.add_node(Node::new("Z")).unwrap();
        let x = g.add_node(Node::new("X")).unwrap();
        assert_eq!(g.z(), Some(z));
        let e = g.find_or_add_edge(z, x);
        assert_eq!(g.find_or_add_edge(z, x), e);
        assert_eq!(g.edge(e).constraint_type(), ConstraintType::Derived);
        assert_eq!(g.out_edges(z).count(), 1);
        assert_eq!(g.in_edges(x).count(), 1);
        g.remove_edge(e);
        assert_eq!(g.find_edge(z, x), None);
        assert_eq!(g.out_edges(z).count(), 0);
    }
}
