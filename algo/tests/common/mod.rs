/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet::graph::{ConstraintType, Edge, LowerCaseValue, Node, TNGraph};
use tempnet::labels::{ALabel, ALetter, Label, Proposition};

pub fn l(s: &str) -> Label {
    s.parse().unwrap()
}

/// Builds a graph from plain node names and `(source, target, label, value)`
/// requirement edges, creating nodes on demand.
pub fn graph_of(edges: &[(&str, &str, &str, i32)]) -> TNGraph {
    let mut g = TNGraph::new();
    g.add_node(Node::new("Z")).unwrap();
    for &(s, t, label, value) in edges {
        for name in [s, t] {
            if g.node_by_name(name).is_none() {
                add_named_node(&mut g, name);
            }
        }
        let u = g.node_by_name(s).unwrap();
        let v = g.node_by_name(t).unwrap();
        let e = g.find_or_add_edge(u, v);
        g.edge_mut(e).set_constraint_type(ConstraintType::Requirement);
        g.edge_mut(e).merge_labeled_value(l(label), value);
    }
    g
}

/// `"P?a"`-style names create observers of the trailing proposition.
fn add_named_node(g: &mut TNGraph, name: &str) {
    if let Some(rest) = name.strip_prefix("P?") {
        let p = Proposition::from_char(rest.chars().next().unwrap()).unwrap();
        g.add_node(Node::observer(name, p)).unwrap();
    } else {
        g.add_node(Node::new(name)).unwrap();
    }
}

/// Merges a labeled value into the edge `source → target`, creating nodes and
/// the edge as needed. Use this for constraints touching contingent nodes,
/// which must be created by [`add_contingent`] first.
pub fn constrain(g: &mut TNGraph, source: &str, target: &str, label: &str, value: i32) {
    for name in [source, target] {
        if g.node_by_name(name).is_none() {
            add_named_node(g, name);
        }
    }
    let u = g.node_by_name(source).unwrap();
    let v = g.node_by_name(target).unwrap();
    let e = g.find_or_add_edge(u, v);
    g.edge_mut(e).merge_labeled_value(l(label), value);
}

/// Adds a contingent link `(activation, contingent, [lower, upper])`, creating
/// the two companion edges.
pub fn add_contingent(g: &mut TNGraph, activation: &str, contingent: &str, lower: i32, upper: i32) {
    let letter = ALetter::from_char(contingent.chars().next().unwrap()).unwrap();
    if g.node_by_name(activation).is_none() {
        g.add_node(Node::new(activation)).unwrap();
    }
    if g.node_by_name(contingent).is_none() {
        g.add_node(Node::contingent(contingent, letter)).unwrap();
    }
    let a = g.node_by_name(activation).unwrap();
    let c = g.node_by_name(contingent).unwrap();

    let mut forward = Edge::new(format!("e{activation}-{contingent}"), a, c);
    forward.set_constraint_type(ConstraintType::Contingent);
    forward.merge_labeled_value(Label::empty(), upper);
    forward.set_lower_case(Some(LowerCaseValue {
        letter,
        label: Label::empty(),
        value: lower,
    }));
    g.add_edge(forward).unwrap();

    let mut backward = Edge::new(format!("e{contingent}-{activation}"), c, a);
    backward.set_constraint_type(ConstraintType::Contingent);
    backward.merge_labeled_value(Label::empty(), -lower);
    backward.merge_upper_case_value(ALabel::from_letter(letter), Label::empty(), -upper);
    g.add_edge(backward).unwrap();
}
