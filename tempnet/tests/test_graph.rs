/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet::graph::{ConstraintType, Edge, GraphError, LowerCaseValue, Node, TNGraph};
use tempnet::labels::{ALabel, ALetter, Label, Proposition};

fn l(s: &str) -> Label {
    s.parse().unwrap()
}

fn make_contingent_pair(g: &mut TNGraph, a: &str, c: &str, lower: i32, upper: i32) {
    let letter = ALetter::from_char(c.chars().next().unwrap()).unwrap();
    let na = g.node_by_name(a).unwrap();
    let nc = g.node_by_name(c).unwrap();
    let mut forward = Edge::new(format!("e{a}-{c}"), na, nc);
    forward.set_constraint_type(ConstraintType::Contingent);
    forward.merge_labeled_value(Label::empty(), upper);
    forward.set_lower_case(Some(LowerCaseValue {
        letter,
        label: Label::empty(),
        value: lower,
    }));
    g.add_edge(forward).unwrap();
    let mut backward = Edge::new(format!("e{c}-{a}"), nc, na);
    backward.set_constraint_type(ConstraintType::Contingent);
    backward.merge_labeled_value(Label::empty(), -lower);
    backward.merge_upper_case_value(ALabel::from_letter(letter), Label::empty(), -upper);
    g.add_edge(backward).unwrap();
}

#[test]
fn test_observers_unique() {
    let mut g = TNGraph::new();
    let p = Proposition::from_char('p').unwrap();
    g.add_node(Node::observer("P?", p)).unwrap();
    assert!(matches!(
        g.add_node(Node::observer("Q?", p)),
        Err(GraphError::DuplicateObserver('p', _))
    ));
    assert_eq!(g.observer(p), g.node_by_name("P?"));
}

#[test]
fn test_contingent_pair_shape() {
    let mut g = TNGraph::new();
    g.add_node(Node::new("Z")).unwrap();
    g.add_node(Node::new("A")).unwrap();
    g.add_node(Node::contingent("C", ALetter::from_char('C').unwrap()))
        .unwrap();
    make_contingent_pair(&mut g, "A", "C", 2, 5);

    let a = g.node_by_name("A").unwrap();
    let c = g.node_by_name("C").unwrap();
    let forward = g.edge(g.find_edge(a, c).unwrap());
    let backward = g.edge(g.find_edge(c, a).unwrap());
    assert_eq!(forward.value(Label::empty()), Some(5));
    assert_eq!(forward.lower_case().unwrap().value, 2);
    assert_eq!(backward.value(Label::empty()), Some(-2));
    let (a_label, label, v) = backward.upper_case_values().next().unwrap();
    assert_eq!(a_label.to_string(), "C");
    assert_eq!(label, Label::empty());
    assert_eq!(v, -5);
    assert_eq!(g.max_absolute_value(), 5);
}

#[test]
fn test_edge_value_monotonicity() {
    let mut g = TNGraph::new();
    let u = g.add_node(Node::new("U")).unwrap();
    let v = g.add_node(Node::new("V")).unwrap();
    let e = g.find_or_add_edge(u, v);
    assert!(g.edge_mut(e).merge_labeled_value(l("a"), 5));
    assert!(g.edge_mut(e).merge_labeled_value(l("a"), 3));
    assert!(!g.edge_mut(e).merge_labeled_value(l("a"), 4));
    assert_eq!(g.edge(e).value(l("a")), Some(3));
}

#[test]
fn test_waits_enumerate_letters() {
    let mut g = TNGraph::new();
    let s = g.add_node(Node::new("S")).unwrap();
    let a = g.add_node(Node::new("A")).unwrap();
    let e = g.find_or_add_edge(s, a);
    let cd: ALabel = "CD".parse().unwrap();
    g.edge_mut(e).merge_upper_case_value(cd, Label::empty(), -4);
    let waits: Vec<_> = g.edge(e).waits().collect();
    assert_eq!(waits.len(), 2);
    assert!(waits.iter().all(|&(_, _, v)| v == -4));
}

#[test]
fn test_propositions_collects_all_sources() {
    let mut g = TNGraph::new();
    let p = Proposition::from_char('p').unwrap();
    g.add_node(Node::observer("P?", p)).unwrap();
    let mut x = Node::new("X");
    x.set_label(l("q"));
    g.add_node(x).unwrap();
    let u = g.node_by_name("P?").unwrap();
    let v = g.node_by_name("X").unwrap();
    let e = g.find_or_add_edge(u, v);
    g.edge_mut(e).merge_labeled_value(l("¬r"), 1);
    let props: Vec<char> = g.propositions().iter().map(|p| p.to_char()).collect();
    assert_eq!(props, ['p', 'q', 'r']);
}
