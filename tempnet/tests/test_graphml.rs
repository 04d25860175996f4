/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet::graph::{ConstraintType, Edge, LowerCaseValue, Node, TNGraph};
use tempnet::io::{read_graphml, write_graphml};
use tempnet::labels::{ALabel, ALetter, Label, Proposition};

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <graph id="g" edgedefault="directed">
    <node id="Z"/>
    <node id="P?">
      <data key="Obs">p</data>
      <data key="x">10</data>
    </node>
    <node id="X">
      <data key="Label">p</data>
    </node>
    <edge id="eZ-X" source="Z" target="X">
      <data key="Type">requirement</data>
      <data key="LabeledValues">{(5, p) }</data>
    </edge>
    <edge id="eX-Z" source="X" target="Z">
      <data key="LabeledValues">{(-3, p) }</data>
    </edge>
  </graph>
</graphml>"#;

#[test]
fn test_read_sample() {
    let g = read_graphml(SAMPLE).unwrap();
    assert_eq!(g.num_nodes(), 3);
    assert_eq!(g.num_edges(), 2);
    let z = g.node_by_name("Z").unwrap();
    assert_eq!(g.z(), Some(z));
    let p = Proposition::from_char('p').unwrap();
    assert_eq!(g.observer(p), g.node_by_name("P?"));
    let x = g.node_by_name("X").unwrap();
    assert_eq!(g.node(x).label(), "p".parse::<Label>().unwrap());
    let e = g.find_edge(z, x).unwrap();
    assert_eq!(g.edge(e).value("p".parse().unwrap()), Some(5));
    assert_eq!(g.edge(e).constraint_type(), ConstraintType::Requirement);
}

#[test]
fn test_rejects_malformed() {
    assert!(read_graphml("<graphml><graph><node/></graph></graphml>").is_err());
    let dangling = r#"<graphml><graph>
        <node id="A"/>
        <edge id="e" source="A" target="B"/>
    </graph></graphml>"#;
    assert!(read_graphml(dangling).is_err());
    let bad_label = r#"<graphml><graph>
        <node id="A"><data key="Label">a1</data></node>
    </graph></graphml>"#;
    assert!(read_graphml(bad_label).is_err());
}

#[test]
fn test_write_read_round_trip() {
    let mut g = TNGraph::new();
    g.add_node(Node::new("Z")).unwrap();
    let p = Proposition::from_char('p').unwrap();
    g.add_node(Node::observer("P?", p)).unwrap();
    let letter = ALetter::from_char('C').unwrap();
    g.add_node(Node::contingent("C", letter)).unwrap();
    g.add_node(Node::new("A")).unwrap();

    let a = g.node_by_name("A").unwrap();
    let c = g.node_by_name("C").unwrap();
    let z = g.node_by_name("Z").unwrap();

    let mut forward = Edge::new("eA-C", a, c);
    forward.set_constraint_type(ConstraintType::Contingent);
    forward.merge_labeled_value(Label::empty(), 5);
    forward.set_lower_case(Some(LowerCaseValue {
        letter,
        label: Label::empty(),
        value: 2,
    }));
    g.add_edge(forward).unwrap();

    let mut backward = Edge::new("eC-A", c, a);
    backward.set_constraint_type(ConstraintType::Contingent);
    backward.merge_labeled_value(Label::empty(), -2);
    backward.merge_upper_case_value(ALabel::from_letter(letter), Label::empty(), -5);
    g.add_edge(backward).unwrap();

    let e = g.find_or_add_edge(z, a);
    g.edge_mut(e).merge_labeled_value("¬p".parse().unwrap(), 7);

    let mut out = Vec::new();
    write_graphml(&g, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let reread = read_graphml(&text).unwrap();

    assert_eq!(reread.num_nodes(), g.num_nodes());
    assert_eq!(reread.num_edges(), g.num_edges());
    for id in g.node_ids() {
        let orig = g.node(id);
        let copy = reread.node(reread.node_by_name(orig.name()).unwrap());
        assert_eq!(copy.label(), orig.label());
        assert_eq!(copy.observed(), orig.observed());
        assert_eq!(copy.contingent_letter(), orig.contingent_letter());
    }
    let a2 = reread.node_by_name("A").unwrap();
    let c2 = reread.node_by_name("C").unwrap();
    let forward = reread.edge(reread.find_edge(a2, c2).unwrap());
    assert_eq!(forward.lower_case().unwrap().value, 2);
    let backward = reread.edge(reread.find_edge(c2, a2).unwrap());
    assert_eq!(
        backward.upper_case_values().next(),
        Some((ALabel::from_letter(letter), Label::empty(), -5))
    );
}
