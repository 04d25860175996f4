/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

mod common;

use common::{add_contingent, constrain, graph_of};
use dsi_progress_logger::no_logging;
use tempnet::graph::{Node, TNGraph};
use tempnet::maps::LabeledIntMap;
use tempnet_algo::{CheckError, CstnuChecker};

#[test]
fn test_contingent_link_integrity_after_init() {
    let mut g = TNGraph::new();
    g.add_node(Node::new("Z")).unwrap();
    add_contingent(&mut g, "A", "C", 2, 5);
    let mut checker = CstnuChecker::new(g);
    checker.init().unwrap();
    assert_eq!(checker.contingent_links().count(), 1);
    assert!(checker.contingent_links_are_integral());
    let link = checker.contingent_links().next().unwrap();
    assert_eq!((link.lower, link.upper), (2, 5));
}

#[test]
fn test_plain_contingent_is_controllable() {
    let mut g = graph_of(&[("Z", "A", "⊡", 10)]);
    add_contingent(&mut g, "A", "C", 2, 5);
    let mut checker = CstnuChecker::new(g);
    let status = checker.dynamic_controllability_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(status.consistency);
}

#[test]
fn test_upper_bound_violation_is_not_controllable() {
    // C is forced to occur within 3 of A, but the environment may take 5.
    let mut g = graph_of(&[]);
    add_contingent(&mut g, "A", "C", 2, 5);
    constrain(&mut g, "C", "A", "⊡", -3);
    let mut checker = CstnuChecker::new(g);
    let status = checker.dynamic_controllability_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(!status.consistency);
}

#[test]
fn test_exact_prediction_is_not_controllable() {
    // X must precede the contingent by 4 (so X ≤ A - 2 in the worst case)
    // but may not precede A by more than 1: impossible in every strategy.
    let mut g = graph_of(&[]);
    add_contingent(&mut g, "A", "C", 2, 5);
    constrain(&mut g, "C", "X", "⊡", -4);
    constrain(&mut g, "X", "A", "⊡", 1);
    let mut checker = CstnuChecker::new(g);
    let status = checker.dynamic_controllability_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(!status.consistency);
}

#[test]
fn test_wait_is_derived() {
    // X must follow C by at least 1: the upper-case propagation produces a
    // wait for C on the X→A edge.
    let mut g = graph_of(&[]);
    add_contingent(&mut g, "A", "C", 2, 5);
    constrain(&mut g, "X", "C", "⊡", -1);
    let mut checker = CstnuChecker::new(g);
    let status = checker.dynamic_controllability_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(status.consistency);
    assert!(status.upper_case_calls > 0);
    let g = checker.graph();
    let x = g.node_by_name("X").unwrap();
    let a = g.node_by_name("A").unwrap();
    let e = g.find_edge(x, a).unwrap();
    let wait = g
        .edge(e)
        .waits()
        .find(|&(letter, _, _)| letter.to_char() == 'C');
    assert_eq!(wait.map(|(_, _, v)| v), Some(-6));
}

#[test]
fn test_malformed_contingent_bounds() {
    let mut g = TNGraph::new();
    g.add_node(Node::new("Z")).unwrap();
    add_contingent(&mut g, "A", "C", 2, 5);
    // Tampering with the lower-case value to make it non-positive.
    let a = g.node_by_name("A").unwrap();
    let c = g.node_by_name("C").unwrap();
    let e = g.find_edge(a, c).unwrap();
    let mut lc = g.edge(e).lower_case().unwrap();
    lc.value = 0;
    g.edge_mut(e).set_lower_case(Some(lc));
    let mut checker = CstnuChecker::new(g);
    assert!(matches!(
        checker.init(),
        Err(CheckError::MalformedContingent(_))
    ));
}

#[test]
fn test_missing_companion_is_rejected() {
    let mut g = TNGraph::new();
    g.add_node(Node::new("Z")).unwrap();
    add_contingent(&mut g, "A", "C", 2, 5);
    let a = g.node_by_name("A").unwrap();
    let c = g.node_by_name("C").unwrap();
    let companion = g.find_edge(c, a).unwrap();
    g.remove_edge(companion);
    let mut checker = CstnuChecker::new(g);
    assert!(matches!(
        checker.init(),
        Err(CheckError::MalformedContingent(_))
    ));
}

#[test]
fn test_second_pass_is_stable() {
    let mut g = graph_of(&[("Z", "A", "⊡", 10), ("Z", "X", "⊡", 8)]);
    add_contingent(&mut g, "A", "C", 2, 5);
    constrain(&mut g, "X", "C", "⊡", -1);
    let mut first = CstnuChecker::new(g);
    assert!(
        first
            .dynamic_controllability_check(no_logging![])
            .unwrap()
            .consistency
    );
    let after_first = first.into_graph();
    let snapshot: Vec<(String, LabeledIntMap, String)> = after_first
        .edge_ids()
        .map(|e| {
            let edge = after_first.edge(e);
            (
                edge.name().to_owned(),
                edge.labeled_value_map(),
                edge.values().upper_case_to_string(),
            )
        })
        .collect();

    let mut second = CstnuChecker::new(after_first);
    assert!(
        second
            .dynamic_controllability_check(no_logging![])
            .unwrap()
            .consistency
    );
    let after_second = second.into_graph();
    for (name, values, upper) in snapshot {
        let e = after_second
            .edge_ids()
            .find(|&e| after_second.edge(e).name() == name)
            .unwrap();
        assert_eq!(after_second.edge(e).labeled_value_map(), values);
        assert_eq!(after_second.edge(e).values().upper_case_to_string(), upper);
    }
}

#[test]
fn test_cleaned_graph_has_no_scaffolding() {
    let mut g = graph_of(&[("Z", "A", "⊡", 10)]);
    add_contingent(&mut g, "A", "C", 2, 5);
    let mut checker = CstnuChecker::new(g);
    checker.dynamic_controllability_check(no_logging![]).unwrap();
    checker.clean_graph();
    let g = checker.graph();
    for e in g.edge_ids() {
        assert!(!g.edge(e).is_empty());
        assert_ne!(
            g.edge(e).constraint_type(),
            tempnet::graph::ConstraintType::Internal
        );
    }
}
