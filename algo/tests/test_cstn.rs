/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

mod common;

use common::{graph_of, l};
use dsi_progress_logger::no_logging;
use tempnet::labels::Label;
use tempnet::maps::LabeledIntMap;
use tempnet_algo::{CheckError, CstnChecker, Semantics};

#[test]
fn test_trivially_consistent() {
    let g = graph_of(&[("Z", "X", "⊡", 5), ("X", "Z", "⊡", -3)]);
    let mut checker = CstnChecker::new(g);
    let status = checker.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(status.consistency);
    assert!(status.negative_loop_node.is_none());
}

#[test]
fn test_trivial_negative_loop() {
    let g = graph_of(&[("Z", "X", "⊡", 5), ("X", "Z", "⊡", -7)]);
    let mut checker = CstnChecker::new(g);
    let status = checker.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(!status.consistency);
    let node = status.negative_loop_node.clone().unwrap();
    assert!(node == "Z" || node == "X", "unexpected loop node {node}");
}

#[test]
fn test_r0_drops_observed_literal() {
    // An entry conditioned on p on an edge leaving the observer of p, with a
    // negative value, binds before the observation: the literal goes away.
    let g = graph_of(&[("P?p", "X", "p", -3), ("Z", "P?p", "⊡", 10), ("Z", "X", "⊡", 10)]);
    let mut checker = CstnChecker::new(g);
    let status = checker.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.consistency);
    assert!(status.r0_calls > 0);
    let g = checker.graph();
    let obs = g.node_by_name("P?p").unwrap();
    let x = g.node_by_name("X").unwrap();
    let e = g.find_edge(obs, x).unwrap();
    assert_eq!(g.edge(e).value(Label::empty()), Some(-3));
    assert_eq!(g.edge(e).value(l("p")), None);
}

#[test]
fn test_r3_weakens_conditioned_value() {
    // S→Z is conditioned on p, while the observer of p is itself bound to Z
    // by -1: R3 derives the unconditional value max(-1, -2) = -1.
    let g = graph_of(&[("P?p", "Z", "⊡", -1), ("S", "Z", "p", -2)]);
    let mut checker = CstnChecker::new(g);
    let status = checker.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.consistency);
    assert!(status.r3_calls > 0);
    let g = checker.graph();
    let s = g.node_by_name("S").unwrap();
    let z = g.node_by_name("Z").unwrap();
    let e = g.find_edge(s, z).unwrap();
    assert_eq!(g.edge(e).value(Label::empty()), Some(-1));
}

#[test]
fn test_inconsistency_found_only_in_one_scenario() {
    // The negative cycle exists only under ¬p, which is a real scenario:
    // the network is not consistent.
    let g = graph_of(&[
        ("Z", "P?p", "⊡", 4),
        ("X", "Z", "¬p", -7),
        ("Z", "X", "¬p", 5),
    ]);
    let mut checker = CstnChecker::new(g);
    let status = checker.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(!status.consistency);
}

#[test]
fn test_only_to_z_agrees_on_verdict() {
    for (edges, expected) in [
        (vec![("Z", "X", "⊡", 5), ("X", "Z", "⊡", -3)], true),
        (vec![("Z", "X", "⊡", 5), ("X", "Z", "⊡", -7)], false),
        (
            vec![("Z", "X", "⊡", 3), ("X", "Y", "⊡", -1), ("Y", "Z", "⊡", -3)],
            false,
        ),
    ] {
        let semantics = Semantics {
            propagation_only_to_z: true,
            ..Semantics::default()
        };
        let mut checker = CstnChecker::with_semantics(graph_of(&edges), semantics);
        let status = checker.dynamic_consistency_check(no_logging![]).unwrap();
        assert!(status.finished);
        assert_eq!(status.consistency, expected);
    }
}

#[test]
fn test_horizon_honored_after_init() {
    let g = graph_of(&[("Z", "X", "⊡", 5), ("X", "Y", "⊡", 4), ("Y", "Z", "⊡", -2)]);
    let mut checker = CstnChecker::new(g);
    checker.init().unwrap();
    assert_eq!(checker.horizon(), 5 * 3);
    assert!(checker.honors_horizon());
}

#[test]
fn test_missing_observer_is_rejected() {
    let g = graph_of(&[("Z", "X", "p", 5)]);
    let mut checker = CstnChecker::new(g);
    assert!(matches!(
        checker.dynamic_consistency_check(no_logging![]),
        Err(CheckError::WellDefinedness(_))
    ));
}

#[test]
fn test_second_pass_is_stable() {
    let g = graph_of(&[
        ("Z", "P?p", "⊡", 4),
        ("P?p", "X", "p", -1),
        ("X", "Z", "⊡", -1),
        ("Z", "X", "⊡", 6),
    ]);
    let mut first = CstnChecker::new(g);
    assert!(first.dynamic_consistency_check(no_logging![]).unwrap().consistency);
    let after_first = first.into_graph();
    let snapshot: Vec<(String, LabeledIntMap)> = after_first
        .edge_ids()
        .map(|e| {
            let edge = after_first.edge(e);
            (edge.name().to_owned(), edge.labeled_value_map())
        })
        .collect();

    let mut second = CstnChecker::new(after_first);
    assert!(second.dynamic_consistency_check(no_logging![]).unwrap().consistency);
    let after_second = second.into_graph();
    for (name, values) in snapshot {
        let e = after_second
            .edge_ids()
            .find(|&e| after_second.edge(e).name() == name)
            .unwrap();
        assert_eq!(
            after_second.edge(e).labeled_value_map(),
            values,
            "edge {name} changed in the second pass"
        );
    }
}
