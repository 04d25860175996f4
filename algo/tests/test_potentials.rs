/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

mod common;

use common::{graph_of, l};
use dsi_progress_logger::no_logging;
use tempnet::arith::NEG_INF;
use tempnet::labels::Label;
use tempnet_algo::PotentialSolver;

#[test]
fn test_minimized_distance_to_z() {
    let g = graph_of(&[("Z", "X", "⊡", 5), ("X", "Z", "⊡", -3)]);
    let mut solver = PotentialSolver::new(g);
    let status = solver.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(status.consistency);
    let g = solver.graph();
    let x = g.node_by_name("X").unwrap();
    assert_eq!(g.node(x).potential().get(Label::empty()), Some(-3));
}

#[test]
fn test_negative_loop_detected() {
    let g = graph_of(&[("Z", "X", "⊡", 5), ("X", "Z", "⊡", -7)]);
    let mut solver = PotentialSolver::new(g);
    let status = solver.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(!status.consistency);
    assert!(status.negative_loop_node.is_some());
}

#[test]
fn test_q_loop_records_unknown_potential() {
    // The two opposite conditioned constraints form a q-loop: consistent
    // overall, but the conflict conditional on a is recorded as a -∞
    // potential under ¿a.
    let g = graph_of(&[("P?a", "X", "a", -5), ("X", "P?a", "¬a", -5)]);
    let mut solver = PotentialSolver::new(g);
    let status = solver.dynamic_consistency_check(no_logging![]).unwrap();
    assert!(status.finished);
    assert!(status.consistency, "a q-loop is not a negative cycle");
    let g = solver.graph();
    let x = g.node_by_name("X").unwrap();
    assert_eq!(g.node(x).potential().get(l("¿a")), Some(NEG_INF));
}

#[test]
fn test_chain_potentials() {
    let g = graph_of(&[
        ("X", "Z", "⊡", -2),
        ("Y", "X", "⊡", -3),
        ("Z", "Y", "⊡", 10),
    ]);
    let mut solver = PotentialSolver::new(g);
    assert!(solver.dynamic_consistency_check(no_logging![]).unwrap().consistency);
    let g = solver.graph();
    let x = g.node_by_name("X").unwrap();
    let y = g.node_by_name("Y").unwrap();
    assert_eq!(g.node(x).potential().get(Label::empty()), Some(-2));
    // Y precedes X by 3 and X precedes Z by 2.
    assert_eq!(g.node(y).potential().get(Label::empty()), Some(-5));
}

#[test]
fn test_conditioned_potential_kept_per_label() {
    // X precedes Z by 5 only when p holds, by 1 otherwise.
    let g = graph_of(&[
        ("X", "Z", "p", -5),
        ("X", "Z", "¬p", -1),
        ("Z", "P?p", "⊡", 3),
    ]);
    let mut solver = PotentialSolver::new(g);
    assert!(solver.dynamic_consistency_check(no_logging![]).unwrap().consistency);
    let g = solver.graph();
    let x = g.node_by_name("X").unwrap();
    let potential = g.node(x).potential();
    assert_eq!(potential.get(l("p")), Some(-5));
    assert_eq!(potential.get(l("¬p")), Some(-1));
}

#[test]
fn test_upper_potentials_bounded_by_horizon() {
    let g = graph_of(&[("Z", "X", "⊡", 5), ("X", "Y", "⊡", 2)]);
    let mut solver = PotentialSolver::new(g);
    solver.compute_upper_potentials(no_logging![]).unwrap();
    let g = solver.graph();
    let x = g.node_by_name("X").unwrap();
    let y = g.node_by_name("Y").unwrap();
    assert_eq!(g.node(x).upper_potential().get(Label::empty()), Some(5));
    // Via X, Y is reachable within 7, tighter than the horizon.
    assert_eq!(g.node(y).upper_potential().get(Label::empty()), Some(7));
}
