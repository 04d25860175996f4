/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

mod common;

use common::{add_contingent, constrain, graph_of};
use tempnet_algo::rte::{is_a_viable_schedule, RealTimeExecutor, Strategy};

/// The network of the LATE-strategy scenario: A activates C in [1, 3], B
/// must follow C, and Z bounds both A and B.
fn late_network() -> tempnet::graph::TNGraph {
    let mut g = graph_of(&[("Z", "A", "⊡", 2), ("Z", "B", "⊡", 5)]);
    add_contingent(&mut g, "A", "C", 1, 3);
    constrain(&mut g, "B", "C", "⊡", 0);
    g
}

#[test]
fn test_late_controller_random_environment() {
    for seed in 0..16 {
        let mut rte =
            RealTimeExecutor::with_seed(late_network(), Strategy::Late, Strategy::Random, seed);
        let result = rte.execute().unwrap();
        assert_eq!(result.time_of("Z"), Some(0));
        assert_eq!(result.time_of("A"), Some(2));
        let c = result.time_of("C").unwrap();
        assert!((3..=5).contains(&c), "C out of range: {c}");
        assert_eq!(result.time_of("B"), Some(c.max(5)));
        assert!(is_a_viable_schedule(rte.graph(), &result));
    }
}

#[test]
fn test_early_strategies() {
    let mut rte = RealTimeExecutor::new(late_network(), Strategy::Early, Strategy::Early);
    let result = rte.execute().unwrap();
    assert_eq!(result.time_of("Z"), Some(0));
    assert_eq!(result.time_of("A"), Some(0));
    assert_eq!(result.time_of("C"), Some(1));
    assert_eq!(result.time_of("B"), Some(1));
    assert!(is_a_viable_schedule(rte.graph(), &result));
}

#[test]
fn test_wait_blocks_until_contingent_or_instant() {
    // X waits for C (or 4 past A): it cannot run before the contingent
    // resolves even though its own window would allow it.
    let mut g = graph_of(&[("Z", "A", "⊡", 0)]);
    add_contingent(&mut g, "A", "C", 2, 5);
    constrain(&mut g, "X", "C", "⊡", -1);
    {
        let x = g.node_by_name("X").unwrap();
        let a = g.node_by_name("A").unwrap();
        let e = g.find_or_add_edge(x, a);
        g.edge_mut(e).merge_upper_case_value(
            "C".parse().unwrap(),
            tempnet::labels::Label::empty(),
            -4,
        );
    }
    let mut rte = RealTimeExecutor::new(g, Strategy::Early, Strategy::Late);
    let result = rte.execute().unwrap();
    let c = result.time_of("C").unwrap();
    assert_eq!(c, 5, "a LATE environment stretches the contingent");
    let x = result.time_of("X").unwrap();
    assert!(x >= c + 1, "X ran before its wait lifted: {x} < {c} + 1");
    assert!(is_a_viable_schedule(rte.graph(), &result));
}

#[test]
fn test_all_strategy_pairs_yield_viable_schedules() {
    let strategies = [
        Strategy::Early,
        Strategy::Middle,
        Strategy::Late,
        Strategy::Random,
        Strategy::FirstNodeEarly,
        Strategy::FirstNodeMiddle,
        Strategy::FirstNodeLate,
    ];
    for &controller in &strategies {
        for &environment in &strategies {
            for seed in [7u64, 1234] {
                let mut rte =
                    RealTimeExecutor::with_seed(late_network(), controller, environment, seed);
                let result = rte.execute().unwrap_or_else(|e| {
                    panic!("{controller:?}/{environment:?} failed: {e}")
                });
                assert!(
                    is_a_viable_schedule(rte.graph(), &result),
                    "{controller:?}/{environment:?} produced a non-viable schedule: {result}"
                );
            }
        }
    }
}
