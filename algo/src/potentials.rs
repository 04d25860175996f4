/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cstn::CstnChecker;
use crate::error::CheckError;
use crate::semantics::Semantics;
use crate::status::CheckStatus;
use dsi_progress_logger::ProgressLog;
use itertools::iproduct;
use log::{debug, info, trace};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tempnet::arith::{sum_overflow_safe, Weight, NEG_INF};
use tempnet::graph::{EdgeId, NodeId, TNGraph};
use tempnet::labels::{Label, Proposition};
use tempnet::maps::LabeledIntMap;
use tempnet::utils::NodesToCheck;

/// A potential-based consistency checker for CSTNs.
///
/// Instead of propagating labeled values over edges, each node owns a map of
/// labeled potentials (distances to Z) relaxed by a single-sink Bellman-Ford
/// pass, with an R3 step run on the potentials themselves after each pass.
/// Negative cycles are caught by a per-label update counter: a label updated
/// more than |V| times is saturated to −∞.
///
/// The solver targets instantaneous-reaction semantics without node labels.
pub struct PotentialSolver {
    core: CstnChecker,
}

impl PotentialSolver {
    pub fn new(graph: TNGraph) -> Self {
        let semantics = Semantics {
            with_node_labels: false,
            ..Semantics::default()
        };
        Self {
            core: CstnChecker::with_semantics(graph, semantics),
        }
    }

    pub fn graph(&self) -> &TNGraph {
        self.core.graph()
    }

    pub fn into_graph(self) -> TNGraph {
        self.core.into_graph()
    }

    pub fn status(&self) -> &CheckStatus {
        self.core.status()
    }

    pub fn set_timeout(&mut self, timeout: Option<std::time::Duration>) {
        self.core.set_timeout(timeout);
    }

    /// Decides dynamic consistency via labeled potentials.
    pub fn dynamic_consistency_check(
        &mut self,
        pl: &mut impl ProgressLog,
    ) -> Result<&CheckStatus, CheckError> {
        let start = Instant::now();
        self.core.init()?;
        self.core.arm_deadline(start);

        self.q_loop_finder(pl);
        if !self.core.status().is_settled() {
            self.reset_potentials();
            self.main_loop(pl);
        }
        if !self.core.status().is_settled() {
            self.core.status_mut().finish(true);
        }
        self.core.status_mut().execution_time = Some(start.elapsed());
        info!("{}", self.core.status());
        Ok(self.core.status())
    }

    /// Completes the graph for |V| rounds applying LP only, recording every
    /// q-loop as a −∞ potential on its node.
    ///
    /// The pass may create edges and merge values freely: everything it adds
    /// is rolled back afterwards, only the recorded potentials survive.
    fn q_loop_finder(&mut self, pl: &mut impl ProgressLog) {
        let graph = self.core.graph();
        let pre_existing: Vec<(EdgeId, LabeledIntMap)> = graph
            .edge_ids()
            .map(|e| (e, graph.edge(e).labeled_value_map()))
            .collect();
        let snapshot: HashSet<EdgeId> = pre_existing.iter().map(|&(e, _)| e).collect();

        pl.item_name("round");
        pl.start("Searching q-loops...");
        let n = self.core.graph().num_nodes();
        'rounds: for round in 0..n {
            let mut changed = false;
            let edges: Vec<EdgeId> = self.core.graph().edge_ids().collect();
            for e1 in edges {
                if !self.core.graph().has_edge(e1) {
                    continue;
                }
                let b = self.core.graph().edge(e1).target();
                for e2 in self.core.graph().out_edges(b).collect::<Vec<_>>() {
                    changed |= self.q_loop_lp(e1, e2);
                    if self.core.status().is_settled() {
                        break 'rounds;
                    }
                }
                if self.core.deadline_expired() {
                    break 'rounds;
                }
            }
            pl.light_update();
            debug!("q-loop round {round}: changed = {changed}");
            if !changed {
                break;
            }
        }
        pl.done();

        // Roll the completion back.
        let graph = self.core.graph_mut();
        for e in graph.edge_ids().collect::<Vec<_>>() {
            if !snapshot.contains(&e) {
                graph.remove_edge(e);
            }
        }
        for (e, values) in pre_existing {
            let edge = graph.edge_mut(e);
            edge.values_mut().clear();
            for (label, value) in values.iter() {
                edge.merge_labeled_value(label, value);
            }
        }
    }

    /// One LP step of the q-loop search: unknown labels may land anywhere,
    /// and self loops write node potentials instead of edge values.
    fn q_loop_lp(&mut self, e1: EdgeId, e2: EdgeId) -> bool {
        let (a, _) = {
            let edge = self.core.graph().edge(e1);
            (edge.source(), edge.target())
        };
        let c = self.core.graph().edge(e2).target();
        let first: Vec<(Label, Weight)> = self.core.graph().edge(e1).labeled_values().collect();
        let second: Vec<(Label, Weight)> = self.core.graph().edge(e2).labeled_values().collect();
        let mut changed = false;
        for (&(alpha, u), &(beta, v)) in iproduct!(&first, &second) {
            let sum = sum_overflow_safe(u, v);
            if sum >= 0 {
                continue;
            }
            let gamma = if self.core.semantics().must_restrict_to_consistent_label(u, v) {
                match alpha.conjunction(beta) {
                    Some(gamma) => gamma,
                    None => continue,
                }
            } else {
                self.core
                    .remove_children_of_unknown(alpha.conjunction_extended(beta))
            };
            if a == c {
                if !gamma.contains_unknown() {
                    let name = self.core.graph().node(a).name().to_owned();
                    self.core.status_mut().negative_loop(name);
                    return true;
                }
                if self.core.graph_mut().node_mut(a).potential_mut().put(gamma, NEG_INF) {
                    trace!(
                        "q-loop at {} under {gamma}",
                        self.core.graph().node(a).name()
                    );
                    self.core.status_mut().potential_update_calls += 1;
                    changed = true;
                }
                continue;
            }
            let e_ac = self.core.graph_mut().find_or_add_edge(a, c);
            if self
                .core
                .graph_mut()
                .edge_mut(e_ac)
                .merge_labeled_value(gamma, sum)
            {
                self.core.status_mut().lp_calls += 1;
                changed = true;
            }
        }
        changed
    }

    /// Clears every potential except the −∞ q-loop records, then pins Z at 0.
    fn reset_potentials(&mut self) {
        let graph = self.core.graph_mut();
        for x in graph.node_ids().collect::<Vec<_>>() {
            let q_loops: Vec<(Label, Weight)> = graph
                .node(x)
                .potential()
                .iter()
                .filter(|&(_, v)| v == NEG_INF)
                .collect();
            graph.node_mut(x).clear_potentials();
            for (label, value) in q_loops {
                graph.node_mut(x).potential_mut().put(label, value);
            }
        }
        let z = graph.z().expect("init ensures Z");
        graph.node_mut(z).update_potential(Label::empty(), 0);
    }

    /// Alternates single-sink Bellman-Ford passes and R3 on potentials until
    /// nothing changes or a negative condition settles the verdict.
    fn main_loop(&mut self, pl: &mut impl ProgressLog) {
        let z = self.core.graph().z().expect("init ensures Z");
        let mut queue = NodesToCheck::new();
        queue.push(z);
        pl.item_name("node");
        pl.start("Relaxing labeled potentials...");
        let mut touched_obs: HashSet<Proposition> = HashSet::new();
        loop {
            if !self.bellman_ford(&mut queue, &mut touched_obs, pl) {
                break;
            }
            if self.core.status().is_settled() || touched_obs.is_empty() {
                break;
            }
            touched_obs.clear();
            if !self.potential_r3(&mut queue) {
                break;
            }
            if queue.is_empty() {
                break;
            }
        }
        pl.done();
    }

    /// Relaxes potentials backwards along incoming edges until the queue
    /// empties. Returns false when the verdict settled or the deadline
    /// expired.
    fn bellman_ford(
        &mut self,
        queue: &mut NodesToCheck,
        touched_obs: &mut HashSet<Proposition>,
        pl: &mut impl ProgressLog,
    ) -> bool {
        while let Some(a) = queue.pop() {
            pl.light_update();
            let a_potential: Vec<(Label, Weight)> =
                self.core.graph().node(a).potential().iter().collect();
            for e in self.core.graph().in_edges(a).collect::<Vec<_>>() {
                let b = self.core.graph().edge(e).source();
                if b == a {
                    continue;
                }
                let values: Vec<(Label, Weight)> =
                    self.core.graph().edge(e).labeled_values().collect();
                for (&(beta, v), &(alpha, u)) in iproduct!(&values, &a_potential) {
                    let w = sum_overflow_safe(u, v);
                    if w >= 0 || (u == NEG_INF && v > 0) {
                        continue;
                    }
                    let gamma = if v >= 0 {
                        match alpha.conjunction(beta) {
                            Some(gamma) => gamma,
                            None => continue,
                        }
                    } else {
                        self.core
                            .remove_children_of_unknown(alpha.conjunction_extended(beta))
                    };
                    if !self.update_potential(b, gamma, w, queue, touched_obs) {
                        return false;
                    }
                }
            }
            if self.core.deadline_expired() {
                return false;
            }
        }
        true
    }

    /// Stores a potential update, saturating labels updated more than |V|
    /// times. Returns false when the update proves inconsistency.
    fn update_potential(
        &mut self,
        node: NodeId,
        label: Label,
        value: Weight,
        queue: &mut NodesToCheck,
        touched_obs: &mut HashSet<Proposition>,
    ) -> bool {
        let n = self.core.graph().num_nodes() as u32;
        if !self.core.graph_mut().node_mut(node).update_potential(label, value) {
            return true;
        }
        self.core.status_mut().potential_update_calls += 1;
        let mut value = value;
        if self.core.graph().node(node).potential_count(label) > n {
            self.core
                .graph_mut()
                .node_mut(node)
                .potential_mut()
                .put(label, NEG_INF);
            value = NEG_INF;
        }
        if !label.contains_unknown() {
            let at_z = Some(node) == self.core.graph().z();
            if (at_z && value < 0) || value == NEG_INF {
                let name = self.core.graph().node(node).name().to_owned();
                debug!("inconsistent potential ({value}, {label}) at {name}");
                self.core.status_mut().negative_loop(name);
                return false;
            }
        }
        queue.push(node);
        for p in label.propositions() {
            if self.core.graph().observer(p).is_some() {
                touched_obs.insert(p);
            }
        }
        true
    }

    /// R3 on potentials: an observation node's potential can discharge the
    /// literals on its proposition in other potentials.
    ///
    /// Observation nodes are aligned among themselves to a fixed point first,
    /// then ordinary nodes are updated once; changed nodes are re-enqueued.
    fn potential_r3(&mut self, queue: &mut NodesToCheck) -> bool {
        let observers: Vec<(Proposition, NodeId)> = self.core.graph().observers().collect();
        let obs_set: HashSet<NodeId> = observers.iter().map(|&(_, o)| o).collect();

        loop {
            let mut changed = false;
            for (&(p, obs), &(_, x)) in iproduct!(&observers, &observers) {
                if x == obs {
                    continue;
                }
                match self.potential_r3_step(p, obs, x, queue) {
                    None => return false,
                    Some(fired) => changed |= fired,
                }
            }
            if !changed {
                break;
            }
        }
        for x in self.core.graph().node_ids().collect::<Vec<_>>() {
            if obs_set.contains(&x) {
                continue;
            }
            for &(p, obs) in &observers {
                if self.potential_r3_step(p, obs, x, queue).is_none() {
                    return false;
                }
            }
        }
        true
    }

    /// One R3 application from observer `obs` (of `p`) to the potentials of
    /// `x`. Returns whether something changed, or `None` when the verdict
    /// settled.
    fn potential_r3_step(
        &mut self,
        p: Proposition,
        obs: NodeId,
        x: NodeId,
        queue: &mut NodesToCheck,
    ) -> Option<bool> {
        let obs_potential: Vec<(Label, Weight)> =
            self.core.graph().node(obs).potential().iter().collect();
        let x_potential: Vec<(Label, Weight)> =
            self.core.graph().node(x).potential().iter().collect();
        let mut scratch = HashSet::new();
        let mut changed = false;
        for (&(alpha, u), &(beta, v)) in iproduct!(&obs_potential, &x_potential) {
            if !beta.contains_proposition(p) {
                continue;
            }
            let new_label = self
                .core
                .remove_children_of_unknown(alpha.conjunction_extended(beta.remove(p)));
            let new_value = u.max(v);
            if new_value >= 0 {
                continue;
            }
            let before = self.core.status().potential_update_calls;
            if !self.update_potential(x, new_label, new_value, queue, &mut scratch) {
                return None;
            }
            changed |= self.core.status().potential_update_calls > before;
        }
        Some(changed)
    }

    /// The optional forward pass bounding every node from above.
    ///
    /// Upper potentials start at the horizon (0 on Z) and relax along
    /// outgoing edges; an R3 step mirrors the lower-potential one.
    pub fn compute_upper_potentials(&mut self, pl: &mut impl ProgressLog) -> Result<(), CheckError> {
        self.core.init()?;
        let horizon = self.core.horizon();
        let z = self.core.graph().z().expect("init ensures Z");
        let graph = self.core.graph_mut();
        for x in graph.node_ids().collect::<Vec<_>>() {
            graph.node_mut(x).upper_potential_mut().clear();
            let seed = if x == z { 0 } else { horizon };
            graph.node_mut(x).upper_potential_mut().put(Label::empty(), seed);
        }

        let mut queue = NodesToCheck::new();
        queue.push(z);
        pl.item_name("node");
        pl.start("Relaxing upper potentials...");
        while let Some(a) = queue.pop() {
            pl.light_update();
            let a_upper: Vec<(Label, Weight)> = self
                .core
                .graph()
                .node(a)
                .upper_potential()
                .iter()
                .collect();
            for e in self.core.graph().out_edges(a).collect::<Vec<_>>() {
                let b = self.core.graph().edge(e).target();
                if b == a {
                    continue;
                }
                let values: Vec<(Label, Weight)> =
                    self.core.graph().edge(e).labeled_values().collect();
                for (&(alpha, v), &(beta, u)) in iproduct!(&values, &a_upper) {
                    let w = sum_overflow_safe(u, v);
                    let Some(gamma) = beta.conjunction(alpha) else {
                        continue;
                    };
                    if self
                        .core
                        .graph_mut()
                        .node_mut(b)
                        .upper_potential_mut()
                        .put(gamma, w)
                    {
                        self.core.status_mut().potential_update_calls += 1;
                        queue.push(b);
                    }
                }
            }
            self.upper_potential_r3(a, &mut queue);
        }
        pl.done();
        Ok(())
    }

    /// R3 on upper potentials, mirroring the lower-potential version.
    fn upper_potential_r3(&mut self, x: NodeId, queue: &mut NodesToCheck) {
        let observers: Vec<(Proposition, NodeId)> = self.core.graph().observers().collect();
        for (p, obs) in observers {
            if obs == x {
                continue;
            }
            let obs_upper: Vec<(Label, Weight)> = self
                .core
                .graph()
                .node(obs)
                .upper_potential()
                .iter()
                .collect();
            let x_upper: Vec<(Label, Weight)> = self
                .core
                .graph()
                .node(x)
                .upper_potential()
                .iter()
                .collect();
            for (&(alpha, u), &(beta, v)) in iproduct!(&obs_upper, &x_upper) {
                if !beta.contains_proposition(p) {
                    continue;
                }
                let Some(new_label) = alpha.conjunction(beta.remove(p)) else {
                    continue;
                };
                let new_value = u.max(v);
                if self
                    .core
                    .graph_mut()
                    .node_mut(x)
                    .upper_potential_mut()
                    .put(new_label, new_value)
                {
                    self.core.status_mut().potential_update_calls += 1;
                    queue.push(x);
                }
            }
        }
    }
}

/// A `HashMap` keyed alias retained for readability in callers that inspect
/// potentials by node name.
pub type PotentialsByName = HashMap<String, LabeledIntMap>;

/// Extracts the potentials of a graph keyed by node name.
pub fn potentials_by_name(graph: &TNGraph) -> PotentialsByName {
    graph
        .node_ids()
        .map(|x| (graph.node(x).name().to_owned(), graph.node(x).potential().clone()))
        .collect()
}
