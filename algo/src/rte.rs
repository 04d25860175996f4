/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Real-time execution of dispatchable STNUs.
//!
//! The executor simulates the dispatch of a network against an adversarial
//! environment: at each step the controller proposes an instant and a set of
//! enabled time-points to execute, the environment decides which active
//! contingents occur and when, and whichever comes first is committed. Both
//! sides choose through interchangeable [`Strategy`] values.

use crate::cstnu::init_contingents;
use crate::error::CheckError;
use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;
use tempnet::arith::{is_finite, Weight, INF};
use tempnet::graph::{ConstraintType, ContingentLink, NodeId, TNGraph};
use tempnet::labels::ALetter;
use tempnet::utils::AddressableHeap;

/// A time-selection policy, usable by the controller and by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Execute as early as the window allows.
    Early,
    /// Execute at the middle of the window.
    Middle,
    /// Execute as late as the window allows.
    Late,
    /// Execute at a uniformly random instant of the window.
    Random,
    /// Execute only the node with the minimal lower bound, early.
    FirstNodeEarly,
    /// Execute only the node with the minimal lower bound, at mid-window.
    FirstNodeMiddle,
    /// Execute only the node with the minimal lower bound, late.
    FirstNodeLate,
}

impl Strategy {
    fn first_node_only(self) -> bool {
        matches!(
            self,
            Strategy::FirstNodeEarly | Strategy::FirstNodeMiddle | Strategy::FirstNodeLate
        )
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "early" => Ok(Strategy::Early),
            "middle" => Ok(Strategy::Middle),
            "late" => Ok(Strategy::Late),
            "random" => Ok(Strategy::Random),
            "first-node-early" => Ok(Strategy::FirstNodeEarly),
            "first-node-middle" => Ok(Strategy::FirstNodeMiddle),
            "first-node-late" => Ok(Strategy::FirstNodeLate),
            _ => Err(format!("unknown strategy {s:?}")),
        }
    }
}

/// An error raised during execution.
#[derive(Error, Debug)]
pub enum RteError {
    #[error("deadlock: {0}")]
    Deadlock(String),
    #[error("node {0} has an empty execution window")]
    Unschedulable(String),
    #[error("execution did not settle within the step bound")]
    StepBoundExceeded,
    #[error(transparent)]
    Malformed(#[from] CheckError),
}

/// The schedule produced by an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RteResult {
    schedule: HashMap<String, Weight>,
}

impl RteResult {
    pub fn time_of(&self, name: &str) -> Option<Weight> {
        self.schedule.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Weight)> {
        self.schedule.iter().map(|(n, &t)| (n.as_str(), t))
    }
}

impl core::fmt::Display for RteResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut entries: Vec<(&str, Weight)> = self.iter().collect();
        entries.sort_by_key(|&(name, t)| (t, name.to_owned()));
        for (name, t) in entries {
            writeln!(f, "{name} = {t}")?;
        }
        Ok(())
    }
}

/// The real-time executor.
pub struct RealTimeExecutor {
    graph: TNGraph,
    links: HashMap<ALetter, ContingentLink>,
    controller: Strategy,
    environment: Strategy,
    rng: SmallRng,
    schedule: HashMap<NodeId, Weight>,
    time_window: HashMap<NodeId, (Weight, Weight)>,
    /// Per node, a heap of (contingent letter → wait-lift instant).
    active_waits: HashMap<NodeId, AddressableHeap<Weight>>,
    glb: AddressableHeap<Weight>,
    gub: AddressableHeap<Weight>,
    enabled: HashSet<NodeId>,
    /// Currently active contingents with their execution windows.
    active_contingents: HashMap<ALetter, (Weight, Weight)>,
    current_time: Weight,
}

/// The controller decision of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Wait,
    Execute { time: Weight, nodes: Vec<NodeId> },
}

impl RealTimeExecutor {
    pub fn new(graph: TNGraph, controller: Strategy, environment: Strategy) -> Self {
        Self::with_seed(graph, controller, environment, 0x5eed)
    }

    pub fn with_seed(
        graph: TNGraph,
        controller: Strategy,
        environment: Strategy,
        seed: u64,
    ) -> Self {
        Self {
            graph,
            links: HashMap::new(),
            controller,
            environment,
            rng: SmallRng::seed_from_u64(seed),
            schedule: HashMap::new(),
            time_window: HashMap::new(),
            active_waits: HashMap::new(),
            glb: AddressableHeap::new(),
            gub: AddressableHeap::new(),
            enabled: HashSet::new(),
            active_contingents: HashMap::new(),
            current_time: 0,
        }
    }

    pub fn graph(&self) -> &TNGraph {
        &self.graph
    }

    /// Runs the execution to completion and returns the schedule.
    pub fn execute(&mut self) -> Result<RteResult, RteError> {
        self.links = init_contingents(&mut self.graph, true)?;
        let z = self
            .graph
            .z()
            .ok_or_else(|| RteError::Deadlock("the network has no zero time-point".into()))?;
        for x in self.graph.node_ids() {
            self.time_window.insert(x, (0, INF));
        }
        self.execute_node(z, 0);

        // Each iteration commits at least one execution, except pure waits;
        // 4·|V| is far beyond any dispatchable run.
        let mut budget = 4 * self.graph.num_nodes() + 4;
        while self.schedule.len() < self.graph.num_nodes() {
            if budget == 0 {
                return Err(RteError::StepBoundExceeded);
            }
            budget -= 1;
            self.refresh_enabled();
            let decision = self.decide()?;
            let observation = self.observe(&decision)?;
            self.update(decision, observation)?;
        }
        let mut result = RteResult::default();
        for (&node, &t) in &self.schedule {
            result
                .schedule
                .insert(self.graph.node(node).name().to_owned(), t);
        }
        Ok(result)
    }

    /// Whether `node` is currently blocked by a wait on an active contingent.
    fn is_waiting(&self, node: NodeId) -> bool {
        self.active_waits.get(&node).is_some_and(|waits| {
            waits.iter().any(|(letter, lift)| {
                self.active_contingents
                    .contains_key(&ALetter::from_index(letter))
                    && lift > self.current_time
            })
        })
    }

    /// Recomputes the enabled set and the glb/gub heaps.
    ///
    /// A node is enabled when it is unexecuted, not contingent, every
    /// non-positive outgoing requirement points to an executed node, and no
    /// wait blocks it.
    fn refresh_enabled(&mut self) {
        self.enabled.clear();
        for n in self.graph.node_ids().collect::<Vec<_>>() {
            let executed = self.schedule.contains_key(&n);
            let eligible = !executed && !self.graph.node(n).is_contingent() && {
                let gated = self.graph.out_edges(n).any(|e| {
                    let edge = self.graph.edge(e);
                    if edge.constraint_type() == ConstraintType::Contingent {
                        return false;
                    }
                    edge.min_labeled_value()
                        .is_some_and(|v| v <= 0 && !self.schedule.contains_key(&edge.target()))
                });
                !gated && !self.is_waiting(n)
            };
            if eligible {
                self.enabled.insert(n);
                let (lb, ub) = self.time_window[&n];
                let lb = lb.max(self.current_time);
                self.glb.push(n, lb);
                self.gub.push(n, ub);
            } else {
                self.glb.remove(n);
                self.gub.remove(n);
            }
        }
    }

    /// Picks an instant in `[lo, hi]` according to `strategy`.
    fn pick_time(&mut self, strategy: Strategy, lo: Weight, hi: Weight) -> Weight {
        let hi = if is_finite(hi) { hi } else { lo };
        if hi <= lo {
            return lo;
        }
        match strategy {
            Strategy::Early | Strategy::FirstNodeEarly => lo,
            Strategy::Late | Strategy::FirstNodeLate => hi,
            Strategy::Middle | Strategy::FirstNodeMiddle => lo + (hi - lo) / 2,
            Strategy::Random => self.rng.random_range(lo..=hi),
        }
    }

    /// Phase 1: the controller proposes an instant and a set of nodes.
    fn decide(&mut self) -> Result<Decision, RteError> {
        if self.enabled.is_empty() {
            return Ok(Decision::Wait);
        }
        let (first, glb_min) = self.glb.peek().unwrap();
        let (_, gub_min) = self.gub.peek().unwrap();
        let lo = glb_min.max(self.current_time);
        if gub_min < lo {
            let name = self.graph.node(self.gub.peek().unwrap().0).name().to_owned();
            return Err(RteError::Unschedulable(name));
        }
        if self.controller.first_node_only() {
            let (node_lo, ub) = self.time_window[&first];
            let node_lo = node_lo.max(self.current_time);
            let time = self.pick_time(self.controller, node_lo, ub.min(gub_min));
            return Ok(Decision::Execute {
                time,
                nodes: vec![first],
            });
        }
        let time = self.pick_time(self.controller, lo, gub_min);
        let nodes: Vec<NodeId> = self
            .enabled
            .iter()
            .copied()
            .filter(|n| {
                let (lb, ub) = self.time_window[n];
                lb.max(self.current_time) <= time && time <= ub
            })
            .collect();
        Ok(Decision::Execute { time, nodes })
    }

    /// Phase 2: the environment chooses which active contingents occur.
    fn observe(
        &mut self,
        decision: &Decision,
    ) -> Result<Option<(Weight, Vec<ALetter>)>, RteError> {
        if self.active_contingents.is_empty() {
            if matches!(decision, Decision::Wait) {
                return Err(RteError::Deadlock(
                    "nothing is enabled and no contingent is active".into(),
                ));
            }
            return Ok(None);
        }
        let lo_min = self
            .active_contingents
            .values()
            .map(|&(lo, _)| lo)
            .min()
            .unwrap();
        let hi = self
            .active_contingents
            .values()
            .map(|&(_, hi)| hi)
            .min()
            .unwrap();
        let lo = lo_min.max(self.current_time);
        let time = self.pick_time(self.environment, lo, hi.max(lo));

        if let Decision::Execute { time: chosen, .. } = decision {
            if time > *chosen {
                return Ok(None);
            }
        }
        let mut eligible: Vec<ALetter> = self
            .active_contingents
            .iter()
            .filter(|&(_, &(lo, _))| lo <= time)
            .map(|(&letter, _)| letter)
            .collect();
        eligible.sort();
        let picked = if self.environment == Strategy::Random {
            let mut picked: Vec<ALetter> = eligible
                .iter()
                .copied()
                .filter(|letter| {
                    // Forced when the upper bound is reached.
                    self.active_contingents[letter].1 == time || self.rng.random_bool(0.5)
                })
                .collect();
            if picked.is_empty() {
                picked.push(eligible[0]);
            }
            picked
        } else {
            eligible
        };
        Ok(Some((time, picked)))
    }

    /// Phase 3: commits whichever of observation and decision comes first.
    fn update(
        &mut self,
        decision: Decision,
        observation: Option<(Weight, Vec<ALetter>)>,
    ) -> Result<(), RteError> {
        match (decision, observation) {
            (Decision::Wait, Some((time, letters))) => {
                self.execute_contingents(time, &letters);
            }
            (Decision::Wait, None) => unreachable!("observe() rejects this case"),
            (Decision::Execute { time, nodes }, Some((obs_time, letters)))
                if obs_time <= time =>
            {
                self.execute_contingents(obs_time, &letters);
                if obs_time == time {
                    self.execute_controller_nodes(time, &nodes);
                }
            }
            (Decision::Execute { time, nodes }, _) => {
                self.execute_controller_nodes(time, &nodes);
            }
        }
        Ok(())
    }

    fn execute_contingents(&mut self, time: Weight, letters: &[ALetter]) {
        for &letter in letters {
            let link = self.links[&letter];
            debug!(
                "environment: {} occurs at {time}",
                self.graph.node(link.contingent).name()
            );
            self.execute_node(link.contingent, time);
        }
        self.current_time = time;
    }

    fn execute_controller_nodes(&mut self, time: Weight, nodes: &[NodeId]) {
        for &n in nodes {
            if self.schedule.contains_key(&n) {
                continue;
            }
            // A sibling executed in this batch may have tightened the window.
            let (lb, ub) = self.time_window[&n];
            if lb.max(self.current_time) > time || time > ub {
                continue;
            }
            debug!("controller: {} executes at {time}", self.graph.node(n).name());
            self.execute_node(n, time);
        }
        self.current_time = time;
    }

    /// Commits `node` at `time`, updating neighbour windows, waits and
    /// contingent activations.
    fn execute_node(&mut self, node: NodeId, time: Weight) {
        self.schedule.insert(node, time);
        self.glb.remove(node);
        self.gub.remove(node);
        self.enabled.remove(&node);

        for e in self.graph.out_edges(node).collect::<Vec<_>>() {
            // Waits are handled at activation time; only the ordinary part
            // of an edge tightens windows here.
            let edge = self.graph.edge(e);
            if edge.constraint_type() == ConstraintType::Contingent {
                continue;
            }
            let Some(v) = edge.min_labeled_value() else {
                continue;
            };
            if !is_finite(v) {
                continue;
            }
            let m = edge.target();
            if self.schedule.contains_key(&m) {
                continue;
            }
            let entry = self.time_window.get_mut(&m).unwrap();
            entry.1 = entry.1.min(time + v);
            trace!("window of {} is now {entry:?}", self.graph.node(m).name());
        }
        for e in self.graph.in_edges(node).collect::<Vec<_>>() {
            let edge = self.graph.edge(e);
            if edge.constraint_type() == ConstraintType::Contingent {
                continue;
            }
            let Some(v) = edge.min_labeled_value() else {
                continue;
            };
            if !is_finite(v) {
                continue;
            }
            let m = edge.source();
            if self.schedule.contains_key(&m) {
                continue;
            }
            let lower = time - v;
            if lower > 0 {
                let entry = self.time_window.get_mut(&m).unwrap();
                entry.0 = entry.0.max(lower);
            }
        }

        // Activating a contingent link opens its window and arms the waits
        // pointing at the activation node.
        let activated: Vec<ContingentLink> = self
            .links
            .values()
            .filter(|l| l.activation == node && !self.schedule.contains_key(&l.contingent))
            .copied()
            .collect();
        for link in activated {
            self.active_contingents
                .insert(link.letter, (time + link.lower, time + link.upper));
            for e in self.graph.in_edges(node).collect::<Vec<_>>() {
                let edge = self.graph.edge(e);
                let s = edge.source();
                if self.schedule.contains_key(&s) {
                    continue;
                }
                for (letter, _, v) in edge.waits().collect::<Vec<_>>() {
                    if letter != link.letter {
                        continue;
                    }
                    let lift = time - v;
                    self.active_waits
                        .entry(s)
                        .or_default()
                        .push(letter.index(), lift);
                    trace!(
                        "wait ({letter}, {lift}) armed on {}",
                        self.graph.node(s).name()
                    );
                }
            }
        }

        // An executed contingent releases every wait on its letter.
        if let Some(letter) = self.graph.node(node).contingent_letter() {
            self.active_contingents.remove(&letter);
            for waits in self.active_waits.values_mut() {
                waits.remove(letter.index());
            }
        }
    }
}

/// Whether `result` satisfies every requirement constraint and every
/// contingent bound of `graph`.
pub fn is_a_viable_schedule(graph: &TNGraph, result: &RteResult) -> bool {
    let time = |node: NodeId| result.time_of(graph.node(node).name());
    for id in graph.node_ids() {
        if time(id).is_none() {
            return false;
        }
    }
    for e in graph.edge_ids() {
        let edge = graph.edge(e);
        if edge.constraint_type() == ConstraintType::Contingent {
            continue;
        }
        let (u, v) = (edge.source(), edge.target());
        let (tu, tv) = (time(u).unwrap(), time(v).unwrap());
        for (_, w) in edge.labeled_values() {
            if is_finite(w) && tv - tu > w {
                return false;
            }
        }
    }
    for e in graph.lower_case_edges() {
        let edge = graph.edge(e);
        let lc = edge.lower_case().unwrap();
        let (a, c) = (edge.source(), edge.target());
        let d = time(c).unwrap() - time(a).unwrap();
        let upper = edge.value(lc.label).unwrap_or(INF);
        if d < lc.value || (is_finite(upper) && d > upper) {
            return false;
        }
    }
    true
}
