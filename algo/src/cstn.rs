/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::error::CheckError;
use crate::semantics::Semantics;
use crate::status::CheckStatus;
use dsi_progress_logger::ProgressLog;
use itertools::iproduct;
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tempnet::arith::{is_finite, sum_overflow_safe, Weight, NEG_INF};
use tempnet::graph::{ConstraintType, EdgeId, Node, NodeId, TNGraph};
use tempnet::labels::{Label, Proposition};
use tempnet::utils::EdgesToCheck;

/// The number of propositions past which label sets are considered
/// intractable.
const MAX_CHECKABLE_PROPOSITIONS: usize = 22;

/// A checker for conditional simple temporal networks.
///
/// The checker owns its graph for the duration of a check. It implements the
/// labeled propagation rule (LP/qLP) and the two label-modification rules
/// (R0/qR0, R3/qR3), and drives them to a fixed point either over the whole
/// edge set or restricted to pairs ending at Z.
pub struct CstnChecker {
    graph: TNGraph,
    semantics: Semantics,
    status: CheckStatus,
    horizon: Weight,
    max_cycles: u64,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    /// Observation-to-Z edges, resolved once at init. Valid for the whole
    /// check since edges are never removed during propagation.
    obs_to_z: HashMap<Proposition, EdgeId>,
    initialized: bool,
}

impl CstnChecker {
    pub fn new(graph: TNGraph) -> Self {
        Self::with_semantics(graph, Semantics::default())
    }

    pub fn with_semantics(graph: TNGraph, semantics: Semantics) -> Self {
        Self {
            graph,
            semantics,
            status: CheckStatus::default(),
            horizon: 0,
            max_cycles: u64::MAX,
            timeout: None,
            deadline: None,
            obs_to_z: HashMap::new(),
            initialized: false,
        }
    }

    /// Sets the wall-clock budget of the next check.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn graph(&self) -> &TNGraph {
        &self.graph
    }

    /// Releases the (possibly minimized) graph.
    pub fn into_graph(self) -> TNGraph {
        self.graph
    }

    pub fn status(&self) -> &CheckStatus {
        &self.status
    }

    pub fn semantics(&self) -> &Semantics {
        &self.semantics
    }

    /// The horizon computed by [`init`](Self::init).
    pub fn horizon(&self) -> Weight {
        self.horizon
    }

    pub(crate) fn status_mut(&mut self) -> &mut CheckStatus {
        &mut self.status
    }

    pub(crate) fn graph_mut(&mut self) -> &mut TNGraph {
        &mut self.graph
    }

    /// Checks structural sanity and prepares the auxiliary constraints.
    ///
    /// After a successful init the graph has a zero time-point, every other
    /// node is bounded by it (a zero edge toward Z and a horizon edge from
    /// Z), and every labeled value honors well-definedness.
    pub fn init(&mut self) -> Result<(), CheckError> {
        if self.initialized {
            return Ok(());
        }
        let z = match self.graph.z() {
            Some(z) => z,
            None => {
                info!("no zero time-point found: adding Z");
                self.graph.add_node(Node::new(tempnet::graph::ZERO_NODE_NAME))?
            }
        };

        let props = self.graph.propositions();
        if props.len() > MAX_CHECKABLE_PROPOSITIONS {
            return Err(CheckError::TooManyPropositions(props.len()));
        }
        for p in &props {
            if self.graph.observer(*p).is_none() {
                return Err(CheckError::WellDefinedness(format!(
                    "proposition {p} has no observation time-point"
                )));
            }
        }
        for (p, obs) in self.graph.observers().collect::<Vec<_>>() {
            if self.graph.node(obs).label().contains_proposition(p) {
                return Err(CheckError::WellDefinedness(format!(
                    "the label of observation node {} mentions its own proposition {p}",
                    self.graph.node(obs).name()
                )));
            }
        }

        let max_weight = self.graph.max_absolute_value();
        let horizon = max_weight as i64 * (self.graph.num_nodes() as i64 - 1).max(1);
        if horizon >= tempnet::arith::INF as i64 {
            return Err(CheckError::HorizonOverflow(horizon));
        }
        self.horizon = horizon as Weight;
        debug!("horizon: {}", self.horizon);

        self.check_well_definedness()?;

        // Z precedes every node; the horizon bounds every node.
        for x in self.graph.node_ids().collect::<Vec<_>>() {
            if x == z {
                continue;
            }
            let label = if self.semantics.with_node_labels {
                self.graph.node(x).label()
            } else {
                Label::empty()
            };
            let e = self.graph.find_or_add_edge(x, z);
            self.graph.edge_mut(e).merge_labeled_value(label, 0);
            let e = self.graph.find_or_add_edge(z, x);
            if self.graph.edge(e).constraint_type() == ConstraintType::Derived {
                self.graph
                    .edge_mut(e)
                    .set_constraint_type(ConstraintType::Internal);
            }
            self.graph.edge_mut(e).merge_labeled_value(label, self.horizon);
        }

        for (p, obs) in self.graph.observers().collect::<Vec<_>>() {
            if let Some(e) = self.graph.find_edge(obs, z) {
                self.obs_to_z.insert(p, e);
            }
        }

        let n = self.graph.num_nodes() as u64;
        let p = (props.len() as u64).max(1);
        let k = (self
            .graph
            .node_ids()
            .filter(|&x| self.graph.node(x).is_contingent())
            .count() as u64)
            .max(1);
        self.max_cycles = (max_weight.max(1) as u64)
            .saturating_mul(n * n)
            .saturating_mul(p * p * p)
            .saturating_mul(k * k);

        self.initialized = true;
        Ok(())
    }

    /// Verifies (or repairs) the labels of every labeled value.
    fn check_well_definedness(&mut self) -> Result<(), CheckError> {
        if !self.semantics.with_node_labels {
            return Ok(());
        }
        for e in self.graph.edge_ids().collect::<Vec<_>>() {
            let (s, d) = {
                let edge = self.graph.edge(e);
                (edge.source(), edge.target())
            };
            let endpoints = self
                .graph
                .node(s)
                .label()
                .conjunction(self.graph.node(d).label())
                .ok_or_else(|| {
                    CheckError::WellDefinedness(format!(
                        "nodes {} and {} have inconsistent labels but are connected",
                        self.graph.node(s).name(),
                        self.graph.node(d).name()
                    ))
                })?;
            let values: Vec<(Label, Weight)> = self.graph.edge(e).labeled_values().collect();
            for (label, value) in values {
                if label.subsumes(endpoints) {
                    continue;
                }
                if !self.semantics.fix_labels {
                    return Err(CheckError::WellDefinedness(format!(
                        "value ({value}, {label}) on edge {} does not honor the endpoint labels",
                        self.graph.edge(e).name()
                    )));
                }
                let fixed = label.conjunction(endpoints).ok_or_else(|| {
                    CheckError::WellDefinedness(format!(
                        "value ({value}, {label}) on edge {} is inconsistent with the endpoint labels",
                        self.graph.edge(e).name()
                    ))
                })?;
                warn!(
                    "replacing dishonest label {label} with {fixed} on edge {}",
                    self.graph.edge(e).name()
                );
                let edge = self.graph.edge_mut(e);
                edge.values_mut().remove(tempnet::labels::ALabel::empty(), label);
                edge.merge_labeled_value(fixed, value);
            }
        }
        Ok(())
    }

    /// The propositions observed by nodes whose own label mentions `p`.
    pub(crate) fn children_of(&self, p: Proposition) -> Vec<Proposition> {
        self.graph
            .observers()
            .filter(|&(_, obs)| self.graph.node(obs).label().contains_proposition(p))
            .map(|(q, _)| q)
            .collect()
    }

    /// Removes, for every unknown literal of `label`, the children of its
    /// proposition.
    pub(crate) fn remove_children_of_unknown(&self, label: Label) -> Label {
        let mut result = label;
        for literal in label.literals() {
            if literal.state == tempnet::labels::State::Unknown {
                result = result.remove_all(self.children_of(literal.proposition));
            }
        }
        result
    }

    /// Rule R0/qR0 applied to every entry of the edge `e`, which must leave
    /// an observation node.
    ///
    /// An entry `(αp, w)` with a non-positive `w` does not depend on the
    /// outcome of `p`, since the constraint binds before the observation is
    /// answered: the literal on `p` (and the children of `p`) can be dropped.
    pub(crate) fn apply_r0(&mut self, e: EdgeId) -> bool {
        let (source, target) = {
            let edge = self.graph.edge(e);
            (edge.source(), edge.target())
        };
        let Some(p) = self.graph.node(source).observed() else {
            return false;
        };
        let is_z = Some(target) == self.graph.z();
        let mut changed = false;
        let entries: Vec<(Label, Weight)> = self.graph.edge(e).labeled_values().collect();
        for (label, value) in entries {
            if !label.contains_proposition(p) || self.semantics.skip_in_r0(value) {
                continue;
            }
            if label.contains_unknown() && !is_z {
                continue;
            }
            let mut new_label = label.remove(p).remove_all(self.children_of(p));
            if is_z {
                new_label = self.remove_children_of_unknown(new_label);
            }
            if self.graph.edge_mut(e).merge_labeled_value(new_label, value) {
                trace!(
                    "R0: ({value}, {label}) → ({value}, {new_label}) on {}",
                    self.graph.edge(e).name()
                );
                self.status.r0_calls += 1;
                changed = true;
            }
        }
        changed
    }

    /// The R3 label simplification when the destination is not Z.
    fn make_alpha_beta_gamma_prime(
        &self,
        s: NodeId,
        d: NodeId,
        gamma: Label,
        beta: Label,
        p: Proposition,
    ) -> Option<Label> {
        let gamma_prime = gamma.remove(p).remove_all(self.children_of(p));
        let beta_prime = beta.remove(p);
        let mut result = gamma_prime.conjunction(beta_prime)?;
        if self.semantics.with_node_labels {
            result = result
                .remove_all(self.graph.node(s).label().propositions())
                .remove_all(self.graph.node(d).label().propositions());
        }
        Some(result)
    }

    /// The qR3 label simplification when the destination is Z.
    fn make_beta_gamma_dagger(&self, gamma: Label, beta: Label, p: Proposition) -> Label {
        let gamma_prime = gamma.remove(p).remove_all(self.children_of(p));
        let result = gamma_prime.conjunction_extended(beta.remove(p));
        self.remove_children_of_unknown(result)
    }

    /// Rule R3/qR3 applied to every entry of the edge `e` (S→D), using every
    /// observation edge toward D.
    pub(crate) fn apply_r3(&mut self, e: EdgeId) -> bool {
        let (s, d) = {
            let edge = self.graph.edge(e);
            (edge.source(), edge.target())
        };
        let is_z = Some(d) == self.graph.z();
        let mut changed = false;
        for (p, obs) in self.graph.observers().collect::<Vec<_>>() {
            if obs == s || obs == d {
                continue;
            }
            let e_obs_d = if is_z {
                self.obs_to_z.get(&p).copied()
            } else {
                self.graph.find_edge(obs, d)
            };
            let Some(e_obs_d) = e_obs_d else {
                continue;
            };
            let obs_values: Vec<(Label, Weight)> =
                self.graph.edge(e_obs_d).labeled_values().collect();
            let entries: Vec<(Label, Weight)> = self.graph.edge(e).labeled_values().collect();
            for (gamma, w) in &obs_values {
                if self.semantics.skip_in_r3(*w, is_z) {
                    continue;
                }
                for (beta, v) in &entries {
                    if !beta.contains_proposition(p) {
                        continue;
                    }
                    let new_value = (*w).max(*v);
                    let new_label = if is_z {
                        self.make_beta_gamma_dagger(*gamma, *beta, p)
                    } else {
                        match self.make_alpha_beta_gamma_prime(s, d, *gamma, *beta, p) {
                            Some(label) => label,
                            None => continue,
                        }
                    };
                    if self
                        .graph
                        .edge_mut(e)
                        .merge_labeled_value(new_label, new_value)
                    {
                        trace!(
                            "R3: ({v}, {beta}) + obs ({w}, {gamma}) → ({new_value}, {new_label}) on {}",
                            self.graph.edge(e).name()
                        );
                        self.status.r3_calls += 1;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Applies R0 and R3 to `e` alternating until neither fires.
    ///
    /// R3 can add values that R0 must minimize again, so a single pass of
    /// each is not enough.
    pub(crate) fn apply_r0_r3(&mut self, e: EdgeId) -> bool {
        let mut changed = false;
        loop {
            let fired = self.apply_r0(e) | self.apply_r3(e);
            changed |= fired;
            if !fired {
                return changed;
            }
        }
    }

    /// The label-propagation rule applied to the pair `e1` (A→B), `e2` (B→C).
    ///
    /// Every derivation with a strictly negative overflow-safe sum lands on
    /// the A→C edge; consistent negative self loops settle the verdict, and
    /// q-loops record −∞ under their unknown label. Modified edges are pushed
    /// on `touched`.
    pub(crate) fn apply_lp(&mut self, e1: EdgeId, e2: EdgeId, touched: &mut EdgesToCheck) {
        let (a, b) = {
            let edge = self.graph.edge(e1);
            (edge.source(), edge.target())
        };
        let c = self.graph.edge(e2).target();
        debug_assert_eq!(b, self.graph.edge(e2).source());
        let z = self.graph.z();

        let first: Vec<(Label, Weight)> = self.graph.edge(e1).labeled_values().collect();
        let second: Vec<(Label, Weight)> = self.graph.edge(e2).labeled_values().collect();
        let mut merged = false;
        for (&(alpha, u), &(beta, v)) in iproduct!(&first, &second) {
            let sum = sum_overflow_safe(u, v);
            if sum >= 0 {
                continue;
            }
            let gamma = if self.semantics.must_restrict_to_consistent_label(u, v) {
                match alpha.conjunction(beta) {
                    Some(gamma) => gamma,
                    None => continue,
                }
            } else {
                let gamma = alpha.conjunction_extended(beta);
                if gamma.contains_unknown() {
                    self.remove_children_of_unknown(gamma)
                } else {
                    gamma
                }
            };
            if a == c {
                if !gamma.contains_unknown() {
                    debug!(
                        "negative self loop of value {sum} under {gamma} at {}",
                        self.graph.node(a).name()
                    );
                    let name = self.graph.node(a).name().to_owned();
                    self.status.negative_loop(name);
                    return;
                }
                // A q-loop: a conflict conditional on unresolved
                // propositions.
                let e_loop = self.graph.find_or_add_edge(a, a);
                if self.graph.edge_mut(e_loop).merge_labeled_value(gamma, NEG_INF) {
                    self.status.lp_calls += 1;
                    touched.push(e_loop);
                }
                continue;
            }
            if gamma.contains_unknown() && Some(c) != z {
                continue;
            }
            let e_ac = self.graph.find_or_add_edge(a, c);
            if self.graph.edge_mut(e_ac).merge_labeled_value(gamma, sum) {
                trace!(
                    "LP: ({u}, {alpha}) + ({v}, {beta}) → ({sum}, {gamma}) on {}",
                    self.graph.edge(e_ac).name()
                );
                self.status.lp_calls += 1;
                touched.push(e_ac);
                merged = true;
            }
        }
        if merged {
            let e_ac = self.graph.find_or_add_edge(a, c);
            if self.graph.node(a).is_observer() {
                self.apply_r0(e_ac);
            }
            self.apply_local_r3_at_zero(e_ac, c);
        }
    }

    /// After a merge on A→C where C observes `p`, entries conditioned on
    /// `¬p`/`¿p` may be rewritten at value 0: the observation itself answers
    /// the condition no later than C.
    fn apply_local_r3_at_zero(&mut self, e: EdgeId, c: NodeId) {
        let Some(p) = self.graph.node(c).observed() else {
            return;
        };
        let is_z = Some(c) == self.graph.z();
        if self.semantics.skip_in_r3(0, is_z) {
            return;
        }
        let entries: Vec<(Label, Weight)> = self.graph.edge(e).labeled_values().collect();
        for (label, value) in entries {
            let depends_on_p = matches!(
                label.state_of(p),
                Some(tempnet::labels::State::Negated) | Some(tempnet::labels::State::Unknown)
            );
            if !depends_on_p || value >= 0 {
                continue;
            }
            let new_label = label.remove(p).remove_all(self.children_of(p));
            if self
                .graph
                .edge_mut(e)
                .merge_labeled_value(new_label, value.max(0))
            {
                self.status.r3_calls += 1;
            }
        }
    }

    /// Whether the deadline expired; settles the status if so.
    pub(crate) fn deadline_expired(&mut self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                warn!("deadline expired, stopping");
                self.status.timeout = true;
                return true;
            }
        }
        false
    }

    pub(crate) fn arm_deadline(&mut self, start: Instant) {
        self.deadline = self.timeout.map(|t| start + t);
    }

    pub(crate) fn max_cycles(&self) -> u64 {
        self.max_cycles
    }

    /// Decides dynamic consistency by the edge-by-edge fixed point.
    ///
    /// When the semantics set `propagation_only_to_z`, only edge pairs whose
    /// second component ends at Z are propagated: faster on consistent
    /// instances, but the resulting graph carries less information.
    pub fn dynamic_consistency_check(
        &mut self,
        pl: &mut impl ProgressLog,
    ) -> Result<&CheckStatus, CheckError> {
        let start = Instant::now();
        self.init()?;
        self.arm_deadline(start);
        let z = self.graph.z();
        let only_to_z = self.semantics.propagation_only_to_z;

        let mut to_check: EdgesToCheck = self.graph.edge_ids().collect();
        pl.item_name("edge");
        pl.start("Propagating labeled values...");
        'check: while !to_check.is_empty() && !self.status.is_settled() {
            self.status.cycles += 1;
            if self.status.cycles > self.max_cycles {
                warn!("cycle bound {} reached", self.max_cycles);
                self.status.consistency = false;
                break;
            }
            let mut touched = EdgesToCheck::new();
            while let Some(e) = to_check.pop() {
                if !self.graph.has_edge(e) {
                    continue;
                }
                pl.light_update();
                if self.apply_r0_r3(e) {
                    touched.push(e);
                }
                let (a, b) = {
                    let edge = self.graph.edge(e);
                    (edge.source(), edge.target())
                };
                for e2 in self.graph.out_edges(b).collect::<Vec<_>>() {
                    if only_to_z && Some(self.graph.edge(e2).target()) != z {
                        continue;
                    }
                    self.apply_lp(e, e2, &mut touched);
                    if self.status.is_settled() {
                        break 'check;
                    }
                }
                if !only_to_z || Some(b) == z {
                    for e0 in self.graph.in_edges(a).collect::<Vec<_>>() {
                        if e0 == e {
                            continue;
                        }
                        self.apply_lp(e0, e, &mut touched);
                        if self.status.is_settled() {
                            break 'check;
                        }
                    }
                }
                if self.deadline_expired() {
                    break 'check;
                }
            }
            debug!(
                "cycle {}: {} edges to reconsider",
                self.status.cycles,
                touched.len()
            );
            to_check = touched;
        }
        if !self.status.is_settled() && to_check.is_empty() {
            self.status.finish(true);
        }
        self.status.execution_time = Some(start.elapsed());
        pl.done();
        info!("{}", self.status);
        Ok(&self.status)
    }

    /// Strips initialization scaffolding and empty edges from the graph.
    ///
    /// Called after a check to emit the minimized network.
    pub fn clean_graph(&mut self) {
        let ids: Vec<EdgeId> = self.graph.edge_ids().collect();
        for e in ids {
            let edge = self.graph.edge(e);
            if edge.constraint_type() == ConstraintType::Internal || edge.is_empty() {
                self.graph.remove_edge(e);
            }
        }
    }

    /// Sanity check used by tests: no ordinary finite value may exceed the
    /// horizon in absolute value.
    pub fn honors_horizon(&self) -> bool {
        self.graph.edge_ids().all(|e| {
            self.graph
                .edge(e)
                .labeled_values()
                .all(|(_, v)| !is_finite(v) || v.abs() <= self.horizon)
        })
    }
}
