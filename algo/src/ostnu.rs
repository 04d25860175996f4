/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::cstn::CstnChecker;
use crate::cstnu::init_contingents;
use crate::error::CheckError;
use crate::semantics::Semantics;
use crate::status::CheckStatus;
use dsi_progress_logger::ProgressLog;
use itertools::iproduct;
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::time::Instant;
use tempnet::arith::{is_finite, sum_overflow_safe, Weight, NEG_INF};
use tempnet::graph::{ContingentLink, EdgeId, NodeId, TNGraph};
use tempnet::labels::{ALabel, ALetter, Label, Literal, Proposition, MAX_PROPOSITIONS};
use tempnet::utils::EdgesToCheck;

/// An agile-controllability checker for OSTNUs.
///
/// An *oracle* is an observation node whose proposition is the name of a
/// contingent: executing it reveals the contingent outcome, so the controller
/// may branch on it. The oracle rule introduces values conditioned on fresh
/// per-(contingent, node) propositions; lower- and upper-case derivations
/// carry the negated literal, oracle derivations the straight one.
///
/// Consistent negative self loops do not settle the verdict directly: their
/// labels are recorded as *negative scenarios* and every value confined to a
/// negative scenario is dropped. Only the empty negative scenario is fatal.
pub struct OstnuChecker {
    core: CstnChecker,
    links: HashMap<ALetter, ContingentLink>,
    activates: HashMap<NodeId, Vec<ALetter>>,
    oracles: HashMap<ALetter, NodeId>,
    pair_props: HashMap<(ALetter, NodeId), Proposition>,
    pool: Vec<Proposition>,
    next_pool: usize,
    negative_scenarios: Vec<Label>,
    initialized: bool,
}

impl OstnuChecker {
    pub fn new(graph: TNGraph) -> Self {
        Self::with_semantics(graph, Semantics::default())
    }

    pub fn with_semantics(graph: TNGraph, semantics: Semantics) -> Self {
        Self {
            core: CstnChecker::with_semantics(graph, semantics),
            links: HashMap::new(),
            activates: HashMap::new(),
            oracles: HashMap::new(),
            pair_props: HashMap::new(),
            pool: Vec::new(),
            next_pool: 0,
            negative_scenarios: Vec::new(),
            initialized: false,
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

    /// The minimal negative scenarios collected so far.
    pub fn negative_scenarios(&self) -> &[Label] {
        &self.negative_scenarios
    }

    /// The oracle of contingent `letter`, if any.
    pub fn oracle(&self, letter: ALetter) -> Option<NodeId> {
        self.oracles.get(&letter).copied()
    }

    pub fn init(&mut self) -> Result<(), CheckError> {
        if self.initialized {
            return Ok(());
        }
        self.core.init()?;
        let contingent_also_as_ordinary = self.core.semantics().contingent_also_as_ordinary;
        self.links = init_contingents(self.core.graph_mut(), contingent_also_as_ordinary)?;
        for link in self.links.values() {
            self.activates
                .entry(link.activation)
                .or_default()
                .push(link.letter);
        }

        // An observer whose proposition spells a contingent name is an
        // oracle; it must precede its contingent.
        for (p, obs) in self.core.graph().observers().collect::<Vec<_>>() {
            if p.index() >= tempnet::labels::MAX_INPUT_PROPOSITIONS {
                continue;
            }
            let Ok(letter) = ALetter::from_char(p.to_char()) else {
                continue;
            };
            if let Some(link) = self.links.get(&letter).copied() {
                debug!(
                    "oracle {} observes contingent {letter}",
                    self.core.graph().node(obs).name()
                );
                self.oracles.insert(letter, obs);
                let e = self.core.graph_mut().find_or_add_edge(link.contingent, obs);
                self.core
                    .graph_mut()
                    .edge_mut(e)
                    .merge_labeled_value(Label::empty(), 0);
            }
        }

        // The fresh-proposition pool: every proposition not already used by
        // the network, in `a..z, A..F` order.
        let used: Vec<Proposition> = self.core.graph().propositions();
        self.pool = (0..MAX_PROPOSITIONS)
            .map(Proposition::from_index)
            .filter(|p| !used.contains(p))
            .collect();
        self.initialized = true;
        Ok(())
    }

    /// The fresh proposition tied to `(letter, node)`, allocating on demand.
    fn pair_proposition(
        &mut self,
        letter: ALetter,
        node: NodeId,
    ) -> Result<Proposition, CheckError> {
        if let Some(&p) = self.pair_props.get(&(letter, node)) {
            return Ok(p);
        }
        let p = *self
            .pool
            .get(self.next_pool)
            .ok_or(CheckError::PropositionPoolExhausted)?;
        self.next_pool += 1;
        debug!(
            "fresh proposition {p} for contingent {letter} and node {}",
            self.core.graph().node(node).name()
        );
        self.pair_props.insert((letter, node), p);
        Ok(p)
    }

    /// Whether `label` is confined to a recorded negative scenario.
    fn is_moot(&self, label: Label) -> bool {
        self.negative_scenarios.iter().any(|&s| label.subsumes(s))
    }

    /// Records `scenario` keeping the set minimal; the empty scenario means
    /// the network is uncontrollable in every execution.
    fn record_negative_scenario(&mut self, scenario: Label, at: NodeId) {
        if scenario.is_empty() {
            let name = self.core.graph().node(at).name().to_owned();
            self.core.status_mut().negative_loop(name);
            return;
        }
        if self.is_moot(scenario) {
            return;
        }
        debug!("negative scenario {scenario}");
        self.negative_scenarios.retain(|s| !s.subsumes(scenario));
        self.negative_scenarios.push(scenario);
        self.prune_moot_values();
    }

    /// Drops every labeled value confined to a negative scenario.
    fn prune_moot_values(&mut self) {
        let scenarios = self.negative_scenarios.clone();
        let graph = self.core.graph_mut();
        for e in graph.edge_ids().collect::<Vec<_>>() {
            let moot: Vec<(ALabel, Label)> = graph
                .edge(e)
                .values()
                .iter()
                .filter(|&(_, l, _)| scenarios.iter().any(|&s| l.subsumes(s)))
                .map(|(a, l, _)| (a, l))
                .collect();
            let edge = graph.edge_mut(e);
            for (a_label, label) in moot {
                edge.values_mut().remove(a_label, label);
            }
        }
    }

    fn merge_ordinary(
        &mut self,
        e: EdgeId,
        label: Label,
        value: Weight,
        touched: &mut EdgesToCheck,
    ) -> bool {
        if self.is_moot(label) {
            return false;
        }
        if self.core.graph_mut().edge_mut(e).merge_labeled_value(label, value) {
            touched.push(e);
            true
        } else {
            false
        }
    }

    fn merge_upper(
        &mut self,
        e: EdgeId,
        aleph: ALabel,
        label: Label,
        value: Weight,
        touched: &mut EdgesToCheck,
    ) -> bool {
        if self.is_moot(label) {
            return false;
        }
        if self
            .core
            .graph_mut()
            .edge_mut(e)
            .merge_upper_case_value(aleph, label, value)
        {
            touched.push(e);
            true
        } else {
            false
        }
    }

    /// Label propagation with negative-scenario handling: a consistent
    /// negative self loop records its label instead of settling the verdict.
    fn apply_lp(&mut self, e1: EdgeId, e2: EdgeId, touched: &mut EdgesToCheck) {
        let a = self.core.graph().edge(e1).source();
        let c = self.core.graph().edge(e2).target();
        let z = self.core.graph().z();
        let first: Vec<(Label, Weight)> = self.core.graph().edge(e1).labeled_values().collect();
        let second: Vec<(Label, Weight)> = self.core.graph().edge(e2).labeled_values().collect();
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
                if gamma.contains_unknown() {
                    let e_loop = self.core.graph_mut().find_or_add_edge(a, a);
                    if self
                        .core
                        .graph_mut()
                        .edge_mut(e_loop)
                        .merge_labeled_value(gamma, NEG_INF)
                    {
                        self.core.status_mut().lp_calls += 1;
                        touched.push(e_loop);
                    }
                } else {
                    self.record_negative_scenario(gamma, a);
                    if self.core.status().is_settled() {
                        return;
                    }
                }
                continue;
            }
            if gamma.contains_unknown() && Some(c) != z {
                continue;
            }
            let e_ac = self.core.graph_mut().find_or_add_edge(a, c);
            if self.merge_ordinary(e_ac, gamma, sum, touched) {
                self.core.status_mut().lp_calls += 1;
            }
        }
    }

    /// Upper-case propagation carrying `¬p(C, X)` on the derived values.
    fn apply_upper_case(
        &mut self,
        e1: EdgeId,
        e2: EdgeId,
        touched: &mut EdgesToCheck,
    ) -> Result<(), CheckError> {
        let x = self.core.graph().edge(e1).source();
        let w_node = self.core.graph().edge(e2).target();
        let z = self.core.graph().z();
        let first: Vec<(Label, Weight)> = self.core.graph().edge(e1).labeled_values().collect();
        let second: Vec<(ALabel, Label, Weight)> =
            self.core.graph().edge(e2).upper_case_values().collect();
        for (&(alpha, u), &(aleph, beta, v)) in iproduct!(&first, &second) {
            if Some(w_node) != z && aleph.len() > 1 {
                continue;
            }
            let sum = sum_overflow_safe(u, v);
            if x == w_node && sum >= 0 {
                continue;
            }
            let Some(mut gamma) = alpha.conjunction(beta) else {
                continue;
            };
            gamma = self.with_negated_pair_literals(gamma, aleph, x)?;
            if x == w_node {
                if sum < 0 && aleph.is_empty() {
                    self.record_negative_scenario(gamma, x);
                    if self.core.status().is_settled() {
                        return Ok(());
                    }
                }
                continue;
            }
            let e_xw = self.core.graph_mut().find_or_add_edge(x, w_node);
            let merged = if sum >= 0 && aleph.is_empty() {
                self.merge_ordinary(e_xw, gamma, sum, touched)
            } else {
                self.merge_upper(e_xw, aleph, gamma, sum, touched)
            };
            if merged {
                self.core.status_mut().upper_case_calls += 1;
            }
        }
        Ok(())
    }

    /// Lower-case and cross-case propagation carrying `¬p(C, X)`.
    fn apply_lower_cross(
        &mut self,
        e_ac: EdgeId,
        e_cx: EdgeId,
        touched: &mut EdgesToCheck,
    ) -> Result<(), CheckError> {
        let Some(lower_case) = self.core.graph().edge(e_ac).lower_case() else {
            return Ok(());
        };
        if lower_case.value <= 0 {
            return Ok(());
        }
        let a = self.core.graph().edge(e_ac).source();
        let x = self.core.graph().edge(e_cx).target();
        let (alpha, u, letter) = (lower_case.label, lower_case.value, lower_case.letter);

        let ordinary: Vec<(Label, Weight)> = self.core.graph().edge(e_cx).labeled_values().collect();
        for &(beta, v) in &ordinary {
            if v > 0 {
                continue;
            }
            let sum = sum_overflow_safe(u, v);
            if a == x && sum >= 0 {
                continue;
            }
            let Some(mut gamma) = alpha.conjunction(beta) else {
                continue;
            };
            gamma = self.with_negated_pair_literals(gamma, ALabel::from_letter(letter), x)?;
            if a == x {
                self.record_negative_scenario(gamma, a);
                if self.core.status().is_settled() {
                    return Ok(());
                }
                continue;
            }
            let e_ax = self.core.graph_mut().find_or_add_edge(a, x);
            if self.merge_ordinary(e_ax, gamma, sum, touched) {
                self.core.status_mut().lower_case_calls += 1;
            }
        }

        let upper: Vec<(ALabel, Label, Weight)> =
            self.core.graph().edge(e_cx).upper_case_values().collect();
        for &(aleph, beta, v) in &upper {
            if v > 0 || aleph.contains(letter) {
                continue;
            }
            let sum = sum_overflow_safe(u, v);
            if a == x && sum >= 0 {
                continue;
            }
            let Some(mut gamma) = alpha.conjunction(beta) else {
                continue;
            };
            gamma = self.with_negated_pair_literals(gamma, ALabel::from_letter(letter), x)?;
            let e_ax = self.core.graph_mut().find_or_add_edge(a, x);
            if self.merge_upper(e_ax, aleph, gamma, sum, touched) {
                self.core.status_mut().cross_case_calls += 1;
            }
        }
        Ok(())
    }

    /// Conjoins `¬p(C, node)` for every contingent of `aleph` (and the rule's
    /// own contingent) that has an oracle.
    fn with_negated_pair_literals(
        &mut self,
        label: Label,
        aleph: ALabel,
        node: NodeId,
    ) -> Result<Label, CheckError> {
        let mut result = label;
        for letter in aleph.letters() {
            if self.oracles.contains_key(&letter) && !self.is_excluded_from_oracle(node) {
                let p = self.pair_proposition(letter, node)?;
                if !result.contains_proposition(p) {
                    result.set(Literal::negated(p));
                }
            }
        }
        Ok(result)
    }

    /// Nodes the oracle rule never conditions on: Z, contingents,
    /// activations and oracles themselves.
    fn is_excluded_from_oracle(&self, node: NodeId) -> bool {
        Some(node) == self.core.graph().z()
            || self.core.graph().node(node).is_contingent()
            || self.activates.contains_key(&node)
            || self.oracles.values().any(|&o| o == node)
    }

    /// Letter removal, unchanged from the uncertainty checker.
    fn apply_letter_removal(&mut self, e: EdgeId, touched: &mut EdgesToCheck) {
        let target = self.core.graph().edge(e).target();
        let Some(letters) = self.activates.get(&target) else {
            return;
        };
        let letters = letters.clone();
        let upper: Vec<(ALabel, Label, Weight)> =
            self.core.graph().edge(e).upper_case_values().collect();
        for (aleph, beta, v) in upper {
            for &letter in &letters {
                if !aleph.contains(letter) {
                    continue;
                }
                let link = self.links[&letter];
                let e_lc = self
                    .core
                    .graph()
                    .find_edge(link.activation, link.contingent)
                    .expect("contingent link edges exist after init");
                let lower_case = self.core.graph().edge(e_lc).lower_case().unwrap();
                if !beta.subsumes(lower_case.label) {
                    continue;
                }
                let new_aleph = aleph.remove(letter);
                let new_value = v.max(-lower_case.value);
                let merged = if new_aleph.is_empty() {
                    self.merge_ordinary(e, beta, new_value, touched)
                } else {
                    self.merge_upper(e, new_aleph, beta, new_value, touched)
                };
                if merged {
                    self.core.status_mut().letter_removal_calls += 1;
                }
            }
        }
    }

    /// The oracle rule: when the span allowed to X beside contingent C is
    /// tighter than the contingent range, the oracle of C lets the controller
    /// branch, producing values conditioned on the fresh pair proposition.
    fn apply_oracle_rule(&mut self, touched: &mut EdgesToCheck) -> Result<(), CheckError> {
        let links: Vec<ContingentLink> = self.links.values().copied().collect();
        for link in links {
            let Some(oracle) = self.oracles.get(&link.letter).copied() else {
                continue;
            };
            let (a, c) = (link.activation, link.contingent);
            let lower_label = {
                let e_lc = self.core.graph().find_edge(a, c).unwrap();
                self.core.graph().edge(e_lc).lower_case().unwrap().label
            };
            for x in self.core.graph().node_ids().collect::<Vec<_>>() {
                if x == a || x == c || x == oracle || self.is_excluded_from_oracle(x) {
                    continue;
                }
                let Some(e_cx) = self.core.graph().find_edge(c, x) else {
                    continue;
                };
                let Some(e_xc) = self.core.graph().find_edge(x, c) else {
                    continue;
                };
                let forward: Vec<(Label, Weight)> =
                    self.core.graph().edge(e_cx).labeled_values().collect();
                let backward: Vec<(Label, Weight)> =
                    self.core.graph().edge(e_xc).labeled_values().collect();
                for (&(beta, v), &(beta_prime, back)) in iproduct!(&forward, &backward) {
                    if !is_finite(v) || !is_finite(back) {
                        continue;
                    }
                    // The stored value is −u; u may have either sign.
                    let u = -back;
                    if sum_overflow_safe(v, -u) >= link.upper - link.lower {
                        continue;
                    }
                    let p = self.pair_proposition(link.letter, x)?;
                    let mut alpha_one = lower_label;
                    alpha_one.set(Literal::straight(p));
                    let Some(base) = beta.conjunction(beta_prime) else {
                        continue;
                    };
                    let Some(full) = alpha_one.conjunction(base) else {
                        continue;
                    };
                    let Some(with_beta) = alpha_one.conjunction(beta) else {
                        continue;
                    };
                    let Some(with_beta_prime) = alpha_one.conjunction(beta_prime) else {
                        continue;
                    };
                    trace!(
                        "oracle rule for {} and {}: span {} < {}",
                        self.core.graph().node(c).name(),
                        self.core.graph().node(x).name(),
                        v - u,
                        link.upper - link.lower
                    );
                    let e = self.core.graph_mut().find_or_add_edge(x, oracle);
                    self.merge_ordinary(e, full, 0, touched);
                    let e = self.core.graph_mut().find_or_add_edge(c, oracle);
                    self.merge_ordinary(e, full, u, touched);
                    let e = self.core.graph_mut().find_or_add_edge(a, oracle);
                    self.merge_ordinary(e, full, sum_overflow_safe(link.lower, u), touched);
                    let e = self.core.graph_mut().find_or_add_edge(x, a);
                    self.merge_ordinary(e, with_beta, v - link.lower, touched);
                    let e = self.core.graph_mut().find_or_add_edge(a, x);
                    self.merge_ordinary(e, with_beta_prime, sum_overflow_safe(link.upper, u), touched);
                    self.core.status_mut().oracle_calls += 1;
                }
            }
        }
        Ok(())
    }

    /// Decides agile controllability.
    ///
    /// The fixed point mirrors the uncertainty checker's, with the oracle
    /// rule run once per cycle; the final verdict additionally requires the
    /// all-max projection to be consistent.
    pub fn agile_controllability_check(
        &mut self,
        pl: &mut impl ProgressLog,
    ) -> Result<&CheckStatus, CheckError> {
        let start = Instant::now();
        self.init()?;
        self.core.arm_deadline(start);

        let mut to_check: EdgesToCheck = self.core.graph().edge_ids().collect();
        let mut bound_reached = false;
        pl.item_name("edge");
        pl.start("Propagating with oracles...");
        'check: while !to_check.is_empty() && !self.core.status().is_settled() {
            self.core.status_mut().cycles += 1;
            if self.core.status().cycles > self.core.max_cycles() {
                warn!("cycle bound {} reached", self.core.max_cycles());
                self.core.status_mut().consistency = false;
                bound_reached = true;
                break;
            }
            let mut touched = EdgesToCheck::new();
            self.apply_oracle_rule(&mut touched)?;
            while let Some(e) = to_check.pop() {
                if !self.core.graph().has_edge(e) {
                    continue;
                }
                pl.light_update();
                if self.core.apply_r0_r3(e) {
                    touched.push(e);
                }
                let (u, v) = {
                    let edge = self.core.graph().edge(e);
                    (edge.source(), edge.target())
                };
                for e2 in self.core.graph().out_edges(v).collect::<Vec<_>>() {
                    self.apply_lp(e, e2, &mut touched);
                    self.apply_upper_case(e, e2, &mut touched)?;
                    self.apply_lower_cross(e, e2, &mut touched)?;
                    if self.core.status().is_settled() {
                        break 'check;
                    }
                }
                for e0 in self.core.graph().in_edges(u).collect::<Vec<_>>() {
                    if e0 == e {
                        continue;
                    }
                    self.apply_lp(e0, e, &mut touched);
                    self.apply_upper_case(e0, e, &mut touched)?;
                    self.apply_lower_cross(e0, e, &mut touched)?;
                    if self.core.status().is_settled() {
                        break 'check;
                    }
                }
                self.apply_letter_removal(e, &mut touched);
                if self.core.deadline_expired() {
                    break 'check;
                }
            }
            to_check = touched;
        }
        if !bound_reached && !self.core.status().is_settled() {
            let consistent = self.all_max_projection_is_consistent();
            if !consistent {
                debug!("all-max projection is inconsistent");
            }
            self.core.status_mut().finish(consistent);
        }
        self.core.status_mut().execution_time = Some(start.elapsed());
        pl.done();
        info!("{}", self.core.status());
        Ok(self.core.status())
    }

    /// Bellman-Ford consistency of the projection in which every contingent
    /// takes its maximal duration. Used as the final gate of the verdict.
    fn all_max_projection_is_consistent(&self) -> bool {
        let graph = self.core.graph();
        let n = graph.num_nodes();
        let mut arcs: Vec<(NodeId, NodeId, Weight)> = Vec::new();
        for e in graph.edge_ids() {
            let edge = graph.edge(e);
            let (s, t) = (edge.source(), edge.target());
            let is_contingent_pair = self.links.values().any(|l| {
                (l.activation == s && l.contingent == t) || (l.contingent == s && l.activation == t)
            });
            if is_contingent_pair {
                continue;
            }
            let weight = edge
                .labeled_values()
                .filter(|(l, _)| !l.contains_unknown() && !self.is_moot(*l))
                .map(|(_, v)| v)
                .min();
            if let Some(w) = weight {
                if is_finite(w) {
                    arcs.push((s, t, w));
                }
            }
        }
        for link in self.links.values() {
            arcs.push((link.activation, link.contingent, link.upper));
            arcs.push((link.contingent, link.activation, -link.upper));
        }

        let mut dist = vec![0i64; n];
        for round in 0..n {
            let mut changed = false;
            for &(s, t, w) in &arcs {
                let candidate = dist[s] + w as i64;
                if candidate < dist[t] {
                    dist[t] = candidate;
                    changed = true;
                }
            }
            if !changed {
                return true;
            }
            if round == n - 1 {
                return false;
            }
        }
        true
    }
}
