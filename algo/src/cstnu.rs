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
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::time::Instant;
use tempnet::arith::{sum_overflow_safe, Weight};
use tempnet::graph::{ConstraintType, ContingentLink, EdgeId, NodeId, TNGraph};
use tempnet::labels::{ALabel, ALetter, Label};
use tempnet::utils::EdgesToCheck;

/// Builds and validates the contingent-link index of a graph.
///
/// Each contingent node must have exactly one activation, identified by the
/// lower-case value on the activation→contingent edge; the companion edge
/// must carry the matching upper-case value. When
/// `contingent_also_as_ordinary` is set, the bounds are duplicated as
/// ordinary labeled values, which several propagation rules rely on.
pub(crate) fn init_contingents(
    graph: &mut TNGraph,
    contingent_also_as_ordinary: bool,
) -> Result<HashMap<ALetter, ContingentLink>, CheckError> {
    let mut links = HashMap::new();
    for e in graph.lower_case_edges().collect::<Vec<_>>() {
        let (a, c, lower_case) = {
            let edge = graph.edge(e);
            (edge.source(), edge.target(), edge.lower_case().unwrap())
        };
        let letter = lower_case.letter;
        if graph.node(c).contingent_letter() != Some(letter) {
            return Err(CheckError::MalformedContingent(format!(
                "edge {} carries the lower-case name {letter} but its target {} is not that contingent",
                graph.edge(e).name(),
                graph.node(c).name()
            )));
        }
        let x = lower_case.value;
        if x <= 0 {
            return Err(CheckError::MalformedContingent(format!(
                "contingent {} has non-positive lower bound {x}",
                graph.node(c).name()
            )));
        }
        let y = graph
            .edge(e)
            .value(Label::empty())
            .or_else(|| graph.edge(e).min_labeled_value())
            .ok_or_else(|| {
                CheckError::MalformedContingent(format!(
                    "contingent {} has no upper bound on its activation edge",
                    graph.node(c).name()
                ))
            })?;
        if y < x {
            return Err(CheckError::MalformedContingent(format!(
                "contingent {} has bounds [{x}, {y}]",
                graph.node(c).name()
            )));
        }
        let companion = graph.find_edge(c, a).ok_or_else(|| {
            CheckError::MalformedContingent(format!(
                "contingent {} has no companion edge toward its activation",
                graph.node(c).name()
            ))
        })?;
        if links
            .insert(
                letter,
                ContingentLink {
                    activation: a,
                    contingent: c,
                    letter,
                    lower: x,
                    upper: y,
                },
            )
            .is_some()
        {
            return Err(CheckError::MalformedContingent(format!(
                "contingent name {letter} is used by two links"
            )));
        }
        let a_label = ALabel::from_letter(letter);
        graph
            .edge_mut(companion)
            .merge_upper_case_value(a_label, lower_case.label, -y);
        if contingent_also_as_ordinary {
            graph.edge_mut(e).merge_labeled_value(lower_case.label, y);
            graph
                .edge_mut(companion)
                .merge_labeled_value(lower_case.label, -x);
        }
    }
    // Contingent nodes without a link, or upper-case values naming
    // non-contingent letters, are configuration errors.
    for id in graph.node_ids().collect::<Vec<_>>() {
        if let Some(letter) = graph.node(id).contingent_letter() {
            if !links.contains_key(&letter) {
                return Err(CheckError::MalformedContingent(format!(
                    "contingent node {} has no activation edge",
                    graph.node(id).name()
                )));
            }
        }
    }
    Ok(links)
}

/// A dynamic-controllability checker for CSTNUs.
///
/// On top of the CSTN rules, the checker propagates upper-case values,
/// applies the lower-case and cross-case rules along contingent links, and
/// removes letters from waits that extend past the contingent range.
pub struct CstnuChecker {
    core: CstnChecker,
    links: HashMap<ALetter, ContingentLink>,
    /// Activation node → letters of the links it activates.
    activates: HashMap<NodeId, Vec<ALetter>>,
    initialized: bool,
}

impl CstnuChecker {
    pub fn new(graph: TNGraph) -> Self {
        Self::with_semantics(graph, Semantics::default())
    }

    pub fn with_semantics(graph: TNGraph, semantics: Semantics) -> Self {
        Self {
            core: CstnChecker::with_semantics(graph, semantics),
            links: HashMap::new(),
            activates: HashMap::new(),
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

    /// The contingent links indexed at init time.
    pub fn contingent_links(&self) -> impl Iterator<Item = &ContingentLink> {
        self.links.values()
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
        self.initialized = true;
        Ok(())
    }

    /// Upper-case propagation: an ordinary X→Y value followed by an
    /// upper-case Y→W value yields an upper-case X→W value.
    pub(crate) fn apply_upper_case(
        &mut self,
        e1: EdgeId,
        e2: EdgeId,
        touched: &mut EdgesToCheck,
    ) {
        let (x, _y) = {
            let edge = self.core.graph().edge(e1);
            (edge.source(), edge.target())
        };
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
            let Some(gamma) = alpha.conjunction(beta) else {
                continue;
            };
            if x == w_node && sum < 0 && aleph.is_empty() {
                let name = self.core.graph().node(x).name().to_owned();
                self.core.status_mut().negative_loop(name);
                return;
            }
            let e_xw = self.core.graph_mut().find_or_add_edge(x, w_node);
            let merged = if sum >= 0 && aleph.is_empty() {
                self.core
                    .graph_mut()
                    .edge_mut(e_xw)
                    .merge_labeled_value(gamma, sum)
            } else {
                self.core
                    .graph_mut()
                    .edge_mut(e_xw)
                    .merge_upper_case_value(aleph, gamma, sum)
            };
            if merged {
                trace!(
                    "upper case: ({u}, {alpha}) + ({aleph}, {v}, {beta}) → ({aleph}, {sum}, {gamma})"
                );
                self.core.status_mut().upper_case_calls += 1;
                touched.push(e_xw);
            }
        }
    }

    /// Lower-case and cross-case propagation along a lower-case edge A→C
    /// followed by an edge C→X.
    pub(crate) fn apply_lower_cross(
        &mut self,
        e_ac: EdgeId,
        e_cx: EdgeId,
        touched: &mut EdgesToCheck,
    ) {
        let Some(lower_case) = self.core.graph().edge(e_ac).lower_case() else {
            return;
        };
        if lower_case.value <= 0 {
            return;
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
            let Some(gamma) = alpha.conjunction(beta) else {
                continue;
            };
            if a == x && sum < 0 {
                let name = self.core.graph().node(a).name().to_owned();
                self.core.status_mut().negative_loop(name);
                return;
            }
            let e_ax = self.core.graph_mut().find_or_add_edge(a, x);
            if self
                .core
                .graph_mut()
                .edge_mut(e_ax)
                .merge_labeled_value(gamma, sum)
            {
                trace!("lower case: ({letter}:{u}, {alpha}) + ({v}, {beta}) → ({sum}, {gamma})");
                self.core.status_mut().lower_case_calls += 1;
                touched.push(e_ax);
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
            let Some(gamma) = alpha.conjunction(beta) else {
                continue;
            };
            let e_ax = self.core.graph_mut().find_or_add_edge(a, x);
            if self
                .core
                .graph_mut()
                .edge_mut(e_ax)
                .merge_upper_case_value(aleph, gamma, sum)
            {
                trace!(
                    "cross case: ({letter}:{u}, {alpha}) + ({aleph}, {v}, {beta}) → ({aleph}, {sum}, {gamma})"
                );
                self.core.status_mut().cross_case_calls += 1;
                touched.push(e_ax);
            }
        }
    }

    /// Letter removal: a wait on C that is not longer than the contingent
    /// lower bound is no wait at all.
    pub(crate) fn apply_letter_removal(&mut self, e: EdgeId, touched: &mut EdgesToCheck) {
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
                    self.core
                        .graph_mut()
                        .edge_mut(e)
                        .merge_labeled_value(beta, new_value)
                } else {
                    self.core
                        .graph_mut()
                        .edge_mut(e)
                        .merge_upper_case_value(new_aleph, beta, new_value)
                };
                if merged {
                    trace!("letter removal: ({aleph}, {v}, {beta}) → ({new_aleph}, {new_value}, {beta})");
                    self.core.status_mut().letter_removal_calls += 1;
                    touched.push(e);
                }
            }
        }
    }

    /// Decides dynamic controllability by the edge-by-edge fixed point.
    pub fn dynamic_controllability_check(
        &mut self,
        pl: &mut impl ProgressLog,
    ) -> Result<&CheckStatus, CheckError> {
        let start = Instant::now();
        self.init()?;
        self.core.arm_deadline(start);

        let mut to_check: EdgesToCheck = self.core.graph().edge_ids().collect();
        let mut bound_reached = false;
        pl.item_name("edge");
        pl.start("Propagating labeled and upper-case values...");
        'check: while !to_check.is_empty() && !self.core.status().is_settled() {
            self.core.status_mut().cycles += 1;
            if self.core.status().cycles > self.core.max_cycles() {
                warn!("cycle bound {} reached", self.core.max_cycles());
                self.core.status_mut().consistency = false;
                bound_reached = true;
                break;
            }
            let mut touched = EdgesToCheck::new();
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
                    self.core.apply_lp(e, e2, &mut touched);
                    self.apply_upper_case(e, e2, &mut touched);
                    self.apply_lower_cross(e, e2, &mut touched);
                    if self.core.status().is_settled() {
                        break 'check;
                    }
                }
                for e0 in self.core.graph().in_edges(u).collect::<Vec<_>>() {
                    if e0 == e {
                        continue;
                    }
                    self.core.apply_lp(e0, e, &mut touched);
                    self.apply_upper_case(e0, e, &mut touched);
                    self.apply_lower_cross(e0, e, &mut touched);
                    if self.core.status().is_settled() {
                        break 'check;
                    }
                }
                self.apply_letter_removal(e, &mut touched);
                if self.core.deadline_expired() {
                    break 'check;
                }
            }
            debug!(
                "cycle {}: {} edges to reconsider",
                self.core.status().cycles,
                touched.len()
            );
            to_check = touched;
        }
        if !bound_reached && !self.core.status().is_settled() {
            self.core.status_mut().finish(true);
        }
        self.core.status_mut().execution_time = Some(start.elapsed());
        pl.done();
        info!("{}", self.core.status());
        Ok(self.core.status())
    }

    /// Strips initialization scaffolding from the graph after a check.
    pub fn clean_graph(&mut self) {
        self.core.clean_graph();
    }

    /// Verifies the §8-style contingent integrity of the initialized graph:
    /// the two link edges carry exactly the expected values.
    pub fn contingent_links_are_integral(&self) -> bool {
        self.links.values().all(|link| {
            let graph = self.core.graph();
            let forward = graph.find_edge(link.activation, link.contingent);
            let backward = graph.find_edge(link.contingent, link.activation);
            match (forward, backward) {
                (Some(f), Some(b)) => {
                    let f = graph.edge(f);
                    let b = graph.edge(b);
                    f.lower_case().is_some_and(|lc| lc.value == link.lower)
                        && f.constraint_type() == ConstraintType::Contingent
                        && b.upper_case_values().any(|(aleph, _, v)| {
                            aleph == ALabel::from_letter(link.letter) && v == -link.upper
                        })
                }
                _ => false,
            }
        })
    }
}
