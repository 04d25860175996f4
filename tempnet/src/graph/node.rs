/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::arith::Weight;
use crate::labels::{ALetter, Label, Proposition};
use crate::maps::LabeledIntMap;
use std::collections::HashMap;

/// A time-point of a temporal network.
///
/// A node may be an *observer* (it reveals the truth of a proposition when
/// executed), a *contingent* time-point (its execution time is chosen by the
/// environment), or a plain one. The labeled potential and upper potential
/// are scratch state owned by the potential solver; the coordinates are
/// opaque metadata for writers.
#[derive(Debug, Clone, Default)]
pub struct Node {
    name: String,
    label: Label,
    observed: Option<Proposition>,
    contingent: Option<ALetter>,
    pub x: f64,
    pub y: f64,
    potential: LabeledIntMap,
    upper_potential: LabeledIntMap,
    potential_count: HashMap<Label, u32>,
    distribution: Option<String>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an observation node revealing `proposition`.
    pub fn observer(name: impl Into<String>, proposition: Proposition) -> Self {
        Self {
            name: name.into(),
            observed: Some(proposition),
            ..Self::default()
        }
    }

    /// Creates a contingent node named by `letter`.
    pub fn contingent(name: impl Into<String>, letter: ALetter) -> Self {
        Self {
            name: name.into(),
            contingent: Some(letter),
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn label(&self) -> Label {
        self.label
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    /// The proposition this node observes, if it is an observer.
    #[inline(always)]
    pub fn observed(&self) -> Option<Proposition> {
        self.observed
    }

    pub fn set_observed(&mut self, proposition: Option<Proposition>) {
        self.observed = proposition;
    }

    /// The contingent name of this node, if it is contingent.
    #[inline(always)]
    pub fn contingent_letter(&self) -> Option<ALetter> {
        self.contingent
    }

    pub fn set_contingent_letter(&mut self, letter: Option<ALetter>) {
        self.contingent = letter;
    }

    #[inline(always)]
    pub fn is_observer(&self) -> bool {
        self.observed.is_some()
    }

    #[inline(always)]
    pub fn is_contingent(&self) -> bool {
        self.contingent.is_some()
    }

    /// The labeled potential (distance to Z indexed by label).
    pub fn potential(&self) -> &LabeledIntMap {
        &self.potential
    }

    pub fn potential_mut(&mut self) -> &mut LabeledIntMap {
        &mut self.potential
    }

    /// The labeled upper potential, used by the upper-bound pass.
    pub fn upper_potential(&self) -> &LabeledIntMap {
        &self.upper_potential
    }

    pub fn upper_potential_mut(&mut self) -> &mut LabeledIntMap {
        &mut self.upper_potential
    }

    /// Updates the potential entry for `label` and bumps its update count.
    ///
    /// Returns whether the potential changed; the new count is available via
    /// [`potential_count`](Self::potential_count).
    pub fn update_potential(&mut self, label: Label, value: Weight) -> bool {
        if self.potential.put(label, value) {
            *self.potential_count.entry(label).or_insert(0) += 1;
            true
        } else {
            false
        }
    }

    /// How many times the potential entry for `label` has been updated.
    pub fn potential_count(&self, label: Label) -> u32 {
        self.potential_count.get(&label).copied().unwrap_or(0)
    }

    /// An opaque duration-distribution record, carried through but never
    /// interpreted.
    pub fn distribution(&self) -> Option<&str> {
        self.distribution.as_deref()
    }

    pub fn set_distribution(&mut self, distribution: Option<String>) {
        self.distribution = distribution;
    }

    /// Clears potentials, upper potentials and update counts.
    pub fn clear_potentials(&mut self) {
        self.potential.clear();
        self.upper_potential.clear();
        self.potential_count.clear();
    }
}

impl core::fmt::Display for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "❮{}", self.name)?;
        if let Some(p) = self.observed {
            write!(f, "; obs {p}")?;
        }
        if let Some(c) = self.contingent {
            write!(f, "; ctg {c}")?;
        }
        if !self.label.is_empty() {
            write!(f, "; {}", self.label)?;
        }
        write!(f, "❯")
    }
}
