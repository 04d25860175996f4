/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::NodeId;
use crate::arith::Weight;
use crate::labels::{ALabel, ALetter, Label};
use crate::maps::{LabeledALabelIntMap, LabeledIntMap};

/// The provenance of an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintType {
    /// A user-given constraint.
    #[default]
    Requirement,
    /// A constraint produced by propagation.
    Derived,
    /// One of the two edges representing a contingent link.
    Contingent,
    /// An auxiliary edge added during initialization.
    Internal,
}

impl ConstraintType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintType::Requirement => "requirement",
            ConstraintType::Derived => "derived",
            ConstraintType::Contingent => "contingent",
            ConstraintType::Internal => "internal",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "requirement" | "normal" | "constraint" => Some(ConstraintType::Requirement),
            "derived" => Some(ConstraintType::Derived),
            "contingent" => Some(ConstraintType::Contingent),
            "internal" => Some(ConstraintType::Internal),
            _ => None,
        }
    }
}

/// The lower-case value of a contingent link: on the edge A→C it states that
/// C occurs at least `value` after A, under `label`, on behalf of the
/// contingent named `letter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowerCaseValue {
    pub letter: ALetter,
    pub label: Label,
    pub value: Weight,
}

impl core::fmt::Display for LowerCaseValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{{({}, {}, {}) }}",
            self.letter.to_lower_char(),
            self.value,
            self.label
        )
    }
}

/// A directed edge carrying labeled values.
///
/// The value map holds the ordinary labeled values (empty A-label) and the
/// upper-case values (non-empty A-label). An upper-case entry on an edge
/// pointing at an activation time-point is a *wait*: its target must not be
/// executed before the named contingents are resolved or the wait expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    name: String,
    source: NodeId,
    target: NodeId,
    constraint_type: ConstraintType,
    values: LabeledALabelIntMap,
    lower_case: Option<LowerCaseValue>,
}

impl Edge {
    pub fn new(name: impl Into<String>, source: NodeId, target: NodeId) -> Self {
        Self {
            name: name.into(),
            source,
            target,
            constraint_type: ConstraintType::default(),
            values: LabeledALabelIntMap::new(),
            lower_case: None,
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn source(&self) -> NodeId {
        self.source
    }

    #[inline(always)]
    pub fn target(&self) -> NodeId {
        self.target
    }

    #[inline(always)]
    pub fn constraint_type(&self) -> ConstraintType {
        self.constraint_type
    }

    pub fn set_constraint_type(&mut self, constraint_type: ConstraintType) {
        self.constraint_type = constraint_type;
    }

    /// Whether the edge carries no value at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.lower_case.is_none()
    }

    /// The full two-level value map.
    pub fn values(&self) -> &LabeledALabelIntMap {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut LabeledALabelIntMap {
        &mut self.values
    }

    /// Merges an ordinary labeled value. Returns whether the edge changed.
    pub fn merge_labeled_value(&mut self, label: Label, value: Weight) -> bool {
        self.values.merge(ALabel::empty(), label, value)
    }

    /// Merges an upper-case value. Returns whether the edge changed.
    pub fn merge_upper_case_value(&mut self, a_label: ALabel, label: Label, value: Weight) -> bool {
        self.values.merge(a_label, label, value)
    }

    /// The ordinary value stored for `label`, if any.
    pub fn value(&self, label: Label) -> Option<Weight> {
        self.values.get(ALabel::empty(), label)
    }

    /// The minimal ordinary value.
    pub fn min_labeled_value(&self) -> Option<Weight> {
        self.values.get_map(ALabel::empty())?.min_value()
    }

    /// Iterates over the ordinary `(label, value)` pairs.
    pub fn labeled_values(&self) -> impl Iterator<Item = (Label, Weight)> + '_ {
        self.values.labeled_value_iter()
    }

    /// A clone of the ordinary part of the value map.
    pub fn labeled_value_map(&self) -> LabeledIntMap {
        self.values.labeled_values()
    }

    /// Iterates over the upper-case `(A-label, label, value)` triples.
    pub fn upper_case_values(&self) -> impl Iterator<Item = (ALabel, Label, Weight)> + '_ {
        self.values.upper_case_iter()
    }

    /// Whether the edge carries at least one upper-case value.
    pub fn has_upper_case_values(&self) -> bool {
        self.values.upper_case_iter().next().is_some()
    }

    /// The lower-case value, if this is the forward edge of a contingent
    /// link.
    #[inline(always)]
    pub fn lower_case(&self) -> Option<LowerCaseValue> {
        self.lower_case
    }

    pub fn set_lower_case(&mut self, lower_case: Option<LowerCaseValue>) {
        self.lower_case = lower_case;
    }

    /// The waits on this edge: upper-case entries interpreted as "do not
    /// execute the source before the named contingent, or before `-value`
    /// past the target".
    pub fn waits(&self) -> impl Iterator<Item = (ALetter, Label, Weight)> + '_ {
        self.values.upper_case_iter().flat_map(|(a_label, l, v)| {
            a_label.letters().map(move |letter| (letter, l, v))
        })
    }

    /// Removes every value from the edge.
    pub fn clear_values(&mut self) {
        self.values.clear();
        self.lower_case = None;
    }
}

impl core::fmt::Display for Edge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "❮{}; {}; {}",
            self.name,
            self.constraint_type.as_str(),
            self.labeled_value_map()
        )?;
        if self.has_upper_case_values() {
            write!(f, "; UL: {}", self.values.upper_case_to_string())?;
        }
        if let Some(lc) = self.lower_case {
            write!(f, "; LL: {lc}")?;
        }
        write!(f, "❯")
    }
}
