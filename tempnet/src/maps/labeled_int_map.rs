/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::arith::{display_weight, parse_weight, Weight};
use crate::labels::{Label, Proposition};
use std::str::FromStr;
use thiserror::Error;

/// Base detection is attempted only on labels up to this many propositions,
/// since it enumerates all 2^n complete assignments.
const MAX_BASE_SIZE: usize = 6;

/// A mapping from [`Label`] to [`Weight`] kept in minimal form.
///
/// The map maintains the *dominance* invariant: no entry survives if a more
/// general entry (a label it subsumes) carries a value that is less than or
/// equal to its own. [`put`](Self::put) refuses dominated insertions and
/// evicts the entries the new one dominates, so the invariant holds after
/// every public call.
///
/// The map also carries a hidden *base*: when all 2^n complete labels over a
/// proposition set are present with a common value that no other entry beats,
/// they collapse into a single empty-label entry recording that value.
///
/// Entries iterate in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LabeledIntMap {
    entries: Vec<(Label, Weight)>,
    base: u32,
}

impl LabeledIntMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map with a single entry.
    pub fn from_entry(label: Label, value: Weight) -> Self {
        let mut map = Self::new();
        map.put(label, value);
        map
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The exact value stored for `label`, if any.
    pub fn get(&self, label: Label) -> Option<Weight> {
        self.entries
            .iter()
            .find(|&&(l, _)| l == label)
            .map(|&(_, v)| v)
    }

    /// Removes the entry for `label`, returning its value.
    ///
    /// Removing an entry may break the base; the base is cleared, not
    /// recomputed.
    pub fn remove(&mut self, label: Label) -> Option<Weight> {
        let index = self.entries.iter().position(|&(l, _)| l == label)?;
        let (_, value) = self.entries.remove(index);
        self.base = 0;
        Some(value)
    }

    /// Inserts `(label, value)` maintaining dominance.
    ///
    /// The insertion is refused if a present entry already implies it (a more
    /// general label with a value ≤ `value`); otherwise every entry the new
    /// one implies is evicted. Returns whether the map changed.
    pub fn put(&mut self, label: Label, value: Weight) -> bool {
        for &(l, v) in &self.entries {
            if label.subsumes(l) && v <= value {
                return false;
            }
        }
        self.entries
            .retain(|&(l, v)| !(l.subsumes(label) && v >= value));
        self.entries.push((label, value));
        self.detect_base(label, value);
        true
    }

    /// An alias of [`put`](Self::put), kept for symmetry with the two-level
    /// map [`merge`](crate::maps::LabeledALabelIntMap::merge).
    #[inline(always)]
    pub fn merge(&mut self, label: Label, value: Weight) -> bool {
        self.put(label, value)
    }

    /// The minimal value in the map.
    pub fn min_value(&self) -> Option<Weight> {
        self.entries.iter().map(|&(_, v)| v).min()
    }

    /// The maximal value in the map.
    pub fn max_value(&self) -> Option<Weight> {
        self.entries.iter().map(|&(_, v)| v).max()
    }

    /// The minimal value among entries whose label is subsumed by `label`.
    pub fn min_value_subsumed_by(&self, label: Label) -> Option<Weight> {
        self.entries
            .iter()
            .filter(|&&(l, _)| label.subsumes(l))
            .map(|&(_, v)| v)
            .min()
    }

    /// The minimal value among entries whose label is consistent with `label`.
    pub fn min_value_consistent_with(&self, label: Label) -> Option<Weight> {
        self.entries
            .iter()
            .filter(|&&(l, _)| label.is_consistent_with(l))
            .map(|&(_, v)| v)
            .min()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, Weight)> + '_ {
        self.entries.iter().copied()
    }

    /// The labels present in the map, in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.entries.iter().map(|&(l, _)| l)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.base = 0;
    }

    /// The current base as a proposition set, if one was detected.
    pub fn base(&self) -> impl Iterator<Item = Proposition> {
        let base = self.base;
        (0..crate::labels::MAX_PROPOSITIONS)
            .filter(move |i| base & (1 << i) != 0)
            .map(Proposition::from_index)
    }

    /// Checks whether the propositions of the entry just inserted form a base
    /// and, if so, collapses the complete assignment set into an empty-label
    /// entry.
    fn detect_base(&mut self, label: Label, value: Weight) {
        if label.is_empty() {
            self.base = 0;
            return;
        }
        if label.contains_unknown() {
            return;
        }
        let props: Vec<Proposition> = label.propositions().collect();
        if props.len() > MAX_BASE_SIZE {
            return;
        }
        for component in Label::all_components(&props) {
            if self.get(component) != Some(value) {
                return;
            }
        }
        for component in Label::all_components(&props) {
            let index = self.entries.iter().position(|&(l, _)| l == component);
            if let Some(index) = index {
                self.entries.remove(index);
            }
        }
        self.base = props.iter().fold(0, |mask, p| mask | (1 << p.index()));
        self.put(Label::empty(), value);
    }
}

impl PartialEq for LabeledIntMap {
    /// Two maps are equal when they hold the same entry set, regardless of
    /// insertion order and base bookkeeping.
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        let mut a = self.entries.clone();
        let mut b = other.entries.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl Eq for LabeledIntMap {}

impl FromIterator<(Label, Weight)> for LabeledIntMap {
    fn from_iter<T: IntoIterator<Item = (Label, Weight)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (label, value) in iter {
            map.put(label, value);
        }
        map
    }
}

/// An error raised parsing a labeled-value map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseLabeledIntMapError {
    #[error("labeled-value map must be enclosed in braces: {0:?}")]
    MissingBraces(String),
    #[error("malformed entry {0:?} (expected \"(value, label)\")")]
    MalformedEntry(String),
    #[error("invalid value in entry {0:?}")]
    InvalidValue(String),
    #[error("invalid label in entry {0:?}: {1}")]
    InvalidLabel(String, crate::labels::ParseLabelError),
}

impl FromStr for LabeledIntMap {
    type Err = ParseLabeledIntMapError;

    /// Parses the textual form `{(v, l) (v, l) }` (or `{}`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let inner = s
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| ParseLabeledIntMapError::MissingBraces(s.into()))?
            .trim();
        let mut map = Self::new();
        if inner.is_empty() {
            return Ok(map);
        }
        for piece in inner.split(')') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let body = piece
                .strip_prefix('(')
                .ok_or_else(|| ParseLabeledIntMapError::MalformedEntry(piece.into()))?;
            let (value, label) = body
                .split_once(',')
                .ok_or_else(|| ParseLabeledIntMapError::MalformedEntry(piece.into()))?;
            let value = parse_weight(value.trim())
                .map_err(|_| ParseLabeledIntMapError::InvalidValue(piece.into()))?;
            let label = label
                .trim()
                .parse::<Label>()
                .map_err(|e| ParseLabeledIntMapError::InvalidLabel(piece.into(), e))?;
            map.put(label, value);
        }
        Ok(map)
    }
}

impl core::fmt::Display for LabeledIntMap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{")?;
        for &(label, value) in &self.entries {
            write!(f, "({}, {label}) ", display_weight(value))?;
        }
        write!(f, "}}")
    }
}
