/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::labeled_int_map::{LabeledIntMap, ParseLabeledIntMapError};
use crate::arith::{display_weight, parse_weight, Weight};
use crate::labels::{ALabel, Label};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// A two-level map `ALabel → (Label → Weight)`.
///
/// The entry for the empty A-label holds the ordinary labeled values of an
/// edge; entries for non-empty A-labels hold its upper-case values. Dominance
/// is maintained within each A-label by the inner [`LabeledIntMap`]s, and
/// *across* A-labels by [`merge`](Self::merge): an ordinary value dominates
/// the same labeled value under any non-empty A-label, since it binds in
/// strictly more situations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabeledALabelIntMap {
    map: BTreeMap<ALabel, LabeledIntMap>,
}

impl LabeledALabelIntMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.values().all(LabeledIntMap::is_empty)
    }

    /// The total number of `(A-label, label, value)` triples.
    pub fn len(&self) -> usize {
        self.map.values().map(LabeledIntMap::len).sum()
    }

    /// The value stored for `(a_label, label)`, if any.
    pub fn get(&self, a_label: ALabel, label: Label) -> Option<Weight> {
        self.map.get(&a_label)?.get(label)
    }

    /// The inner map for `a_label`, if non-empty.
    pub fn get_map(&self, a_label: ALabel) -> Option<&LabeledIntMap> {
        self.map.get(&a_label).filter(|m| !m.is_empty())
    }

    /// Merges `(a_label, label, value)` maintaining dominance within and
    /// across A-labels. Returns whether the map changed.
    pub fn merge(&mut self, a_label: ALabel, label: Label, value: Weight) -> bool {
        if !a_label.is_empty() {
            // An ordinary entry at the same or more general label with a
            // value ≤ value already binds in every situation this upper-case
            // value would.
            if let Some(ordinary) = self.map.get(&ALabel::empty()) {
                if ordinary
                    .min_value_subsumed_by(label)
                    .is_some_and(|v| v <= value)
                {
                    return false;
                }
            }
        }
        let inner = self.map.entry(a_label).or_default();
        let changed = inner.put(label, value);
        if !changed && inner.is_empty() {
            // The refused merge must not leave behind an empty inner map.
            self.map.remove(&a_label);
        }
        if changed && a_label.is_empty() {
            // The new ordinary value may dominate upper-case entries.
            for (&other, inner) in self.map.iter_mut() {
                if other.is_empty() {
                    continue;
                }
                let dominated: Vec<Label> = inner
                    .iter()
                    .filter(|&(l, v)| l.subsumes(label) && v >= value)
                    .map(|(l, _)| l)
                    .collect();
                for l in dominated {
                    inner.remove(l);
                }
            }
            self.map.retain(|_, inner| !inner.is_empty());
        }
        changed
    }

    /// Removes the entry for `(a_label, label)`, returning its value.
    pub fn remove(&mut self, a_label: ALabel, label: Label) -> Option<Weight> {
        let inner = self.map.get_mut(&a_label)?;
        let value = inner.remove(label);
        if inner.is_empty() {
            self.map.remove(&a_label);
        }
        value
    }

    /// The minimal value across every A-label.
    pub fn min_value(&self) -> Option<Weight> {
        self.map.values().filter_map(LabeledIntMap::min_value).min()
    }

    /// Iterates over all `(A-label, label, value)` triples, ordinary values
    /// first.
    pub fn iter(&self) -> impl Iterator<Item = (ALabel, Label, Weight)> + '_ {
        self.map
            .iter()
            .flat_map(|(&a_label, inner)| inner.iter().map(move |(l, v)| (a_label, l, v)))
    }

    /// Iterates over the upper-case triples only.
    pub fn upper_case_iter(&self) -> impl Iterator<Item = (ALabel, Label, Weight)> + '_ {
        self.iter().filter(|(a_label, _, _)| !a_label.is_empty())
    }

    /// The ordinary (empty-A-label) part of the map.
    pub fn labeled_values(&self) -> LabeledIntMap {
        self.map.get(&ALabel::empty()).cloned().unwrap_or_default()
    }

    /// Iterates over the ordinary `(label, value)` pairs without cloning.
    pub fn labeled_value_iter(&self) -> impl Iterator<Item = (Label, Weight)> + '_ {
        self.map
            .get(&ALabel::empty())
            .into_iter()
            .flat_map(LabeledIntMap::iter)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Renders the upper-case part as `{(aleph, v, l) ...}`.
    pub fn upper_case_to_string(&self) -> String {
        let mut triples = self.upper_case_iter().peekable();
        if triples.peek().is_none() {
            return "{}".into();
        }
        let mut s = String::from("{");
        for (a_label, label, value) in triples {
            s.push_str(&format!("({a_label}, {}, {label}) ", display_weight(value)));
        }
        s.push('}');
        s
    }
}

/// An error raised parsing an upper-case value map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseUpperCaseError {
    #[error("upper-case map must be enclosed in braces: {0:?}")]
    MissingBraces(String),
    #[error("malformed triple {0:?} (expected \"(aleph, value, label)\")")]
    MalformedTriple(String),
    #[error(transparent)]
    InvalidALabel(#[from] crate::labels::InvalidALetter),
    #[error("invalid value in triple {0:?}")]
    InvalidValue(String),
    #[error("invalid label in triple {0:?}: {1}")]
    InvalidLabel(String, crate::labels::ParseLabelError),
    #[error(transparent)]
    InvalidMap(#[from] ParseLabeledIntMapError),
}

impl LabeledALabelIntMap {
    /// Parses an upper-case map rendered by
    /// [`upper_case_to_string`](Self::upper_case_to_string) and merges its
    /// triples into `self`.
    pub fn merge_upper_case_from_str(&mut self, s: &str) -> Result<(), ParseUpperCaseError> {
        let s = s.trim();
        let inner = s
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| ParseUpperCaseError::MissingBraces(s.into()))?
            .trim();
        for piece in inner.split(')') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let body = piece
                .strip_prefix('(')
                .ok_or_else(|| ParseUpperCaseError::MalformedTriple(piece.into()))?;
            let mut parts = body.splitn(3, ',');
            let a_label = parts
                .next()
                .ok_or_else(|| ParseUpperCaseError::MalformedTriple(piece.into()))?
                .trim()
                .parse::<ALabel>()?;
            let value = parts
                .next()
                .ok_or_else(|| ParseUpperCaseError::MalformedTriple(piece.into()))?
                .trim();
            let value = parse_weight(value)
                .map_err(|_| ParseUpperCaseError::InvalidValue(piece.into()))?;
            let label = parts
                .next()
                .ok_or_else(|| ParseUpperCaseError::MalformedTriple(piece.into()))?
                .trim()
                .parse::<Label>()
                .map_err(|e| ParseUpperCaseError::InvalidLabel(piece.into(), e))?;
            self.merge(a_label, label, value);
        }
        Ok(())
    }

    /// Parses an ordinary labeled-value map and merges its entries into
    /// `self` under the empty A-label.
    pub fn merge_labeled_values_from_str(&mut self, s: &str) -> Result<(), ParseUpperCaseError> {
        let parsed: LabeledIntMap = s.parse()?;
        for (label, value) in parsed.iter() {
            self.merge(ALabel::empty(), label, value);
        }
        Ok(())
    }
}

impl FromStr for LabeledALabelIntMap {
    type Err = ParseUpperCaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = Self::new();
        map.merge_upper_case_from_str(s)?;
        Ok(map)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::labels::ALetter;

    fn l(s: &str) -> Label {
        s.parse().unwrap()
    }

    fn al(s: &str) -> ALabel {
        s.parse().unwrap()
    }

    #[test]
    fn test_cross_dominance() {
        let mut map = LabeledALabelIntMap::new();
        assert!(map.merge(al("C"), l("a"), -5));
        // An ordinary value at the same label dominates the upper-case one.
        assert!(map.merge(ALabel::empty(), l("a"), -5));
        assert_eq!(map.get(al("C"), l("a")), None);
        // And refuses further dominated upper-case merges.
        assert!(!map.merge(al("C"), l("ab"), -5));
        assert!(map.merge(al("C"), l("a"), -7));
    }

    #[test]
    fn test_upper_case_round_trip() {
        let mut map = LabeledALabelIntMap::new();
        map.merge(ALetter::from_char('C').unwrap().into(), l("¬b"), -7);
        map.merge(al("CD"), l("a"), -9);
        let mut parsed = LabeledALabelIntMap::new();
        parsed
            .merge_upper_case_from_str(&map.upper_case_to_string())
            .unwrap();
        assert_eq!(parsed, map);
    }
}
