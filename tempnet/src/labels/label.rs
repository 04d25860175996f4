/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::literal::{Literal, Proposition, State};
use std::str::FromStr;
use thiserror::Error;

/// A conjunction of literals in which no proposition appears twice.
///
/// A label is stored as three 32-bit masks indexed by proposition ordinal:
/// `present` marks the propositions appearing in the label, `negated` and
/// `unknown` refine the state of the present ones. All label operations are
/// bitwise and run in constant time.
///
/// The empty label is rendered `⊡`; a non-empty label is the concatenation of
/// its literals in proposition order, e.g. `¬ab¿c`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    present: u32,
    negated: u32,
    unknown: u32,
}

/// An error raised parsing a label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseLabelError {
    #[error("character {0:?} is not a proposition (allowed: a..z, A..F)")]
    InvalidProposition(char),
    #[error("dangling state prefix at the end of label {0:?}")]
    DanglingPrefix(String),
    #[error("proposition {0} appears twice in label {1:?}")]
    DuplicateProposition(char, String),
}

impl Label {
    /// The empty label `⊡`.
    pub const fn empty() -> Self {
        Self {
            present: 0,
            negated: 0,
            unknown: 0,
        }
    }

    /// Creates a label containing a single literal.
    pub fn from_literal(literal: Literal) -> Self {
        let mut label = Self::empty();
        label.set(literal);
        label
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.present == 0
    }

    /// The number of literals in this label.
    #[inline(always)]
    pub fn len(self) -> usize {
        self.present.count_ones() as usize
    }

    /// Whether this label contains a literal in the unknown state.
    #[inline(always)]
    pub fn contains_unknown(self) -> bool {
        self.unknown != 0
    }

    /// Whether `proposition` appears in this label, in any state.
    #[inline(always)]
    pub fn contains_proposition(self, proposition: Proposition) -> bool {
        self.present & proposition.bit() != 0
    }

    /// Returns the state of `proposition` in this label, if present.
    pub fn state_of(self, proposition: Proposition) -> Option<State> {
        let bit = proposition.bit();
        if self.present & bit == 0 {
            None
        } else if self.unknown & bit != 0 {
            Some(State::Unknown)
        } else if self.negated & bit != 0 {
            Some(State::Negated)
        } else {
            Some(State::Straight)
        }
    }

    /// Returns the literal on `proposition` in this label, if present.
    pub fn get(self, proposition: Proposition) -> Option<Literal> {
        self.state_of(proposition).map(|state| Literal {
            proposition,
            state,
        })
    }

    /// Sets `literal`, replacing any literal on the same proposition.
    pub fn set(&mut self, literal: Literal) {
        let bit = literal.proposition.bit();
        self.present |= bit;
        self.negated &= !bit;
        self.unknown &= !bit;
        match literal.state {
            State::Straight => {}
            State::Negated => self.negated |= bit,
            State::Unknown => self.unknown |= bit,
        }
    }

    /// Returns a copy of this label with `proposition` removed (in any state).
    pub fn remove(self, proposition: Proposition) -> Self {
        let mask = !proposition.bit();
        Self {
            present: self.present & mask,
            negated: self.negated & mask,
            unknown: self.unknown & mask,
        }
    }

    /// Returns a copy of this label without `literal`, if present with that
    /// exact state; a literal on the same proposition in another state is
    /// left alone.
    pub fn without(self, literal: Literal) -> Self {
        if self.get(literal.proposition) == Some(literal) {
            self.remove(literal.proposition)
        } else {
            self
        }
    }

    /// The literals of this label that do not appear, with the same state,
    /// in `other`.
    pub fn difference(self, other: Self) -> Self {
        let mut result = self;
        for literal in self.literals() {
            if other.get(literal.proposition) == Some(literal) {
                result = result.remove(literal.proposition);
            }
        }
        result
    }

    /// Returns a copy of this label with every proposition in `props` removed.
    pub fn remove_all(self, props: impl IntoIterator<Item = Proposition>) -> Self {
        let mut mask = 0;
        for p in props {
            mask |= p.bit();
        }
        Self {
            present: self.present & !mask,
            negated: self.negated & !mask,
            unknown: self.unknown & !mask,
        }
    }

    /// The conjunction of two labels, or `None` if they are inconsistent.
    ///
    /// Labels containing unknown literals have no proper conjunction: use
    /// [`conjunction_extended`](Self::conjunction_extended) for those.
    pub fn conjunction(self, other: Self) -> Option<Self> {
        if self.unknown != 0 || other.unknown != 0 {
            return None;
        }
        // Opposite straight/negated states on a common proposition.
        if (self.present & other.present) & (self.negated ^ other.negated) != 0 {
            return None;
        }
        Some(Self {
            present: self.present | other.present,
            negated: self.negated | other.negated,
            unknown: 0,
        })
    }

    /// The extended conjunction: opposite or unknown states collapse to the
    /// unknown state. Never fails.
    pub fn conjunction_extended(self, other: Self) -> Self {
        let present = self.present | other.present;
        let both = self.present & other.present;
        let unknown = self.unknown | other.unknown | (both & (self.negated ^ other.negated));
        let negated = ((self.negated & !other.present)
            | (other.negated & !self.present)
            | (self.negated & other.negated))
            & !unknown;
        Self {
            present,
            negated,
            unknown,
        }
    }

    /// Whether every literal of `other` appears in this label with the same
    /// state.
    #[inline(always)]
    pub fn subsumes(self, other: Self) -> bool {
        self.present & other.present == other.present
            && self.negated & other.present == other.negated
            && self.unknown & other.present == other.unknown
    }

    /// Whether no common proposition has opposite straight/negated states.
    ///
    /// An unknown literal is consistent with any literal on the same
    /// proposition.
    pub fn is_consistent_with(self, other: Self) -> bool {
        let both = self.present & other.present & !(self.unknown | other.unknown);
        both & (self.negated ^ other.negated) == 0
    }

    /// Iterates over the propositions of this label in ordinal order.
    pub fn propositions(self) -> impl Iterator<Item = Proposition> {
        let present = self.present;
        (0..super::literal::MAX_PROPOSITIONS)
            .filter(move |i| present & (1 << i) != 0)
            .map(Proposition::from_index)
    }

    /// Iterates over the literals of this label in proposition order.
    pub fn literals(self) -> impl Iterator<Item = Literal> {
        self.propositions().map(move |p| self.get(p).unwrap())
    }

    /// Enumerates the 2^n consistent complete labels over `props`.
    ///
    /// This is the generator used for base detection in labeled-value maps:
    /// every returned label assigns a straight or negated state to each
    /// proposition of `props`.
    pub fn all_components(props: &[Proposition]) -> impl Iterator<Item = Label> + '_ {
        (0..1u64 << props.len()).map(move |assignment| {
            let mut label = Label::empty();
            for (i, &p) in props.iter().enumerate() {
                if assignment & (1 << i) != 0 {
                    label.set(Literal::negated(p));
                } else {
                    label.set(Literal::straight(p));
                }
            }
            label
        })
    }
}

impl FromStr for Label {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "⊡" {
            return Ok(Self::empty());
        }
        let mut label = Self::empty();
        let mut state = State::Straight;
        let mut pending = false;
        for c in s.chars() {
            match c {
                '¬' => {
                    state = State::Negated;
                    pending = true;
                }
                '¿' => {
                    state = State::Unknown;
                    pending = true;
                }
                c => {
                    let proposition = Proposition::from_char(c)
                        .map_err(|_| ParseLabelError::InvalidProposition(c))?;
                    if label.contains_proposition(proposition) {
                        return Err(ParseLabelError::DuplicateProposition(c, s.into()));
                    }
                    label.set(Literal { proposition, state });
                    state = State::Straight;
                    pending = false;
                }
            }
        }
        if pending {
            return Err(ParseLabelError::DanglingPrefix(s.into()));
        }
        Ok(label)
    }
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "⊡");
        }
        for literal in self.literals() {
            write!(f, "{literal}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn l(s: &str) -> Label {
        s.parse().unwrap()
    }

    #[test]
    fn test_conjunction() {
        assert_eq!(l("ab").conjunction(l("¬c")), Some(l("ab¬c")));
        assert_eq!(l("a").conjunction(l("¬a")), None);
        assert_eq!(l("¿a").conjunction(l("b")), None);
        assert_eq!(l("ab").conjunction(Label::empty()), Some(l("ab")));
    }

    #[test]
    fn test_conjunction_extended() {
        assert_eq!(l("a").conjunction_extended(l("¬a")), l("¿a"));
        assert_eq!(l("¿a").conjunction_extended(l("a")), l("¿a"));
        assert_eq!(l("a¬b").conjunction_extended(l("a¬b")), l("a¬b"));
        assert_eq!(l("a¬bc").conjunction_extended(l("¬a¬b")), l("¿a¬bc"));
    }

    #[test]
    fn test_subsumption() {
        assert!(l("a¬bc").subsumes(l("a¬b")));
        assert!(!l("a¬b").subsumes(l("a¬bc")));
        assert!(!l("ab").subsumes(l("a¬b")));
        assert!(!l("¿ab").subsumes(l("ab")));
        assert!(l("¿ab").subsumes(l("¿a")));
    }

    #[test]
    fn test_consistency() {
        assert!(l("ab").is_consistent_with(l("a¬c")));
        assert!(!l("ab").is_consistent_with(l("¬b")));
        assert!(l("¿b").is_consistent_with(l("¬b")));
        assert!(l("¿b").is_consistent_with(l("b")));
    }

    #[test]
    fn test_difference_and_without() {
        assert_eq!(l("a¬bc").difference(l("¬bc")), l("a"));
        assert_eq!(l("a¬b").difference(l("ab")), l("¬b"));
        let b = crate::labels::Proposition::from_char('b').unwrap();
        assert_eq!(l("a¬b").without(Literal::negated(b)), l("a"));
        assert_eq!(l("a¬b").without(Literal::straight(b)), l("a¬b"));
    }

    #[test]
    fn test_components() {
        let props: Vec<_> = l("ab").propositions().collect();
        let components: Vec<_> = Label::all_components(&props).collect();
        assert_eq!(components.len(), 4);
        for c in &components {
            assert_eq!(c.len(), 2);
            assert!(!c.contains_unknown());
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!("a¬".parse::<Label>().is_err());
        assert!("a1".parse::<Label>().is_err());
        assert!("aa".parse::<Label>().is_err());
        assert!("a¬a".parse::<Label>().is_err());
    }
}
