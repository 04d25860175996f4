/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::str::FromStr;
use thiserror::Error;

/// The name of a contingent time-point, one of the letters `A..Z`.
///
/// Upper-case values carry sets of these names ([`ALabel`]); the lower-case
/// value of a contingent link carries a single one, rendered lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ALetter(u8);

/// An error raised when a character does not denote a contingent name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("character {0:?} is not a contingent name (allowed: A..Z)")]
pub struct InvalidALetter(pub char);

impl ALetter {
    pub fn from_char(c: char) -> Result<Self, InvalidALetter> {
        match c {
            'A'..='Z' => Ok(Self(c as u8 - b'A')),
            'a'..='z' => Ok(Self(c as u8 - b'a')),
            _ => Err(InvalidALetter(c)),
        }
    }

    /// Creates a contingent name from its ordinal.
    ///
    /// # Panics
    ///
    /// Panics if `index >= 26`.
    pub fn from_index(index: usize) -> Self {
        assert!(index < 26, "contingent ordinal {index} out of range");
        Self(index as u8)
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The upper-case rendering, used by A-labels.
    pub fn to_char(self) -> char {
        (b'A' + self.0) as char
    }

    /// The lower-case rendering, used by lower-case values.
    pub fn to_lower_char(self) -> char {
        (b'a' + self.0) as char
    }

    #[inline(always)]
    fn bit(self) -> u32 {
        1 << self.0
    }
}

impl core::fmt::Display for ALetter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A set of contingent names, used to tag upper-case labeled values.
///
/// The empty A-label (rendered `◇`) denotes an ordinary labeled value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ALabel(u32);

impl ALabel {
    /// The empty A-label `◇`.
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_letter(letter: ALetter) -> Self {
        Self(letter.bit())
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The number of contingent names in this A-label.
    #[inline(always)]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline(always)]
    pub fn contains(self, letter: ALetter) -> bool {
        self.0 & letter.bit() != 0
    }

    #[must_use]
    pub fn insert(self, letter: ALetter) -> Self {
        Self(self.0 | letter.bit())
    }

    #[must_use]
    pub fn remove(self, letter: ALetter) -> Self {
        Self(self.0 & !letter.bit())
    }

    /// The union of two A-labels.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Iterates over the contingent names in alphabetical order.
    pub fn letters(self) -> impl Iterator<Item = ALetter> {
        let bits = self.0;
        (0..26u8)
            .filter(move |i| bits & (1 << i) != 0)
            .map(ALetter)
    }
}

impl From<ALetter> for ALabel {
    fn from(letter: ALetter) -> Self {
        Self::from_letter(letter)
    }
}

impl FromStr for ALabel {
    type Err = InvalidALetter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "◇" {
            return Ok(Self::empty());
        }
        let mut a_label = Self::empty();
        for c in s.chars() {
            a_label = a_label.insert(ALetter::from_char(c)?);
        }
        Ok(a_label)
    }
}

impl core::fmt::Display for ALabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "◇");
        }
        for letter in self.letters() {
            write!(f, "{letter}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_a_label() {
        let c = ALetter::from_char('C').unwrap();
        let d = ALetter::from_char('d').unwrap();
        let a_label = ALabel::from_letter(c).insert(d);
        assert_eq!(a_label.to_string(), "CD");
        assert_eq!("CD".parse::<ALabel>().unwrap(), a_label);
        assert_eq!(a_label.remove(c).to_string(), "D");
        assert_eq!(a_label.remove(c).remove(d), ALabel::empty());
        assert_eq!(ALabel::empty().to_string(), "◇");
        assert!(a_label.contains(c));
        assert_eq!(a_label.len(), 2);
    }
}
