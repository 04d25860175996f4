/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet::labels::{ALabel, Label};
use tempnet::maps::LabeledALabelIntMap;

fn l(s: &str) -> Label {
    s.parse().unwrap()
}

fn al(s: &str) -> ALabel {
    s.parse().unwrap()
}

#[test]
fn test_ordinary_dominates_across_a_labels() {
    let mut map = LabeledALabelIntMap::new();
    assert!(map.merge(al("C"), l("ab"), -5));
    assert!(map.merge(al("D"), l("a"), -4));
    // The ordinary value binds in every situation: both upper-case entries it
    // implies disappear.
    assert!(map.merge(ALabel::empty(), l("a"), -5));
    assert_eq!(map.get(al("C"), l("ab")), None);
    assert_eq!(map.get(al("D"), l("a")), None);
    assert_eq!(map.len(), 1);
    // A strictly tighter upper-case value is still informative.
    assert!(map.merge(al("C"), l("a"), -6));
    assert_eq!(map.min_value(), Some(-6));
}

#[test]
fn test_dominance_within_one_a_label() {
    let mut map = LabeledALabelIntMap::new();
    assert!(map.merge(al("C"), l("a"), -5));
    assert!(!map.merge(al("C"), l("ab"), -5));
    assert!(!map.merge(al("C"), l("ab"), -3));
    assert!(map.merge(al("C"), l("ab"), -7));
    assert_eq!(map.len(), 2);
}

#[test]
fn test_triple_iteration_ordinary_first() {
    let mut map = LabeledALabelIntMap::new();
    map.merge(al("C"), l("b"), -2);
    map.merge(ALabel::empty(), l("a"), 3);
    let triples: Vec<_> = map.iter().collect();
    assert_eq!(triples[0], (ALabel::empty(), l("a"), 3));
    assert_eq!(triples[1], (al("C"), l("b"), -2));
    assert_eq!(map.upper_case_iter().count(), 1);
}

#[test]
fn test_upper_case_textual_round_trip() {
    let mut map = LabeledALabelIntMap::new();
    map.merge(al("C"), l("¬a"), -7);
    map.merge(al("CD"), l("b"), -9);
    map.merge(al("D"), Label::empty(), -1);
    let rendered = map.upper_case_to_string();
    let parsed: LabeledALabelIntMap = rendered.parse().unwrap();
    assert_eq!(parsed, map);
    assert_eq!(
        "{}".parse::<LabeledALabelIntMap>().unwrap(),
        LabeledALabelIntMap::new()
    );
}

#[test]
fn test_remove_prunes_empty_levels() {
    let mut map = LabeledALabelIntMap::new();
    map.merge(al("C"), l("a"), -5);
    assert_eq!(map.remove(al("C"), l("a")), Some(-5));
    assert!(map.is_empty());
    assert_eq!(map.remove(al("C"), l("a")), None);
}
