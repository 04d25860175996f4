/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet::arith::Weight;

/// The reaction-time semantics of a check.
///
/// Under instantaneous reaction (IR) the controller can react to an
/// observation in the very instant it is made; under the standard semantics it
/// must react strictly later; under ε-reaction at least `reaction_time` later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reaction {
    #[default]
    Instantaneous,
    Standard,
    Epsilon(Weight),
}

/// The configuration of a propagation run.
///
/// Checker variants differ only in a handful of predicates over rule
/// applicability; those predicates live here so a single propagator core can
/// serve every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semantics {
    pub reaction: Reaction,
    /// Whether node labels take part in well-definedness checks and rules.
    pub with_node_labels: bool,
    /// Whether the fixed point only considers pairs ending at Z.
    pub propagation_only_to_z: bool,
    /// Whether contingent bounds are duplicated as ordinary labeled values.
    pub contingent_also_as_ordinary: bool,
    /// Whether ill-formed labels are repaired instead of rejected.
    pub fix_labels: bool,
}

impl Default for Semantics {
    fn default() -> Self {
        Self {
            reaction: Reaction::Instantaneous,
            with_node_labels: false,
            propagation_only_to_z: false,
            contingent_also_as_ordinary: true,
            fix_labels: true,
        }
    }
}

impl Semantics {
    /// Under IR, a label-propagation step with a non-negative first value must
    /// restrict itself to consistent labels.
    #[inline(always)]
    pub fn must_restrict_to_consistent_label(&self, u: Weight, _v: Weight) -> bool {
        match self.reaction {
            Reaction::Instantaneous => u >= 0,
            _ => u > 0,
        }
    }

    /// Whether R0 must skip an entry of value `w`.
    #[inline(always)]
    pub fn skip_in_r0(&self, w: Weight) -> bool {
        match self.reaction {
            Reaction::Instantaneous => w >= 0,
            _ => w > 0,
        }
    }

    /// Whether R3 must skip an observation value `w` toward `destination_is_z`.
    #[inline(always)]
    pub fn skip_in_r3(&self, w: Weight, destination_is_z: bool) -> bool {
        match self.reaction {
            Reaction::Instantaneous => {
                if destination_is_z {
                    w >= 0
                } else {
                    w > 0
                }
            }
            _ => w > 0,
        }
    }
}
