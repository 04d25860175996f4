/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Propositional labels and their algebra.
//!
//! A [`Label`] is a conjunction of [`Literal`]s, at most one per
//! [`Proposition`]; a literal can be straight (`a`), negated (`¬a`) or, during
//! propagation only, unknown (`¿a`). Labels support proper conjunction, which
//! fails on opposite states, and extended conjunction, which collapses
//! opposite states to the unknown state.
//!
//! [`ALabel`]s are sets of contingent-time-point names used to tag upper-case
//! labeled values in networks with uncertainty.

mod a_label;
mod label;
mod literal;

pub use a_label::{ALabel, ALetter, InvalidALetter};
pub use label::{Label, ParseLabelError};
pub use literal::{
    InvalidProposition, Literal, Proposition, State, MAX_INPUT_PROPOSITIONS, MAX_PROPOSITIONS,
};
