/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Reading and writing networks in the GraphML-ish textual format.
//!
//! Nodes carry the data keys `x`, `y`, `Label`, `Obs`, `ALabel`, `Potential`
//! and `Distribution`; edges carry `Type`, `LabeledValues`,
//! `LowerCaseLabeledValues` and `UpperCaseLabeledValues`. Values use the
//! textual forms of the label and map types, e.g. `{(-3, ¬ab) }`.

mod graphml;

pub use graphml::{read_graphml, write_graphml, ParseError};
