/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unconditional_recursion)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod arith;
pub mod graph;
pub mod io;
pub mod labels;
pub mod maps;
pub mod utils;

pub mod prelude {
    pub use crate::arith::{sum_overflow_safe, Weight, INF, NEG_INF};
    pub use crate::graph::{
        ConstraintType, ContingentLink, Edge, EdgeId, GraphError, LowerCaseValue, Node, NodeId,
        TNGraph,
    };
    pub use crate::labels::{ALabel, ALetter, Label, Literal, Proposition, State};
    pub use crate::maps::{LabeledALabelIntMap, LabeledIntMap};
    pub use crate::utils::{AddressableHeap, EdgesToCheck, NodesToCheck};
}
