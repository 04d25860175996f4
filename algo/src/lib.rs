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

mod cstn;
mod cstnu;
mod error;
mod ostnu;
mod potentials;
pub mod rte;
mod semantics;
mod status;

pub use cstn::CstnChecker;
pub use cstnu::CstnuChecker;
pub use error::CheckError;
pub use ostnu::OstnuChecker;
pub use potentials::{potentials_by_name, PotentialSolver, PotentialsByName};
pub use semantics::{Reaction, Semantics};
pub use status::CheckStatus;

pub mod prelude {
    pub use crate::rte::{is_a_viable_schedule, RealTimeExecutor, RteResult, Strategy};
    pub use crate::{
        CheckError, CheckStatus, CstnChecker, CstnuChecker, OstnuChecker, PotentialSolver,
        Reaction, Semantics,
    };
}
