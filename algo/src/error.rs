/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use tempnet::graph::GraphError;
use thiserror::Error;

/// An error raised before or during a check.
///
/// All variants are detected before propagation starts: propagation itself
/// never fails, it only settles the [`CheckStatus`](crate::CheckStatus).
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("the network uses {0} propositions, more than the supported 22")]
    TooManyPropositions(usize),
    #[error("the horizon {0} does not fit the finite weight range")]
    HorizonOverflow(i64),
    #[error("ill-defined network: {0}")]
    WellDefinedness(String),
    #[error("malformed contingent link: {0}")]
    MalformedContingent(String),
    #[error("the fresh-proposition pool is exhausted")]
    PropositionPoolExhausted,
    #[error(transparent)]
    Graph(#[from] GraphError),
}
