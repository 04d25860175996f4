/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Shared utilities: work sets for fixed-point drivers and the addressable
//! heap used by the real-time executor.

mod heap;
mod work_set;

pub use heap::AddressableHeap;
pub use work_set::{EdgesToCheck, NodesToCheck, WorkSet};
