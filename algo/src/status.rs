/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::time::Duration;

/// The outcome of a check, including per-rule application counters.
///
/// `consistency` is meaningful only when `finished` is true. A check that hit
/// its cycle bound reports `finished = false` with `timeout = false`: a sound
/// instance would have converged within the bound, so callers should treat it
/// as a negative verdict.
#[derive(Debug, Clone, Default)]
pub struct CheckStatus {
    /// Whether the network is consistent/controllable.
    pub consistency: bool,
    /// Whether the check ran to completion.
    pub finished: bool,
    /// Whether the deadline expired before completion.
    pub timeout: bool,
    /// Fixed-point cycles executed.
    pub cycles: u64,
    /// Applications of the label-propagation rule.
    pub lp_calls: u64,
    /// Applications of rule R0/qR0.
    pub r0_calls: u64,
    /// Applications of rule R3/qR3.
    pub r3_calls: u64,
    /// Applications of the upper-case propagation rule.
    pub upper_case_calls: u64,
    /// Applications of the lower-case rule.
    pub lower_case_calls: u64,
    /// Applications of the cross-case rule.
    pub cross_case_calls: u64,
    /// Applications of the letter-removal rule.
    pub letter_removal_calls: u64,
    /// Applications of the oracle rule.
    pub oracle_calls: u64,
    /// Potential updates performed by the potential solver.
    pub potential_update_calls: u64,
    /// Wall-clock time of the check.
    pub execution_time: Option<Duration>,
    /// A node on a negative loop, when one was found.
    pub negative_loop_node: Option<String>,
}

impl CheckStatus {
    /// Marks the check as finished with the given verdict.
    pub(crate) fn finish(&mut self, consistency: bool) {
        self.finished = true;
        self.consistency = consistency;
    }

    /// Records a negative loop through `node` and settles the verdict.
    pub(crate) fn negative_loop(&mut self, node: impl Into<String>) {
        self.negative_loop_node = Some(node.into());
        self.finish(false);
    }

    /// Whether the check already reached a verdict or gave up.
    pub(crate) fn is_settled(&self) -> bool {
        self.finished || self.timeout
    }
}

impl core::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.timeout {
            writeln!(f, "verdict: timeout")?;
        } else if !self.finished {
            writeln!(f, "verdict: cycle bound reached (treated as negative)")?;
        } else if self.consistency {
            writeln!(f, "verdict: consistent/controllable")?;
        } else {
            writeln!(f, "verdict: NOT consistent/controllable")?;
        }
        if let Some(node) = &self.negative_loop_node {
            writeln!(f, "negative loop at: {node}")?;
        }
        writeln!(f, "cycles: {}", self.cycles)?;
        writeln!(f, "rule LP: {}", self.lp_calls)?;
        writeln!(f, "rule R0: {}", self.r0_calls)?;
        writeln!(f, "rule R3: {}", self.r3_calls)?;
        if self.upper_case_calls + self.lower_case_calls + self.cross_case_calls != 0 {
            writeln!(f, "rule upper case: {}", self.upper_case_calls)?;
            writeln!(f, "rule lower case: {}", self.lower_case_calls)?;
            writeln!(f, "rule cross case: {}", self.cross_case_calls)?;
            writeln!(f, "rule letter removal: {}", self.letter_removal_calls)?;
        }
        if self.oracle_calls != 0 {
            writeln!(f, "rule oracle: {}", self.oracle_calls)?;
        }
        if self.potential_update_calls != 0 {
            writeln!(f, "potential updates: {}", self.potential_update_calls)?;
        }
        if let Some(t) = self.execution_time {
            writeln!(f, "execution time: {} ns", t.as_nanos())?;
        }
        Ok(())
    }
}
