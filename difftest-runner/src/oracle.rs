// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Majority voting across variant outputs.
//!
//! There is no ground-truth oracle for a program under test, so the pool of
//! presumed-equivalent variants is run on each input and their outputs are
//! voted. An output that clears the vote threshold becomes the synthetic
//! oracle for that input.

use indexmap::IndexMap;

/// The vote threshold used when none is configured: a strict majority of the
/// full pool, `total / 2 + 1`.
pub fn default_min_votes(total_variants: usize) -> usize {
    total_variants / 2 + 1
}

/// Vote counts for the distinct outputs seen on a single test input.
///
/// Insertion order is tracked so that ties can be broken in favor of the
/// output seen first, which keeps runs deterministic given the fixed variant
/// enumeration order.
#[derive(Clone, Debug, Default)]
pub struct VoteTally {
    counts: IndexMap<String, usize>,
}

impl VoteTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one variant's output.
    pub fn record(&mut self, output: String) {
        *self.counts.entry(output).or_insert(0) += 1;
    }

    /// Returns the number of votes recorded, i.e. how many variants produced
    /// output.
    pub fn successes(&self) -> usize {
        self.counts.values().sum()
    }

    /// Picks the winning output, if any variant produced output at all.
    ///
    /// The winner is the output with the most votes; ties go to the output
    /// recorded first. `total_variants` is the size of the full pool and
    /// becomes the decision's denominator, whether or not every variant
    /// voted.
    ///
    /// The returned decision says nothing about quorum. Check it with
    /// [`OracleDecision::quorum_met`].
    pub fn decide(&self, total_variants: usize) -> Option<OracleDecision> {
        let mut leader: Option<(&str, usize)> = None;
        for (text, &votes) in &self.counts {
            let beats = match leader {
                Some((_, best)) => votes > best,
                None => true,
            };
            if beats {
                leader = Some((text, votes));
            }
        }

        leader.map(|(text, votes)| OracleDecision {
            text: text.to_owned(),
            votes,
            total_variants,
        })
    }
}

/// The output that won the vote on a single test input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OracleDecision {
    /// The winning normalized output text.
    pub text: String,

    /// How many variants produced exactly this output.
    pub votes: usize,

    /// The size of the full variant pool.
    pub total_variants: usize,
}

impl OracleDecision {
    /// Returns true if this decision carries at least `min_votes` votes and
    /// can act as an oracle.
    pub fn quorum_met(&self, min_votes: usize) -> bool {
        self.votes >= min_votes
    }
}
