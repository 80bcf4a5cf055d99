// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The differential run driver.
//!
//! Drives every test case through the same sequence: vote the variant pool
//! into an oracle, run the program under test, compare, and persist any
//! mismatch. Cases are driven strictly in corpus order, one at a time, and a
//! case that produces no verdict is skipped rather than retried.

use crate::{
    build_cache::BuildCache,
    case_store::CaseStore,
    compare::{judge, Verdict},
    config::{LanguageSpec, DEFAULT_TIMEOUT},
    errors::{CaseStoreError, RunError, RunnerBuildError},
    exec::{ExecutionOutcome, Executor},
    list::{InputCorpus, TestCase, VariantPool},
    oracle::{default_min_votes, VoteTally},
    reporter::{RunEvent, SkipReason},
    stopwatch::stopwatch,
};
use camino::Utf8Path;
use std::{convert::Infallible, time::Duration};
use tokio::runtime::Runtime;

/// Builder for [`DiffRunner`].
#[derive(Debug, Default)]
pub struct DiffRunnerBuilder {
    timeout: Option<Duration>,
    min_votes: Option<usize>,
}

impl DiffRunnerBuilder {
    /// Sets the per-execution timeout. Defaults to
    /// [`DEFAULT_TIMEOUT`](crate::config::DEFAULT_TIMEOUT).
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the number of votes an output needs to become the oracle.
    ///
    /// Defaults to a strict majority of the full pool, `total / 2 + 1`.
    pub fn set_min_votes(&mut self, min_votes: usize) -> &mut Self {
        self.min_votes = Some(min_votes);
        self
    }

    /// Creates a new differential runner.
    ///
    /// Validates that `put` exists, creates the output and build directories,
    /// and spins up the Tokio runtime executions are driven on.
    pub fn build<'a>(
        self,
        corpus: &'a InputCorpus,
        pool: &'a VariantPool,
        put: &'a Utf8Path,
        language: LanguageSpec,
        out_dir: &Utf8Path,
        build_dir: &Utf8Path,
    ) -> Result<DiffRunner<'a>, RunnerBuildError> {
        if !put.is_file() {
            return Err(RunnerBuildError::PutNotFound {
                path: put.to_owned(),
            });
        }

        let case_store = CaseStore::new(out_dir).map_err(RunnerBuildError::CaseStoreCreate)?;

        let build_cache = if language.is_compiled() {
            Some(BuildCache::new(build_dir).map_err(RunnerBuildError::BuildCacheCreate)?)
        } else {
            None
        };

        let min_votes = self
            .min_votes
            .unwrap_or_else(|| default_min_votes(pool.variant_count()));

        let runtime = Runtime::new().map_err(RunnerBuildError::TokioRuntimeCreate)?;

        Ok(DiffRunner {
            inner: DiffRunnerInner {
                corpus,
                pool,
                put,
                min_votes,
                executor: Executor::new(
                    language,
                    build_cache,
                    self.timeout.unwrap_or(DEFAULT_TIMEOUT),
                ),
                case_store,
                runtime,
            },
        })
    }
}

/// Runs every test case differentially: variants vote an oracle, the program
/// under test is judged against it.
#[derive(Debug)]
pub struct DiffRunner<'a> {
    inner: DiffRunnerInner<'a>,
}

impl<'a> DiffRunner<'a> {
    /// Executes the run.
    ///
    /// Accepts a callback that is called with every [`RunEvent`]. The only
    /// mid-run error that aborts a run is a failure to persist a confirmed
    /// mismatch.
    pub fn execute<F>(&mut self, mut callback: F) -> Result<RunStats, CaseStoreError>
    where
        F: FnMut(RunEvent<'a>),
    {
        self.try_execute::<Infallible, _>(|event| {
            callback(event);
            Ok(())
        })
        .map_err(|error| match error {
            RunError::Callback(infallible) => match infallible {},
            RunError::SaveCase(error) => error,
        })
    }

    /// Executes the run with a fallible event callback.
    ///
    /// If the callback returns an error, the run terminates and the callback
    /// is no longer called.
    pub fn try_execute<E, F>(&mut self, callback: F) -> Result<RunStats, RunError<E>>
    where
        F: FnMut(RunEvent<'a>) -> Result<(), E>,
    {
        self.inner.try_execute(callback)
    }
}

#[derive(Debug)]
struct DiffRunnerInner<'a> {
    corpus: &'a InputCorpus,
    pool: &'a VariantPool,
    put: &'a Utf8Path,
    min_votes: usize,
    executor: Executor,
    case_store: CaseStore,
    runtime: Runtime,
}

impl<'a> DiffRunnerInner<'a> {
    fn try_execute<E, F>(&self, mut callback: F) -> Result<RunStats, RunError<E>>
    where
        F: FnMut(RunEvent<'a>) -> Result<(), E>,
    {
        let stopwatch = stopwatch();
        let mut stats = RunStats {
            initial_case_count: self.corpus.test_count(),
            ..RunStats::default()
        };

        callback(RunEvent::RunStarted {
            test_count: self.corpus.test_count(),
            variant_count: self.pool.variant_count(),
            min_votes: self.min_votes,
        })
        .map_err(RunError::Callback)?;

        self.runtime.block_on(async {
            for case in self.corpus.iter() {
                self.run_case(case, &mut stats, &mut callback).await?;
            }
            Ok::<_, RunError<E>>(())
        })?;

        let snapshot = stopwatch.snapshot();
        callback(RunEvent::RunFinished {
            start_time: snapshot.start_time,
            elapsed: snapshot.duration,
            run_stats: stats,
            out_dir: self.case_store.out_dir().to_owned(),
        })
        .map_err(RunError::Callback)?;

        Ok(stats)
    }

    /// Drives a single case from aggregation to verdict.
    async fn run_case<E>(
        &self,
        case: &'a TestCase,
        stats: &mut RunStats,
        callback: &mut impl FnMut(RunEvent<'a>) -> Result<(), E>,
    ) -> Result<(), RunError<E>> {
        // Aggregate: run the whole pool in order and tally the survivors.
        // A variant failure only removes that variant's vote.
        let mut tally = VoteTally::new();
        for variant in self.pool.iter() {
            match self.executor.run(&variant.path, &case.input).await {
                ExecutionOutcome::Output(text) => tally.record(text),
                ExecutionOutcome::Failure(kind) => {
                    stats.variant_failures += 1;
                    callback(RunEvent::VariantFailed {
                        case,
                        variant,
                        kind,
                    })
                    .map_err(RunError::Callback)?;
                }
            }
        }

        let decision = match tally.decide(self.pool.variant_count()) {
            Some(decision) if decision.quorum_met(self.min_votes) => decision,
            leader => {
                stats.no_quorum_skipped += 1;
                callback(RunEvent::CaseSkipped {
                    case,
                    reason: SkipReason::NoQuorum {
                        leader,
                        min_votes: self.min_votes,
                        total_variants: self.pool.variant_count(),
                    },
                })
                .map_err(RunError::Callback)?;
                return Ok(());
            }
        };

        // Compare: a failing program under test yields no verdict, only a
        // skip.
        let put_output = match self.executor.run(self.put, &case.input).await {
            ExecutionOutcome::Output(text) => text,
            ExecutionOutcome::Failure(kind) => {
                stats.put_failure_skipped += 1;
                callback(RunEvent::CaseSkipped {
                    case,
                    reason: SkipReason::PutFailure { kind },
                })
                .map_err(RunError::Callback)?;
                return Ok(());
            }
        };

        match judge(&decision.text, &put_output) {
            Verdict::Match => {
                stats.matched += 1;
                callback(RunEvent::CaseMatched { case, decision }).map_err(RunError::Callback)?;
            }
            Verdict::Defect => {
                // Persist before reporting so the event can point at real
                // files.
                let saved = self
                    .case_store
                    .save(case, &decision.text, &put_output)
                    .map_err(RunError::SaveCase)?;
                stats.mismatched += 1;
                callback(RunEvent::CaseMismatched {
                    case,
                    decision,
                    put_output,
                    saved,
                })
                .map_err(RunError::Callback)?;
            }
        }

        Ok(())
    }
}

/// Statistics for a differential run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The number of test cases in the corpus.
    pub initial_case_count: usize,

    /// Cases where the program under test agreed with the oracle.
    pub matched: usize,

    /// Cases where the program under test contradicted the oracle. Each one
    /// was persisted as a bug-triggering case.
    pub mismatched: usize,

    /// Cases skipped because no output cleared the vote threshold.
    pub no_quorum_skipped: usize,

    /// Cases skipped because the program under test itself failed.
    pub put_failure_skipped: usize,

    /// Variant failures absorbed across the whole run.
    pub variant_failures: usize,
}

impl RunStats {
    /// The number of cases that produced a verdict.
    pub fn decided(&self) -> usize {
        self.matched + self.mismatched
    }

    /// The number of cases that produced no verdict.
    pub fn skipped(&self) -> usize {
        self.no_quorum_skipped + self.put_failure_skipped
    }

    /// Returns true if no mismatches were found.
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0
    }

    /// Returns true if not a single case produced a verdict. Such a run says
    /// nothing about the program under test.
    pub fn no_cases_decided(&self) -> bool {
        self.decided() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accounting() {
        let stats = RunStats {
            initial_case_count: 10,
            matched: 6,
            mismatched: 2,
            no_quorum_skipped: 1,
            put_failure_skipped: 1,
            variant_failures: 4,
        };
        assert_eq!(stats.decided(), 8);
        assert_eq!(stats.skipped(), 2);
        assert!(!stats.is_clean());
        assert!(!stats.no_cases_decided());

        let all_skipped = RunStats {
            initial_case_count: 3,
            no_quorum_skipped: 2,
            put_failure_skipped: 1,
            ..RunStats::default()
        };
        assert!(all_skipped.is_clean());
        assert!(all_skipped.no_cases_decided());
    }
}
