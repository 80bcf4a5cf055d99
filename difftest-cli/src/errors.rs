// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use difftest_runner::errors::{
    CaseStoreError, CorpusError, PoolError, RunError, RunnerBuildError, WriteEventError,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::{error, info};

/// Documented exit codes for difftest failures.
///
/// Runs may fail for a variety of reasons. This structure documents the exit codes that may occur
/// in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum DifftestExitCode {}

impl DifftestExitCode {
    /// No errors occurred and difftest exited normally.
    pub const OK: i32 = 0;

    /// No test case reached a verdict, so the run says nothing about the program
    /// under test.
    pub const NO_CASES_DECIDED: i32 = 4;

    /// A user issue happened while setting up a difftest invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// One or more test cases disagreed with the oracle.
    pub const DEFECTS_FOUND: i32 = 100;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that occurred during a difftest invocation.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("corpus scan failed")]
    CorpusError {
        #[from]
        err: CorpusError,
    },
    #[error("variant pool scan failed")]
    PoolError {
        #[from]
        err: PoolError,
    },
    #[error("building differential runner failed")]
    RunnerBuildError {
        #[from]
        err: RunnerBuildError,
    },
    #[error("saving bug-triggering case failed")]
    SaveCaseError {
        #[source]
        err: CaseStoreError,
    },
    #[error("writing event failed")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("writing case list to output failed")]
    WriteCaseListError {
        #[source]
        err: std::io::Error,
    },
    #[error("differential test run failed")]
    DefectsFound,
    #[error("no test cases were decided")]
    NoCasesDecided,
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CorpusError { .. }
            | Self::PoolError { .. }
            | Self::RunnerBuildError { .. } => DifftestExitCode::SETUP_ERROR,
            Self::SaveCaseError { .. }
            | Self::WriteEventError { .. }
            | Self::WriteCaseListError { .. } => DifftestExitCode::WRITE_OUTPUT_ERROR,
            Self::DefectsFound => DifftestExitCode::DEFECTS_FOUND,
            Self::NoCasesDecided => DifftestExitCode::NO_CASES_DECIDED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CorpusError { err } => {
                error!("{}", err);
                err.source()
            }
            Self::PoolError { err } => {
                error!("{}", err);
                err.source()
            }
            Self::RunnerBuildError { err } => {
                error!("{}", err);
                err.source()
            }
            Self::SaveCaseError { err } => {
                error!("failed to save bug-triggering case");
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                error!("failed to write event to output");
                Some(err as &dyn Error)
            }
            Self::WriteCaseListError { err } => {
                error!("failed to write case list to output");
                Some(err as &dyn Error)
            }
            Self::DefectsFound => {
                error!("differential test run failed");
                None
            }
            Self::NoCasesDecided => {
                error!("no test cases were decided");
                info!(
                    target: "difftest_cli::no_heading",
                    "(hint: grow the variant pool, or lower {})",
                    "--min-votes".style(styles.bold),
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: "difftest_cli::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<RunError<WriteEventError>> for ExpectedError {
    fn from(err: RunError<WriteEventError>) -> Self {
        match err {
            RunError::Callback(err) => Self::WriteEventError { err },
            RunError::SaveCase(err) => Self::SaveCaseError { err },
        }
    }
}
