// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by difftest.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while scanning a directory of test inputs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CorpusError {
    /// Reading the test input directory failed.
    #[error("failed to read test input directory `{dir}`")]
    ReadDir {
        /// The directory that couldn't be read.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// No test inputs matched the expected pattern.
    #[error("no test inputs found in `{dir}` (expected `*.in`)")]
    NoTestInputs {
        /// The directory that was scanned.
        dir: Utf8PathBuf,
    },

    /// Reading a single test input failed.
    #[error("failed to read test input `{path}`")]
    ReadInput {
        /// The input file that couldn't be read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while scanning a directory of variants.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Reading the variant directory failed.
    #[error("failed to read variant directory `{dir}`")]
    ReadDir {
        /// The directory that couldn't be read.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// No variants matched the expected pattern.
    #[error("no variants found in `{dir}` (expected `variant_*.{extension}`)")]
    NoVariants {
        /// The directory that was scanned.
        dir: Utf8PathBuf,

        /// The source extension that was looked for.
        extension: String,
    },
}

/// An error that occurred while compiling a source file into the build cache.
///
/// These errors are not fatal to a run: the executor folds them into a
/// build-failed outcome for the program concerned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildCacheError {
    /// The build directory couldn't be created.
    #[error("failed to create build directory `{dir}`")]
    CreateDir {
        /// The build directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The source file couldn't be read for hashing.
    #[error("failed to read source file `{path}`")]
    ReadSource {
        /// The source file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The compiler could not be executed at all.
    #[error("failed to execute compiler `{program}`")]
    CompilerExec {
        /// The compiler binary that was invoked.
        program: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The compiler exited non-zero.
    #[error("failed to compile `{path}`:\n{stderr}")]
    CompileFailed {
        /// The source file that failed to compile.
        path: Utf8PathBuf,

        /// Captured compiler stderr.
        stderr: String,
    },

    /// Moving the finished artifact into place failed.
    #[error("failed to store compiled artifact `{path}`")]
    StoreArtifact {
        /// The final artifact path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while persisting a bug-triggering case.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaseStoreError {
    /// The output directory couldn't be created.
    #[error("failed to create output directory `{dir}`")]
    CreateDir {
        /// The output directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Writing one of the case files failed.
    #[error("failed to write case file `{path}`")]
    Write {
        /// The file being written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while building a `DiffRunner`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerBuildError {
    /// The program under test doesn't exist on disk.
    #[error("program under test not found at `{path}`")]
    PutNotFound {
        /// The path that was configured.
        path: Utf8PathBuf,
    },

    /// Creating the output directory for bug cases failed.
    #[error("failed to set up case store")]
    CaseStoreCreate(#[source] CaseStoreError),

    /// Creating the build directory failed.
    #[error("failed to set up build cache")]
    BuildCacheCreate(#[source] BuildCacheError),

    /// Creating the Tokio runtime failed.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] io::Error),
}

/// An error that occurred during a differential run.
#[derive(Debug, Error)]
pub enum RunError<E> {
    /// An error was returned by the event callback.
    #[error("error reported by event callback")]
    Callback(#[source] E),

    /// A confirmed defect couldn't be persisted.
    #[error("failed to save bug-triggering case")]
    SaveCase(#[source] CaseStoreError),
}

/// An error that occurred while writing a run event to output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] io::Error),
}
