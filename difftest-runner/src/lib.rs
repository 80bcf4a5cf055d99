// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core functionality for [difftest](https://crates.io/crates/difftest-cli).
//!
//! difftest hunts for bugs in a program under test without a hand-written
//! oracle: a pool of independently produced, presumed-equivalent variants is
//! run on each test input, their outputs are majority-voted into a synthetic
//! oracle, and any input where the program under test contradicts that oracle
//! is persisted as a bug-triggering case.
//!
//! The flow of a run:
//!
//! 1. [`list`] discovers the variant pool and the test corpus.
//! 2. [`runner`] drives each case: every variant runs through [`exec`]
//!    (compiling through [`build_cache`] for compiled languages), the outputs
//!    are tallied by [`oracle`], and the program under test is judged by
//!    [`compare`].
//! 3. Mismatches are persisted by [`case_store`] and everything is reported
//!    through [`reporter`] events.

#![warn(missing_docs)]

pub mod build_cache;
pub mod case_store;
pub mod compare;
pub mod config;
pub mod errors;
pub mod exec;
pub mod list;
pub mod oracle;
pub mod reporter;
pub mod runner;
mod stopwatch;
