// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A differential testing harness for pools of presumed-equivalent programs.
//!
//! This crate provides the `difftest` binary. The core logic lives in the
//! [difftest-runner](https://crates.io/crates/difftest-runner) crate.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
