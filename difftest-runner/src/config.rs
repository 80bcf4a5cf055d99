// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language configuration: how variants and programs under test are run.

use std::time::Duration;

/// The default per-execution timeout applied to variants and the program
/// under test alike.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// How sources in a given language are turned into something runnable.
#[derive(Clone, Debug)]
pub enum ExecutionMode {
    /// Sources are handed to an interpreter on every run. The source path is
    /// appended as the final argument of `command`.
    Interpreted {
        /// The interpreter invocation, e.g. `["python3"]`.
        command: Vec<String>,
    },

    /// Sources are compiled once into the build cache, after which the
    /// artifact is executed directly. The source path and `-o <artifact>` are
    /// appended to `command`.
    Compiled {
        /// The compiler invocation, e.g. `["g++", "-std=c++17", "-O2"]`.
        command: Vec<String>,
    },
}

/// A language that variants and the program under test can be written in.
///
/// Couples the source extension used during discovery with the execution mode
/// used to run a source file.
#[derive(Clone, Debug)]
pub struct LanguageSpec {
    extension: String,
    mode: ExecutionMode,
}

impl LanguageSpec {
    /// Python sources, run with `python3`.
    pub fn python() -> Self {
        Self::interpreted("py", vec!["python3".to_owned()])
    }

    /// C++ sources, compiled with `g++ -std=c++17 -O2 -pipe`.
    pub fn cpp() -> Self {
        Self::compiled(
            "cpp",
            vec![
                "g++".to_owned(),
                "-std=c++17".to_owned(),
                "-O2".to_owned(),
                "-pipe".to_owned(),
            ],
        )
    }

    /// Creates a spec for an interpreted language with a custom interpreter
    /// invocation.
    ///
    /// The extension is specified without the leading dot. Panics if `command`
    /// is empty.
    pub fn interpreted(extension: impl Into<String>, command: Vec<String>) -> Self {
        assert!(!command.is_empty(), "interpreter command must be non-empty");
        Self {
            extension: extension.into(),
            mode: ExecutionMode::Interpreted { command },
        }
    }

    /// Creates a spec for a compiled language with a custom compiler
    /// invocation.
    ///
    /// The compiler must accept `<command..> <source> -o <output>`. The
    /// extension is specified without the leading dot. Panics if `command` is
    /// empty.
    pub fn compiled(extension: impl Into<String>, command: Vec<String>) -> Self {
        assert!(!command.is_empty(), "compiler command must be non-empty");
        Self {
            extension: extension.into(),
            mode: ExecutionMode::Compiled { command },
        }
    }

    /// Returns the source extension for this language, without the leading
    /// dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns true if sources require a compile step before running.
    pub fn is_compiled(&self) -> bool {
        matches!(self.mode, ExecutionMode::Compiled { .. })
    }

    pub(crate) fn mode(&self) -> &ExecutionMode {
        &self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_have_expected_extensions() {
        assert_eq!(LanguageSpec::python().extension(), "py");
        assert!(!LanguageSpec::python().is_compiled());
        assert_eq!(LanguageSpec::cpp().extension(), "cpp");
        assert!(LanguageSpec::cpp().is_compiled());
    }

    #[test]
    #[should_panic(expected = "interpreter command must be non-empty")]
    fn empty_interpreter_command_panics() {
        LanguageSpec::interpreted("sh", Vec::new());
    }
}
