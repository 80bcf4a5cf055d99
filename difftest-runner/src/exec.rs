// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executing a single program against a single test input.
//!
//! The executor feeds the input over stdin, captures stdout and stderr, and
//! enforces a wall-clock timeout. Failures of any kind are folded into an
//! [`ExecutionOutcome`] rather than surfaced as errors: a misbehaving variant
//! must never abort a differential run.

use crate::{
    build_cache::BuildCache,
    config::{ExecutionMode, LanguageSpec},
    errors::BuildCacheError,
};
use camino::Utf8Path;
use std::{fmt, process::Stdio, time::Duration};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 4096;

/// How long to wait for stdout/stderr to hit EOF after the child exits.
/// Grandchildren that inherited the pipes can hold them open indefinitely.
const PIPE_GRACE: Duration = Duration::from_millis(100);

/// The outcome of running one program on one test input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecutionOutcome {
    /// The program exited zero. The payload is its stdout, decoded as UTF-8
    /// (lossily) with trailing whitespace trimmed.
    Output(String),

    /// The program produced no usable output.
    Failure(FailureKind),
}

impl ExecutionOutcome {
    /// Returns the normalized output text, if the execution produced one.
    pub fn output(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Output(text) => Some(text),
            ExecutionOutcome::Failure(_) => None,
        }
    }
}

/// The ways an execution can fail to produce output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The program exited non-zero or was terminated by a signal.
    Crashed {
        /// The exit code, if there was one.
        exit_code: Option<i32>,

        /// The terminating signal, on Unix.
        signal: Option<i32>,
    },

    /// The program ran past the configured timeout and was killed.
    TimedOut,

    /// The program's source failed to compile.
    BuildFailed,

    /// The program couldn't be spawned, or its output couldn't be collected.
    StartFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Crashed {
                signal: Some(signal),
                ..
            } => write!(f, "crashed (signal {signal})"),
            FailureKind::Crashed {
                exit_code: Some(code),
                ..
            } => write!(f, "crashed (exit code {code})"),
            FailureKind::Crashed { .. } => write!(f, "crashed"),
            FailureKind::TimedOut => write!(f, "timed out"),
            FailureKind::BuildFailed => write!(f, "build failed"),
            FailureKind::StartFailed => write!(f, "failed to start"),
        }
    }
}

/// Decodes captured stdout and trims trailing whitespace.
///
/// Output equality is judged on this normalized form, so programs that differ
/// only in a final newline still agree.
pub fn normalize_output(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_owned()
}

/// Runs programs of one language under a shared timeout, compiling them
/// through the build cache if needed.
#[derive(Debug)]
pub struct Executor {
    language: LanguageSpec,
    build_cache: Option<BuildCache>,
    timeout: Duration,
}

impl Executor {
    /// Creates an executor.
    ///
    /// Panics if `language` is compiled and no build cache is provided.
    pub fn new(
        language: LanguageSpec,
        build_cache: Option<BuildCache>,
        timeout: Duration,
    ) -> Self {
        assert!(
            build_cache.is_some() || !language.is_compiled(),
            "compiled languages require a build cache"
        );
        Self {
            language,
            build_cache,
            timeout,
        }
    }

    /// Runs `program` with `input` fed over stdin.
    ///
    /// Never returns an error: compile failures, spawn failures, crashes and
    /// timeouts all come back as [`ExecutionOutcome::Failure`]. The child is
    /// reaped on every path before this returns.
    pub async fn run(&self, program: &Utf8Path, input: &str) -> ExecutionOutcome {
        let argv = match self.resolve(program).await {
            Ok(argv) => argv,
            Err(error) => {
                warn!("build of `{program}` failed: {error}");
                return ExecutionOutcome::Failure(FailureKind::BuildFailed);
            }
        };

        match self.run_command(&argv, input).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("failed to execute `{program}`: {error}");
                ExecutionOutcome::Failure(FailureKind::StartFailed)
            }
        }
    }

    /// Resolves a source file into the argv that actually runs it.
    async fn resolve(&self, program: &Utf8Path) -> Result<Vec<String>, BuildCacheError> {
        match self.language.mode() {
            ExecutionMode::Interpreted { command } => {
                let mut argv = command.clone();
                argv.push(program.to_string());
                Ok(argv)
            }
            ExecutionMode::Compiled { command } => {
                let cache = self
                    .build_cache
                    .as_ref()
                    .expect("asserted in new: compiled language has a build cache");
                let artifact = cache.artifact_for(program, command).await?;
                Ok(vec![artifact.into_string()])
            }
        }
    }

    async fn run_command(&self, argv: &[String], input: &str) -> std::io::Result<ExecutionOutcome> {
        let mut cmd = tokio::process::Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let child_stdin = child.stdin.take();
        let child_stdout = child.stdout.take().map(BufReader::new);
        let child_stderr = child.stderr.take().map(BufReader::new);
        let mut stdout = bytes::BytesMut::with_capacity(CHUNK_SIZE);
        let mut stderr = bytes::BytesMut::with_capacity(CHUNK_SIZE);

        let mut timed_out = false;

        let exit_status = {
            let stdin_fut = async {
                if let Some(mut child_stdin) = child_stdin {
                    // Write errors (EPIPE from a child that exited without
                    // reading) don't matter; the exit status tells the story.
                    let _ = child_stdin.write_all(input.as_bytes()).await;
                    let _ = child_stdin.shutdown().await;
                }
            };
            tokio::pin!(stdin_fut);
            let mut stdin_done = false;

            let stdout_fut = async {
                if let Some(mut child_stdout) = child_stdout {
                    loop {
                        stdout.reserve(CHUNK_SIZE);
                        let bytes_read = child_stdout.read_buf(&mut stdout).await?;
                        if bytes_read == 0 {
                            break;
                        }
                    }
                }
                Ok::<_, std::io::Error>(())
            };
            tokio::pin!(stdout_fut);
            let mut stdout_done = false;

            let stderr_fut = async {
                if let Some(mut child_stderr) = child_stderr {
                    loop {
                        stderr.reserve(CHUNK_SIZE);
                        let bytes_read = child_stderr.read_buf(&mut stderr).await?;
                        if bytes_read == 0 {
                            break;
                        }
                    }
                }
                Ok::<_, std::io::Error>(())
            };
            tokio::pin!(stderr_fut);
            let mut stderr_done = false;

            let deadline = tokio::time::sleep(self.timeout);
            tokio::pin!(deadline);

            let res = loop {
                tokio::select! {
                    () = &mut stdin_fut, if !stdin_done => {
                        stdin_done = true;
                    }
                    res = &mut stdout_fut, if !stdout_done => {
                        stdout_done = true;
                        res?;
                    }
                    res = &mut stderr_fut, if !stderr_done => {
                        stderr_done = true;
                        res?;
                    }
                    res = child.wait() => {
                        // The program finished executing.
                        break res;
                    }
                    () = &mut deadline, if !timed_out => {
                        timed_out = true;
                        // This races against a normal exit; an error here just
                        // means the child is already gone. The wait arm reaps
                        // it either way.
                        let _ = child.start_kill();
                    }
                }
            };

            // Once the child has exited, drain what's left in the pipes.
            loop {
                let sleep = tokio::time::sleep(PIPE_GRACE);

                tokio::select! {
                    res = &mut stdout_fut, if !stdout_done => {
                        stdout_done = true;
                        res?;
                    }
                    res = &mut stderr_fut, if !stderr_done => {
                        stderr_done = true;
                        res?;
                    }
                    () = sleep, if !(stdout_done && stderr_done) => {
                        break;
                    }
                    else => {
                        break;
                    }
                }
            }

            res?
        };

        if timed_out {
            return Ok(ExecutionOutcome::Failure(FailureKind::TimedOut));
        }

        if exit_status.success() {
            Ok(ExecutionOutcome::Output(normalize_output(&stdout)))
        } else {
            let stderr_text = normalize_output(&stderr);
            if !stderr_text.is_empty() {
                debug!("stderr from `{}`:\n{stderr_text}", argv[0]);
            }

            cfg_if::cfg_if! {
                if #[cfg(unix)] {
                    use std::os::unix::process::ExitStatusExt;
                    let signal = exit_status.signal();
                } else {
                    let signal = None;
                }
            }

            Ok(ExecutionOutcome::Failure(FailureKind::Crashed {
                exit_code: exit_status.code(),
                signal,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_trailing_whitespace_only() {
        assert_eq!(normalize_output(b"42\n"), "42");
        assert_eq!(normalize_output(b"42 \t\r\n\n"), "42");
        assert_eq!(normalize_output(b"  42"), "  42");
        assert_eq!(normalize_output(b"a\nb\n"), "a\nb");
        assert_eq!(normalize_output(b""), "");
    }

    #[test]
    fn normalize_is_lossy_for_invalid_utf8() {
        assert_eq!(normalize_output(b"ok\xff\n"), "ok\u{fffd}");
    }

    #[test]
    fn failure_kind_display() {
        let crash = FailureKind::Crashed {
            exit_code: Some(1),
            signal: None,
        };
        assert_eq!(crash.to_string(), "crashed (exit code 1)");

        let signalled = FailureKind::Crashed {
            exit_code: None,
            signal: Some(9),
        };
        assert_eq!(signalled.to_string(), "crashed (signal 9)");

        assert_eq!(FailureKind::TimedOut.to_string(), "timed out");
        assert_eq!(FailureKind::BuildFailed.to_string(), "build failed");
        assert_eq!(FailureKind::StartFailed.to_string(), "failed to start");
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use camino::Utf8Path;
        use camino_tempfile::Utf8TempDir;
        use std::time::Instant;

        fn sh_executor(timeout: Duration) -> Executor {
            Executor::new(
                LanguageSpec::interpreted("sh", vec!["/bin/sh".to_owned()]),
                None,
                timeout,
            )
        }

        fn write_script(dir: &Utf8Path, name: &str, contents: &str) -> camino::Utf8PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, contents).expect("write script");
            path
        }

        #[tokio::test]
        async fn captures_and_trims_stdout() {
            let temp = Utf8TempDir::new().expect("created temp dir");
            let script = write_script(temp.path(), "hello.sh", "echo hello\necho\n");

            let outcome = sh_executor(Duration::from_secs(5)).run(&script, "").await;
            assert_eq!(outcome, ExecutionOutcome::Output("hello".to_owned()));
        }

        #[tokio::test]
        async fn feeds_input_over_stdin() {
            let temp = Utf8TempDir::new().expect("created temp dir");
            let script = write_script(temp.path(), "cat.sh", "cat\n");

            let outcome = sh_executor(Duration::from_secs(5))
                .run(&script, "3 7\n1 2 3\n")
                .await;
            assert_eq!(outcome, ExecutionOutcome::Output("3 7\n1 2 3".to_owned()));
        }

        #[tokio::test]
        async fn nonzero_exit_is_crashed() {
            let temp = Utf8TempDir::new().expect("created temp dir");
            let script = write_script(temp.path(), "fail.sh", "echo oops >&2\nexit 3\n");

            let outcome = sh_executor(Duration::from_secs(5)).run(&script, "").await;
            assert_eq!(
                outcome,
                ExecutionOutcome::Failure(FailureKind::Crashed {
                    exit_code: Some(3),
                    signal: None,
                })
            );
        }

        #[tokio::test]
        async fn killed_by_signal_is_crashed_with_signal() {
            let temp = Utf8TempDir::new().expect("created temp dir");
            let script = write_script(temp.path(), "die.sh", "kill -KILL $$\n");

            let outcome = sh_executor(Duration::from_secs(5)).run(&script, "").await;
            assert_eq!(
                outcome,
                ExecutionOutcome::Failure(FailureKind::Crashed {
                    exit_code: None,
                    signal: Some(9),
                })
            );
        }

        #[tokio::test]
        async fn timeout_kills_the_child() {
            let temp = Utf8TempDir::new().expect("created temp dir");
            let script = write_script(temp.path(), "sleep.sh", "sleep 10\n");

            let start = Instant::now();
            let outcome = sh_executor(Duration::from_millis(200)).run(&script, "").await;
            let elapsed = start.elapsed();

            assert_eq!(outcome, ExecutionOutcome::Failure(FailureKind::TimedOut));
            assert!(
                elapsed < Duration::from_secs(5),
                "killed well before the sleep finished (took {elapsed:?})"
            );
        }

        #[tokio::test]
        async fn missing_program_fails_to_start() {
            let executor = Executor::new(
                LanguageSpec::interpreted(
                    "sh",
                    vec!["/nonexistent/difftest-interpreter".to_owned()],
                ),
                None,
                Duration::from_secs(5),
            );

            let outcome = executor.run(Utf8Path::new("ignored.sh"), "").await;
            assert_eq!(outcome, ExecutionOutcome::Failure(FailureKind::StartFailed));
        }

        #[tokio::test]
        async fn large_output_is_not_truncated() {
            let temp = Utf8TempDir::new().expect("created temp dir");
            // Well past one pipe buffer.
            let script = write_script(
                temp.path(),
                "spam.sh",
                "i=0\nwhile [ $i -lt 20000 ]; do echo line$i; i=$((i+1)); done\n",
            );

            let outcome = sh_executor(Duration::from_secs(30)).run(&script, "").await;
            let output = outcome.output().expect("succeeded");
            assert!(output.starts_with("line0\n"));
            assert!(output.ends_with("line19999"));
        }
    }
}
