// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting run progress and results to stderr.

use crate::{
    case_store::SavedCase,
    errors::WriteEventError,
    exec::FailureKind,
    list::{TestCase, Variant},
    oracle::OracleDecision,
    runner::RunStats,
};
use camino::Utf8PathBuf;
use chrono::{DateTime, Local};
use owo_colors::{OwoColorize, Style};
use std::{io, io::Write, time::Duration};

/// An event in a differential run.
///
/// Events are passed to the callback given to
/// [`DiffRunner::try_execute`](crate::runner::DiffRunner::try_execute).
#[derive(Clone, Debug)]
pub enum RunEvent<'a> {
    /// The run is starting.
    RunStarted {
        /// The number of test cases about to be driven.
        test_count: usize,

        /// The size of the variant pool.
        variant_count: usize,

        /// The number of votes an oracle needs to stand.
        min_votes: usize,
    },

    /// A variant failed on a case. Its vote is absent from the tally; nothing
    /// else happens.
    VariantFailed {
        /// The test case being voted on.
        case: &'a TestCase,

        /// The variant that failed.
        variant: &'a Variant,

        /// How it failed.
        kind: FailureKind,
    },

    /// The program under test agreed with the voted oracle on a case.
    CaseMatched {
        /// The test case.
        case: &'a TestCase,

        /// The winning decision.
        decision: OracleDecision,
    },

    /// The program under test disagreed with the voted oracle. The case has
    /// already been persisted when this event fires.
    CaseMismatched {
        /// The test case.
        case: &'a TestCase,

        /// The winning decision the program under test contradicted.
        decision: OracleDecision,

        /// The normalized output of the program under test.
        put_output: String,

        /// Where the case was saved.
        saved: SavedCase,
    },

    /// A case produced no verdict.
    CaseSkipped {
        /// The test case.
        case: &'a TestCase,

        /// Why it was skipped.
        reason: SkipReason,
    },

    /// The run is over.
    RunFinished {
        /// When the run started.
        start_time: DateTime<Local>,

        /// How long the run took.
        elapsed: Duration,

        /// Counters for the whole run.
        run_stats: RunStats,

        /// The directory bug-triggering cases were saved into.
        out_dir: Utf8PathBuf,
    },
}

/// The reason a case was skipped.
#[derive(Clone, Debug)]
pub enum SkipReason {
    /// No output cleared the vote threshold, so there is no oracle to compare
    /// against.
    NoQuorum {
        /// The best-supported output, if any variant produced output at all.
        leader: Option<OracleDecision>,

        /// The threshold that wasn't met.
        min_votes: usize,

        /// The size of the pool.
        total_variants: usize,
    },

    /// The program under test itself failed on this case, so there is nothing
    /// to compare.
    PutFailure {
        /// How the program under test failed.
        kind: FailureKind,
    },
}

/// Reports run events to a writer, usually stderr.
pub struct RunReporter {
    styles: Box<Styles>,
}

impl RunReporter {
    /// Creates a reporter with colors disabled.
    pub fn new() -> Self {
        Self {
            styles: Box::default(),
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Reports a run event.
    pub fn report_event(
        &mut self,
        event: RunEvent<'_>,
        writer: impl Write,
    ) -> Result<(), WriteEventError> {
        self.write_event_impl(&event, writer)
            .map_err(WriteEventError::Io)
    }

    fn write_event_impl(&mut self, event: &RunEvent<'_>, mut writer: impl Write) -> io::Result<()> {
        match event {
            RunEvent::RunStarted {
                test_count,
                variant_count,
                min_votes,
            } => {
                write!(writer, "{:>12} ", "Starting".style(self.styles.pass))?;

                let count_style = self.styles.count;
                writeln!(
                    writer,
                    "{} test cases against {} variants (quorum {})",
                    test_count.style(count_style),
                    variant_count.style(count_style),
                    min_votes.style(count_style),
                )?;
            }
            RunEvent::VariantFailed {
                case,
                variant,
                kind,
            } => {
                write!(writer, "{:>12} ", "VARFAIL".style(self.styles.skip))?;
                writeln!(writer, "{} on {}: {kind}", variant.name, case.name)?;
            }
            RunEvent::CaseMatched { case, decision } => {
                write!(writer, "{:>12} ", "MATCH".style(self.styles.pass))?;
                self.write_votes(decision.votes, decision.total_variants, &mut writer)?;
                writeln!(writer, "{}", case.name)?;
            }
            RunEvent::CaseMismatched {
                case,
                decision,
                put_output,
                saved,
            } => {
                write!(writer, "{:>12} ", "MISMATCH".style(self.styles.fail))?;
                self.write_votes(decision.votes, decision.total_variants, &mut writer)?;
                writeln!(
                    writer,
                    "{}: oracle {:?} vs put {:?} (saved {})",
                    case.name, decision.text, put_output, saved.prefix,
                )?;
            }
            RunEvent::CaseSkipped { case, reason } => {
                write!(writer, "{:>12} ", "SKIP".style(self.styles.skip))?;
                match reason {
                    SkipReason::NoQuorum {
                        leader,
                        min_votes,
                        total_variants,
                    } => {
                        let votes = leader.as_ref().map_or(0, |leader| leader.votes);
                        self.write_votes(votes, *total_variants, &mut writer)?;
                        match leader {
                            Some(leader) => writeln!(
                                writer,
                                "{}: no quorum (best {:?}, need {min_votes})",
                                case.name, leader.text,
                            )?,
                            None => writeln!(
                                writer,
                                "{}: no quorum (no variant produced output, need {min_votes})",
                                case.name,
                            )?,
                        }
                    }
                    SkipReason::PutFailure { kind } => {
                        // same spacing as the votes bracket
                        write!(writer, "[       ] ")?;
                        writeln!(writer, "{}: program under test {kind}", case.name)?;
                    }
                }
            }
            RunEvent::RunFinished {
                elapsed,
                run_stats,
                out_dir,
                ..
            } => {
                let summary_style = if run_stats.mismatched > 0 {
                    self.styles.fail
                } else {
                    self.styles.pass
                };
                write!(writer, "{:>12} ", "Summary".style(summary_style))?;

                // Next, print the total time taken.
                // * > means right-align.
                // * 8 is the number of characters to pad to.
                // * .3 means print three digits after the decimal point.
                write!(writer, "[{:>8.3?}s] ", elapsed.as_secs_f64())?;

                write!(writer, "{}", run_stats.decided().style(self.styles.count))?;
                if run_stats.decided() != run_stats.initial_case_count {
                    write!(
                        writer,
                        "/{}",
                        run_stats.initial_case_count.style(self.styles.count)
                    )?;
                }
                write!(
                    writer,
                    " cases decided: {} {}",
                    run_stats.matched.style(self.styles.count),
                    "matched".style(self.styles.pass),
                )?;

                if run_stats.mismatched > 0 {
                    write!(
                        writer,
                        ", {} {}",
                        run_stats.mismatched.style(self.styles.count),
                        "mismatched".style(self.styles.fail),
                    )?;
                }

                if run_stats.skipped() > 0 {
                    write!(
                        writer,
                        ", {} {}",
                        run_stats.skipped().style(self.styles.count),
                        "skipped".style(self.styles.skip),
                    )?;
                }

                writeln!(writer)?;

                if run_stats.mismatched > 0 {
                    write!(writer, "{:>12} ", "Saved".style(self.styles.fail))?;
                    writeln!(
                        writer,
                        "{} bug-triggering cases into `{out_dir}`",
                        run_stats.mismatched.style(self.styles.count),
                    )?;
                }
            }
        }

        Ok(())
    }

    fn write_votes(
        &self,
        votes: usize,
        total_variants: usize,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let votes = format!("{votes}/{total_variants}");
        write!(writer, "[{votes:>7}] ")
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case(case_index: usize, name: &str) -> TestCase {
        TestCase {
            case_index,
            name: name.to_owned(),
            input: "unused".to_owned(),
        }
    }

    fn decision(text: &str, votes: usize, total_variants: usize) -> OracleDecision {
        OracleDecision {
            text: text.to_owned(),
            votes,
            total_variants,
        }
    }

    fn render(event: RunEvent<'_>) -> String {
        let mut reporter = RunReporter::new();
        let mut out = Vec::new();
        reporter
            .report_event(event, &mut out)
            .expect("write to vec succeeds");
        String::from_utf8(out).expect("valid utf-8")
    }

    #[test]
    fn run_started_line() {
        let line = render(RunEvent::RunStarted {
            test_count: 12,
            variant_count: 5,
            min_votes: 3,
        });
        assert_eq!(line, "    Starting 12 test cases against 5 variants (quorum 3)\n");
    }

    #[test]
    fn variant_failed_line() {
        let case = case(3, "test_0003.in");
        let variant = Variant {
            name: "variant_0002.py".to_owned(),
            path: "variants/variant_0002.py".into(),
        };
        let line = render(RunEvent::VariantFailed {
            case: &case,
            variant: &variant,
            kind: FailureKind::TimedOut,
        });
        assert_eq!(line, "     VARFAIL variant_0002.py on test_0003.in: timed out\n");
    }

    #[test]
    fn case_matched_line() {
        let case = case(7, "test_0007.in");
        let line = render(RunEvent::CaseMatched {
            case: &case,
            decision: decision("42", 4, 5),
        });
        assert_eq!(line, "       MATCH [    4/5] test_0007.in\n");
    }

    #[test]
    fn case_mismatched_line_escapes_newlines() {
        let case = case(4, "test_0004.in");
        let saved = SavedCase {
            prefix: "case_0004".to_owned(),
            input_path: "out/case_0004.in".into(),
            oracle_path: "out/case_0004.oracle".into(),
            put_path: "out/case_0004.put".into(),
        };
        let line = render(RunEvent::CaseMismatched {
            case: &case,
            decision: decision("1\n2", 3, 5),
            put_output: "1".to_owned(),
            saved,
        });
        assert_eq!(
            line,
            "    MISMATCH [    3/5] test_0004.in: oracle \"1\\n2\" vs put \"1\" (saved case_0004)\n"
        );
    }

    #[test]
    fn skip_lines() {
        let no_output = case(1, "test_0001.in");
        let line = render(RunEvent::CaseSkipped {
            case: &no_output,
            reason: SkipReason::NoQuorum {
                leader: None,
                min_votes: 3,
                total_variants: 5,
            },
        });
        assert_eq!(
            line,
            "        SKIP [    0/5] test_0001.in: no quorum (no variant produced output, need 3)\n"
        );

        let split = case(2, "test_0002.in");
        let line = render(RunEvent::CaseSkipped {
            case: &split,
            reason: SkipReason::NoQuorum {
                leader: Some(decision("7", 2, 5)),
                min_votes: 3,
                total_variants: 5,
            },
        });
        assert_eq!(
            line,
            "        SKIP [    2/5] test_0002.in: no quorum (best \"7\", need 3)\n"
        );

        let put_crash = case(3, "test_0003.in");
        let line = render(RunEvent::CaseSkipped {
            case: &put_crash,
            reason: SkipReason::PutFailure {
                kind: FailureKind::Crashed {
                    exit_code: Some(1),
                    signal: None,
                },
            },
        });
        assert_eq!(
            line,
            "        SKIP [       ] test_0003.in: program under test crashed (exit code 1)\n"
        );
    }

    #[test]
    fn summary_lines() {
        let mut run_stats = RunStats {
            initial_case_count: 12,
            matched: 9,
            mismatched: 2,
            no_quorum_skipped: 1,
            put_failure_skipped: 0,
            variant_failures: 3,
        };

        let output = render(RunEvent::RunFinished {
            start_time: Local::now(),
            elapsed: Duration::from_millis(2345),
            run_stats,
            out_dir: "out".into(),
        });
        assert_eq!(
            output,
            "     Summary [   2.345s] 11/12 cases decided: 9 matched, 2 mismatched, 1 skipped\n       Saved 2 bug-triggering cases into `out`\n"
        );

        // A clean run prints neither the mismatch count nor the saved line.
        run_stats.mismatched = 0;
        run_stats.no_quorum_skipped = 0;
        run_stats.matched = 12;
        let output = render(RunEvent::RunFinished {
            start_time: Local::now(),
            elapsed: Duration::from_millis(500),
            run_stats,
            out_dir: "out".into(),
        });
        assert_eq!(output, "     Summary [   0.500s] 12 cases decided: 12 matched\n");
    }
}
