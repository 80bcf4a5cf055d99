// Copyright (c) The difftest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    output::{OutputContext, OutputOpts, OutputWriter},
    DifftestExitCode, ExpectedError,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use difftest_runner::{
    config::LanguageSpec,
    errors::WriteEventError,
    list::{InputCorpus, VariantPool},
    reporter::RunReporter,
    runner::DiffRunnerBuilder,
};
use owo_colors::{style, OwoColorize, Style};
use serde::Serialize;
use std::{
    io::{self, Write},
    time::Duration,
};
use supports_color::Stream;
use tracing::warn;

/// A differential testing harness.
///
/// difftest feeds a corpus of stdin inputs to a pool of presumed-equivalent
/// variants, majority-votes their outputs into an oracle, and compares the
/// program under test against it. Inputs that expose a disagreement are saved
/// as bug-triggering cases.
#[derive(Debug, Parser)]
#[command(
    name = "difftest",
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100
)]
pub struct DifftestApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl DifftestApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        match self.command {
            Command::List {
                target,
                message_format,
            } => {
                let language = target.lang.to_language_spec();
                let corpus = InputCorpus::scan(&target.tests)?;
                let pool = VariantPool::scan(&target.variants, &language)?;

                let mut writer = output_writer.stdout_writer();
                write_case_list(&mut writer, &corpus, &pool, message_format, output)
                    .map_err(|err| ExpectedError::WriteCaseListError { err })?;
                writer
                    .flush()
                    .map_err(|err| ExpectedError::WriteCaseListError { err })?;

                Ok(DifftestExitCode::OK)
            }
            Command::Run {
                target,
                runner_opts,
            } => {
                let language = target.lang.to_language_spec();
                let corpus = InputCorpus::scan(&target.tests)?;
                let pool = VariantPool::scan(&target.variants, &language)?;

                if let Some(min_votes) = runner_opts.min_votes {
                    if min_votes > pool.variant_count() {
                        let styles = output.stderr_styles();
                        warn!(
                            "quorum of {} exceeds the {} variants in the pool; no case can be decided",
                            min_votes.style(styles.bold),
                            pool.variant_count().style(styles.bold),
                        );
                    }
                }

                let build_dir = runner_opts
                    .build_dir
                    .clone()
                    .unwrap_or_else(|| runner_opts.out.join("build"));

                let mut runner = runner_opts.to_builder().build(
                    &corpus,
                    &pool,
                    &target.put,
                    language,
                    &runner_opts.out,
                    &build_dir,
                )?;

                let mut reporter = RunReporter::new();
                if output.color.should_colorize(Stream::Stderr) {
                    reporter.colorize();
                }

                let mut writer = output_writer.stderr_writer();
                let run_stats = runner.try_execute(|event| {
                    // Write and flush the event.
                    reporter.report_event(event, &mut writer)?;
                    writer.flush().map_err(WriteEventError::Io)
                })?;

                if !run_stats.is_clean() {
                    return Err(ExpectedError::DefectsFound);
                }
                if run_stats.no_cases_decided() {
                    return Err(ExpectedError::NoCasesDecided);
                }
                Ok(DifftestExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List test inputs and variants
    ///
    /// This command scans the test and variant directories without running
    /// anything. Use --message-format json to get machine-readable output.
    List {
        #[command(flatten)]
        target: TargetOpts,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "Output options",
            value_name = "FMT"
        )]
        message_format: MessageFormatOpts,
    },
    /// Run the program under test against the variant pool
    ///
    /// Every test input is fed to every variant over stdin. Variant outputs
    /// that agree form an oracle, and the program under test is compared
    /// against it. Each disagreement is persisted as a bug-triggering case.
    Run {
        #[command(flatten)]
        target: TargetOpts,

        #[command(flatten)]
        runner_opts: RunnerOpts,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    #[default]
    Human,
    Json,
    JsonPretty,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Target options")]
struct TargetOpts {
    /// Language of the program under test and variants
    #[arg(long, value_enum, default_value_t, value_name = "LANG")]
    lang: LanguageOpt,

    /// Path to the program under test
    #[arg(long, value_name = "PATH")]
    put: Utf8PathBuf,

    /// Directory of variants (variant_*.<ext>)
    #[arg(long, value_name = "DIR")]
    variants: Utf8PathBuf,

    /// Directory of test inputs (*.in)
    #[arg(long, value_name = "DIR")]
    tests: Utf8PathBuf,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LanguageOpt {
    /// Python sources, run with python3
    #[default]
    Py,
    /// C++ sources, built with g++
    Cpp,
}

impl LanguageOpt {
    fn to_language_spec(self) -> LanguageSpec {
        match self {
            Self::Py => LanguageSpec::python(),
            Self::Cpp => LanguageSpec::cpp(),
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Runner options")]
struct RunnerOpts {
    /// Output directory for bug-triggering cases
    #[arg(long, value_name = "DIR")]
    out: Utf8PathBuf,

    /// Directory for compiled artifacts [default: <out>/build]
    #[arg(long, value_name = "DIR")]
    build_dir: Option<Utf8PathBuf>,

    /// Timeout for a single execution, in seconds
    #[arg(long, value_name = "SECONDS", default_value = "2", value_parser = parse_timeout)]
    timeout: Duration,

    /// Votes required to accept an output as the oracle [default: majority of the pool]
    #[arg(long, value_name = "VOTES", value_parser = parse_min_votes)]
    min_votes: Option<usize>,
}

impl RunnerOpts {
    fn to_builder(&self) -> DiffRunnerBuilder {
        let mut builder = DiffRunnerBuilder::default();
        builder.set_timeout(self.timeout);
        if let Some(min_votes) = self.min_votes {
            builder.set_min_votes(min_votes);
        }
        builder
    }
}

fn parse_timeout(input: &str) -> Result<Duration, String> {
    let seconds: f64 = input
        .parse()
        .map_err(|err| format!("invalid timeout: {err}"))?;
    // try_from_secs_f64 rejects NaN and anything outside Duration's range.
    match Duration::try_from_secs_f64(seconds) {
        Ok(timeout) if !timeout.is_zero() => Ok(timeout),
        _ => Err("timeout must be a positive number of seconds".to_owned()),
    }
}

fn parse_min_votes(input: &str) -> Result<usize, String> {
    let votes: usize = input
        .parse()
        .map_err(|err| format!("invalid vote count: {err}"))?;
    if votes == 0 {
        return Err("at least one vote is required".to_owned());
    }
    Ok(votes)
}

fn write_case_list(
    mut writer: impl Write,
    corpus: &InputCorpus,
    pool: &VariantPool,
    message_format: MessageFormatOpts,
    output: OutputContext,
) -> io::Result<()> {
    match message_format {
        MessageFormatOpts::Human => {
            let mut styles = ListStyles::default();
            if output.color.should_colorize(Stream::Stdout) {
                styles.colorize();
            }

            writeln!(
                writer,
                "{}: {} inputs in `{}`",
                "tests".style(styles.heading),
                corpus.test_count().style(styles.count),
                corpus.dir(),
            )?;
            for case in corpus.iter() {
                if output.verbose {
                    writeln!(writer, "    {} ({} bytes)", case.name, case.input.len())?;
                } else {
                    writeln!(writer, "    {}", case.name)?;
                }
            }

            writeln!(
                writer,
                "{}: {} sources in `{}`",
                "variants".style(styles.heading),
                pool.variant_count().style(styles.count),
                pool.dir(),
            )?;
            for variant in pool.iter() {
                if output.verbose {
                    writeln!(writer, "    {} ({})", variant.name, variant.path)?;
                } else {
                    writeln!(writer, "    {}", variant.name)?;
                }
            }
        }
        MessageFormatOpts::Json | MessageFormatOpts::JsonPretty => {
            let summary = ListSummary::new(corpus, pool);
            if matches!(message_format, MessageFormatOpts::JsonPretty) {
                serde_json::to_writer_pretty(&mut writer, &summary)?;
            } else {
                serde_json::to_writer(&mut writer, &summary)?;
            }
            writeln!(writer)?;
        }
    }

    Ok(())
}

#[derive(Debug, Default)]
struct ListStyles {
    heading: Style,
    count: Style,
}

impl ListStyles {
    fn colorize(&mut self) {
        self.heading = style().bold();
        self.count = style().bold();
    }
}

/// Machine-readable summary of a `difftest list` invocation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ListSummary<'a> {
    tests_dir: &'a Utf8Path,
    variants_dir: &'a Utf8Path,
    test_count: usize,
    variant_count: usize,
    tests: Vec<TestEntry<'a>>,
    variants: Vec<VariantEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct TestEntry<'a> {
    case_index: usize,
    name: &'a str,
    input_bytes: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct VariantEntry<'a> {
    name: &'a str,
    path: &'a Utf8Path,
}

impl<'a> ListSummary<'a> {
    fn new(corpus: &'a InputCorpus, pool: &'a VariantPool) -> Self {
        let tests = corpus
            .iter()
            .map(|case| TestEntry {
                case_index: case.case_index,
                name: &case.name,
                input_bytes: case.input.len(),
            })
            .collect();
        let variants = pool
            .iter()
            .map(|variant| VariantEntry {
                name: &variant.name,
                path: &variant.path,
            })
            .collect();

        Self {
            tests_dir: corpus.dir(),
            variants_dir: pool.dir(),
            test_count: corpus.test_count(),
            variant_count: pool.variant_count(),
            tests,
            variants,
        }
    }
}
