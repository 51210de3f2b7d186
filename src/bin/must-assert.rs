//! must-assert CLI: runs the built-in suites and checks their outcome.

use must_assert::cli::{
    errors, CliError, ColorChoice, ExitCode, Output, OutputFormat, RunSummary, SuiteListing,
};
use must_assert::host::{Runner, RunnerConfig, SuiteExpectation};
use must_assert::observability::MemoryLogger;
use must_assert::{MustAssert, MustAssertConfig};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "must-assert",
    version,
    about = "Run test suites with required assertions and zone-isolated async work"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct CommonArgs {
    /// Output format: human, json, json-pretty
    #[arg(short = 'f', long = "format", global = true)]
    format: Option<OutputFormat>,

    /// Color output: auto, always, never
    #[arg(short = 'c', long = "color", global = true, value_parser = parse_color_choice)]
    color: Option<ColorChoice>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbosity: u8,
}

impl CommonArgs {
    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(OutputFormat::auto_detect)
    }

    fn color_choice(&self) -> ColorChoice {
        self.color.unwrap_or_else(ColorChoice::auto_detect)
    }

    fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn parse_color_choice(s: &str) -> Result<ColorChoice, String> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(ColorChoice::Auto),
        "always" => Ok(ColorChoice::Always),
        "never" => Ok(ColorChoice::Never),
        other => Err(format!("unknown color choice: {other}")),
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in suites
    List,

    /// Run a built-in suite and check it against its expectation
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Suite name (see `list`)
    suite: String,

    /// Override the suite's expectation: all-pass or all-fail
    #[arg(long = "expect")]
    expect: Option<SuiteExpectation>,

    /// Per-test timeout in virtual milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Skip post-test assertion-count verification
    #[arg(long = "no-verify", action = ArgAction::SetTrue)]
    no_verify: bool,
}

fn main() {
    let cli = Cli::parse();
    let format = cli.common.output_format();
    let color = cli.common.color_choice();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.common.log_filter())),
        )
        .with_writer(io::stderr)
        .try_init();

    let mut output = Output::new(format).with_color(color);
    if let Err(err) = run(cli.command, &mut output) {
        let _ = write_cli_error(&err, format, color);
        std::process::exit(err.exit_code);
    }
    std::process::exit(ExitCode::SUCCESS);
}

fn run(command: Command, output: &mut Output) -> Result<(), CliError> {
    match command {
        Command::List => write(output, &SuiteListing::builtin()),
        Command::Run(args) => run_suite(&args, output),
    }
}

fn run_suite(args: &RunArgs, output: &mut Output) -> Result<(), CliError> {
    let names: Vec<&str> = must_assert::suites::names().collect();
    let info = must_assert::suites::find(&args.suite)
        .ok_or_else(|| errors::unknown_suite(&args.suite, &names))?;
    if args.timeout_ms == Some(0) {
        return Err(errors::invalid_argument("--timeout-ms", "must be positive"));
    }

    let config = MustAssertConfig::from_env().map_err(|e| errors::invalid_config(&e))?;
    let logger = Arc::new(MemoryLogger::new());
    let plugin = MustAssert::new(config.logger(Arc::clone(&logger)));

    let mut runner_config = RunnerConfig::new().verify_assertions(!args.no_verify);
    if let Some(ms) = args.timeout_ms {
        runner_config = runner_config.timeout_ms(ms);
    }

    let expectation = args.expect.unwrap_or(info.expectation);
    tracing::info!(suite = info.name, %expectation, "running suite");
    let report = Runner::new(runner_config).run(info.build(&plugin));
    let summary = RunSummary::new(report, expectation, logger.warnings());
    write(output, &summary)?;

    if summary.expectation_met {
        Ok(())
    } else {
        Err(errors::expectation_failed(
            expectation,
            &summary.report,
            summary.mismatch.as_deref().unwrap_or_default(),
        ))
    }
}

fn write<T: must_assert::cli::Outputtable>(output: &mut Output, value: &T) -> Result<(), CliError> {
    output
        .write(value)
        .and_then(|()| output.flush())
        .map_err(|e| errors::io_error(&e))
}

fn write_cli_error(err: &CliError, format: OutputFormat, color: ColorChoice) -> io::Result<()> {
    let mut stderr = io::stderr();
    if format.is_json() {
        writeln!(stderr, "{}", err.json_format())
    } else {
        writeln!(stderr, "{}", err.human_format(color.should_colorize()))
    }
}
