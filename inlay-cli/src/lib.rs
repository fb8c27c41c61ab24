//! inlay CLI (made by FontLab https://www.fontlab.com/)

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use log::debug;

use inlay_core::config::{Config, DEFAULT_CONFIG};
use inlay_core::discovery::{AssetDiscovery, AssetRef, PathDiscovery};
use inlay_core::imports::ResolveImports;
use inlay_core::job::{run_batch, JobOutcome, JobReport, JobStatus, RunOptions};
use inlay_core::output::{write_json_pretty, write_ndjson};
use inlay_core::urls::InlineUrls;
use inlay_core::{process_job, CyclePolicy, InlineOptions, Job};

/// CLI entrypoint for inlay.
#[derive(Debug, Parser)]
#[command(
    name = "inlay",
    about = "Inline @imports and fonts into self-contained CSS (made by FontLab https://www.fontlab.com/)"
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every job listed in a config file
    Run(RunArgs),
    /// Inline a single stylesheet
    File(FileArgs),
    /// List the inlinable font assets under a directory
    Assets(AssetsArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Config file with font_base_dir and [[job]] entries
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG, value_hint = ValueHint::FilePath)]
    config: PathBuf,

    /// Worker threads for running jobs (defaults to one per core)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Emit a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue, conflicts_with = "ndjson")]
    json: bool,

    /// Emit newline-delimited JSON
    #[arg(long = "ndjson", action = ArgAction::SetTrue)]
    ndjson: bool,

    /// Control colorized output (auto|always|never)
    #[arg(long = "color", default_value_t = ColorChoice::Auto, value_enum)]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct FileArgs {
    /// Stylesheet to inline
    #[arg(value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Where to write the self-contained stylesheet
    #[arg(value_hint = ValueHint::FilePath)]
    dest: PathBuf,

    /// Directory font urls are resolved against
    #[arg(short = 'f', long = "font-dir", value_hint = ValueHint::DirPath)]
    font_dir: PathBuf,

    /// Drop circular @imports instead of failing
    #[arg(long = "skip-cycles", action = ArgAction::SetTrue)]
    skip_cycles: bool,

    /// Keep url() references to assets larger than this many bytes
    #[arg(long = "max-size")]
    max_size: Option<u64>,
}

#[derive(Debug, Args)]
struct AssetsArgs {
    /// Font directory to list
    #[arg(value_hint = ValueHint::DirPath)]
    dir: PathBuf,

    /// Follow symlinks while walking
    #[arg(long = "follow-symlinks", action = ArgAction::SetTrue)]
    follow_symlinks: bool,

    /// Emit a single JSON array
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Parse CLI args and execute the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => run_jobs(args),
        Command::File(args) => run_file(args),
        Command::Assets(args) => run_assets(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn run_jobs(args: RunArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    debug!(
        "{} jobs from {}, fonts in {}",
        config.jobs.len(),
        args.config.display(),
        config.font_base_dir.display()
    );
    let opts = config.options();
    let run = RunOptions { jobs: args.jobs };

    let outcomes = run_batch(&config.jobs, &opts, &run)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let use_color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => handle.is_terminal(),
    };

    if args.ndjson {
        write_ndjson(&outcomes, &mut handle)?;
    } else if args.json {
        write_json_pretty(&outcomes, &mut handle)?;
    } else {
        write_outcomes(&outcomes, &mut handle, use_color)?;
    }
    handle.flush()?;

    ensure_all_ok(&outcomes)
}

fn ensure_all_ok(outcomes: &[JobOutcome]) -> Result<()> {
    let failed: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.is_ok())
        .map(|o| o.job.source.display().to_string())
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} jobs failed: {}",
            failed.len(),
            outcomes.len(),
            failed.join(", ")
        ))
    }
}

fn file_options(args: &FileArgs) -> InlineOptions {
    let policy = if args.skip_cycles {
        CyclePolicy::Skip
    } else {
        CyclePolicy::Fail
    };

    InlineOptions::new(&args.font_dir)
        .cycle_policy(policy)
        .max_inline_size(args.max_size)
}

fn run_file(args: FileArgs) -> Result<()> {
    let job = Job::new(&args.source, &args.dest);
    let report = process_job(&job, &file_options(&args)).map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!(
            "{} failed during {stage}",
            job.source.display()
        ))
    })?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let use_color = handle.is_terminal();
    writeln!(handle, "{}", render_ok(&job, &report, use_color))?;
    Ok(())
}

fn run_assets(args: AssetsArgs) -> Result<()> {
    let assets = PathDiscovery::new(&args.dir)
        .follow_symlinks(args.follow_symlinks)
        .discover()
        .with_context(|| format!("listing assets in {}", args.dir.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        write_json_pretty(&assets, &mut handle)?;
    } else {
        write_assets(&assets, &mut handle)?;
    }
    Ok(())
}

fn write_outcomes(outcomes: &[JobOutcome], mut w: impl Write, color: bool) -> Result<()> {
    for outcome in outcomes {
        let line = match &outcome.status {
            JobStatus::Ok(report) => render_ok(&outcome.job, report, color),
            JobStatus::Failed { stage, message } => {
                let tag = apply_color("FAIL", color, AnsiColor::Red);
                format!(
                    "{tag} {} [{stage}] {message}",
                    outcome.job.source.display()
                )
            }
        };
        writeln!(w, "{line}")?;
    }
    Ok(())
}

fn render_ok(job: &Job, report: &JobReport, color: bool) -> String {
    let tag = apply_color("ok  ", color, AnsiColor::Green);
    let dest = apply_color(&job.dest.display().to_string(), color, AnsiColor::Cyan);
    format!(
        "{tag} {} -> {dest} (imports:{} urls:{} bytes:{})",
        job.source.display(),
        report.rewrites_for(ResolveImports::NAME),
        report.rewrites_for(InlineUrls::NAME),
        report.bytes_written,
    )
}

fn write_assets(assets: &[AssetRef], mut w: impl Write) -> Result<()> {
    let url_width = assets
        .iter()
        .map(|a| a.url.len())
        .max()
        .unwrap_or(0)
        .clamp(0, 120);

    for asset in assets {
        writeln!(
            w,
            "{:<url_width$}  {:<30}  {}",
            asset.url, asset.mime, asset.size
        )?;
    }
    Ok(())
}

#[derive(Copy, Clone)]
enum AnsiColor {
    Cyan,
    Green,
    Red,
}

fn apply_color(text: &str, color: bool, code: AnsiColor) -> String {
    if !color {
        return text.to_string();
    }

    let code_str = match code {
        AnsiColor::Cyan => "36",
        AnsiColor::Green => "32",
        AnsiColor::Red => "31",
    };

    format!("\u{1b}[{}m{}\u{1b}[0m", code_str, text)
}
