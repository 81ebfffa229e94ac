//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use thiserror::Error;

use file_bisect::bisect::index::{Index, RefreshOptions, RoundReport, Verdict};
use file_bisect::bisect::record::FileStatus;
use file_bisect::bisect::store::IndexStore;
use file_bisect::core::config::Config;
use file_bisect::core::errors::BisectError;
use file_bisect::core::paths::clean_file_arg;
use file_bisect::logger::events;
use file_bisect::logger::jsonl::{JournalWriter, JsonlConfig};

/// Delta-debugging for a directory of files.
#[derive(Debug, Parser)]
#[command(
    name = "file-bisect",
    author,
    version,
    about = "Find the file that breaks things by bisecting a directory",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Working directory holding the files under test.
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    dir: PathBuf,
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Track new files in the working directory.
    Index,
    /// The check passed with the current file set.
    Good,
    /// The check failed with the current file set.
    Bad,
    /// Exclude a file from bisection.
    Ignore(IgnoreArgs),
    /// Bring everything back and start over.
    Reset,
    /// Show tracked files and their status.
    Status,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct IgnoreArgs {
    /// File name as listed in the index.
    file: String,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<BisectError> for CliError {
    fn from(err: BisectError) -> Self {
        match err {
            BisectError::InvalidConfig { .. }
            | BisectError::MissingConfig { .. }
            | BisectError::ConfigParse { .. }
            | BisectError::NotFound { .. }
            | BisectError::NotIndexed => Self::User(err.to_string()),
            BisectError::Serialization { .. } => Self::Internal(err.to_string()),
            _ if err.is_record_level() => Self::Partial(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Index => run_index(cli),
        Command::Good => run_verdict(cli, Verdict::Good),
        Command::Bad => run_verdict(cli, Verdict::Bad),
        Command::Ignore(args) => run_ignore(cli, args),
        Command::Reset => run_reset(cli),
        Command::Status => run_status(cli),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Session: config + loaded, validated index + journal
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    store: IndexStore,
    index: Index,
    journal: JournalWriter,
    mode: OutputMode,
}

impl Session {
    /// Load config and index, then validate every record against the disk.
    fn open(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let store = IndexStore::open(&cli.dir, &config.index_file_name)?;

        let mut journal = if config.journal.enabled {
            JournalWriter::open(JsonlConfig::at(config.journal.path.clone()))
        } else {
            JournalWriter::disabled()
        };
        journal.set_working_dir(store.working_dir());

        let mut index = store.load_or_create()?;
        let report = index.init();
        journal.write_all(&events::init_entries(&report));

        for problem in &report.problems {
            eprintln!("{} {problem}", "warning:".yellow().bold());
        }
        if cli.verbose {
            for (name, status) in &report.restored {
                eprintln!("{name}: back in place, status restored to {status}");
            }
        }

        Ok(Self {
            config,
            store,
            index,
            journal,
            mode: output_mode(cli),
        })
    }

    fn save(&mut self) -> Result<(), CliError> {
        let saved = self.store.save(&self.index);
        self.journal.flush();
        saved.map_err(CliError::from)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_index(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let options = RefreshOptions::from(&session.config);
    let report = session.index.refresh(&options)?;
    session.journal.write_all(&events::refresh_entries(&report));
    session.save()?;

    match session.mode {
        OutputMode::Human => {
            if cli.quiet {
                return Ok(());
            }
            if let Some(dir) = &report.quarantine_created {
                println!("Quarantine directory: {}", dir.display());
            }
            println!(
                "Indexed {} new file(s), {} tracked.",
                report.added.len(),
                session.index.len()
            );
            if cli.verbose {
                for name in &report.added {
                    println!("  + {name}");
                }
            }
            for name in &report.skipped {
                eprintln!("{} skipped {name}: name is not valid UTF-8", "warning:".yellow().bold());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "index",
                "working_dir": session.index.working_dir().display().to_string(),
                "quarantine_dir": session.index.quarantine_dir().display().to_string(),
                "quarantine_created": report.quarantine_created.is_some(),
                "added": report.added,
                "skipped": report.skipped,
                "total": session.index.len(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_verdict(cli: &Cli, verdict: Verdict) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let seed = session.config.seed.unwrap_or_else(wall_clock_seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let report = match verdict {
        Verdict::Good => session.index.good(&mut rng)?,
        Verdict::Bad => session.index.bad(&mut rng)?,
    };

    let mut entries = events::round_entries(&report);
    if let Some(first) = entries.first_mut() {
        first.details = Some(format!("seed={seed}"));
    }
    session.journal.write_all(&entries);
    session.save()?;

    match session.mode {
        OutputMode::Human => print_round_human(cli, &report, seed),
        OutputMode::Json => {
            let failures: Vec<Value> = report.move_failures.iter().map(error_json).collect();
            let payload = json!({
                "command": verdict,
                "seed": seed,
                "tested": report.tested,
                "offender": report.offender,
                "kept": report.kept,
                "quarantined": report.quarantined,
                "move_failures": failures,
                "done": report.done,
                "summary": session.index.summary(),
            });
            write_json_line(&payload)?;
        }
    }

    partial_on_move_failures(report.move_failures.len())
}

fn print_round_human(cli: &Cli, report: &RoundReport, seed: u64) {
    for err in &report.move_failures {
        eprintln!("{} {err}", "error:".red().bold());
    }
    if cli.quiet {
        return;
    }
    if cli.verbose {
        println!("seed: {seed}");
    }
    if let Some(offender) = &report.offender {
        println!("Offender: {}", offender.red().bold());
    }
    if report.done {
        println!("{}", "Done!".green().bold());
        return;
    }
    println!(
        "{} file(s) left in place, {} moved to quarantine.",
        report.kept.len(),
        report.quarantined.len()
    );
    if cli.verbose {
        for name in &report.kept {
            println!("  = {name}");
        }
        for name in &report.quarantined {
            println!("  > {name}");
        }
    }
    println!("Run your check again, then report `good` or `bad`.");
}

fn run_ignore(cli: &Cli, args: &IgnoreArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let name = clean_file_arg(&args.file);

    if !session.index.ignore(&name) {
        let err = BisectError::NotFound { name };
        session.journal.write_entry(&events::problem_entry(&err));
        session.journal.flush();
        return Err(err.into());
    }
    session.journal.write_entry(&events::ignore_entry(&name));
    session.save()?;

    match session.mode {
        OutputMode::Human => {
            if !cli.quiet {
                println!("Ignoring {name}.");
            }
        }
        OutputMode::Json => {
            write_json_line(&json!({ "command": "ignore", "file": name }))?;
        }
    }
    Ok(())
}

fn run_reset(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let report = session.index.reset()?;
    session.journal.write_all(&events::reset_entries(&report));
    session.save()?;

    match session.mode {
        OutputMode::Human => {
            for err in &report.move_failures {
                eprintln!("{} {err}", "error:".red().bold());
            }
            if !cli.quiet {
                println!(
                    "Reset {} file(s), {} brought back from quarantine.",
                    report.reset.len(),
                    report.returned.len()
                );
            }
        }
        OutputMode::Json => {
            let failures: Vec<Value> = report.move_failures.iter().map(error_json).collect();
            let payload = json!({
                "command": "reset",
                "reset": report.reset,
                "returned": report.returned,
                "move_failures": failures,
            });
            write_json_line(&payload)?;
        }
    }

    partial_on_move_failures(report.move_failures.len())
}

/// Read-only: the index is validated but never saved.
fn run_status(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    session.journal.flush();
    let summary = session.index.summary();

    match session.mode {
        OutputMode::Human => {
            if cli.quiet {
                return Ok(());
            }
            println!("Working directory: {}", session.index.working_dir().display());
            if session.index.quarantine_dir().as_os_str().is_empty() {
                println!("Quarantine: none (run `file-bisect index`)");
            } else {
                println!("Quarantine: {}", session.index.quarantine_dir().display());
            }
            println!();
            println!("  {:<40}  {:<10}  {:>5}  {:<10}", "File", "Status", "Bad", "Location");
            println!("  {}", "-".repeat(71));
            for (name, rec) in session.index.records() {
                let location = if rec.in_quarantine() {
                    "quarantine"
                } else {
                    "working"
                };
                let padded = format!("{:<10}", rec.status);
                let status = match rec.status {
                    FileStatus::Bad => padded.red().bold(),
                    FileStatus::Good => padded.green(),
                    FileStatus::Errored | FileStatus::Unrecognized(_) => padded.yellow(),
                    _ => padded.normal(),
                };
                println!("  {name:<40}  {status}  {:>5}  {location:<10}", rec.bad_count);
            }
            println!();
            println!(
                "{} tracked: {} unknown, {} good, {} bad, {} ignored, {} errored ({} quarantined)",
                summary.total,
                summary.unknown,
                summary.good,
                summary.bad,
                summary.ignored,
                summary.errored,
                summary.quarantined
            );
        }
        OutputMode::Json => {
            let files: Vec<Value> = session
                .index
                .records()
                .map(|(name, rec)| {
                    json!({
                        "name": name,
                        "status": rec.status.as_str(),
                        "bad_count": rec.bad_count,
                        "in_quarantine": rec.in_quarantine(),
                        "dependencies": rec.dependencies,
                    })
                })
                .collect();
            let payload = json!({
                "command": "status",
                "working_dir": session.index.working_dir().display().to_string(),
                "quarantine_dir": session.index.quarantine_dir().display().to_string(),
                "summary": summary,
                "files": files,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn partial_on_move_failures(count: usize) -> Result<(), CliError> {
    if count == 0 {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{count} file(s) could not be moved; the index was saved anyway"
        )))
    }
}

fn error_json(err: &BisectError) -> Value {
    json!({ "code": err.code(), "message": err.to_string() })
}

fn wall_clock_seed() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .unsigned_abs()
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("FILE_BISECT_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
