//! vrdx CLI: manage decision records embedded in Markdown files.

mod commands;
mod config;
mod discovery;
mod logging;
mod persistence;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use vrdx_engine::{DecisionId, DecisionUpdate, LinkRelation, NewDecision, Status};

use commands::decision::MoveTarget;
use config::VrdxConfig;

#[derive(Parser)]
#[command(name = "vrdx", version, about = "Decision records inside Markdown files")]
struct Cli {
    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,
    /// Log level (trace, debug, info, warn, error); overrides VRDX_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Also write log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List Markdown files and their marker state
    Files {
        /// Directory to search (default: current directory)
        dir: Option<PathBuf>,
    },
    /// Validate every decision block under a directory
    Check {
        /// Directory to search (default: current directory)
        dir: Option<PathBuf>,
    },
    /// List the decisions in a file
    List { file: PathBuf },
    /// Show one decision in full
    Show {
        file: PathBuf,
        #[arg(value_parser = parse_id)]
        id: DecisionId,
    },
    /// Add an empty marker block to a file
    Init {
        file: PathBuf,
        /// Confirm the modification
        #[arg(long)]
        yes: bool,
        /// Remove malformed markers and start a fresh block
        #[arg(long)]
        recreate: bool,
    },
    /// Add a decision with the next free ID
    Add {
        file: PathBuf,
        title: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Change fields of an existing decision
    Edit {
        file: PathBuf,
        #[arg(value_parser = parse_id)]
        id: DecisionId,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Make one decision supersede, or be deprecated by, another
    Link {
        file: PathBuf,
        #[arg(value_parser = parse_id)]
        source: DecisionId,
        #[arg(
            long,
            value_parser = parse_id,
            conflicts_with = "deprecated_by",
            required_unless_present = "deprecated_by"
        )]
        supersedes: Option<DecisionId>,
        #[arg(long, value_parser = parse_id)]
        deprecated_by: Option<DecisionId>,
    },
    /// Drop the link held by a decision
    Unlink {
        file: PathBuf,
        #[arg(value_parser = parse_id)]
        source: DecisionId,
    },
    /// Reposition a decision
    Move {
        file: PathBuf,
        #[arg(value_parser = parse_id)]
        id: DecisionId,
        #[arg(long, group = "direction")]
        up: bool,
        #[arg(long, group = "direction")]
        down: bool,
        /// 1-based position
        #[arg(long, group = "direction")]
        to: Option<usize>,
    },
    /// Order decisions highest ID first
    Sort { file: PathBuf },
    /// Remove a decision
    Delete {
        file: PathBuf,
        #[arg(value_parser = parse_id)]
        id: DecisionId,
    },
}

#[derive(Args)]
struct FieldArgs {
    /// draft, accepted, rejected, or a full status such as "⬆️ Supersedes 3"
    #[arg(long, value_parser = parse_status)]
    status: Option<Status>,
    #[arg(long)]
    decision: Option<String>,
    #[arg(long)]
    context: Option<String>,
    #[arg(long)]
    consequences: Option<String>,
}

fn parse_id(s: &str) -> Result<DecisionId, String> {
    let raw: u32 = s
        .trim()
        .trim_start_matches('#')
        .parse()
        .map_err(|_| format!("`{s}` is not a decision ID"))?;
    DecisionId::new(raw).ok_or_else(|| "decision IDs start at 1".to_string())
}

fn parse_status(s: &str) -> Result<Status, String> {
    let lower = s.trim().to_ascii_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    match words.as_slice() {
        ["draft"] => Ok(Status::Draft),
        ["accepted"] => Ok(Status::Accepted),
        ["rejected"] => Ok(Status::Rejected),
        ["supersedes", id] => parse_id(id).map(Status::Supersedes),
        ["deprecated-by" | "deprecated_by", id] | ["deprecated", "by", id] => {
            parse_id(id).map(Status::DeprecatedBy)
        }
        _ => s.parse::<Status>().map_err(|e| e.to_string()),
    }
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Directory that config lookup starts from for a file argument.
fn file_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let base = match &cli.command {
        Commands::Files { dir } | Commands::Check { dir } => dir.clone().unwrap_or(cwd),
        Commands::List { file }
        | Commands::Show { file, .. }
        | Commands::Init { file, .. }
        | Commands::Add { file, .. }
        | Commands::Edit { file, .. }
        | Commands::Link { file, .. }
        | Commands::Unlink { file, .. }
        | Commands::Move { file, .. }
        | Commands::Sort { file }
        | Commands::Delete { file, .. } => file_dir(file),
    };
    let config = VrdxConfig::load_or_default(&base)?;

    let env_level = std::env::var(logging::LOG_LEVEL_ENV).ok();
    let level = logging::effective_level(
        cli.log_level.as_deref(),
        env_level.as_deref(),
        config.log_level.as_deref(),
    );
    logging::init(level, cli.log_file.as_deref())?;
    debug!(base = %base.display(), "configuration loaded");

    let json = cli.json;
    match cli.command {
        Commands::Files { .. } => commands::files::files(&base, &config.discovery, json),
        Commands::Check { .. } => commands::files::check(&base, &config.discovery, json),
        Commands::List { file } => commands::decision::list(&file, json),
        Commands::Show { file, id } => commands::decision::show(&file, id, json),

        Commands::Init {
            file,
            yes,
            recreate,
        } => {
            let outcome = commands::markers::init(&file, yes, recreate, config.scaffold.newline)?;
            commands::markers::report(&file, outcome, json)
        }

        Commands::Add {
            file,
            title,
            fields,
        } => {
            let new = NewDecision::new(title)
                .with_status(fields.status.unwrap_or_default())
                .with_decision(fields.decision.unwrap_or_default())
                .with_context(fields.context.unwrap_or_default())
                .with_consequences(fields.consequences.unwrap_or_default());
            commands::decision::add(&file, new, json).map(|_| ())
        }

        Commands::Edit {
            file,
            id,
            title,
            fields,
        } => {
            let update = DecisionUpdate {
                title,
                status: fields.status,
                decision: fields.decision,
                context: fields.context,
                consequences: fields.consequences,
            };
            commands::decision::edit(&file, id, update, json)
        }

        Commands::Link {
            file,
            source,
            supersedes,
            deprecated_by,
        } => {
            let (relation, target) = match (supersedes, deprecated_by) {
                (Some(target), _) => (LinkRelation::Supersedes, target),
                (None, Some(target)) => (LinkRelation::DeprecatedBy, target),
                (None, None) => anyhow::bail!("pass --supersedes or --deprecated-by"),
            };
            commands::decision::link(&file, source, relation, target, json)
        }

        Commands::Unlink { file, source } => commands::decision::unlink(&file, source, json),

        Commands::Move {
            file,
            id,
            up,
            down,
            to,
        } => {
            let target = match (up, down, to) {
                (true, _, _) => MoveTarget::Up,
                (_, true, _) => MoveTarget::Down,
                (_, _, Some(position)) => MoveTarget::Position(position),
                _ => anyhow::bail!("pass --up, --down or --to <POSITION>"),
            };
            commands::decision::move_decision(&file, id, target, json)
        }

        Commands::Sort { file } => commands::decision::sort(&file, json),
        Commands::Delete { file, id } => commands::decision::delete(&file, id, json),
    }
}
