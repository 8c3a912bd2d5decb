use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waypoint::config::Config;
use waypoint::models::*;
use waypoint::{mcp, report, Workspace};

#[derive(Parser)]
#[command(name = "wpt")]
#[command(about = "Project memory for AI-assisted development")]
struct Cli {
    /// Project root holding summaries/ and archive/ (overrides WAYPOINT_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the layout and write the project brief
    Init {
        #[arg(long)]
        name: String,
        /// Kind of project, e.g. "CLI tool"
        #[arg(long = "type")]
        project_type: String,
        #[arg(long)]
        phase: String,
        /// All planned phases, comma separated
        #[arg(long, value_delimiter = ',')]
        phases: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Summarize a raw document and archive the original
    Process {
        path: PathBuf,
        /// light or full
        #[arg(long)]
        mode: String,
    },
    /// Write a session handoff and archive the previous one
    Handoff {
        #[arg(long)]
        topic: String,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Accomplishment, optionally with outputs: "Did X -> src/a.rs, src/b.rs"
        #[arg(long = "done")]
        accomplishments: Vec<String>,
        /// Numeric fact, verbatim
        #[arg(long = "fact")]
        numeric_facts: Vec<String>,
        /// Conditional rule, "IF x THEN y"
        #[arg(long = "rule")]
        conditional_logic: Vec<String>,
        #[arg(long = "next")]
        next_steps: Vec<String>,
        #[arg(long = "question")]
        open_questions: Vec<String>,
        /// Free-form notes (full mode only)
        #[arg(long)]
        notes: Option<String>,
        /// light or full; derived from --sessions when omitted
        #[arg(long)]
        mode: Option<String>,
        /// Sessions completed so far
        #[arg(long)]
        sessions: Option<u32>,
    },
    /// Show project state
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Verify workspace invariants
    Check {
        /// Remove staged files left by an interrupted write before checking
        #[arg(long)]
        discard_staged: bool,
    },
    /// List active and archived handoffs
    History,
    /// Start MCP server via stdio
    Mcp,
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "waypoint=info".into()),
    );

    if use_stderr {
        // MCP mode: log to stderr so stdout is clean for protocol
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, Commands::Mcp);
    init_tracing(use_stderr);

    let config = match cli.root {
        Some(root) => Config::new(root),
        None => Config::from_env()?,
    };
    let workspace = Workspace::open(config);

    match cli.command {
        Commands::Init {
            name,
            project_type,
            phase,
            phases,
            description,
        } => {
            let brief = ProjectBrief {
                name,
                project_type,
                phase,
                phases,
                description,
            };
            let path = workspace.init(&brief)?;
            println!("{}", workspace.relative(&path));
        }
        Commands::Process { path, mode } => {
            let outcome = workspace.process_document(&path, Mode::from_str(&mode)?)?;
            println!("{}", workspace.relative(&outcome.summary_path));
            println!("archived: {}", workspace.relative(&outcome.archived_source));
            println!("{}", outcome.synopsis);
        }
        Commands::Handoff {
            topic,
            date,
            accomplishments,
            numeric_facts,
            conditional_logic,
            next_steps,
            open_questions,
            notes,
            mode,
            sessions,
        } => {
            let date = match date {
                Some(d) => NaiveDate::parse_from_str(&d, DATE_FORMAT)?,
                None => chrono::Local::now().date_naive(),
            };
            let mode = mode.as_deref().map(Mode::from_str).transpose()?;
            let facts = SessionFacts {
                date,
                topic,
                accomplishments: accomplishments
                    .iter()
                    .map(|a| Accomplishment::parse(a))
                    .collect(),
                numeric_facts,
                conditional_logic,
                next_steps,
                open_questions,
                notes,
                session_count: sessions,
            };
            let outcome = workspace.generate_handoff(facts, mode)?;
            println!("{}", workspace.relative(&outcome.record_path));
            if let Some(prev) = &outcome.archived_previous {
                println!("archived: {}", workspace.relative(prev));
            }
            println!("{}", outcome.synopsis);
        }
        Commands::Status { json } => {
            let state = workspace.report_state()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print!("{}", report::render_report(&state));
            }
        }
        Commands::Check { discard_staged } => {
            if discard_staged {
                for path in workspace.discard_staged()? {
                    println!("discarded: {}", workspace.relative(&path));
                }
            }
            workspace.check()?;
            println!("ok");
        }
        Commands::History => {
            print!("{}", report::render_history(&workspace.handoffs()?));
        }
        Commands::Mcp => {
            mcp::run_stdio_server(workspace).await?;
        }
    }

    Ok(())
}
