//! # Task Master
//!
//! A terminal task and habit tracker. Regular tasks share a date "cycle",
//! daily tasks carry a checklist that drives their progress, and finished
//! cycles roll up into sprint analytics. Year-long resolutions live on a
//! separate track and lock shortly after the year starts.
//!
//! ## Usage
//!
//! ### Interactive Mode (TUI)
//!
//! ```bash
//! taskpro
//! # or explicitly
//! taskpro ui
//! ```
//!
//! #### TUI Key Bindings
//!
//! *   `q`: Quit
//! *   `v` / `Tab`: Switch view (Tasks, Resolutions, Analytics)
//! *   `a`: Add task or resolution
//! *   `Enter`: Open daily checklist (or progress prompt)
//! *   `p`: Set progress
//! *   `d`: Delete selected
//! *   `e`: Show/Hide expired tasks
//!
//! ### Command Line Interface (CLI)
//!
//! ```bash
//! # Start a cycle (5 days by default) or join the active one
//! taskpro add "Write report" --priority high
//! taskpro add "Stretch" --daily
//!
//! # Update progress
//! taskpro progress 1 60
//! taskpro check 2 --date 2025-12-01
//! taskpro check 2 --date 2025-12-01 --undo
//!
//! # Analytics
//! taskpro sprints
//! taskpro calendar --month 2025-12
//!
//! # Resolutions
//! taskpro resolution add "Read 20 books"
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved in a SQLite database in your local data directory
//! (`~/.local/share/taskpro/taskpro.db` on Linux). Override it with the
//! `TASKPRO_DB` environment variable. An optional `config.toml` next to the
//! database tunes cycle length, cycle enforcement and the resolution lock.
//!
//! Set `RUST_LOG=taskpro=debug` to trace store operations on stderr.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use taskpro::commands::*;
use taskpro::config::Config;
use taskpro::error::Result;
use taskpro::models::Priority;
use taskpro::storage::Store;
use taskpro::tui::run_tui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "taskpro")]
#[command(about = "Task tracker with cycles, daily checklists and sprint analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task to the active cycle (or start a new one)
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Longer description
        #[arg(short, long)]
        desc: Option<String>,
        /// Priority: High, Medium or Low
        #[arg(short, long, default_value = "Medium")]
        priority: Priority,
        /// Start date in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        start: Option<String>,
        /// End date in YYYY-MM-DD (default: cycle end)
        #[arg(short, long)]
        end: Option<String>,
        /// Track progress with a daily checklist
        #[arg(long)]
        daily: bool,
    },
    /// List regular tasks
    List {
        /// Include expired tasks
        #[arg(short, long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a task and its daily checklist
    Show {
        id: i64,
    },
    /// Set progress of a single-progress task
    Progress {
        id: i64,
        /// Percent complete, 0-100
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
    /// Check off a day of a daily task
    Check {
        id: i64,
        /// Day in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Uncheck the day instead
        #[arg(short, long)]
        undo: bool,
    },
    /// Edit a task
    Edit {
        id: i64,
        /// New task name
        #[arg(short, long)]
        name: Option<String>,
        /// New description (empty to clear)
        #[arg(short, long)]
        desc: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<Priority>,
        /// New start date
        #[arg(short, long)]
        start: Option<String>,
        /// New end date
        #[arg(short, long)]
        end: Option<String>,
    },
    /// Remove a task and its checklist
    Remove {
        id: i64,
    },
    /// Show the active cycle
    Cycle,
    /// Sprint analytics
    Sprints {
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Month calendar of tasks
    Calendar {
        /// Month in YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// Manage New Year resolutions
    Resolution {
        #[command(subcommand)]
        command: ResolutionCommands,
    },
    /// Reset the database (delete all tasks and resolutions)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Subcommand)]
enum ResolutionCommands {
    /// Lock in a new resolution
    Add {
        /// Resolution goal
        name: String,
        /// Details
        #[arg(short, long)]
        desc: Option<String>,
    },
    /// List resolutions
    List,
    /// Remove a resolution
    Remove {
        id: i64,
    },
    /// Set progress of a resolution
    Progress {
        id: i64,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
}

fn init_tracing() {
    // Opt-in via RUST_LOG; stays silent otherwise.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(command: Option<Commands>) -> Result<()> {
    if let Some(Commands::Completions { shell }) = &command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return Ok(());
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "taskpro", &mut io::stdout());
        return Ok(());
    }

    let config = Config::load()?;
    let store = Store::open_default()?;

    match command {
        Some(Commands::Add { name, desc, priority, start, end, daily }) => {
            cmd_add(&store, &config, name, desc, priority, start, end, daily, false).map(|_| ())
        }
        Some(Commands::List { all, json }) => cmd_list(&store, all, json),
        Some(Commands::Show { id }) => cmd_show(&store, id),
        Some(Commands::Progress { id, percent }) => cmd_progress(&store, id, percent, false),
        Some(Commands::Check { id, date, undo }) => cmd_check(&store, id, date, !undo, false).map(|_| ()),
        Some(Commands::Edit { id, name, desc, priority, start, end }) => {
            cmd_edit(&store, &config, id, name, desc, priority, start, end, false)
        }
        Some(Commands::Remove { id }) => cmd_remove(&store, &config, id, false),
        Some(Commands::Cycle) => cmd_cycle(&store, &config),
        Some(Commands::Sprints { json }) => cmd_sprints(&store, &config, json),
        Some(Commands::Calendar { month }) => cmd_calendar(&store, month),
        Some(Commands::Resolution { command }) => match command {
            ResolutionCommands::Add { name, desc } => {
                cmd_resolution_add(&store, &config, name, desc, false).map(|_| ())
            }
            ResolutionCommands::List => cmd_resolution_list(&store, &config),
            ResolutionCommands::Remove { id } => cmd_resolution_remove(&store, &config, id, false),
            ResolutionCommands::Progress { id, percent } => {
                cmd_resolution_progress(&store, id, percent, false)
            }
        },
        Some(Commands::Reset { force }) => cmd_reset(&store, force),
        Some(Commands::Completions { .. }) => Ok(()),
        Some(Commands::Ui) | None => Ok(run_tui(store, config)?),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}
