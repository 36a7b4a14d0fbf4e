use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Output;

#[derive(Parser)]
#[command(name = "aura-focus", version, about = "Focus timer with a daily task list")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log informational events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Today's tasks
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Recent sessions, newest first
    History {
        /// Number of sessions to show (default: store.history_limit)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Write every session to the export file
    Export,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out = Output { json: cli.json };
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, out),
        Commands::Timer { action } => commands::timer::run(action, out),
        Commands::History { limit } => commands::history::run(limit, out),
        Commands::Export => commands::export::run(out),
        Commands::Config { action } => commands::config::run(action, out),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "aura-focus", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "aura_core=info,aura_focus=info"
    } else {
        "aura_core=warn,aura_focus=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}
