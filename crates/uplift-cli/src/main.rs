#![forbid(unsafe_code)]

mod cmd;
mod output;
mod transport;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uplift_core::model::EditorMode;

#[derive(Parser, Debug)]
#[command(
    name = "uplift",
    author,
    version,
    about = "uplift: review release uplift requests from the terminal",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "List analyses",
        after_help = "EXAMPLES:\n    uplift analyses\n    uplift analyses --json"
    )]
    Analyses,

    #[command(
        about = "Show the bugs of an analysis",
        after_help = "EXAMPLES:\n    # All bugs of analysis 3\n    uplift show 3\n\n    # Detail of one bug\n    uplift show 3 --bug 1234"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        about = "Edit status and tracking flags of a bug",
        after_help = "EXAMPLES:\n    uplift flags 3 1234 --set status_firefox55=fixed --comment \"Verified.\""
    )]
    Flags(cmd::edit::FlagsArgs),

    #[command(
        about = "Approve uplift requests",
        after_help = "EXAMPLES:\n    uplift approve 3 1234 --version approval-mozilla-beta"
    )]
    Approve(cmd::edit::DecisionArgs),

    #[command(
        about = "Reject uplift requests",
        after_help = "EXAMPLES:\n    uplift reject 3 1234 --version approval-mozilla-beta --comment \"Too risky.\""
    )]
    Reject(cmd::edit::DecisionArgs),

    #[command(about = "Show resolved configuration")]
    Config,
}

/// Default filter when `UPLIFT_LOG` is unset. `uplift` is the binary's own
/// target.
const fn default_directives(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "uplift=debug,uplift_core=debug,info"
    } else if quiet {
        "error"
    } else {
        "uplift=info,uplift_core=info,warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("UPLIFT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_directives(
            env::var("DEBUG").is_ok() || verbose,
            quiet,
        ))
    });

    let format = env::var("UPLIFT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    if cli.verbose {
        info!(json = output.is_json(), "Verbose mode enabled");
    }

    match cli.command {
        Commands::Analyses => cmd::analyses::run_analyses(&project_root, output),
        Commands::Show(ref args) => cmd::show::run_show(args, &project_root, output),
        Commands::Flags(ref args) => cmd::edit::run_flags(args, &project_root, output),
        Commands::Approve(ref args) => {
            cmd::edit::run_decision(args, EditorMode::Approve, &project_root, output)
        }
        Commands::Reject(ref args) => {
            cmd::edit::run_decision(args, EditorMode::Reject, &project_root, output)
        }
        Commands::Config => cmd::config::run_config(&project_root, output),
    }
}
