use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metarules", version, about = "Inspect merged extraction rule sets")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args)]
struct RuleSources {
    /// Project directory containing .metarules/rules.toml
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Inline rules file merged ahead of local and project rules (repeatable)
    #[arg(long = "inline", value_name = "FILE")]
    inline: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the merged rule order
    Merge {
        #[command(flatten)]
        sources: RuleSources,
        /// Output in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show which extractors would be attempted for a URL
    Plan {
        /// Page URL to evaluate inline tests against
        #[arg(long)]
        url: String,
        #[command(flatten)]
        sources: RuleSources,
        #[arg(long)]
        json: bool,
    },
    /// Validate rule files
    Lint {
        #[command(flatten)]
        sources: RuleSources,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Command::Merge { sources, json } => {
            metarules_core::cmd_merge(&sources.root, &sources.inline, json)?
        }
        Command::Plan { url, sources, json } => {
            metarules_core::cmd_plan(&sources.root, &sources.inline, &url, json)?
        }
        Command::Lint { sources } => metarules_core::cmd_lint(&sources.root, &sources.inline)?,
    }
    Ok(())
}
