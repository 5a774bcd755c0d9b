use clap::{ArgAction, Parser, Subcommand};
use commands::{config, harvest};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "reviewharvest")]
#[command(about = "Harvest structured review records from paginated listing pages")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest reviews for the configured subjects
    #[command(
        long_about = "Walk the paginated review listings for every configured subject and write one CSV per subject. With no feed flags, every feed enabled in the configuration runs."
    )]
    Harvest {
        /// Harvest the server-rendered short-comment feed
        #[arg(long, action = ArgAction::SetTrue)]
        comments: bool,

        /// Harvest the browser-rendered long-review feed
        #[arg(long, action = ArgAction::SetTrue)]
        reviews: bool,

        /// Harvest every enabled feed (conflicts with individual flags)
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["comments", "reviews"])]
        all: bool,

        /// Restrict the run to one subject id
        #[arg(long, value_name = "ID")]
        subject: Option<String>,

        /// Output directory for CSV files (defaults to the data directory)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Show or scaffold configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Write a starter config file
    Init {
        /// Overwrite an existing config file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging(cli.verbose, cli.quiet, matches!(cli.command, Commands::Harvest { .. }))
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Harvest {
            comments,
            reviews,
            all,
            subject,
            out,
        } => harvest::run_harvest(comments, reviews, all, subject, out, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output),
    }
}
