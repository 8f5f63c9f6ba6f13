use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;
use crate::migrate::config::OnError;

#[derive(Debug, Parser)]
#[command(
    name = "photo-migrate",
    version,
    about = "Migrate a Flickr export into a photo library, resumably"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Catalog an export, stage its media and write the action plan.
    Prep {
        source_dir: PathBuf,
        plan: PathBuf,
        staging_dir: Option<PathBuf>,
        /// Skip embedding metadata into staged copies.
        #[arg(long)]
        no_embed: bool,
    },
    /// Replay an action plan against the photo library.
    Import {
        plan: PathBuf,
        /// Refuse to run unless this library is the one open.
        library_name: Option<String>,
        /// Index of the first action to process.
        #[arg(long, default_value_t = 0)]
        resume: usize,
        #[arg(long)]
        log: Option<PathBuf>,
        #[arg(long, value_enum)]
        on_error: Option<OnError>,
    },
    /// Summarize the resume log against a plan.
    ResumeStatus {
        plan: PathBuf,
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Returns whether the command's report came back ok.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let report = match cli.command {
        Command::Prep {
            source_dir,
            plan,
            staging_dir,
            no_embed,
        } => commands::prep::run(&commands::prep::PrepOptions {
            source_dir,
            plan_path: plan,
            staging_dir,
            no_embed,
        })?,
        Command::Import {
            plan,
            library_name,
            resume,
            log,
            on_error,
        } => commands::import::run(&commands::import::ImportOptions {
            plan_path: plan,
            library_name,
            resume,
            log_path: log,
            on_error,
        })?,
        Command::ResumeStatus { plan, log } => {
            commands::resume_status::run(&commands::resume_status::ResumeStatusOptions {
                plan_path: plan,
                log_path: log,
            })?
        }
    };

    print_report(&report, cli.json)?;
    Ok(report.ok)
}
