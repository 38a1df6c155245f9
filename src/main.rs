use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

mod error;
mod ingest;
mod logging;
mod models;
mod outreach;
mod report;
mod score;

/// Stage 1 finished and wrote its artifacts, but nobody qualified.
const EXIT_NO_QUALIFYING: u8 = 2;

#[derive(Parser)]
#[command(name = "trainer-scout")]
#[command(about = "Rank trainers from learner feedback and draft outreach for the best", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log filter, e.g. `info` or `trainer_scout=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score trainers from a feedback CSV and write the leaderboard, results and report
    Score {
        #[arg(long, env = "CSV_PATH", default_value = "data/feedback.csv")]
        csv: PathBuf,
        #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
        out_dir: PathBuf,
    },
    /// Turn stage 1 results into outreach email drafts
    Outreach {
        #[arg(long, env = "RESULTS_PATH", default_value = "output/results.json")]
        results: PathBuf,
        #[arg(long, env = "OUTREACH_PATH", default_value = "output/outreach_ready.json")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Score { csv, out_dir } => {
            let loaded = ingest::load_feedback(&csv)?;
            if !loaded.malformed.is_empty() {
                println!(
                    "Skipped {} malformed row(s); rerun with --verbose for details.",
                    loaded.malformed.len()
                );
            }

            let ranked = score::score_trainers(&loaded.rows);
            let board = score::leaderboard(&ranked);
            let results = report::build_results(&ranked, Utc::now());

            print!("{}", report::console_summary(&results));
            report::write_artifacts(&out_dir, &results, &board)
                .with_context(|| format!("writing artifacts to {}", out_dir.display()))?;
            println!("Artifacts written to {}.", out_dir.display());

            if ranked.is_empty() {
                tracing::warn!(
                    min_responses = score::MIN_RESPONSES,
                    "no trainers met the minimum response threshold"
                );
                eprintln!(
                    "No qualifying trainers: nobody reached {} responses.",
                    score::MIN_RESPONSES
                );
                return Ok(ExitCode::from(EXIT_NO_QUALIFYING));
            }
        }
        Commands::Outreach { results, out } => {
            let loaded = outreach::load_results(&results)?;
            println!(
                "Loaded {} top trainer(s) from {}.",
                loaded.top_trainers.len(),
                results.display()
            );

            let drafts = outreach::generate_drafts(&loaded, Utc::now());
            for draft in &drafts {
                println!("- Draft for {}: {}", draft.trainer_display_name, draft.subject);
            }
            outreach::write_drafts(&out, &drafts)
                .with_context(|| format!("writing drafts to {}", out.display()))?;
            println!("Saved {} outreach draft(s) to {}.", drafts.len(), out.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
