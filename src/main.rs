mod commands;
mod logging;
mod reporter;

use std::env;
use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use media_consolidator::analysis::audit::AuditReport;
use media_consolidator::config::{self, AppConfig, DEFAULT_CONFIG_PATH};
use media_consolidator::execution::executor::ExecutionReport;
use media_consolidator::execution::undo::UndoReport;
use media_consolidator::hasher::cache::HashCache;
use media_consolidator::{report, Pipeline};
use reporter::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    let config_path = args
        .config
        .or_else(|| env::var("MC_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match config::load_configuration(&config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration from {}: {}", config_path, err);
            process::exit(1);
        }
    };

    if let Err(err) = run(command, config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            return Ok(());
        }
        Commands::CountHashCache => {
            info!("Counting hash cache entries...");
            let cache = HashCache::open(config.hash_cache_path())?;
            println!(
                "{} entries in {}",
                format!("{}", cache.count()?).cyan(),
                cache.path().display()
            );
            return Ok(());
        }
        _ => {}
    }

    let pipeline = Pipeline::open(config).context("opening index store")?;
    let reporter = CliReporter::new();

    match command {
        Commands::Scan { roots } => {
            let indexed = pipeline.inventory(&roots, &reporter)?;
            info!("{} files indexed", format!("{}", indexed).green());
        }
        Commands::Hash => {
            let stats = pipeline.fingerprint(&reporter)?;
            info!(
                "{} unique sizes, {} unique partials skipped; {} full hashes ({} from cache)",
                format!("{}", stats.unique_sizes).green(),
                format!("{}", stats.unique_partials).green(),
                format!("{}", stats.full_hashed).cyan(),
                format!("{}", stats.cache_hits).cyan(),
            );
            if stats.read_failures > 0 {
                info!("{} files could not be read", format!("{}", stats.read_failures).red());
            }
        }
        Commands::Analyze => {
            let (scored, stats) = pipeline.analyze(&reporter)?;
            info!(
                "{} files scored; {} duplicate sets, {} duplicates to trash",
                scored,
                format!("{}", stats.duplicate_sets).cyan(),
                format!("{}", stats.deleted).red(),
            );
        }
        Commands::Plan => {
            let planned = pipeline.plan(&reporter)?;
            info!("{} destinations planned", format!("{}", planned).green());
        }
        Commands::Audit => {
            let audit = pipeline.audit()?;
            print_audit(&audit);
            audit.into_result()?;
        }
        Commands::Execute(args) => {
            let report = pipeline.execute(!args.live, &reporter)?;
            print_execution(&report);
        }
        Commands::All { live, roots } => {
            let summary = pipeline.run_all(&roots, !live.live, &reporter)?;
            info!(
                "{} indexed, {} duplicate sets, {} planned in {}",
                summary.indexed,
                format!("{}", summary.judge.duplicate_sets).cyan(),
                summary.planned,
                format!("{:.2}s", summary.duration.as_secs_f64()).green(),
            );
            print_audit(&summary.audit);
            print_execution(&summary.execution);
        }
        Commands::Undo(args) => {
            let report = pipeline.undo(!args.live, &reporter)?;
            print_undo(&report);
        }
        Commands::ExportPlan { file } => {
            let rows = report::export_plan_to_path(pipeline.database(), &file)
                .with_context(|| format!("writing plan to {}", file))?;
            info!("{} rows written to {}", rows, file);
        }
        Commands::PrintConfig | Commands::CountHashCache => {}
    }

    Ok(())
}

fn print_audit(audit: &AuditReport) {
    let c = audit.counts;
    let verdict = if audit.passed() {
        "PASSED".green()
    } else {
        "FAILED".red()
    };
    println!(
        "Audit {}: {} total, {} keep, {} trash, {} unset",
        verdict,
        c.total,
        format!("{}", c.keeps).green(),
        format!("{}", c.deletes).red(),
        c.unset,
    );
}

fn print_execution(report: &ExecutionReport) {
    if report.dry_run {
        println!(
            "{} {} moves planned, {} already in place. Re-run with --live to apply.",
            "[DRY RUN]".yellow(),
            report.planned,
            report.already_in_place,
        );
        return;
    }
    println!(
        "{} moved, {} already in place, {} consolidated, {} trashed without keeper",
        format!("{}", report.moved).green(),
        report.already_in_place,
        format!("{}", report.consolidated).cyan(),
        report.trashed_without_keeper,
    );
    println!(
        "{} missing sources, {} failed, receipts written to {} folders",
        format!("{}", report.missing_sources).yellow(),
        format!("{}", report.failed).red(),
        report.trace_folders,
    );
}

fn print_undo(report: &UndoReport) {
    if report.dry_run {
        println!(
            "{} {} restorations planned. Re-run with --live to apply.",
            "[DRY RUN]".yellow(),
            report.planned,
        );
    } else {
        println!(
            "Restored {}/{} keepers and {}/{} duplicates",
            format!("{}", report.keepers_restored).green(),
            report.keepers_total,
            format!("{}", report.deletes_restored).green(),
            report.deletes_total,
        );
    }
    println!(
        "{} refused (destination occupied), {} missing, {} failed",
        format!("{}", report.refused).yellow(),
        report.missing,
        format!("{}", report.failed).red(),
    );
}
