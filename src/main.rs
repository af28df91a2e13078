//! rectify: CLI entry point.
//!
//! Generates rectification documents from an inspection spreadsheet and
//! fills per-case template workbooks.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::Colorize;

use rectify_notice::config::{Config, CONFIG_ENV};
use rectify_notice::excel::write_starter_template;
use rectify_notice::extractor::Extractor;
use rectify_notice::filler::TemplateFiller;
use rectify_notice::manifest::TemplateCopier;
use rectify_notice::types::{Outcome, Summary};

#[derive(Parser)]
#[command(name = "rectify")]
#[command(about = "Generate rectification notices from inspection spreadsheets")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file (or set `RECTIFY_CONFIG` env var).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write a YAML report of every outcome to this file.
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split inspection findings into one text document per case.
    Generate {
        /// Source spreadsheet (xlsx, xls, ods or csv).
        source: PathBuf,

        /// Directory for the generated documents.
        #[arg(short, long, default_value = "input")]
        output: PathBuf,

        /// Worksheet name (defaults to the first sheet).
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Copy a template workbook once per manifest line.
    Copy {
        /// Manifest with one `id name` pair per line.
        manifest: PathBuf,

        /// Template workbook to copy.
        template: PathBuf,

        /// Directory for the copies (defaults to the manifest's directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write each document into the workbook of the same name.
    Fill {
        /// Directory containing the generated documents.
        #[arg(short, long, default_value = "input")]
        input: PathBuf,

        /// Directory containing the per-case workbooks.
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Write an empty template workbook matching the configured layout.
    Template {
        /// Path of the workbook to create.
        path: PathBuf,

        /// Number of issue rows to prepare.
        #[arg(long, default_value_t = 20)]
        rows: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
    let config = Config::load(config_path.as_deref())?;

    println!("{}", "rectify".bold());
    if let Some(path) = &config_path {
        println!("  Config: {}", path.display());
    }

    let start = Instant::now();
    let outcomes = match cli.command {
        Command::Generate {
            source,
            output,
            sheet,
        } => {
            println!("  Source: {}", source.display());
            println!("  Output: {}", output.display());
            println!();
            println!("{}", "Generating documents...".cyan());
            let extractor = Extractor::new(&config, output);
            extractor.run_file(&source, sheet.as_deref(), print_outcome)?
        }
        Command::Copy {
            manifest,
            template,
            output,
        } => {
            let output = output.unwrap_or_else(|| TemplateCopier::default_output_dir(&manifest));
            println!("  Manifest: {}", manifest.display());
            println!("  Template: {}", template.display());
            println!("  Output: {}", output.display());
            println!();
            println!("{}", "Copying templates...".cyan());
            let copier = TemplateCopier::new(template, output, &config.filename_prefix)?;
            copier.run(&manifest, print_outcome)?
        }
        Command::Fill { input, output } => {
            println!("  Input: {}", input.display());
            println!("  Output: {}", output.display());
            println!();
            println!("{}", "Filling workbooks...".cyan());
            let filler = TemplateFiller::new(&config.layout, input, output);
            filler.run(print_outcome)?
        }
        Command::Template { path, rows } => {
            write_starter_template(&path, &config.layout, rows)?;
            println!("  {} {}", "✓".green(), path.display());
            return Ok(());
        }
    };

    if let Some(report) = &cli.report {
        write_report(report, &outcomes)?;
    }

    print_summary(&Summary::from_outcomes(&outcomes), start.elapsed().as_secs_f64());

    if outcomes.iter().any(Outcome::is_failed) {
        std::process::exit(1);
    }

    Ok(())
}

fn write_report(path: &Path, outcomes: &[Outcome]) -> anyhow::Result<()> {
    let yaml = serde_yaml_ng::to_string(outcomes)?;
    fs::write(path, yaml)
        .map_err(|e| anyhow::anyhow!("Failed to write report {}: {e}", path.display()))
}

fn print_summary(summary: &Summary, elapsed: f64) {
    println!();
    println!("{}", "═".repeat(60));

    if summary.failed == 0 {
        println!(
            "  {} {} done, {} skipped in {:.2}s",
            "✓".green(),
            summary.done.to_string().green(),
            summary.skipped,
            elapsed
        );
    } else {
        println!(
            "  {} {} done, {} failed, {} skipped in {:.2}s",
            "✗".red(),
            summary.done,
            summary.failed.to_string().red(),
            summary.skipped,
            elapsed
        );
    }

    println!("{}", "═".repeat(60));
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Done { name, detail } => {
            println!("  {} {} ({})", "✓".green(), name, detail);
        }
        Outcome::Failed { name, error } => {
            println!("  {} {}", "✗".red(), name.red());
            println!("      error: {error}");
        }
        Outcome::Skipped { name, reason } => {
            println!("  {} {} ({})", "○".yellow(), name.dimmed(), reason.dimmed());
        }
    }
}
