use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabclean::config::AppSettings;
use tabclean::io::{read_csv, write_csv, write_csv_to};
use tabclean::pipeline::{PipelineSpec, RunReport, run_pipeline, validate_pipeline};
use tabclean::rules::ExecOptions;
use tabclean::stats;
use tabclean::table::Table;

#[derive(Parser)]
#[command(name = "tabclean", about = "Clean string-encoded CSV data with a JSON pipeline")]
pub struct Cli {
    /// Do not write a log file, whatever the settings say
    #[arg(long, global = true)]
    pub no_log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipeline over a CSV file
    Clean {
        /// CSV file with a header row
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline spec (JSON)
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Where to write the cleaned CSV. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the full run report, including every row issue, as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Clean rows on all cores
        #[arg(long)]
        parallel: bool,

        /// Field delimiter
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// Check a pipeline against a CSV header without running it
    Validate {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        pipeline: PathBuf,

        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// Print frequency tables and summary statistics, or grouped means
    Describe {
        #[arg(short, long)]
        input: PathBuf,

        /// Only describe this column. Defaults to every column.
        #[arg(short, long)]
        column: Option<String>,

        /// Run this pipeline first and describe its output
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// Number of most frequent values to list
        #[arg(long, default_value_t = 5)]
        top: usize,

        /// Count nulls as a value of their own in the frequency listing
        #[arg(long)]
        nulls: bool,

        /// Print the mean of --column for each value of this column instead
        #[arg(long, requires = "column")]
        group_by: Option<String>,

        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
}

pub fn run_command(command: Commands, settings: &AppSettings) -> Result<()> {
    match command {
        Commands::Clean {
            input,
            pipeline,
            output,
            report,
            parallel,
            delimiter,
        } => {
            let options = ExecOptions {
                parallel: parallel || settings.parallel,
            };
            handle_clean(
                &input,
                &pipeline,
                output.as_deref(),
                report.as_deref(),
                options,
                delimiter,
                settings.report_limit,
            )
        }
        Commands::Validate {
            input,
            pipeline,
            delimiter,
        } => handle_validate(&input, &pipeline, delimiter),
        Commands::Describe {
            input,
            column,
            pipeline,
            top,
            nulls,
            group_by,
            delimiter,
        } => {
            let table = load_described(&input, pipeline.as_deref(), delimiter)?;
            match (group_by, column) {
                (Some(by), Some(column)) => handle_group_mean(&table, &by, &column),
                (_, column) => handle_describe(&table, column.as_deref(), top, nulls),
            }
        }
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("Delimiter '{delimiter}' must be a single ASCII character"))
}

fn load_input(input: &Path, delimiter: char) -> Result<Table> {
    read_csv(input, delimiter_byte(delimiter)?)
        .with_context(|| format!("Failed to load {}", input.display()))
}

fn handle_clean(
    input: &Path,
    pipeline: &Path,
    output: Option<&Path>,
    report_path: Option<&Path>,
    options: ExecOptions,
    delimiter: char,
    report_limit: usize,
) -> Result<()> {
    let spec = PipelineSpec::from_file(pipeline)?;
    let table = load_input(input, delimiter)?;

    let (cleaned, report) = run_pipeline(&spec, table, options)?;

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    match output {
        Some(path) => {
            write_csv(&cleaned, path)?;
            println!("{}", report.summary());
            print_issues(&report, report_limit);
            println!("Cleaned data written to {}", path.display());
        }
        None => {
            // stdout carries the data, so the summary only goes to the log
            write_csv_to(&cleaned, std::io::stdout().lock())?;
            for warning in &report.warnings {
                tracing::warn!("{warning}");
            }
        }
    }
    Ok(())
}

fn print_issues(report: &RunReport, limit: usize) {
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    let issues = &report.cleaning.issues;
    if !issues.is_empty() {
        let per_column: Vec<String> = report
            .cleaning
            .issues_by_column()
            .into_iter()
            .map(|(column, n)| format!("{column}: {n}"))
            .collect();
        println!("issues by column: {}", per_column.join(", "));
    }
    for issue in issues.iter().take(limit) {
        println!(
            "  step {}, row {}, column '{}': {:?} ({}) -> {:?}",
            issue.step.map_or(0, |s| s + 1),
            issue.row,
            issue.column,
            issue.value,
            issue.reason,
            issue.action
        );
    }
    if issues.len() > limit {
        println!("  ... and {} more", issues.len() - limit);
    }
}

fn handle_validate(input: &Path, pipeline: &Path, delimiter: char) -> Result<()> {
    let spec = PipelineSpec::from_file(pipeline)?;
    let table = load_input(input, delimiter)?;

    let errors = validate_pipeline(&spec, table.header());
    if errors.is_empty() {
        println!(
            "Pipeline '{}' is valid for {} ({} steps)",
            spec.name,
            input.display(),
            spec.steps.len()
        );
        return Ok(());
    }

    for error in &errors {
        println!("{error}");
    }
    anyhow::bail!("Pipeline validation failed with {} error(s)", errors.len())
}

fn load_described(input: &Path, pipeline: Option<&Path>, delimiter: char) -> Result<Table> {
    let table = load_input(input, delimiter)?;
    let Some(pipeline) = pipeline else {
        return Ok(table);
    };
    let spec = PipelineSpec::from_file(pipeline)?;
    let (table, _) = run_pipeline(&spec, table, ExecOptions::default())?;
    Ok(table)
}

fn handle_group_mean(table: &Table, by: &str, column: &str) -> Result<()> {
    println!("mean of {column} by {by}");
    for group in stats::group_mean(table, by, column)? {
        let mean = group
            .mean
            .map_or_else(|| "-".to_owned(), |m| format!("{m:.2}"));
        println!(
            "  {:<24} {:>12}  ({} of {} rows)",
            group.group, mean, group.count, group.rows
        );
    }
    Ok(())
}

fn handle_describe(table: &Table, column: Option<&str>, top: usize, nulls: bool) -> Result<()> {
    let columns: Vec<String> = match column {
        Some(c) => vec![c.to_owned()],
        None => table.header().names().to_vec(),
    };

    println!("{} rows, {} columns", table.row_count(), table.column_count());
    for name in &columns {
        let summary = stats::describe(table, name)?;
        println!();
        println!(
            "{name}: {} values, {} null, {} distinct",
            summary.count, summary.nulls, summary.distinct
        );
        if let Some(n) = &summary.numeric {
            println!(
                "  mean {:.2}, std {}, min {}, median {}, max {}",
                n.mean,
                n.std_dev.map_or_else(|| "-".to_owned(), |s| format!("{s:.2}")),
                n.min,
                n.median,
                n.max
            );
        }
        for entry in stats::value_counts(table, name, nulls)?.iter().take(top) {
            println!("  {:>6.2}%  {:>6}  {}", entry.percent, entry.count, entry.value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_clean_args() {
        let cli = Cli::try_parse_from([
            "tabclean", "clean", "-i", "autos.csv", "-p", "autos.json", "--parallel",
        ]);
        let Ok(Cli {
            command: Commands::Clean {
                parallel, output, ..
            },
            ..
        }) = cli
        else {
            panic!("expected clean command");
        };
        assert!(parallel);
        assert!(output.is_none());
    }

    #[test]
    fn test_group_by_requires_column() {
        let missing = Cli::try_parse_from([
            "tabclean", "describe", "-i", "autos.csv", "--group-by", "brand",
        ]);
        assert!(missing.is_err());

        let cli = Cli::try_parse_from([
            "tabclean", "describe", "-i", "autos.csv", "-c", "price", "--group-by", "brand",
            "--nulls",
        ]);
        let Ok(Cli {
            command: Commands::Describe {
                group_by, nulls, ..
            },
            ..
        }) = cli
        else {
            panic!("expected describe command");
        };
        assert_eq!(group_by.as_deref(), Some("brand"));
        assert!(nulls);
    }

    #[test]
    fn test_delimiter_must_be_ascii() {
        assert_eq!(delimiter_byte(';').ok(), Some(b';'));
        assert!(delimiter_byte('é').is_err());
    }
}
