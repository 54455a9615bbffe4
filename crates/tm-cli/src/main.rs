//! Table Merger CLI
//!
//! Command-line tool for appending columns of a secondary table to a reference
//! table, matching rows on equality and tolerance-based join fields.

mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tm_core::{
    candidate_fields, parse_csv, write_delimited, write_json, MergeConfig, MergeEngine,
    MergeReport, Table,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "table-merger")]
#[command(about = "Merge a secondary table into a reference table", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the input table into the base table and write the result
    Merge {
        /// Reference table; every row appears once in the output
        #[arg(short, long)]
        base: PathBuf,

        /// Secondary table providing the appended columns
        #[arg(short, long)]
        input: PathBuf,

        /// Join configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Input column to append, in output order (repeatable)
        #[arg(short, long)]
        append: Vec<String>,

        /// Append every input column that is not a join field
        #[arg(long, conflicts_with = "append")]
        all_fields: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
        format: OutputFormat,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the input columns that can be appended
    Fields {
        /// Secondary table
        #[arg(short, long)]
        input: PathBuf,

        /// Join configuration (JSON); its input join fields are excluded
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the join fragments and output columns without joining
    Plan {
        #[arg(short, long)]
        base: PathBuf,

        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        config: PathBuf,

        /// Input column to append (repeatable)
        #[arg(short, long)]
        append: Vec<String>,
    },

    /// Create a configuration file template
    InitConfig {
        /// Output path for the configuration file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Delimiter from the configuration (tab by default)
    Tsv,
    /// Comma-separated
    Csv,
    Json,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> tm_core::Result<()> {
    match command {
        Commands::Merge {
            base,
            input,
            config,
            output,
            append,
            all_fields,
            format,
            report,
        } => cmd_merge(
            &base,
            &input,
            &config,
            &output,
            append,
            all_fields,
            format,
            report.as_deref(),
        ),
        Commands::Fields { input, config } => cmd_fields(&input, config.as_deref()),
        Commands::Plan {
            base,
            input,
            config,
            append,
        } => cmd_plan(&base, &input, &config, append),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

/// Load both tables with the reading options from the configuration
fn load_tables(config: &MergeConfig, base: &Path, input: &Path) -> tm_core::Result<(Table, Table)> {
    let mut base_table = parse_csv(base, &config.base.read_options()?)?;
    base_table.name = "base".to_string();
    let mut input_table = parse_csv(input, &config.input.read_options()?)?;
    input_table.name = "input".to_string();
    info!(
        base_rows = base_table.row_count(),
        input_rows = input_table.row_count(),
        "tables loaded"
    );
    Ok((base_table, input_table))
}

/// `--append` wins, then `--all-fields`, then the configuration's list
fn select_fields(
    config: &MergeConfig,
    input: &Table,
    append: Vec<String>,
    all_fields: bool,
) -> Vec<String> {
    if !append.is_empty() {
        append
    } else if all_fields {
        candidate_fields(input, &config.join_fields)
    } else {
        config.fields_to_append.clone()
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_merge(
    base: &Path,
    input: &Path,
    config_path: &Path,
    output: &Path,
    append: Vec<String>,
    all_fields: bool,
    format: OutputFormat,
    report: Option<&Path>,
) -> tm_core::Result<()> {
    let started = Instant::now();
    let config = MergeConfig::load(config_path)?;
    let (base_table, input_table) = load_tables(&config, base, input)?;
    let fields = select_fields(&config, &input_table, append, all_fields);

    let engine = MergeEngine::from_config(&config);
    let outcome = engine.launch(&base_table, &input_table, &fields)?;

    match format {
        OutputFormat::Tsv => {
            write_delimited(&outcome.table, output, config.output.delimiter_byte()?)?
        }
        OutputFormat::Csv => write_delimited(&outcome.table, output, b',')?,
        OutputFormat::Json => write_json(&outcome.table, output)?,
    }

    println!(
        "Merged {} rows ({} matched, {} unmatched) into {}",
        outcome.table.row_count(),
        outcome.matched_rows,
        outcome.unmatched_rows,
        output.display()
    );
    if outcome.ambiguous_rows_removed > 0 {
        println!(
            "{} ambiguous rows had to be removed",
            outcome.ambiguous_rows_removed
        );
    }

    if let Some(report_path) = report {
        let summary = MergeReport::new(&outcome, input_table.row_count(), started.elapsed());
        summary.save(report_path)?;
        println!("Report written to {}", report_path.display());
    }

    Ok(())
}

fn cmd_fields(input: &Path, config_path: Option<&Path>) -> tm_core::Result<()> {
    let config = match config_path {
        Some(path) => MergeConfig::load(path)?,
        None => MergeConfig::new(Vec::new()),
    };
    let table = parse_csv(input, &config.input.read_options()?)?;

    let fields = candidate_fields(&table, &config.join_fields);
    println!("Appendable fields ({}):", fields.len());
    for (i, field) in fields.iter().enumerate() {
        println!("  {}. {}", i + 1, field);
    }

    Ok(())
}

fn cmd_plan(base: &Path, input: &Path, config_path: &Path, append: Vec<String>) -> tm_core::Result<()> {
    let config = MergeConfig::load(config_path)?;
    let (base_table, input_table) = load_tables(&config, base, input)?;
    let fields = select_fields(&config, &input_table, append, false);

    let prepared = MergeEngine::from_config(&config).prepare(&base_table, &input_table, &fields)?;

    println!("Join condition:");
    for (i, fragment) in prepared.plan.fragments.iter().enumerate() {
        let joiner = if i == 0 { "   " } else { "AND" };
        println!("  {} {}", joiner, fragment);
    }
    println!();
    println!("Output columns:");
    for column in &base_table.columns {
        println!("  {}", column.name);
    }
    for column in &prepared.plan.projection {
        if column.source == column.output {
            println!("  {}", column.output);
        } else {
            println!("  {} (input '{}')", column.output, column.source);
        }
    }
    println!();
    println!("Ambiguity policy: {:?}", config.ambiguity);

    Ok(())
}

fn cmd_init_config(output: &Path) -> tm_core::Result<()> {
    let config = MergeConfig::template();
    config.save(output)?;

    println!("Created configuration file: {}", output.display());
    println!("Join fields: {}", config.join_fields.len());
    for field in &config.join_fields {
        println!(
            "  {} <-> {} ({})",
            field.field_in_base, field.field_in_input, field.condition
        );
    }
    println!();
    println!("Edit the file to match your tables, then run:");
    println!(
        "  table-merger merge --base <file> --input <file> --config {} --output output.txt",
        output.display()
    );

    Ok(())
}
