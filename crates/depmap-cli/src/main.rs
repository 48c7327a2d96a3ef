mod config_cmds;
mod context;
mod grid_cmds;
mod mutate;
mod orchestrator;
mod query;
mod visualize;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use depmap_core::ConfigManager;
use tabled::builder::Builder as TableBuilder;
use tabled::settings::Style;

use context::AppContext;

#[derive(Parser)]
#[command(name = "depmap")]
#[command(about = "Dependency tracker: key generation, grid maintenance, and suggestion orchestration", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the project, (re)generate keys, analyze files, embed, suggest, and write every tracker.
    AnalyzeProject {
        /// Alternate project root for this run only.
        root: Option<String>,
        #[arg(long)]
        force_analysis: bool,
        #[arg(long)]
        force_embeddings: bool,
    },

    /// Re-analyze a single file and report its resolved key and suggestions.
    AnalyzeFile { path: String },

    /// Set a single grid cell between two keys in a tracker.
    AddDependency {
        #[arg(long)]
        tracker: String,
        #[arg(long)]
        source_key: String,
        #[arg(long)]
        target_key: String,
        #[arg(long)]
        dep_type: char,
    },

    /// Remove a key (and its row/column) from a tracker.
    RemoveKey { tracker: String, key: String },

    /// Merge one tracker into another.
    MergeTrackers {
        primary: String,
        secondary: String,
        #[arg(long)]
        output: Option<String>,
    },

    /// List a tracker's key definitions, flagging rows that need a human look.
    ShowKeys {
        #[arg(long)]
        tracker: String,
    },

    /// Aggregate one key's dependencies across every tracker file.
    ShowDependencies {
        #[arg(long)]
        key: String,
    },

    /// Export a tracker to another format.
    ExportTracker {
        tracker: String,
        #[arg(long, default_value = "md")]
        format: String,
        #[arg(long)]
        output: String,
    },

    /// Render a Mermaid dependency diagram.
    VisualizeDependencies {
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        output: Option<String>,
    },

    /// Run-length compress a raw grid row.
    Compress { row: String },

    /// Decompress a run-length-encoded grid row.
    Decompress { row: String },

    /// Read one cell out of a compressed row.
    GetChar { row: String, index: usize },

    /// Rewrite one cell of a compressed row.
    SetChar { row: String, index: usize, value: char },

    /// Set a single configuration value addressed by a dotted path.
    UpdateConfig { key: String, value: String },

    /// Reset configuration to compiled-in defaults.
    ResetConfig,

    /// Clear the embeddings cache and tracker backup history.
    ClearCaches,
}

fn main() {
    let cli = Cli::parse();
    context::init_logging(cli.verbose, cli.json_logs);

    match run(&cli) {
        Ok(value) => {
            if let Err(e) = print_output(&cli.output, &value) {
                eprintln!("{} {}", "Error:".red().bold(), e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<serde_json::Value> {
    match &cli.command {
        Commands::AnalyzeProject { root, force_analysis, force_embeddings } => {
            let ctx = AppContext::load(root.as_deref().or(cli.root.as_deref()))?;
            let report = orchestrator::run_analyze_project(&ctx, *force_analysis, *force_embeddings)?;
            Ok(serde_json::to_value(report)?)
        }
        Commands::AnalyzeFile { path } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let abs_path = context::as_abs(&ctx.project_root, path);
            let report = orchestrator::run_analyze_file(&ctx, &abs_path)?;
            Ok(serde_json::to_value(report)?)
        }
        Commands::AddDependency { tracker, source_key, target_key, dep_type } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let tracker_path = ctx.resolve_tracker_path(tracker);
            mutate::add_dependency(&tracker_path, source_key, target_key, *dep_type)?;
            Ok(serde_json::json!({"status": "ok", "tracker": tracker_path.display().to_string()}))
        }
        Commands::RemoveKey { tracker, key } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let tracker_path = ctx.resolve_tracker_path(tracker);
            mutate::remove_key(&tracker_path, key)?;
            Ok(serde_json::json!({"status": "ok", "removed_key": key}))
        }
        Commands::MergeTrackers { primary, secondary, output } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let primary_path = ctx.resolve_tracker_path(primary);
            let secondary_path = ctx.resolve_tracker_path(secondary);
            let output_path = output.as_ref().map(PathBuf::from);
            mutate::merge_tracker_files(&primary_path, &secondary_path, output_path.as_deref())?;
            Ok(serde_json::json!({"status": "ok"}))
        }
        Commands::ShowKeys { tracker } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let tracker_path = ctx.resolve_tracker_path(tracker);
            let rows = query::show_keys(&tracker_path)?;
            Ok(serde_json::to_value(rows)?)
        }
        Commands::ShowDependencies { key } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let sections = query::show_dependencies(&ctx, key)?;
            Ok(serde_json::to_value(sections)?)
        }
        Commands::ExportTracker { tracker, format, output } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let tracker_path = ctx.resolve_tracker_path(tracker);
            let export_format = mutate::parse_format(format)?;
            mutate::export(&tracker_path, std::path::Path::new(output), export_format)?;
            Ok(serde_json::json!({"status": "ok", "output": output}))
        }
        Commands::VisualizeDependencies { key, output } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let diagram = visualize::visualize_dependencies(&ctx, key.as_deref())?;
            if let Some(output_path) = output {
                std::fs::write(output_path, &diagram).context("failed to write diagram output")?;
            }
            Ok(serde_json::json!({"diagram": diagram}))
        }
        Commands::Compress { row } => Ok(serde_json::json!({"compressed": grid_cmds::compress_row(row)})),
        Commands::Decompress { row } => Ok(serde_json::json!({"decompressed": grid_cmds::decompress_row(row)})),
        Commands::GetChar { row, index } => Ok(serde_json::to_value(grid_cmds::get_char(row, *index)?)?),
        Commands::SetChar { row, index, value } => {
            Ok(serde_json::json!({"row": grid_cmds::set_char(row, *index, *value)?}))
        }
        Commands::UpdateConfig { key, value } => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let config_dir = ConfigManager::default_config_dir(&ctx.project_root);
            let mut manager = ConfigManager::load(&config_dir).context("failed to load configuration")?;
            let settings = config_cmds::update_config(&mut manager, key, value)?;
            Ok(serde_json::to_value(settings)?)
        }
        Commands::ResetConfig => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let config_dir = ConfigManager::default_config_dir(&ctx.project_root);
            let mut manager = ConfigManager::load(&config_dir).context("failed to load configuration")?;
            let settings = config_cmds::reset_config(&mut manager)?;
            Ok(serde_json::to_value(settings)?)
        }
        Commands::ClearCaches => {
            let ctx = AppContext::load(cli.root.as_deref())?;
            let report = config_cmds::clear_caches(&ctx)?;
            Ok(serde_json::to_value(report)?)
        }
    }
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => print_pretty(value)?,
        OutputFormat::Table => print_table(value)?,
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => println!("{}: {}", key_colored, s.green()),
                    serde_json::Value::Number(n) => println!("{}: {}", key_colored, n.to_string().yellow()),
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                        println!("{}:", key_colored);
                        print_pretty(val)?;
                    }
                    _ => println!("{}: {}", key_colored, val),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("\n{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item)?;
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Renders a list of flat JSON objects as a table; anything else falls back
/// to [`print_pretty`] since there's no tabular shape to build columns from.
fn print_table(value: &serde_json::Value) -> Result<()> {
    let rows = match value {
        serde_json::Value::Array(arr) if arr.iter().all(|v| v.is_object()) && !arr.is_empty() => arr.clone(),
        serde_json::Value::Object(_) => vec![value.clone()],
        _ => return print_pretty(value),
    };

    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        if let serde_json::Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut builder = TableBuilder::default();
    builder.push_record(columns.iter().cloned());
    for row in &rows {
        let serde_json::Value::Object(map) = row else { continue };
        let cells = columns.iter().map(|col| match map.get(col) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        });
        builder.push_record(cells);
    }

    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
