use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tree_clones::config::Config;
use tree_clones::output::json::JsonReporter;
use tree_clones::output::text::TextReporter;
use tree_clones::output::Reporter;

#[derive(Parser)]
#[command(
    name = "tree-clones",
    about = "Detect structural code clones in Rust codebases"
)]
struct Cli {
    /// Path to analyze (defaults to current directory).
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Clone detection strategy.
    #[arg(long)]
    strategy: Option<String>,

    /// Minimum exactly-matched weight for a clone.
    #[arg(long)]
    min_weight: Option<usize>,

    /// Minimum node count for a function to be analyzed.
    #[arg(long)]
    min_unit_size: Option<usize>,

    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Exclude patterns (can be repeated).
    #[arg(long)]
    exclude: Vec<String>,

    /// Skip #[test] functions and #[cfg(test)] modules.
    #[arg(long)]
    exclude_tests: bool,

    /// SQLite database to record canonical patterns in.
    #[arg(long)]
    database: Option<PathBuf>,

    /// Snapshot label (e.g. commit hash) for recorded patterns.
    #[arg(long)]
    commit: Option<String>,

    /// Exit non-zero if more than this many clusters are found.
    #[arg(long)]
    max_clusters: Option<usize>,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let root = cli
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = match Config::load(&root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    // Apply CLI overrides
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(min_weight) = cli.min_weight {
        config.min_weight = min_weight;
    }
    if let Some(min_unit_size) = cli.min_unit_size {
        config.min_unit_size = min_unit_size;
    }
    if !cli.exclude.is_empty() {
        config.exclude = cli.exclude;
    }
    if cli.exclude_tests {
        config.exclude_tests = true;
    }
    if cli.database.is_some() {
        config.database = cli.database;
    }
    if cli.commit.is_some() {
        config.commit = cli.commit;
    }

    let result = match tree_clones::analyze(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    for warning in &result.warnings {
        eprintln!("Warning: {warning}");
    }

    if let Err(e) = tree_clones::persist(&config, &result) {
        eprintln!("Error: {e}");
        process::exit(2);
    }

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    let reporter: Box<dyn Reporter> = match cli.format {
        OutputFormat::Text => Box::new(TextReporter::new(Some(root.clone()))),
        OutputFormat::Json => Box::new(JsonReporter::new(Some(root.clone()))),
    };
    reporter.report(&result.detection, &mut writer).unwrap();

    if let Some(max) = cli.max_clusters {
        if result.detection.clones.len() > max {
            eprintln!(
                "Check FAILED: {} clone clusters (max: {max})",
                result.detection.clones.len()
            );
            process::exit(1);
        }
    }
}
