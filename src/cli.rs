//! Command-line interface for archfacts.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{self, ProjectConfig};
use crate::extract::{ExtractorRegistry, Repository};
use crate::extractors;
use crate::logging::{self, LoggingConfig};
use crate::pipeline::Orchestrator;
use crate::quality;
use crate::report::{self, JsonProject};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

const CONFIG_TEMPLATE: &str = include_str!("templates/archfacts.yaml");

/// Architecture fact extraction for source repositories.
///
/// Archfacts runs a set of pluggable extractors over a repository and
/// reports what they find: components, dependencies, API endpoints, data
/// entities and message flows. Later extractors can build on earlier
/// ones, e.g. inferring event flows from REST endpoints.
#[derive(Parser)]
#[command(name = "archfacts")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract architecture facts from a repository
    Scan(ScanArgs),
    /// List the built-in extractors
    List,
    /// Write a starter configuration file
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Repository root to scan
    pub path: PathBuf,

    /// Path to configuration YAML (default: auto-discover in <PATH>)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Drop facts reported more than once, keeping the first
    #[arg(long)]
    pub dedupe: bool,

    /// Log per-extractor and per-file progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "archfacts.yaml")]
    pub output: PathBuf,
}

/// Load the explicit config, a discovered one, or defaults.
fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<(ProjectConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => ProjectConfig::discover(root),
    };
    let config = match &path {
        Some(p) => ProjectConfig::parse_file(p)?,
        None => ProjectConfig::default(),
    };
    config::validate(&config)?;
    Ok((config, path))
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if args.verbose {
        logging::init_logging(LoggingConfig::verbose());
    } else {
        logging::init_from_env();
    }

    // Resolve path
    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    if !root.is_dir() {
        eprintln!("Error: {} is not a directory", root.display());
        return Ok(EXIT_ERROR);
    }

    let (config, config_path) = match load_config(&root, args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: invalid configuration: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    match &config_path {
        Some(p) => debug!("Using configuration {}", p.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    debug!("Parallel per-file extraction: {}", config.parallel());

    let registry = match extractors::builtin_registry().and_then(|r| r.select(&config.extractors)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let repo = match Repository::from_config(&root, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: invalid configuration: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let outcome = Orchestrator::new(&registry).run(&repo);
    let quality = quality::assess(&outcome);
    let facts = if args.dedupe {
        outcome.aggregate.clone().deduplicated()
    } else {
        outcome.aggregate.clone()
    };

    let project = JsonProject {
        name: config.project_name(&root),
        version: config.project.version.clone(),
        description: config.project.description.clone(),
        path: args.path.to_string_lossy().to_string(),
    };

    match args.format {
        OutputFormat::Json => {
            let json = report::json_report(project, &outcome, facts, quality);
            report::write_json(&json)?;
        }
        OutputFormat::Pretty => report::write_pretty(&project, &outcome, &facts, &quality),
    }

    if outcome.has_failures() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the list command.
pub fn run_list() -> anyhow::Result<i32> {
    let registry = extractors::builtin_registry()?;
    print_extractors(&registry);
    Ok(EXIT_SUCCESS)
}

fn print_extractors(registry: &ExtractorRegistry) {
    println!("Built-in extractors (in run order):");
    println!();

    for extractor in registry.ordered() {
        let mut notes = vec![format!("groups: {}", extractor.groups().join(", "))];
        if !extractor.reads().is_empty() {
            let reads: Vec<String> = extractor.reads().iter().map(|k| k.to_string()).collect();
            notes.push(format!("reads: {}", reads.join(", ")));
        }
        println!(
            "  {:>4}  {:<20} {:<26} {}",
            extractor.priority(),
            extractor.id(),
            extractor.display_name(),
            notes.join("; ")
        );
    }

    let groups: Vec<&str> = registry.groups().into_iter().collect();
    println!();
    println!("Groups: {}", groups.join(", "));
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to describe your project", args.output.display());
    println!("  2. Run: archfacts scan . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
