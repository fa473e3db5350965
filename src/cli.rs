//! Command-line interface for goatlas.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::analysis::BodyStrategy;
use crate::atlas::AtlasBuilder;
use crate::config::{self, AtlasConfig, DEFAULT_TEMPLATE};
use crate::graph::DetailLevel;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "GOATLAS_LOG";

/// Go architecture atlas.
///
/// goatlas reads a Go module and builds an architecture graph: structs and
/// interfaces with their implementation and composition relations, the
/// goroutine spawn/channel topology with cancellation hygiene, the package
/// import graph, and structural metrics over all of it.
#[derive(Parser)]
#[command(name = "goatlas")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a Go module and print its atlas
    Analyze(AnalyzeArgs),
    /// Create a goatlas config file
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Module root (directory containing go.mod)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover in the module root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Write JSON output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Drop _test.go files and test-only packages
    #[arg(long)]
    pub exclude_tests: bool,

    /// Function body extraction: none, selective or full
    #[arg(long)]
    pub body_strategy: Option<String>,

    /// Confirm interface implementations with gopls
    #[arg(long)]
    pub gopls: bool,

    /// gopls binary to run (implies --gopls)
    #[arg(long)]
    pub gopls_path: Option<String>,

    /// Metrics detail level: package, class or method
    #[arg(long)]
    pub level: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "goatlas.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Install the stderr log subscriber. `GOATLAS_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("goatlas={}", default_level)));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve the config: explicit path, then discovery in the module root,
/// then defaults.
fn load_config(explicit: Option<&Path>, root: &Path) -> anyhow::Result<(AtlasConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => config::discover(root),
    };
    match path {
        Some(path) => {
            debug!(config = %path.display(), "loading config");
            let config = AtlasConfig::parse_file(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((AtlasConfig::default(), None)),
    }
}

/// Apply command-line overrides on top of the file config.
fn apply_overrides(config: &mut AtlasConfig, args: &AnalyzeArgs) -> Result<(), String> {
    if args.exclude_tests {
        config.exclude_tests = true;
    }
    if let Some(strategy) = &args.body_strategy {
        config.function_body_strategy = strategy.parse::<BodyStrategy>()?;
    }
    if let Some(level) = &args.level {
        config.detail_level = level.parse::<DetailLevel>()?;
    }
    if args.gopls {
        config.oracle.enabled = true;
    }
    if let Some(command) = &args.gopls_path {
        config.oracle.enabled = true;
        config.oracle.command = command.clone();
    }
    Ok(())
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

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

    let (mut config, config_path) = match load_config(args.config.as_deref(), &root) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error parsing config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Err(e) = apply_overrides(&mut config, args) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    if let Err(e) = config::validate(&config) {
        eprintln!("Error: invalid config: {}", e);
        return Ok(EXIT_ERROR);
    }

    let options = config.to_options();
    info!(
        root = %root.display(),
        strategy = config.function_body_strategy.as_str(),
        gopls = config.oracle.enabled,
        "analyzing"
    );

    let graph = AtlasBuilder::new(options).analyze_path(&root)?;

    let path_str = args.path.to_string_lossy().to_string();
    let config_str = config_path.map(|p| p.to_string_lossy().to_string());

    match args.format.as_str() {
        "json" => report::write_json(&graph, args.output.as_deref())?,
        _ => report::write_pretty(&path_str, config_str.as_deref(), &graph),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite or --output to choose another path");
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

    if let Err(e) = std::fs::write(&args.output, DEFAULT_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize the analysis", args.output.display());
    println!("  2. Run: goatlas analyze . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["goatlas", "analyze", "."];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Analyze(a) => a,
            Commands::Init(_) => unreachable!(),
        }
    }

    #[test]
    fn test_overrides() {
        let mut config = AtlasConfig::default();
        let a = args(&["--exclude-tests", "--body-strategy", "full", "--level", "package", "--gopls-path", "/opt/gopls"]);
        apply_overrides(&mut config, &a).unwrap();
        assert!(config.exclude_tests);
        assert_eq!(config.function_body_strategy, BodyStrategy::Full);
        assert_eq!(config.detail_level, DetailLevel::Package);
        assert!(config.oracle.enabled);
        assert_eq!(config.oracle.command, "/opt/gopls");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = AtlasConfig::default();
        let a = args(&["--body-strategy", "most"]);
        assert!(apply_overrides(&mut config, &a).is_err());
    }

    #[test]
    fn test_verbose_count() {
        let a = args(&["-vv"]);
        assert_eq!(a.verbose, 2);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("goatlas.yaml");
        std::fs::write(&output, "exclude_tests: true\n").unwrap();

        let code = run_init(&InitArgs { output: output.clone(), force: false }).unwrap();
        assert_eq!(code, EXIT_ERROR);

        let code = run_init(&InitArgs { output: output.clone(), force: true }).unwrap();
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), DEFAULT_TEMPLATE);
    }
}
