//! Strict Verifier CLI
//!
//! Verifies LLM-predicted exclusion identifiers against extracted syntax
//! trees and declarative rules.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use strict_verifier::config::{CliOverrides, Config};
use strict_verifier::discovery::FileDiscovery;
use strict_verifier::extractor::ProcessExtractor;
use strict_verifier::orchestrator::Orchestrator;
use strict_verifier::output::{write_report, JsonFormatter, OutputFormatter, TextFormatter};
use strict_verifier::predictions::Predictions;
use strict_verifier::rule::RuleSet;
use strict_verifier::verifier::StrictVerifier;

#[derive(Parser)]
#[command(
    name = "strict-verifier",
    version,
    about = "Strict rule-based verifier for LLM exclusion predictions",
    long_about = "Accepts a predicted identifier only when it exists in the extracted AST and a rule backs it."
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every source file of a project in parallel
    Verify {
        /// Project root directory
        project: PathBuf,

        #[command(flatten)]
        common: CommonArgs,

        /// Number of parallel workers (0 = one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Console output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Verify a single source file
    Check {
        /// Source file
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,

        /// Console output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Load, validate and list rules
    Rules {
        /// Rule file (YAML or JSON)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Show one rule in detail
        #[arg(long)]
        show: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Predicted identifiers JSON file
    #[arg(short, long)]
    identifiers: PathBuf,

    /// Rule file (YAML or JSON)
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// AST analyzer executable
    #[arg(short, long)]
    analyzer: Option<PathBuf>,

    /// Report output path (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Per-file extraction timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Minimum confidence for reported exclusions
    #[arg(long)]
    min_confidence: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Verify {
            project,
            common,
            workers,
            format,
        } => {
            let config = resolve_config(cli, common, *workers)?;
            handle_verify(&config, project, common, *format, cli.no_color)
        }
        Commands::Check {
            file,
            common,
            format,
        } => {
            let config = resolve_config(cli, common, None)?;
            handle_check(&config, file, common, *format, cli.no_color)
        }
        Commands::Rules { rules, show } => {
            let mut config = load_config(cli)?;
            config.merge_cli(CliOverrides {
                rules: rules.clone(),
                ..CliOverrides::default()
            });
            handle_rules(&config, show.as_deref())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Config::load_default().context("Failed to load config"),
    }
}

fn resolve_config(cli: &Cli, common: &CommonArgs, workers: Option<usize>) -> Result<Config> {
    let mut config = load_config(cli)?;
    config.merge_cli(CliOverrides {
        workers,
        timeout_secs: common.timeout,
        min_confidence: common.min_confidence,
        analyzer: common.analyzer.clone(),
        rules: common.rules.clone(),
    });
    config.validate()?;
    Ok(config)
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let rules = RuleSet::load(&config.paths.rules)
        .with_context(|| format!("Failed to load rules from {}", config.paths.rules.display()))?;
    let verifier = StrictVerifier::new(rules, config.verifier_config());
    let extractor = ProcessExtractor::new(&config.extractor.path).with_args(&config.extractor.args);

    Ok(Orchestrator::new(verifier, Arc::new(extractor))
        .with_workers(config.worker_count())
        .with_timeout(config.timeout()))
}

fn formatter(format: Format, no_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        Format::Json => Box::new(JsonFormatter::new().pretty()),
        Format::Text if no_color => Box::new(TextFormatter::new().without_color()),
        Format::Text => Box::new(TextFormatter::new()),
    }
}

fn default_output_path(config: &Config) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    config.paths.results_dir.join(format!("verification_{}.json", secs))
}

fn save(path: &Path, contents: &str) -> Result<()> {
    write_report(path, contents).with_context(|| format!("Failed to write report {}", path.display()))?;
    eprintln!("Report saved to {}", path.display().to_string().cyan());
    Ok(())
}

fn handle_verify(
    config: &Config,
    project: &Path,
    common: &CommonArgs,
    format: Format,
    no_color: bool,
) -> Result<i32> {
    let predictions = Predictions::load(&common.identifiers)?;
    let orchestrator = build_orchestrator(config)?;

    let files = FileDiscovery::new(&config.files)?.discover(project)?;
    let root = if project.is_file() {
        project.parent().unwrap_or(project)
    } else {
        project
    };

    let report = orchestrator.run(root, &files, &predictions)?;

    print!("{}", formatter(format, no_color).format(&report));

    let output = common
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(config));
    save(&output, &JsonFormatter::new().pretty().format(&report))?;

    Ok(report.exit_code())
}

fn handle_check(
    config: &Config,
    file: &Path,
    common: &CommonArgs,
    format: Format,
    no_color: bool,
) -> Result<i32> {
    if !file.is_file() {
        anyhow::bail!("Source file not found: {}", file.display());
    }

    let predictions = Predictions::load(&common.identifiers)?;
    let orchestrator = build_orchestrator(config)?;

    let root = file.parent().unwrap_or(Path::new("."));
    let identifiers = predictions.for_file(file, root);
    let report = orchestrator
        .check_file(file, identifiers)
        .with_context(|| format!("AST extraction failed for {}", file.display()))?;

    print!("{}", formatter(format, no_color).format_file(&report));

    if let Some(output) = &common.output {
        save(output, &JsonFormatter::new().pretty().format_file(&report))?;
    }

    Ok(0)
}

fn handle_rules(config: &Config, show: Option<&str>) -> Result<i32> {
    let rules = RuleSet::load(&config.paths.rules)
        .with_context(|| format!("Failed to load rules from {}", config.paths.rules.display()))?;

    if let Some(id) = show {
        let Some(rule) = rules.get(id) else {
            eprintln!("{}: Rule '{}' not found", "error".red().bold(), id);
            return Ok(1);
        };

        println!("{}", rule.id.cyan().bold());
        if !rule.description.is_empty() {
            println!("  {}", rule.description);
        }
        println!("  Binds: {}", rule.binding_variable);
        if !rule.kinds.is_empty() {
            let kinds: Vec<&str> = rule.kinds.iter().map(|k| k.as_str()).collect();
            println!("  Kinds: {}", kinds.join(", "));
        }
        if rule.conditions.is_empty() {
            println!("  Matches every candidate");
        } else {
            println!("  Where:");
            for condition in &rule.conditions {
                println!("    {}", condition);
            }
        }
        return Ok(0);
    }

    println!("{} rules in {}\n", rules.len(), config.paths.rules.display());
    for rule in &rules {
        println!(
            "  {:<36} {} condition(s)  {}",
            rule.id.cyan(),
            rule.conditions.len(),
            rule.description.dimmed()
        );
    }
    Ok(0)
}
