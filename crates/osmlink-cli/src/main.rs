//! CLI binary for osmlink: resolve, validate and simplify element streams.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use osmlink_cli::input::open_source;
use osmlink_cli::progress::{self, ProgressSource};
use osmlink_cli::view::{ResolutionView, SimplifyView, ValidationView};
use osmlink_core::config::{OsmlinkConfig, OutputOrder, Strategy};
use osmlink_core::element::{ElementId, ElementType};
use osmlink_core::simplify::{CurveSimplifier, DouglasPeucker};
use osmlink_resolve::{Resolution, Resolver, integrity};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "osmlink", about = "Resolve flat element streams into linked networks")]
struct Cli {
    /// Project root directory holding .osmlink/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an input file and print a summary
    Resolve {
        /// Input file (.json document or .jsonl stream)
        input: PathBuf,

        /// Read strategy: restream, buffer (overrides config)
        #[arg(short, long)]
        strategy: Option<Strategy>,

        /// Output order: grouped, stream (overrides config)
        #[arg(short, long)]
        order: Option<OutputOrder>,

        /// Print the resolved graph as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve an input file and check the integrity of the result
    Validate {
        /// Input file (.json document or .jsonl stream)
        input: PathBuf,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Simplify the path of one resolved polyline
    Simplify {
        /// Input file (.json document or .jsonl stream)
        input: PathBuf,

        /// Polyline identifier
        #[arg(long)]
        polyline: ElementId,

        /// Maximum deviation in degrees (overrides config)
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;
    let config = OsmlinkConfig::load(&project_root)
        .with_context(|| format!("failed to load config from {}", project_root.display()))?;

    match cli.command {
        Commands::Resolve {
            input,
            strategy,
            order,
            json,
        } => cmd_resolve(config, &input, strategy, order, json),
        Commands::Validate { input, json } => cmd_validate(config, &input, json),
        Commands::Simplify {
            input,
            polyline,
            tolerance,
            json,
        } => cmd_simplify(config, &input, polyline, tolerance, json),
    }
}

/// Open `input` and resolve it with a spinner on stderr.
fn resolve_input(config: &OsmlinkConfig, input: &Path) -> Result<Resolution> {
    let mut source = open_source(input)?;
    let mut source = ProgressSource::new(source.as_mut(), progress::spinner());
    let resolved = Resolver::new(config.resolve.clone()).resolve(&mut source);
    source.finish();
    resolved.with_context(|| format!("failed to resolve {}", input.display()))
}

fn cmd_resolve(
    mut config: OsmlinkConfig,
    input: &Path,
    strategy: Option<Strategy>,
    order: Option<OutputOrder>,
    json: bool,
) -> Result<()> {
    if let Some(strategy) = strategy {
        config.resolve.strategy = strategy;
    }
    if let Some(order) = order {
        config.resolve.order = order;
    }

    let resolution = resolve_input(&config, input)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ResolutionView::from(&resolution))?
        );
        return Ok(());
    }

    let report = &resolution.report;
    println!("{}", report.summary());
    println!("  Points: {}", report.points);
    println!("  Polylines: {}", report.polylines);
    println!("  Composites: {}", report.composites);
    println!("  Unresolved identifiers: {}", report.unresolved.len());
    if !report.excluded.is_empty() {
        println!("\nExcluded:");
        for exclusion in &report.excluded {
            println!(
                "  {} {}: {}",
                exclusion.element_type, exclusion.id, exclusion.reason
            );
        }
    }
    Ok(())
}

fn cmd_validate(config: OsmlinkConfig, input: &Path, json: bool) -> Result<()> {
    let resolution = resolve_input(&config, input)?;
    let integrity = integrity::check(&resolution.elements);

    if json {
        let view = ValidationView {
            resolution: &resolution.report,
            integrity: &integrity,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        for violation in &integrity.violations {
            println!("WARN: {}", serde_json::to_string(violation)?);
        }
    }

    if !integrity.is_ok() {
        anyhow::bail!(
            "found {} integrity issue(s) in {}",
            integrity.violations.len(),
            input.display()
        );
    }

    eprintln!("Graph is valid. No integrity issues found.");
    eprintln!(
        "  {} elements, {} references, {} excluded",
        integrity.elements_checked,
        integrity.references_checked,
        resolution.report.excluded.len()
    );
    Ok(())
}

fn cmd_simplify(
    mut config: OsmlinkConfig,
    input: &Path,
    polyline: ElementId,
    tolerance: Option<f64>,
    json: bool,
) -> Result<()> {
    if let Some(tolerance) = tolerance {
        config.simplify.tolerance = tolerance;
        config.validate()?;
    }
    let tolerance = config.simplify.tolerance;

    let resolution = resolve_input(&config, input)?;
    let Some(line) = resolution
        .find(ElementType::Polyline, polyline)
        .and_then(|e| e.as_polyline())
    else {
        if resolution.report.is_excluded(ElementType::Polyline, polyline) {
            anyhow::bail!("polyline {} could not be resolved", polyline);
        }
        anyhow::bail!("polyline {} not found in {}", polyline, input.display());
    };

    let original = line.coordinates();
    let coordinates = DouglasPeucker.simplify(&original, tolerance)?;

    if json {
        let view = SimplifyView {
            polyline,
            tolerance,
            original: original.len(),
            coordinates,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    eprintln!(
        "Polyline {}: {} -> {} coordinates (tolerance {})",
        polyline,
        original.len(),
        coordinates.len(),
        tolerance
    );
    for c in &coordinates {
        println!("{} {}", c.lat, c.lon);
    }
    Ok(())
}
