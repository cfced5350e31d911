use anyhow::{Context, Result};
use clap::Parser;
use fieldpath_core::{AllianceColor, SolverConfig, TrajectoryResult, TrajectorySolver};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Solve constant-heading trajectories for one or more field configurations
#[derive(Debug, Parser)]
#[command(name = "plan_trajectory", version)]
struct Args {
    /// YAML configuration files, solved concurrently
    #[arg(short, long = "config", required = true, num_args = 1..)]
    configs: Vec<PathBuf>,

    /// Tuning overrides such as `step=0.01` or `max_iterations=200`
    #[arg(long = "set", value_parser = parse_override)]
    overrides: Vec<(String, f64)>,

    /// Print each result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn parse_override(raw: &str) -> std::result::Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {}: {}", key, e))?;
    Ok((key.trim().to_string(), value))
}

#[derive(Serialize)]
struct Report<'a> {
    config: String,
    theta: f64,
    t1: f64,
    t2: f64,
    total_time: f64,
    penalty: f64,
    improved: bool,
    degraded: bool,
    line: &'a fieldpath_core::PathLine,
}

fn line_color(alliance: AllianceColor) -> &'static str {
    match alliance {
        AllianceColor::Blue => "#1f6feb",
        AllianceColor::Red => "#d73a49",
    }
}

fn load_config(path: &Path, overrides: &HashMap<String, f64>) -> Result<SolverConfig> {
    let mut config = SolverConfig::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    config
        .apply_overrides(overrides)
        .with_context(|| format!("invalid override for {}", path.display()))?;
    Ok(config)
}

fn print_result(
    path: &Path,
    config: &SolverConfig,
    result: &TrajectoryResult,
    json: bool,
) -> Result<()> {
    let line = result.export_line(line_color(config.alliance));

    if json {
        let report = Report {
            config: path.display().to_string(),
            theta: result.theta,
            t1: result.t1,
            t2: result.t2,
            total_time: result.total_time(),
            penalty: result.penalty,
            improved: result.improved,
            degraded: result.is_degraded(),
            line: &line,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let [p0, p1, p2, p3] = result.curve.control_points();
    println!("{}", path.display());
    println!(
        "  theta: {:.4} rad ({:.2} deg)",
        result.theta,
        result.theta.to_degrees()
    );
    println!(
        "  curve: ({:.2}, {:.2}) -> ({:.2}, {:.2}) -> ({:.2}, {:.2}) -> ({:.2}, {:.2})",
        p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
    );
    println!(
        "  t1: {:.4}  t2: {:.4}  total: {:.4}",
        result.t1,
        result.t2,
        result.total_time()
    );
    println!("  penalty: {:.6}", result.penalty);
    if result.is_degraded() {
        println!(
            "  warning: {} curve lookups fell back during simulation",
            result.inversion_fallbacks
        );
    }
    if result.off_segment_lookups > 0 {
        println!(
            "  ran past the end point for {} lookups",
            result.off_segment_lookups
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let overrides: HashMap<String, f64> = args.overrides.into_iter().collect();

    // Each solve owns its own solver on the blocking pool
    let mut handles = Vec::with_capacity(args.configs.len());
    for path in args.configs {
        let config = load_config(&path, &overrides)?;
        info!("Loaded configuration from {:?}", path);
        handles.push(tokio::task::spawn_blocking(move || {
            let result = TrajectorySolver::new(config.clone()).and_then(|solver| solver.solve());
            (path, config, result)
        }));
    }

    let mut failures = 0;
    for handle in handles {
        let (path, config, result) = handle.await.context("solver task panicked")?;
        match result {
            Ok(result) => print_result(&path, &config, &result, args.json)?,
            Err(e) => {
                error!("Failed to solve {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} configuration(s) failed to solve", failures);
    }
    Ok(())
}
