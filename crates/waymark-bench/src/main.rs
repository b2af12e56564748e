//! waymark-bench: CLI tool for route experimentation and diagnostics.
//!
//! Loads a map snapshot, plans a route between two points with
//! configurable parameters, and prints per-stage diagnostics. Useful for:
//!
//! - Checking that a new snapshot routes cleanly before publishing it
//! - Comparing stair selection policies on multi-floor maps
//! - Measuring search time on large waypoint graphs
//! - Rendering the route as an SVG overlay for visual review
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin waymark-bench -- [OPTIONS] <SNAPSHOT_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use waymark_routing::{
    Clock, FloorId, Point, RouteDiagnostics, RoutePoint, RouteRequest, RoutingConfig, Snapshot,
    StairSelection, Viewport, route_with_diagnostics,
};

/// Route experimentation and diagnostics for waymark.
///
/// Plans a route on a map snapshot and prints per-stage timing and
/// count diagnostics.
#[derive(Parser)]
#[command(name = "waymark-bench", version)]
struct Cli {
    /// Path to the map snapshot (JSON).
    snapshot_path: PathBuf,

    /// Start at this local instead of explicit coordinates.
    #[arg(long, conflicts_with_all = ["from_floor", "from_x", "from_y"])]
    from_local: Option<String>,

    /// Start floor id. Defaults to the snapshot's first floor.
    #[arg(long)]
    from_floor: Option<String>,

    /// Start x in percent of map width.
    #[arg(long, default_value_t = 50.0)]
    from_x: f64,

    /// Start y in percent of map height.
    #[arg(long, default_value_t = 50.0)]
    from_y: f64,

    /// Destination local id.
    #[arg(long, conflicts_with_all = ["to_floor", "to_x", "to_y"])]
    to_local: Option<String>,

    /// Destination floor id. Defaults to the start floor.
    #[arg(long)]
    to_floor: Option<String>,

    /// Destination x in percent of map width.
    #[arg(long)]
    to_x: Option<f64>,

    /// Destination y in percent of map height.
    #[arg(long)]
    to_y: Option<f64>,

    /// Rendered map width in pixels.
    #[arg(long, default_value_t = 1200.0)]
    width: f64,

    /// Rendered map height in pixels.
    #[arg(long, default_value_t = 900.0)]
    height: f64,

    /// Waypoints connected to each synthetic start/end node.
    #[arg(long, default_value_t = RoutingConfig::DEFAULT_K_NEAREST)]
    k_nearest: usize,

    /// Minimum drawable segment length in pixels.
    #[arg(long, default_value_t = RoutingConfig::DEFAULT_MIN_SEGMENT_LENGTH)]
    min_segment_length: f64,

    /// Stair pair selection policy.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_STAIRS)]
    stair_selection: Stairs,

    /// Fail unreachable routes instead of drawing a straight line.
    #[arg(long)]
    no_fallback: bool,

    /// Full routing config as JSON (overrides individual flags).
    #[arg(long)]
    config_json: Option<String>,

    /// Number of runs (for timing stability).
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable table.
    #[arg(long)]
    json: bool,

    /// Write the route overlay to this SVG file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Print debug logs from the routing core to stderr.
    #[arg(short, long)]
    verbose: bool,
}

/// Stair selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stairs {
    /// First valid stair pair in snapshot order.
    FirstDiscovered,
    /// Stair pair with the shortest straight-line detour.
    Nearest,
}

const fn stairs_from_config(selection: StairSelection) -> Stairs {
    match selection {
        StairSelection::FirstDiscovered => Stairs::FirstDiscovered,
        StairSelection::Nearest => Stairs::Nearest,
    }
}

impl From<Stairs> for StairSelection {
    fn from(stairs: Stairs) -> Self {
        match stairs {
            Stairs::FirstDiscovered => Self::FirstDiscovered,
            Stairs::Nearest => Self::Nearest,
        }
    }
}

/// The CLI default policy, derived from
/// [`RoutingConfig::DEFAULT_STAIR_SELECTION`] so the two cannot diverge.
const CLI_DEFAULT_STAIRS: Stairs = stairs_from_config(RoutingConfig::DEFAULT_STAIR_SELECTION);

/// Build a [`RoutingConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<RoutingConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(RoutingConfig {
        k_nearest: cli.k_nearest,
        min_segment_length: cli.min_segment_length,
        stair_selection: cli.stair_selection.into(),
        straight_line_fallback: !cli.no_fallback,
    })
}

/// Resolve the start and end points of the request.
fn request_from_cli(cli: &Cli, snapshot: &Snapshot) -> Result<RouteRequest, String> {
    let start = if let Some(ref id) = cli.from_local {
        snapshot
            .local(id)
            .ok_or_else(|| format!("Unknown start local: {id}"))?
            .route_point()
    } else {
        let floor = match cli.from_floor {
            Some(ref floor) => FloorId::from(floor.as_str()),
            None => snapshot
                .default_floor()
                .map(|f| f.id.clone())
                .ok_or("Snapshot has no floors; pass --from-floor")?,
        };
        RoutePoint::new(Point::new(cli.from_x, cli.from_y), floor)
    };

    let end = if let Some(ref id) = cli.to_local {
        snapshot
            .local(id)
            .ok_or_else(|| format!("Unknown destination local: {id}"))?
            .route_point()
    } else {
        let (Some(x), Some(y)) = (cli.to_x, cli.to_y) else {
            return Err("Pass --to-local or both --to-x and --to-y".to_string());
        };
        let floor = cli
            .to_floor
            .as_deref()
            .map_or_else(|| start.floor.clone(), FloorId::from);
        RoutePoint::new(Point::new(x, y), floor)
    };

    Ok(RouteRequest::new(
        start,
        end,
        Some(Viewport::new(cli.width, cli.height)),
    ))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let json = match std::fs::read_to_string(&cli.snapshot_path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.snapshot_path.display());
            return ExitCode::FAILURE;
        }
    };

    let snapshot = match Snapshot::from_json(&json) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Error loading snapshot: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Snapshot: {} ({} floors, {} waypoints, {} locals)",
        cli.snapshot_path.display(),
        snapshot.floors().len(),
        snapshot.graph().len(),
        snapshot.locals().len(),
    );
    for issue in snapshot.issues() {
        eprintln!("  skipped: {issue}");
    }

    let request = match request_from_cli(&cli, &snapshot) {
        Ok(request) => request,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Route: ({}, {}) on {} -> ({}, {}) on {}",
        request.start.point.x,
        request.start.point.y,
        request.start.floor,
        request.end.point.x,
        request.end.point.y,
        request.end.floor,
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (outcome, diagnostics) =
            route_with_diagnostics(&snapshot, &request, &config, &StdClock);

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
            if let Some(message) = outcome.message() {
                println!("Message: {message}");
            }
        }

        // Write SVG on the first run only.
        if run == 0
            && let Some(ref svg_path) = cli.svg
        {
            let title = cli
                .to_local
                .as_deref()
                .and_then(|id| snapshot.local(id))
                .map_or("route", |local| local.name.as_str());
            let desc = format!("{config:#?}");
            let metadata = waymark_export::SvgMetadata {
                title: Some(title),
                description: Some(&desc),
            };
            let svg = waymark_export::to_svg(
                &outcome.path,
                &outcome.debug_waypoints,
                Viewport::new(cli.width, cli.height),
                &metadata,
                None,
            );
            match std::fs::write(svg_path, &svg) {
                Ok(()) => {
                    eprintln!(
                        "SVG written to {} ({} bytes)",
                        svg_path.display(),
                        svg.len(),
                    );
                }
                Err(e) => {
                    eprintln!("Error writing SVG to {}: {e}", svg_path.display());
                }
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Native clock backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RouteDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stages: &[(&str, fn(&RouteDiagnostics) -> Duration)] = &[
        ("Path Solve", |d| d.solve_duration),
        ("Segment Build", |d| d.segment_duration),
    ];

    for (name, extractor) in stages {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stair_policy_mappings_agree() {
        for stairs in Stairs::value_variants() {
            assert_eq!(stairs_from_config(StairSelection::from(*stairs)), *stairs);
        }
        assert_eq!(
            StairSelection::from(CLI_DEFAULT_STAIRS),
            RoutingConfig::DEFAULT_STAIR_SELECTION
        );
    }

    #[test]
    fn flags_build_the_routing_config() {
        let cli = Cli::try_parse_from([
            "waymark-bench",
            "campus.json",
            "--to-local",
            "5",
            "--stair-selection",
            "nearest",
            "--k-nearest",
            "5",
            "--no-fallback",
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.stair_selection, StairSelection::Nearest);
        assert_eq!(config.k_nearest, 5);
        assert!(!config.straight_line_fallback);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::try_parse_from([
            "waymark-bench",
            "campus.json",
            "--k-nearest",
            "5",
            "--config-json",
            r#"{"stair_selection": "Nearest"}"#,
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.k_nearest, RoutingConfig::DEFAULT_K_NEAREST);
        assert_eq!(config.stair_selection, StairSelection::Nearest);
    }
}
