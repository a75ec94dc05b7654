#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs an outbreak simulation headlessly.

mod setup;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use outbreak_rendering::{RenderingBackend, Scene, TextBackend};
use outbreak_simulation::{query, Simulation};
use outbreak_system_analytics::{DataCollector, RunReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs an agent-based epidemic simulation on a tile map.
#[derive(Debug, Parser)]
#[command(name = "outbreak", version)]
struct Args {
    /// TOML configuration file; omitted sections keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// ASCII map layout; the built-in demo town is used when omitted.
    #[arg(long)]
    map: Option<PathBuf>,
    /// Overrides the random seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of steps to simulate.
    #[arg(long, default_value_t = 1_000)]
    steps: u64,
    /// Overrides the number of agents from the configuration.
    #[arg(long)]
    agents: Option<u32>,
    /// Prints a text frame every N steps; zero disables frames.
    #[arg(long, default_value_t = 0)]
    render_every: u64,
    /// Writes the JSON run report to this file instead of standard output.
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Entry point for the outbreak command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = run(&args, &mut out)?;

    match &args.report {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create report {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &report)
                .context("failed to write report")?;
            writer.flush().context("failed to write report")?;
            info!(path = %path.display(), "report written");
        }
        None => {
            serde_json::to_writer_pretty(&mut out, &report).context("failed to print report")?;
            writeln!(out).context("failed to print report")?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run<W>(args: &Args, out: &mut W) -> Result<RunReport>
where
    W: Write,
{
    let mut config = setup::load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.schedule.seed = seed;
    }
    if let Some(agents) = args.agents {
        config.population.agent_count = agents;
    }
    let map = setup::load_map(args.map.as_deref())?;

    let mut simulation = Simulation::new(map, config).context("failed to set up simulation")?;
    let mut collector = DataCollector::new();
    let mut backend = TextBackend::new(out);
    let mut events = Vec::new();

    for _ in 0..args.steps {
        events.clear();
        simulation.step(&mut events).context("simulation step failed")?;
        collector.record(&events, &query::agent_view(&simulation));

        let step = query::step(&simulation);
        if args.render_every > 0 && step % args.render_every == 0 {
            let scene = Scene::capture(
                step,
                query::map(&simulation),
                query::field_view(&simulation)?,
                &query::renderables(&simulation),
            )?;
            backend.present(&scene)?;
        }
    }

    let report = collector.report();
    info!(
        steps = report.steps,
        infections = report.cumulative.infections,
        deaths = report.cumulative.deaths,
        peak_infected = report.peak_infected,
        "run finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["outbreak"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = args(&[]);
        assert_eq!(args.steps, 1_000);
        assert_eq!(args.render_every, 0);
        assert!(args.config.is_none());
        assert!(args.report.is_none());
    }

    #[test]
    fn frames_are_rendered_on_cadence() {
        let args = args(&["--steps", "6", "--agents", "5", "--render-every", "3"]);
        let mut out = Vec::new();

        let report = run(&args, &mut out).expect("run succeeds");
        let text = String::from_utf8(out).expect("utf-8 output");

        assert_eq!(report.steps, 6);
        assert_eq!(report.final_tally.total(), 5);
        assert_eq!(text.matches("step ").count(), 2);
        assert!(text.starts_with("step 3  S:5 I:0 R:0 D:0"));
    }

    #[test]
    fn empty_population_runs_without_seeding() {
        let quiet = args(&["--steps", "2", "--agents", "0", "--seed", "7"]);
        let report = run(&quiet, &mut io::sink()).expect("run succeeds");
        assert_eq!(report.final_tally.total(), 0);
        assert!(report.patient_zero.is_none());
    }

    #[test]
    fn seeding_happens_during_a_long_run() {
        let long = args(&["--steps", "120", "--agents", "20", "--seed", "11"]);
        let report = run(&long, &mut io::sink()).expect("run succeeds");
        assert_eq!(report.seeded_at, Some(100));
        assert!(report.cumulative.infections >= 1);
    }

    #[test]
    fn unknown_map_path_is_an_error() {
        let bad = args(&["--map", "no/such/map.txt", "--steps", "1"]);
        assert!(run(&bad, &mut io::sink()).is_err());
    }
}
