//! # Two Pendulums
//!
//! Two pendulums hinged on ground, free, spring-coupled or held apart by
//! a rod, drawn while they swing.
//!
//! ## Usage
//!
//! ```bash
//! two_pendulums --coupling rod --final-time 10
//! two_pendulums --coupling spring --headless
//! RUST_LOG=debug two_pendulums --config viewer.toml
//! ```

use armillary::{decorate, run, Coupling, DriverError, DriverResult, Integrator, RunSummary, TwoPendulums};
use armillary_rendering::{FrameSynchronizer, HeadlessScene, MultibodySystem, SceneBackend, Stage, ViewerConfig};
use armillary_shared::Real;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_FINAL_TIME: Real = 10.0;

/// Parsed command line.
struct Options {
    coupling: Coupling,
    headless: bool,
    config_path: Option<String>,
    final_time: Real,
}

fn parse_args(args: &[String]) -> DriverResult<Option<Options>> {
    let mut options = Options {
        coupling: Coupling::ROD,
        headless: !cfg!(feature = "window"),
        config_path: None,
        final_time: DEFAULT_FINAL_TIME,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--coupling" | "-c" => {
                let value = value_after(args, i)?;
                options.coupling = value.parse()?;
                i += 1;
            }
            "--headless" => options.headless = true,
            "--config" => {
                options.config_path = Some(value_after(args, i)?.to_string());
                i += 1;
            }
            "--final-time" | "-t" => {
                let value = value_after(args, i)?;
                options.final_time = value
                    .parse()
                    .ok()
                    .filter(|t: &Real| t.is_finite() && *t >= 0.0)
                    .ok_or_else(|| DriverError::InvalidArgument(format!("bad final time '{value}'")))?;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: two_pendulums [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --coupling <none|spring|rod>  How the pendulums are tied (default: rod)");
                println!("      --headless                    Draw into memory instead of a window");
                println!("      --config <PATH>               Viewer configuration (TOML)");
                println!("  -t, --final-time <SECS>           Simulated time to run (default: 10)");
                println!("  -h, --help                        Show this help");
                return Ok(None);
            }
            other => return Err(DriverError::InvalidArgument(format!("unknown option '{other}'"))),
        }
        i += 1;
    }
    Ok(Some(options))
}

fn value_after(args: &[String], i: usize) -> DriverResult<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| DriverError::InvalidArgument(format!("{} needs a value", args[i])))
}

/// Shows the default, unassembled and assembled configurations, then runs.
fn simulate<B: SceneBackend>(
    system: &TwoPendulums,
    backend: B,
    config: &ViewerConfig,
    final_time: Real,
) -> DriverResult<RunSummary> {
    let mut viz = FrameSynchronizer::new(system, backend, config.synchronizer.clone())?;
    decorate(&mut viz, system);

    let mut state = system.default_state();
    system.realize(&mut state, Stage::Position);
    viz.report(&mut state);
    info!("Default configuration shown");

    let mut state = system.initial_state();
    system.realize(&mut state, Stage::Velocity);
    viz.report(&mut state);
    info!(
        q = ?state.q(),
        constraint_error = system.constraint_error(&state),
        "Unassembled configuration shown"
    );

    let mut integrator = Integrator::new(system, state);
    integrator.set_final_time(final_time);
    integrator.initialize()?;
    viz.report(integrator.state_mut());
    info!(
        q = ?integrator.state().q(),
        constraint_error = system.constraint_error(integrator.state()),
        "Assembled configuration shown"
    );

    let summary = run(&mut viz, &mut integrator, system);
    viz.shutdown();
    Ok(summary)
}

fn launch(options: &Options) -> DriverResult<RunSummary> {
    let config = match &options.config_path {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let system = TwoPendulums::new(options.coupling);
    info!(coupling = ?options.coupling, headless = options.headless, final_time = options.final_time, "Starting");

    #[cfg(feature = "window")]
    if !options.headless {
        let backend = armillary_rendering::WindowScene::new(&config.window)?;
        return simulate(&system, backend, &config, options.final_time);
    }

    simulate(&system, HeadlessScene::default(), &config, options.final_time)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let result = parse_args(&args).and_then(|options| match options {
        Some(options) => launch(&options).map(Some),
        None => Ok(None),
    });

    match result {
        Ok(Some(summary)) => {
            info!(
                reports = summary.reports,
                steps = summary.steps,
                final_time = summary.final_time,
                energy_drift = summary.final_energy - summary.initial_energy,
                window_closed = summary.window_closed,
                "Done"
            );
        }
        Ok(None) => {}
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}
