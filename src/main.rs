// Entry point: dispatches render / run / sweep against the loaded config.
mod cli;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Args, Command, RenderArgs, RunArgs, SweepArgs};
use sigmafgm::config::AppConfig;
use sigmafgm::core::stats::InvalidSamplePolicy;
use sigmafgm::core::trajectory::AnimationSettings;
use sigmafgm::pipeline::{render_stats_file, run_solver};
use sigmafgm::solver::{SolverCommand, SweepPlan, run_sweep};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = AppConfig::load_or_default(&args.config);

    let result = match &args.command {
        Command::Render(render) => render_cmd(&config, render, None),
        Command::Run(run) => run_cmd(&config, run),
        Command::Sweep(sweep) => sweep_cmd(&config, sweep),
    };
    if let Err(err) = result {
        error!("{err}");
        eprintln!("sigmafgm failed: {err}");
        std::process::exit(1);
    }
}

fn render_cmd(
    config: &AppConfig,
    args: &RenderArgs,
    stats_override: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let stats_path = args
        .stats
        .clone()
        .or(stats_override)
        .unwrap_or_else(|| PathBuf::from(&config.stats.path));
    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.render.out_dir));
    let policy = if args.skip_invalid {
        InvalidSamplePolicy::Skip
    } else {
        config.stats.invalid_samples
    };

    let mut settings = config.render.settings();
    if let Some(stride) = args.stride {
        settings.stride = stride;
    }
    if let Some(gif) = &args.gif {
        settings.animation = Some(AnimationSettings {
            path: gif.clone(),
            frame_delay_ms: config.render.gif_frame_delay_ms,
        });
    }
    if args.plain {
        settings.annotate = false;
    }

    let report = render_stats_file(&stats_path, policy, settings, &out_dir)?;
    for failure in report.failures.iter().chain(&report.animation_failures) {
        error!(index = failure.index, "frame failed: {}", failure.error);
    }
    if let Some(gif) = &report.animation {
        info!(path = %gif.display(), "animation written");
    }
    println!(
        "Saved {} frames to {}",
        report.frames.len(),
        out_dir.display()
    );
    if !report.failures.is_empty() {
        return Err(Box::new(sigmafgm::Error::IncompleteRender {
            failed: report.failures.len(),
            total: report.frames.len() + report.failures.len(),
        }));
    }
    Ok(())
}

/// The configured command with the CLI overrides of `run` applied.
fn run_command(config: &AppConfig, args: &RunArgs) -> SolverCommand {
    let mut command = config.solver.command();
    if let Some(seed) = args.seed {
        command.params.set_seed(seed);
    }
    if args.render {
        command.params.request_2d_statistics();
    }
    command
}

fn run_cmd(config: &AppConfig, args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let command = run_command(config, args);
    let post = if args.no_post {
        None
    } else {
        config.post_process.step()
    };

    let stats_path = run_solver(&command, post.as_ref(), Path::new(&config.stats.path))?;
    info!(stats = %stats_path.display(), "solver finished");

    if args.render {
        render_cmd(config, &args.render_args, Some(stats_path))?;
    }
    Ok(())
}

fn sweep_cmd(config: &AppConfig, args: &SweepArgs) -> Result<(), Box<dyn Error>> {
    let base = config.solver.command();
    let post = if args.no_post {
        None
    } else {
        config.post_process.step()
    };
    let plan = SweepPlan {
        repetitions: args.repetitions,
        seed: args.seed,
        root: args.root.clone(),
    };

    let report = run_sweep(&base, &plan, post.as_ref());
    let failed = report.failed().count();
    println!(
        "Sweep finished: {} runs, {} failed (master seed {})",
        report.runs.len(),
        failed,
        report.master_seed
    );
    if failed > 0 {
        return Err(Box::new(sigmafgm::Error::IncompleteSweep {
            failed,
            total: report.runs.len(),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigmafgm::solver::{Invocation, SolverBinary};

    fn run_args(argv: &[&str]) -> RunArgs {
        match Args::parse_from(argv).command {
            Command::Run(run) => run,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn render_after_run_asks_for_2d_statistics() {
        let config = AppConfig::default();

        let plain = run_command(&config, &run_args(&["sigmafgm", "run"]));
        assert!(!plain.args().iter().any(|a| a == "-2Dstatistics"));

        let rendered = run_command(
            &config,
            &run_args(&["sigmafgm", "run", "--render", "--seed", "9"]),
        );
        assert!(rendered.args().iter().any(|a| a == "-2Dstatistics"));
        assert_eq!(rendered.params.seed(), 9);
        match rendered.params {
            Invocation::Solver(params) => assert!(params.statistics_2d),
            other => panic!("unexpected invocation: {other:?}"),
        }
    }

    #[test]
    fn seed_override_reaches_the_simulation() {
        let mut config = AppConfig::default();
        config.solver.binary = SolverBinary::Simulation;
        let command = run_command(&config, &run_args(&["sigmafgm", "run", "--seed", "31"]));
        assert_eq!(command.program, PathBuf::from("../build/bin/SigmaFGM_simulation"));
        assert_eq!(&command.args()[..2], &["-seed", "31"]);
    }
}
