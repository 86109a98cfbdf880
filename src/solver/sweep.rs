//! Repeated solver runs with independent seeds, one directory per run.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use crate::solver::process::{PostProcess, SolverCommand, SolverError};

/// Range the per-run seeds are drawn from.
pub const SEED_RANGE: std::ops::RangeInclusive<u64> = 1..=100_000_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    pub repetitions: u32,
    /// Master seed for the per-run seed stream; drawn from entropy when unset.
    pub seed: Option<u64>,
    pub root: PathBuf,
}

#[derive(Debug)]
pub struct SweepRun {
    pub repetition: u32,
    pub seed: u64,
    pub dir: PathBuf,
    pub result: Result<ExitStatus, SolverError>,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub master_seed: u64,
    pub runs: Vec<SweepRun>,
}

impl SweepReport {
    pub fn failed(&self) -> impl Iterator<Item = &SweepRun> {
        self.runs.iter().filter(|r| r.result.is_err())
    }
}

pub fn derive_seeds(master: u64, count: u32) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master);
    (0..count).map(|_| rng.random_range(SEED_RANGE)).collect()
}

pub fn run_dir(root: &Path, repetition: u32) -> PathBuf {
    root.join(format!("run_{repetition:03}"))
}

/// Runs every repetition in order; a failing run is recorded and the sweep
/// moves on.
pub fn run_sweep(base: &SolverCommand, plan: &SweepPlan, post: Option<&PostProcess>) -> SweepReport {
    let master_seed = plan.seed.unwrap_or_else(|| rand::rng().random_range(SEED_RANGE));
    info!(
        repetitions = plan.repetitions,
        master_seed,
        root = %plan.root.display(),
        "starting sweep"
    );

    let mut report = SweepReport {
        master_seed,
        runs: Vec::with_capacity(plan.repetitions as usize),
    };
    for (repetition, seed) in (0..plan.repetitions).zip(derive_seeds(master_seed, plan.repetitions)) {
        let dir = run_dir(&plan.root, repetition);
        let result = run_one(base, seed, &dir, post);
        if let Err(err) = &result {
            warn!(repetition, seed, %err, "sweep run failed");
        }
        report.runs.push(SweepRun {
            repetition,
            seed,
            dir,
            result,
        });
    }
    report
}

fn run_one(
    base: &SolverCommand,
    seed: u64,
    dir: &Path,
    post: Option<&PostProcess>,
) -> Result<ExitStatus, SolverError> {
    fs::create_dir_all(dir).map_err(|source| SolverError::RunDir {
        path: dir.display().to_string(),
        source,
    })?;
    let mut command = base.clone().with_working_dir(dir);
    command.params.set_seed(seed);
    let status = command.run()?;
    if let Some(step) = post {
        step.run(Some(dir))?;
    }
    Ok(status)
}
