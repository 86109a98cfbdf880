//! End-to-end steps shared by the binary: load then render, run then render.

use std::path::Path;

use tracing::info;

use crate::core::stats::{InvalidSamplePolicy, StatsReader};
use crate::core::trajectory::{RenderReport, RenderSettings, TrajectoryRenderer};
use crate::error::Result;
use crate::solver::{PostProcess, SolverCommand};

/// Loads `stats_path` and renders it into `out_dir`.
///
/// A load failure returns before the renderer runs, so no frame is ever
/// produced from a partial series and `out_dir` is left untouched.
pub fn render_stats_file(
    stats_path: &Path,
    policy: InvalidSamplePolicy,
    settings: RenderSettings,
    out_dir: &Path,
) -> Result<RenderReport> {
    let loaded = StatsReader::new(policy).read_path(stats_path)?;
    if !loaded.skipped.is_empty() {
        info!(
            skipped = loaded.skipped.len(),
            "invalid samples left out of the trajectory"
        );
    }
    let report = TrajectoryRenderer::new(settings).render(&loaded.series, out_dir)?;
    Ok(report)
}

/// Runs the solver, its optional post-processing step, and returns the path
/// of the 2D statistics file it is expected to have written.
pub fn run_solver(
    command: &SolverCommand,
    post: Option<&PostProcess>,
    stats_file: &Path,
) -> Result<std::path::PathBuf> {
    command.run()?;
    if let Some(step) = post {
        step.run(command.working_dir.as_deref())?;
    }
    let stats_path = match &command.working_dir {
        Some(dir) if stats_file.is_relative() => dir.join(stats_file),
        _ => stats_file.to_path_buf(),
    };
    Ok(stats_path)
}
