use thiserror::Error;

use crate::core::stats::StatsError;
use crate::core::trajectory::RenderError;
use crate::solver::SolverError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("{failed} of {total} frames could not be rendered")]
    IncompleteRender { failed: usize, total: usize },

    #[error("{failed} of {total} solver runs failed")]
    IncompleteSweep { failed: usize, total: usize },
}
