pub mod params;
pub mod process;
pub mod simulation;
pub mod sweep;

pub use params::{Invocation, SolverBinary, SolverParams};
pub use process::{PostProcess, SolverCommand, SolverError};
pub use simulation::SimulationParams;
pub use sweep::{SweepPlan, SweepReport, run_sweep};
