//! Command-line contract of the external FGM solver.
//!
//! Flags are emitted in a fixed order: valued flags first, then the
//! boolean toggles that are switched on.

use serde::{Deserialize, Serialize};

use crate::solver::simulation::SimulationParams;

pub const DEFAULT_NB_DIMENSIONS: u64 = 10;

/// Which external binary a command drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverBinary {
    /// Numerical solver of the distribution dynamics (`run_solver`).
    #[default]
    Solver,
    /// Individual-based simulation (`SigmaFGM_simulation`).
    Simulation,
}

impl SolverBinary {
    pub fn default_program(self) -> &'static str {
        match self {
            SolverBinary::Solver => "../build/bin/run_solver",
            SolverBinary::Simulation => "../build/bin/SigmaFGM_simulation",
        }
    }
}

/// Arguments for one of the two binaries.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Solver(SolverParams),
    Simulation(SimulationParams),
}

impl Invocation {
    pub fn binary(&self) -> SolverBinary {
        match self {
            Invocation::Solver(_) => SolverBinary::Solver,
            Invocation::Simulation(_) => SolverBinary::Simulation,
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            Invocation::Solver(params) => params.to_args(),
            Invocation::Simulation(params) => params.to_args(),
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            Invocation::Solver(params) => params.seed,
            Invocation::Simulation(params) => params.seed,
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        match self {
            Invocation::Solver(params) => params.seed = seed,
            Invocation::Simulation(params) => params.seed = seed,
        }
    }

    /// Asks the binary for the 2D statistics file the renderer reads.
    /// The simulation has no such switch and is left as is.
    pub fn request_2d_statistics(&mut self) {
        if let Invocation::Solver(params) = self {
            params.statistics_2d = true;
        }
    }
}

impl From<SolverParams> for Invocation {
    fn from(params: SolverParams) -> Self {
        Invocation::Solver(params)
    }
}

impl From<SimulationParams> for Invocation {
    fn from(params: SimulationParams) -> Self {
        Invocation::Simulation(params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// `-stabt`: stabilizing time before the main run.
    pub stabilizing_time: u64,
    /// `-t`: simulation time budget.
    pub simulation_time: u64,
    pub shutoff_fitness: f64,
    pub shutoff_time: u64,
    pub seed: u64,
    pub nb_dimensions: u64,
    /// Passed through untouched; the solver owns the list of shapes.
    pub fitness_shape: String,
    pub fitness_parameter: f64,
    pub nb_particles: u64,
    pub initial_mu: f64,
    pub initial_sigma: f64,
    pub initial_theta: f64,
    pub d_mu: f64,
    pub d_sigma: f64,
    pub d_theta: f64,
    pub statistics: bool,
    pub statistics_2d: bool,
    pub one_axis: bool,
    pub no_noise: bool,
    pub isotropic_noise: bool,
    pub no_rotation: bool,
    pub qagi: bool,
}

impl SolverParams {
    /// Reference parameter set, with the initial distance and drift
    /// magnitudes scaled by `1/sqrt(nb_dimensions)`.
    pub fn scaled_for(nb_dimensions: u64) -> Self {
        let scale = (nb_dimensions.max(1) as f64).sqrt();
        Self {
            stabilizing_time: 0,
            simulation_time: 0,
            shutoff_fitness: 0.9,
            shutoff_time: 20_000,
            seed: 87_693,
            nb_dimensions,
            fitness_shape: "exponential".to_string(),
            fitness_parameter: 2.0,
            nb_particles: 10_000,
            initial_mu: 4.0 / scale,
            initial_sigma: 1e-15,
            initial_theta: 0.0,
            d_mu: 0.01 / scale,
            d_sigma: 0.1 / scale,
            d_theta: 0.1 / scale,
            statistics: true,
            statistics_2d: false,
            one_axis: false,
            no_noise: false,
            isotropic_noise: false,
            no_rotation: false,
            qagi: false,
        }
    }

    fn valued_flags(&self) -> [(&'static str, String); 15] {
        [
            ("-stabt", self.stabilizing_time.to_string()),
            ("-t", self.simulation_time.to_string()),
            ("-shutofffitness", format_real(self.shutoff_fitness)),
            ("-shutofftime", self.shutoff_time.to_string()),
            ("-seed", self.seed.to_string()),
            ("-nbdim", self.nb_dimensions.to_string()),
            ("-fitnessshape", self.fitness_shape.clone()),
            ("-fitnessparameter", format_real(self.fitness_parameter)),
            ("-nbparticles", self.nb_particles.to_string()),
            ("-initmu", format_real(self.initial_mu)),
            ("-initsigma", format_real(self.initial_sigma)),
            ("-inittheta", format_real(self.initial_theta)),
            ("-dmu", format_real(self.d_mu)),
            ("-dsigma", format_real(self.d_sigma)),
            ("-dtheta", format_real(self.d_theta)),
        ]
    }

    fn toggles(&self) -> [(&'static str, bool); 7] {
        [
            ("-statistics", self.statistics),
            ("-2Dstatistics", self.statistics_2d),
            ("-oneaxis", self.one_axis),
            ("-nonoise", self.no_noise),
            ("-isotropicnoise", self.isotropic_noise),
            ("-norotation", self.no_rotation),
            ("-qagi", self.qagi),
        ]
    }

    /// Argument tokens, one per element; never joined into a shell string.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(2 * 15 + 7);
        for (flag, value) in self.valued_flags() {
            args.push(flag.to_string());
            args.push(value);
        }
        args.extend(
            self.toggles()
                .into_iter()
                .filter(|(_, on)| *on)
                .map(|(flag, _)| flag.to_string()),
        );
        args
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self::scaled_for(DEFAULT_NB_DIMENSIONS)
    }
}

/// Shortest round-trip text, switching to exponent form for tiny or huge
/// magnitudes (`1e-15`, not `0.000000000000001`).
pub(crate) fn format_real(x: f64) -> String {
    format!("{x:?}")
}
