//! Command-line contract of the individual-based SigmaFGM simulation.
//!
//! Every flag takes a value, so the token list has a fixed length and order.

use serde::{Deserialize, Serialize};

use crate::solver::params::format_real;

/// Noise model the simulation applies to phenotypes.
pub const DEFAULT_NOISE: &str = "ISOTROPIC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    pub seed: u64,
    /// `-g`: number of generations.
    pub generations: u64,
    /// `-shutoffd`: stop once the mean is this close to the optimum.
    pub shutoff_distance: f64,
    /// `-shutoffg`: earliest generation the distance shutoff may trigger.
    pub shutoff_generation: u64,
    pub nb_dimensions: u64,
    /// Fitness function parameters `-alpha`, `-beta`, `-Q`.
    pub alpha: f64,
    pub beta: f64,
    pub q: f64,
    pub population_size: u64,
    pub initial_mu: f64,
    pub initial_sigma: f64,
    pub initial_theta: f64,
    /// Mutation rates of the three genotype parts.
    pub m_mu: f64,
    pub m_sigma: f64,
    pub m_theta: f64,
    /// Mutation sizes of the three genotype parts.
    pub s_mu: f64,
    pub s_sigma: f64,
    pub s_theta: f64,
    /// Forwarded verbatim, like the solver's fitness shape.
    pub noise: String,
}

impl Default for SimulationParams {
    /// One-dimensional run, 1000 individuals starting 2 units from the optimum.
    fn default() -> Self {
        Self {
            seed: 1,
            generations: 100_000,
            shutoff_distance: 0.4,
            shutoff_generation: 100_000,
            nb_dimensions: 1,
            alpha: 3.125,
            beta: 0.1,
            q: 2.0,
            population_size: 1000,
            initial_mu: 2.0,
            initial_sigma: 0.6,
            initial_theta: 0.0,
            m_mu: 1e-4,
            m_sigma: 0.0,
            m_theta: 0.0,
            s_mu: 0.1,
            s_sigma: 0.0,
            s_theta: 0.0,
            noise: DEFAULT_NOISE.to_string(),
        }
    }
}

impl SimulationParams {
    fn flags(&self) -> [(&'static str, String); 19] {
        [
            ("-seed", self.seed.to_string()),
            ("-g", self.generations.to_string()),
            ("-shutoffd", format_real(self.shutoff_distance)),
            ("-shutoffg", self.shutoff_generation.to_string()),
            ("-nbdim", self.nb_dimensions.to_string()),
            ("-alpha", format_real(self.alpha)),
            ("-beta", format_real(self.beta)),
            ("-Q", format_real(self.q)),
            ("-popsize", self.population_size.to_string()),
            ("-initmu", format_real(self.initial_mu)),
            ("-initsigma", format_real(self.initial_sigma)),
            ("-inittheta", format_real(self.initial_theta)),
            ("-mmu", format_real(self.m_mu)),
            ("-msigma", format_real(self.m_sigma)),
            ("-mtheta", format_real(self.m_theta)),
            ("-smu", format_real(self.s_mu)),
            ("-ssigma", format_real(self.s_sigma)),
            ("-stheta", format_real(self.s_theta)),
            ("-noise", self.noise.clone()),
        ]
    }

    pub fn to_args(&self) -> Vec<String> {
        self.flags()
            .into_iter()
            .flat_map(|(flag, value)| [flag.to_string(), value])
            .collect()
    }
}
