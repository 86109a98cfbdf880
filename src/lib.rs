//! Orchestration and trajectory rendering for SigmaFGM runs.
//!
//! The solver itself is an external binary; this crate builds its command
//! line, reads the 2D statistics it writes, and renders the evolving
//! confidence ellipse of the phenotype distribution frame by frame.

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod solver;

pub use error::{Error, Result};
