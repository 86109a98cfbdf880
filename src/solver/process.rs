use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::solver::params::Invocation;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    NonZeroExit { program: String, status: ExitStatus },

    #[error("failed to prepare run directory {path}: {source}")]
    RunDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Spawns `command` directly (no shell) and waits for it.
fn run_to_completion(mut command: Command, program: &str) -> Result<ExitStatus, SolverError> {
    let status = command.status().map_err(|source| SolverError::Spawn {
        program: program.to_string(),
        source,
    })?;
    if status.success() {
        Ok(status)
    } else {
        Err(SolverError::NonZeroExit {
            program: program.to_string(),
            status,
        })
    }
}

/// A relative program path with a directory part names a file under our own
/// working directory, not the child's. Bare names are left for `PATH` lookup.
fn resolve_program(program: &Path, working_dir: Option<&Path>) -> PathBuf {
    if working_dir.is_none() || program.is_absolute() || program.components().count() < 2 {
        return program.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(program),
        Err(err) => {
            warn!(program = %program.display(), %err, "cannot resolve program path");
            program.to_path_buf()
        }
    }
}

fn describe(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// One structured invocation of the solver or simulation binary.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverCommand {
    pub program: PathBuf,
    pub params: Invocation,
    /// The solver writes its statistics files into its working directory.
    pub working_dir: Option<PathBuf>,
}

impl SolverCommand {
    pub fn new(program: impl Into<PathBuf>, params: impl Into<Invocation>) -> Self {
        Self {
            program: program.into(),
            params: params.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn args(&self) -> Vec<String> {
        self.params.to_args()
    }

    pub fn to_command(&self) -> Command {
        let program = resolve_program(&self.program, self.working_dir.as_deref());
        let mut command = Command::new(program);
        command.args(self.args());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }

    /// Human-readable command line, for logs only.
    pub fn command_line(&self) -> String {
        describe(&self.program.display().to_string(), &self.args())
    }

    pub fn run(&self) -> Result<ExitStatus, SolverError> {
        info!(cmd = %self.command_line(), "starting solver");
        run_to_completion(self.to_command(), &self.program.display().to_string())
    }
}

/// Optional companion step run after a successful solver exit, typically a
/// plotting script fed the solver's statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcess {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl PostProcess {
    pub fn to_command(&self, working_dir: Option<&Path>) -> Command {
        let mut command = Command::new(resolve_program(Path::new(&self.program), working_dir));
        command.args(&self.args);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }
        command
    }

    pub fn run(&self, working_dir: Option<&Path>) -> Result<ExitStatus, SolverError> {
        info!(cmd = %describe(&self.program, &self.args), "starting post-processing");
        run_to_completion(self.to_command(working_dir), &self.program)
    }
}
