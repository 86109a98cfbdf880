use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML (written with defaults if missing)
    #[arg(long, global = true, default_value = "sigmafgm.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render trajectory frames from a 2D statistics file
    Render(RenderArgs),
    /// Run the solver once, then optionally render its output
    Run(RunArgs),
    /// Run the solver repeatedly with derived seeds
    Sweep(SweepArgs),
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Statistics file (overrides config)
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Output directory for frames; wiped before rendering (overrides config)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Render every Nth generation (overrides config)
    #[arg(long)]
    pub stride: Option<usize>,

    /// Also write an animated GIF here (overrides config)
    #[arg(long)]
    pub gif: Option<PathBuf>,

    /// Drop invalid samples instead of rejecting the file
    #[arg(long, default_value_t = false)]
    pub skip_invalid: bool,

    /// Frames without caption and axis labels
    #[arg(long, default_value_t = false)]
    pub plain: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Solver seed (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the post-processing step even if enabled in config
    #[arg(long, default_value_t = false)]
    pub no_post: bool,

    /// Render the 2D statistics after a successful run
    #[arg(long, default_value_t = false)]
    pub render: bool,

    #[command(flatten)]
    pub render_args: RenderArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SweepArgs {
    /// Number of solver runs
    #[arg(long)]
    pub repetitions: u32,

    /// Master seed for the per-run seeds (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory receiving one sub-directory per run
    #[arg(long, default_value = "sweep")]
    pub root: PathBuf,

    /// Skip the post-processing step even if enabled in config
    #[arg(long, default_value_t = false)]
    pub no_post: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_overrides_parse() {
        let args = Args::parse_from([
            "sigmafgm",
            "render",
            "--stats",
            "run/2Dstatistics.txt",
            "--stride",
            "10",
            "--skip-invalid",
        ]);
        assert_eq!(args.config, "sigmafgm.toml");
        match args.command {
            Command::Render(r) => {
                assert_eq!(r.stats, Some(PathBuf::from("run/2Dstatistics.txt")));
                assert_eq!(r.stride, Some(10));
                assert!(r.skip_invalid);
                assert!(r.out.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn run_accepts_render_flags_and_global_config() {
        let args = Args::parse_from([
            "sigmafgm", "run", "--seed", "5", "--render", "--out", "frames", "--config", "x.toml",
        ]);
        assert_eq!(args.config, "x.toml");
        match args.command {
            Command::Run(r) => {
                assert_eq!(r.seed, Some(5));
                assert!(r.render);
                assert_eq!(r.render_args.out, Some(PathBuf::from("frames")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn sweep_requires_repetitions() {
        assert!(Args::try_parse_from(["sigmafgm", "sweep"]).is_err());
        let args = Args::try_parse_from(["sigmafgm", "sweep", "--repetitions", "200"]).unwrap();
        match args.command {
            Command::Sweep(s) => {
                assert_eq!(s.repetitions, 200);
                assert_eq!(s.root, PathBuf::from("sweep"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
