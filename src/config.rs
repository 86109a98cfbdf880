use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::core::ellipse::AxisBounds;
use crate::core::stats::InvalidSamplePolicy;
use crate::core::trajectory::{
    AnimationSettings, DEFAULT_ELLIPSE_ALPHA, DEFAULT_FRAME_SIZE, DEFAULT_STRIDE, RenderSettings,
};
use crate::solver::{
    Invocation, PostProcess, SimulationParams, SolverBinary, SolverCommand, SolverParams,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "StatsConfig::default_path")]
    pub path: String,
    #[serde(default)]
    pub invalid_samples: InvalidSamplePolicy,
}

impl StatsConfig {
    fn default_path() -> String {
        "2Dstatistics.txt".to_string()
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            invalid_samples: InvalidSamplePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_out_dir")]
    pub out_dir: String,
    #[serde(default = "RenderConfig::default_stride")]
    pub stride: usize,
    #[serde(default = "RenderConfig::default_frame_size")]
    pub frame_size: u32,
    #[serde(default = "RenderConfig::default_ellipse_alpha")]
    pub ellipse_alpha: f64,
    #[serde(default = "RenderConfig::default_frame_prefix")]
    pub frame_prefix: String,
    #[serde(default = "RenderConfig::default_annotate")]
    pub annotate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gif: Option<String>,
    #[serde(default = "RenderConfig::default_gif_frame_delay_ms")]
    pub gif_frame_delay_ms: u32,
    #[serde(default)]
    pub bounds: AxisBounds,
}

impl RenderConfig {
    fn default_out_dir() -> String {
        "tmp".to_string()
    }
    fn default_stride() -> usize {
        DEFAULT_STRIDE
    }
    fn default_frame_size() -> u32 {
        DEFAULT_FRAME_SIZE
    }
    fn default_ellipse_alpha() -> f64 {
        DEFAULT_ELLIPSE_ALPHA
    }
    fn default_frame_prefix() -> String {
        "frame_".to_string()
    }
    fn default_annotate() -> bool {
        true
    }
    fn default_gif_frame_delay_ms() -> u32 {
        100
    }

    pub fn settings(&self) -> RenderSettings {
        RenderSettings {
            stride: self.stride,
            bounds: self.bounds,
            frame_size: self.frame_size,
            ellipse_alpha: self.ellipse_alpha,
            frame_prefix: self.frame_prefix.clone(),
            annotate: self.annotate,
            animation: self.gif.as_ref().map(|path| AnimationSettings {
                path: PathBuf::from(path),
                frame_delay_ms: self.gif_frame_delay_ms,
            }),
            ..RenderSettings::default()
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            out_dir: Self::default_out_dir(),
            stride: Self::default_stride(),
            frame_size: Self::default_frame_size(),
            ellipse_alpha: Self::default_ellipse_alpha(),
            frame_prefix: Self::default_frame_prefix(),
            annotate: Self::default_annotate(),
            gif: None,
            gif_frame_delay_ms: Self::default_gif_frame_delay_ms(),
            bounds: AxisBounds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SolverConfig {
    #[serde(default)]
    pub binary: SolverBinary,
    /// Path of the binary; the selected binary's build path when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Flags for `binary = "solver"`.
    #[serde(default)]
    pub params: SolverParams,
    /// Flags for `binary = "simulation"`.
    #[serde(default)]
    pub simulation: SimulationParams,
}

impl SolverConfig {
    pub fn program(&self) -> &str {
        self.program
            .as_deref()
            .unwrap_or(self.binary.default_program())
    }

    pub fn command(&self) -> SolverCommand {
        let params: Invocation = match self.binary {
            SolverBinary::Solver => self.params.clone().into(),
            SolverBinary::Simulation => self.simulation.clone().into(),
        };
        let command = SolverCommand::new(self.program(), params);
        match &self.working_dir {
            Some(dir) => command.with_working_dir(dir),
            None => command,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "PostProcessConfig::default_program")]
    pub program: String,
    #[serde(default = "PostProcessConfig::default_args")]
    pub args: Vec<String>,
}

impl PostProcessConfig {
    fn default_program() -> String {
        "Rscript".to_string()
    }
    fn default_args() -> Vec<String> {
        vec!["plot_data.R".to_string(), "output.png".to_string()]
    }

    pub fn step(&self) -> Option<PostProcess> {
        self.enabled.then(|| PostProcess {
            program: self.program.clone(),
            args: self.args.clone(),
        })
    }
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: Self::default_program(),
            args: Self::default_args(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub post_process: PostProcessConfig,
}

impl AppConfig {
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        // File does not exist: write defaults and return them.
        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                if let Err(err) = fs::write(path_obj, commented(&text)) {
                    warn!("Failed to write default config to {path}: {err}");
                }
            }
            Err(err) => warn!("Failed to serialize default config: {err}; continuing with defaults"),
        }
        default_cfg
    }
}

/// Six decimals at most, or the exact `{:?}` form when that would lose the value.
fn format_f64_compact(x: f64) -> String {
    let fixed = format!("{x:.6}");
    let short = fixed.trim_end_matches('0').trim_end_matches('.');
    match short.parse::<f64>() {
        Ok(v) if (v - x).abs() <= x.abs() * 1e-6 => short.to_string(),
        _ => format!("{x:?}"),
    }
}

/// Compact form of a float literal, still typed as a float; `None` for
/// anything else (integers, strings, booleans, arrays).
fn compact_float(value: &str) -> Option<String> {
    if !value.contains(['.', 'e', 'E']) {
        return None;
    }
    let compact = format_f64_compact(value.parse().ok()?);
    if compact.contains(['.', 'e']) {
        Some(compact)
    } else {
        Some(compact + ".0")
    }
}

/// Comments out a `key = value` line; headers and blank lines stay as they are.
fn comment_line(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.is_empty() || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return line.to_string();
    }
    match line.split_once('=') {
        Some((key, value)) => {
            let value = value.trim();
            let value = compact_float(value).unwrap_or_else(|| value.to_string());
            format!("# {} = {value}", key.trim())
        }
        None => format!("# {line}"),
    }
}

/// Default config text with every setting commented out.
fn commented(text: &str) -> String {
    text.lines().map(|line| comment_line(line) + "\n").collect()
}
