//! core/trajectory.rs — Frame-by-frame rendering of the distribution trajectory.
//!
//! Every `stride`-th sample becomes one PNG: the mean path up to that sample
//! (green), its confidence ellipse (blue, translucent) and the reference axes
//! through the optimum at the origin (red). Frames are independent images.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::ellipse::{AxisBounds, ConfidenceEllipse, clip_polygon, clip_polyline};
use crate::core::stats::{DistributionSample, SampleDefect, TimeSeries};

pub const DEFAULT_STRIDE: usize = 1000;
pub const DEFAULT_FRAME_SIZE: u32 = 800;
pub const DEFAULT_ELLIPSE_ALPHA: f64 = 0.7;

const CHART_MARGIN: u32 = 10;
const LABEL_AREA: u32 = 40;
const CAPTION_FONT: (&str, u32) = ("sans-serif", 20);
const MIN_PAD_WIDTH: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSettings {
    pub path: PathBuf,
    pub frame_delay_ms: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub stride: usize,
    pub bounds: AxisBounds,
    /// Side of the square frame, pixels.
    pub frame_size: u32,
    pub ellipse_alpha: f64,
    pub outline_segments: usize,
    pub frame_prefix: String,
    /// Caption and axis labels. Off yields text-free frames.
    pub annotate: bool,
    pub animation: Option<AnimationSettings>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            bounds: AxisBounds::default(),
            frame_size: DEFAULT_FRAME_SIZE,
            ellipse_alpha: DEFAULT_ELLIPSE_ALPHA,
            outline_segments: 128,
            frame_prefix: "frame_".to_string(),
            annotate: true,
            animation: None,
        }
    }
}

/// Errors that stop a whole render pass before any frame is drawn.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("frame stride must be positive")]
    InvalidStride,

    #[error("invalid axis bounds x={:?} y={:?}", .0.x, .0.y)]
    InvalidBounds(AxisBounds),

    #[error("frame size {0}px is too small to hold a chart")]
    FrameTooSmall(u32),

    #[error("failed to reset output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open animation {path}: {message}")]
    Animation { path: String, message: String },
}

/// Errors confined to a single frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("no sample at index {0}")]
    MissingSample(usize),

    #[error("cannot draw sample: {0}")]
    InvalidSample(SampleDefect),

    #[error("degenerate ellipse with semi-axes {0:?}")]
    DegenerateEllipse((f64, f64)),

    #[error("drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::error::Error + Send + Sync>(
    err: plotters::drawing::DrawingAreaErrorKind<E>,
) -> FrameError {
    FrameError::Draw(err.to_string())
}

#[derive(Debug)]
pub struct FrameFailure {
    pub index: usize,
    pub error: FrameError,
}

/// Outcome of one pass. Frame-level problems never abort the pass; they are
/// collected here.
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Written frames in increasing index order.
    pub frames: Vec<PathBuf>,
    pub failures: Vec<FrameFailure>,
    /// Frames that could not be appended to the animation.
    pub animation_failures: Vec<FrameFailure>,
    pub animation: Option<PathBuf>,
}

impl RenderReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.animation_failures.is_empty()
    }
}

/// Indices `i` with `i % stride == 0`, ascending.
pub fn select_frames(len: usize, stride: usize) -> Result<Vec<usize>, RenderError> {
    if stride == 0 {
        return Err(RenderError::InvalidStride);
    }
    Ok((0..len).step_by(stride).collect())
}

/// Zero-pad width so that file names sort in index order.
pub fn pad_width(last_index: Option<usize>) -> usize {
    let digits = last_index.map_or(1, |i| i.to_string().len());
    digits.max(MIN_PAD_WIDTH)
}

pub fn frame_file_name(prefix: &str, index: usize, width: usize) -> String {
    format!("{prefix}{index:0width$}.png")
}

/// Destroys `path` (and anything in it) and recreates it empty.
pub fn prepare_output_dir(path: &Path) -> Result<(), RenderError> {
    let wrap = |source| RenderError::OutputDir {
        path: path.display().to_string(),
        source,
    };
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map_err(wrap)?,
        Ok(_) => fs::remove_file(path).map_err(wrap)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(wrap(err)),
    }
    fs::create_dir_all(path).map_err(wrap)?;
    debug!(path = %path.display(), "output directory reset");
    Ok(())
}

/// Margins `(top, bottom, left, right)` that shrink an area of `avail`
/// pixels so its plotting region (area minus `chrome` on each axis) has the
/// same aspect as `spans`.
pub fn aspect_margins(avail: (u32, u32), chrome: u32, spans: (f64, f64)) -> (u32, u32, u32, u32) {
    let pw = avail.0.saturating_sub(chrome) as f64;
    let ph = avail.1.saturating_sub(chrome) as f64;
    if pw <= 0.0 || ph <= 0.0 {
        return (0, 0, 0, 0);
    }
    let target = spans.0 / spans.1;
    if pw / ph > target {
        let extra = (pw - ph * target).round() as u32;
        (0, 0, extra / 2, extra - extra / 2)
    } else {
        let extra = (ph - pw / target).round() as u32;
        (extra / 2, extra - extra / 2, 0, 0)
    }
}

pub struct TrajectoryRenderer {
    settings: RenderSettings,
}

impl TrajectoryRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.settings.stride == 0 {
            return Err(RenderError::InvalidStride);
        }
        if !self.settings.bounds.is_valid() {
            return Err(RenderError::InvalidBounds(self.settings.bounds));
        }
        let chrome = 2 * CHART_MARGIN + LABEL_AREA + 2 * CAPTION_FONT.1;
        if self.settings.frame_size <= chrome {
            return Err(RenderError::FrameTooSmall(self.settings.frame_size));
        }
        Ok(())
    }

    /// Resets `out_dir`, then renders every selected frame in index order.
    pub fn render(&self, series: &TimeSeries, out_dir: &Path) -> Result<RenderReport, RenderError> {
        self.validate()?;
        prepare_output_dir(out_dir)?;

        let indices = select_frames(series.len(), self.settings.stride)?;
        let width = pad_width(indices.last().copied());
        info!(
            samples = series.len(),
            frames = indices.len(),
            stride = self.settings.stride,
            out = %out_dir.display(),
            "rendering trajectory"
        );

        let mut report = RenderReport::default();
        if indices.is_empty() {
            return Ok(report);
        }

        let size = (self.settings.frame_size, self.settings.frame_size);
        let animation = match &self.settings.animation {
            Some(anim) => {
                let root = BitMapBackend::gif(&anim.path, size, anim.frame_delay_ms)
                    .map_err(|err| RenderError::Animation {
                        path: anim.path.display().to_string(),
                        message: err.to_string(),
                    })?
                    .into_drawing_area();
                Some((root, &anim.path))
            }
            None => None,
        };

        for index in indices {
            let path = out_dir.join(frame_file_name(&self.settings.frame_prefix, index, width));
            match self.render_png(series, index, &path) {
                Ok(()) => {
                    debug!(index, path = %path.display(), "frame written");
                    report.frames.push(path);
                }
                Err(error) => {
                    warn!(index, %error, "frame failed");
                    report.failures.push(FrameFailure { index, error });
                }
            }

            if let Some((root, _)) = &animation {
                let drawn = self
                    .draw_frame(root, series, index)
                    .and_then(|()| root.present().map_err(draw_err));
                if let Err(error) = drawn {
                    warn!(index, %error, "animation frame failed");
                    report.animation_failures.push(FrameFailure { index, error });
                }
            }
        }

        if let Some((_, path)) = animation {
            report.animation = Some(path.clone());
        }
        info!(
            written = report.frames.len(),
            failed = report.failures.len(),
            "render pass finished"
        );
        Ok(report)
    }

    fn render_png(&self, series: &TimeSeries, index: usize, path: &Path) -> Result<(), FrameError> {
        // Validate before touching the file so a bad sample leaves no artifact.
        self.frame_geometry(series, index)?;
        let size = (self.settings.frame_size, self.settings.frame_size);
        discard_on_error(path, || {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            self.draw_frame(&root, series, index)?;
            root.present().map_err(draw_err)
        })
    }

    /// The sample at `index` and its unclipped ellipse outline.
    fn frame_geometry<'a>(
        &self,
        series: &'a TimeSeries,
        index: usize,
    ) -> Result<(&'a DistributionSample, Vec<(f64, f64)>), FrameError> {
        let sample = check_sample(series, index)?;
        let ellipse = ConfidenceEllipse::from_sample(sample);
        let outline = ellipse
            .finite_outline(self.settings.outline_segments)
            .ok_or(FrameError::DegenerateEllipse(ellipse.semi_axes))?;
        Ok((sample, outline))
    }

    /// Draws frame `index` onto `root`, replacing whatever it held.
    pub fn draw_frame<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        series: &TimeSeries,
        index: usize,
    ) -> Result<(), FrameError> {
        let (sample, outline) = self.frame_geometry(series, index)?;
        let bounds = self.settings.bounds;

        root.fill(&WHITE).map_err(draw_err)?;
        let (area, label_area) = if self.settings.annotate {
            let titled = root
                .titled(
                    &format!("generation {} | t = {:.3}", sample.step, sample.time),
                    CAPTION_FONT,
                )
                .map_err(draw_err)?;
            (titled, LABEL_AREA)
        } else {
            (root.margin(0, 0, 0, 0), 0)
        };

        let spans = (bounds.x.1 - bounds.x.0, bounds.y.1 - bounds.y.0);
        let (top, bottom, left, right) =
            aspect_margins(area.dim_in_pixel(), 2 * CHART_MARGIN + label_area, spans);
        let area = area.margin(top, bottom, left, right);

        let mut chart = ChartBuilder::on(&area)
            .margin(CHART_MARGIN)
            .x_label_area_size(label_area)
            .y_label_area_size(label_area)
            .build_cartesian_2d(bounds.x.0..bounds.x.1, bounds.y.0..bounds.y.1)
            .map_err(draw_err)?;
        if self.settings.annotate {
            chart
                .configure_mesh()
                .x_desc("mu1")
                .y_desc("mu2")
                .draw()
                .map_err(draw_err)?;
        } else {
            chart
                .configure_mesh()
                .x_labels(0)
                .y_labels(0)
                .draw()
                .map_err(draw_err)?;
        }

        for run in clip_polyline(&series.mean_path(index), &bounds) {
            chart
                .draw_series(LineSeries::new(run, &GREEN))
                .map_err(draw_err)?;
        }

        let outline = clip_polygon(&outline, &bounds);
        if outline.len() >= 3 {
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline,
                    BLUE.mix(self.settings.ellipse_alpha).filled(),
                )))
                .map_err(draw_err)?;
        }

        if bounds.y.0 <= 0.0 && 0.0 <= bounds.y.1 {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(bounds.x.0, 0.0), (bounds.x.1, 0.0)],
                    &RED,
                )))
                .map_err(draw_err)?;
        }
        if bounds.x.0 <= 0.0 && 0.0 <= bounds.x.1 {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(0.0, bounds.y.0), (0.0, bounds.y.1)],
                    &RED,
                )))
                .map_err(draw_err)?;
        }

        Ok(())
    }
}

fn check_sample(series: &TimeSeries, index: usize) -> Result<&DistributionSample, FrameError> {
    let sample = series.get(index).ok_or(FrameError::MissingSample(index))?;
    match sample.defect() {
        Some(defect) => Err(FrameError::InvalidSample(defect)),
        None => Ok(sample),
    }
}

/// Runs `write`; when it fails, removes whatever it left at `path`. A bitmap
/// backend flushes its buffer on drop, so a frame that failed mid-draw would
/// otherwise still leave a partial image.
fn discard_on_error(
    path: &Path,
    write: impl FnOnce() -> Result<(), FrameError>,
) -> Result<(), FrameError> {
    let result = write();
    if result.is_err() {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "partial frame removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), %err, "failed to remove partial frame"),
        }
    }
    result
}
