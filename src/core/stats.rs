//! core/stats.rs — Reader for the solver's 2D statistics table.
//!
//! The file has one header line followed by one line per reported generation:
//! `step time mu1 mu2 sigma1 sigma2 theta`.
//! Example: `5 0.5 1.0 -2.0 0.3 0.4 0.0` → step 5 at t=0.5, mean (1,-2).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Number of columns in a data line.
pub const FIELD_COUNT: usize = 7;

const FIELD_NAMES: [&str; FIELD_COUNT] =
    ["step", "time", "mu1", "mu2", "sigma1", "sigma2", "theta"];

/// Distribution state reported for one generation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistributionSample {
    pub step: u64,
    pub time: f64,
    /// Center in phenotype space (mu1, mu2).
    pub mean: [f64; 2],
    /// Standard deviations along the principal axes (sigma1, sigma2).
    pub spread: [f64; 2],
    /// Orientation of the principal axes, radians.
    pub theta: f64,
}

impl DistributionSample {
    /// Returns the physical defect of this sample, if any.
    pub fn defect(&self) -> Option<SampleDefect> {
        let finite = self.time.is_finite()
            && self.mean.iter().all(|v| v.is_finite())
            && self.spread.iter().all(|v| v.is_finite())
            && self.theta.is_finite();
        if !finite {
            return Some(SampleDefect::NonFinite);
        }
        if let Some(axis) = self.spread.iter().position(|&s| s < 0.0) {
            return Some(SampleDefect::NegativeSpread {
                axis,
                value: self.spread[axis],
            });
        }
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleDefect {
    NonFinite,
    NegativeSpread { axis: usize, value: f64 },
}

impl std::fmt::Display for SampleDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleDefect::NonFinite => write!(f, "non-finite value"),
            SampleDefect::NegativeSpread { axis, value } => {
                write!(f, "sigma{} is negative ({value})", axis + 1)
            }
        }
    }
}

/// A structurally valid record rejected for its values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidSample {
    pub line: usize,
    pub sample: DistributionSample,
    pub defect: SampleDefect,
}

/// Generation-ordered series of samples. Read-only once loaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    samples: Vec<DistributionSample>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: DistributionSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DistributionSample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[DistributionSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DistributionSample> {
        self.samples.iter()
    }

    /// Mean positions of samples `0..=end`, clamped to the series length.
    pub fn mean_path(&self, end: usize) -> Vec<(f64, f64)> {
        let stop = end.saturating_add(1).min(self.samples.len());
        self.samples[..stop]
            .iter()
            .map(|s| (s.mean[0], s.mean[1]))
            .collect()
    }
}

impl From<Vec<DistributionSample>> for TimeSeries {
    fn from(samples: Vec<DistributionSample>) -> Self {
        Self { samples }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a DistributionSample;
    type IntoIter = std::slice::Iter<'a, DistributionSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// What to do with a record whose values are physically invalid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidSamplePolicy {
    /// Fail the whole load on the first invalid sample.
    #[default]
    Reject,
    /// Drop the sample and report it in [`LoadedSeries::skipped`].
    Skip,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to open statistics file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read statistics (line {line}): {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("statistics file has no header line")]
    MissingHeader,

    #[error("line {line}: expected 7 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: field `{field}` is not a valid number: {value:?}")]
    BadNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: blank line inside the data section")]
    BlankLine { line: usize },

    #[error("line {line}: step {step} goes back from previous step {previous}")]
    StepOrder { line: usize, step: u64, previous: u64 },

    #[error("line {}: invalid sample: {}", .0.line, .0.defect)]
    InvalidSample(InvalidSample),
}

impl StatsError {
    /// True for structural problems (as opposed to an invalid sample value).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, StatsError::InvalidSample(_))
    }
}

/// Output of a successful load.
#[derive(Clone, Debug, Default)]
pub struct LoadedSeries {
    pub series: TimeSeries,
    /// Samples dropped under [`InvalidSamplePolicy::Skip`].
    pub skipped: Vec<InvalidSample>,
}

fn parse_step(token: &str, line: usize) -> Result<u64, StatsError> {
    let bad = || StatsError::BadNumber {
        line,
        field: FIELD_NAMES[0],
        value: token.to_string(),
    };
    if let Ok(step) = token.parse::<u64>() {
        return Ok(step);
    }
    // The solver may print the generation as a float ("5.0").
    let value = token.parse::<f64>().map_err(|_| bad())?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(bad())
    }
}

/// Parses one data line. `line` is the 1-based line number in the file.
pub fn parse_record(text: &str, line: usize) -> Result<DistributionSample, StatsError> {
    let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
    if tokens.len() != FIELD_COUNT {
        return Err(StatsError::FieldCount {
            line,
            found: tokens.len(),
        });
    }

    let step = parse_step(tokens[0], line)?;
    let mut values = [0.0f64; FIELD_COUNT - 1];
    for (k, token) in tokens[1..].iter().enumerate() {
        values[k] = token.parse::<f64>().map_err(|_| StatsError::BadNumber {
            line,
            field: FIELD_NAMES[k + 1],
            value: (*token).to_string(),
        })?;
    }

    Ok(DistributionSample {
        step,
        time: values[0],
        mean: [values[1], values[2]],
        spread: [values[3], values[4]],
        theta: values[5],
    })
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StatsReader {
    pub policy: InvalidSamplePolicy,
}

impl StatsReader {
    pub fn new(policy: InvalidSamplePolicy) -> Self {
        Self { policy }
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<LoadedSeries, StatsError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| StatsError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let loaded = self.read(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            samples = loaded.series.len(),
            skipped = loaded.skipped.len(),
            "loaded statistics"
        );
        Ok(loaded)
    }

    /// Single sequential pass over `input`; nothing is returned unless every
    /// line was accepted.
    pub fn read(&self, input: impl BufRead) -> Result<LoadedSeries, StatsError> {
        let mut lines = input.lines();
        match lines.next() {
            Some(Ok(_header)) => {}
            Some(Err(source)) => return Err(StatsError::Read { line: 1, source }),
            None => return Err(StatsError::MissingHeader),
        }

        let mut loaded = LoadedSeries::default();
        let mut previous_step: Option<u64> = None;
        let mut blank_at: Option<usize> = None;

        for (offset, text) in lines.enumerate() {
            let line = offset + 2;
            let text = text.map_err(|source| StatsError::Read { line, source })?;
            if text.trim().is_empty() {
                blank_at.get_or_insert(line);
                continue;
            }
            if let Some(blank) = blank_at {
                return Err(StatsError::BlankLine { line: blank });
            }

            let sample = parse_record(&text, line)?;
            if let Some(previous) = previous_step {
                if sample.step < previous {
                    return Err(StatsError::StepOrder {
                        line,
                        step: sample.step,
                        previous,
                    });
                }
            }
            previous_step = Some(sample.step);

            if let Some(defect) = sample.defect() {
                let invalid = InvalidSample {
                    line,
                    sample,
                    defect,
                };
                match self.policy {
                    InvalidSamplePolicy::Reject => return Err(StatsError::InvalidSample(invalid)),
                    InvalidSamplePolicy::Skip => {
                        warn!(line, step = sample.step, %defect, "skipping invalid sample");
                        loaded.skipped.push(invalid);
                        continue;
                    }
                }
            }
            loaded.series.push(sample);
        }

        Ok(loaded)
    }
}
