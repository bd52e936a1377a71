use std::fmt;

use ndarray::{Array1, Array2};
use serde::Serialize;

use super::contiguous::ContiguousSequenceLabels;
use super::sequence::{LabelError, SequenceLabels};

/// Absolute tolerance when checking that scaled interval boundaries land on
/// integral sample indices.
pub const ROUNDING_TOLERANCE: f64 = 1e-6;

/// A run of samples on one channel that was annotated more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapRun {
    pub channel: usize,
    pub start: usize,
    pub end: usize,
}

/// Data-quality conditions detected while rasterizing.
///
/// Advisories are non-fatal: each has a documented recovery (round to the
/// nearest sample, clip to binary occupancy) and is returned alongside the
/// best-effort result so batch pipelines do not halt on imperfect upstream
/// data. Every advisory names the source it came from so problems can be
/// traced back to the offending file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The target samplerate does not evenly divide the starts and ends of
    /// the listed intervals; they were rounded to the nearest sample.
    SampleRateMismatch {
        source: String,
        samplerate: u32,
        indices: Vec<usize>,
    },
    /// Some samples were annotated more than once on the same channel; the
    /// listed runs were clipped to binary occupancy.
    DuplicateAnnotation {
        source: String,
        overlaps: Vec<OverlapRun>,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::SampleRateMismatch {
                source,
                samplerate,
                indices,
            } => write!(
                f,
                "samplerate {samplerate} does not evenly divide the starts and ends \
                 of {} interval(s) in {source}",
                indices.len()
            ),
            Advisory::DuplicateAnnotation { source, overlaps } => write!(
                f,
                "duplicate annotations in {source}: {} overlapping run(s) clipped to binary",
                overlaps.len()
            ),
        }
    }
}

/// Dense occupancy raster plus the advisories produced while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// Binary occupancy, rows are sample indices, columns are channels.
    pub matrix: Array2<u32>,
    pub advisories: Vec<Advisory>,
}

/// Expand a sequence into a dense per-sample occupancy matrix of shape
/// `(max end, channels)` at an integral target samplerate.
///
/// Each interval is scaled to `samplerate`, rounded to the nearest sample
/// index, and mapped to a channel through `channel_of`. Cells are
/// incremented rather than assigned so that double-annotated regions are
/// detected; after detection every cell is clipped to binary occupancy.
///
/// `source` identifies the sequence in advisories and is never parsed.
pub fn rasterize<L>(
    seq: &SequenceLabels<L>,
    samplerate: u32,
    channels: usize,
    channel_of: impl Fn(&L) -> usize,
    source: &str,
) -> Result<Raster, LabelError> {
    let factor = scale_factor(seq.samplerate(), samplerate)?;

    let mut rounded = Vec::with_capacity(seq.len());
    let mut mismatched = Vec::new();
    for (index, &(start, end)) in seq.starts_ends().iter().enumerate() {
        let (start, end) = (start * factor, end * factor);
        if end <= start {
            return Err(LabelError::InvalidInterval { index, start, end });
        }
        if (start.round() - start).abs() > ROUNDING_TOLERANCE
            || (end.round() - end).abs() > ROUNDING_TOLERANCE
        {
            mismatched.push(index);
        }
        rounded.push((start.round() as usize, end.round() as usize));
    }

    let mut advisories = Vec::new();
    if !mismatched.is_empty() {
        let advisory = Advisory::SampleRateMismatch {
            source: source.to_string(),
            samplerate,
            indices: mismatched,
        };
        log::warn!("{advisory}");
        advisories.push(advisory);
    }

    let rows = rounded.iter().map(|&(_, end)| end).max().unwrap_or(0);
    let mut matrix = Array2::<u32>::zeros((rows, channels));

    for (index, (&(start, end), label)) in rounded.iter().zip(seq.labels()).enumerate() {
        let channel = channel_of(label);
        if channel >= channels {
            return Err(LabelError::ShapeMismatch {
                message: format!(
                    "interval {index} maps to channel {channel} \
                     but the raster has {channels} channel(s)"
                ),
            });
        }
        for row in start..end {
            matrix[(row, channel)] += 1;
        }
    }

    if matrix.iter().any(|&cell| cell > 1) {
        let advisory = Advisory::DuplicateAnnotation {
            source: source.to_string(),
            overlaps: overlap_runs(&matrix),
        };
        log::warn!("{advisory}");
        advisories.push(advisory);
        matrix.mapv_inplace(|cell| cell.min(1));
    }

    Ok(Raster { matrix, advisories })
}

/// Locate the per-channel runs of cells with occupancy above 1.
fn overlap_runs(matrix: &Array2<u32>) -> Vec<OverlapRun> {
    let mut runs = Vec::new();
    for (channel, column) in matrix.columns().into_iter().enumerate() {
        let mut open: Option<usize> = None;
        for (row, &cell) in column.iter().enumerate() {
            match (cell > 1, open) {
                (true, None) => open = Some(row),
                (false, Some(start)) => {
                    runs.push(OverlapRun {
                        channel,
                        start,
                        end: row,
                    });
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            runs.push(OverlapRun {
                channel,
                start,
                end: column.len(),
            });
        }
    }
    runs
}

/// Joint two-track activity labels plus the advisories accumulated while
/// rescaling both inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlaid {
    pub labels: ContiguousSequenceLabels<Array1<u32>>,
    pub advisories: Vec<Advisory>,
}

/// Merge two independently derived contiguous label sequences into one joint
/// two-channel sequence: column 0 is "any channel of `primary` active",
/// column 1 is "any channel of `secondary` active", per sample at
/// `samplerate`.
///
/// The output duration is fixed to the primary's. Secondary intervals
/// entirely beyond it contribute nothing; partially overlapping ones are
/// truncated at the primary's end boundary.
pub fn overlay(
    primary: &ContiguousSequenceLabels<Array1<u32>>,
    secondary: &ContiguousSequenceLabels<Array1<u32>>,
    samplerate: u32,
    primary_source: &str,
    secondary_source: &str,
) -> Result<Overlaid, LabelError> {
    let mut advisories = Vec::new();
    let primary_spans = active_spans(primary, samplerate, primary_source, &mut advisories)?;
    let secondary_spans = active_spans(secondary, samplerate, secondary_source, &mut advisories)?;

    let factor = scale_factor(primary.samplerate(), samplerate)?;
    let rows = (primary.duration() * factor).round() as usize;

    let mut matrix = Array2::<u32>::zeros((rows, 2));
    for (start, end) in primary_spans {
        for row in start..end.min(rows) {
            matrix[(row, 0)] = 1;
        }
    }
    for (start, end) in secondary_spans {
        if start >= rows {
            continue;
        }
        for row in start..end.min(rows) {
            matrix[(row, 1)] = 1;
        }
    }

    let labels = ContiguousSequenceLabels::from_matrix(matrix.view(), samplerate as f64)?;
    Ok(Overlaid { labels, advisories })
}

/// Rescale a contiguous sequence and return the rounded spans of its active
/// intervals (any channel above zero), reporting rounding mismatches.
fn active_spans(
    seq: &ContiguousSequenceLabels<Array1<u32>>,
    samplerate: u32,
    source: &str,
    advisories: &mut Vec<Advisory>,
) -> Result<Vec<(usize, usize)>, LabelError> {
    let factor = scale_factor(seq.samplerate(), samplerate)?;

    let mut spans = Vec::new();
    let mut mismatched = Vec::new();
    for (index, (&(start, end), label)) in seq.starts_ends().iter().zip(seq.labels()).enumerate() {
        let (start, end) = (start * factor, end * factor);
        if (start.round() - start).abs() > ROUNDING_TOLERANCE
            || (end.round() - end).abs() > ROUNDING_TOLERANCE
        {
            mismatched.push(index);
        }
        if label.iter().any(|&active| active > 0) {
            spans.push((start.round() as usize, end.round() as usize));
        }
    }

    if !mismatched.is_empty() {
        let advisory = Advisory::SampleRateMismatch {
            source: source.to_string(),
            samplerate,
            indices: mismatched,
        };
        log::warn!("{advisory}");
        advisories.push(advisory);
    }
    Ok(spans)
}

fn scale_factor(from: f64, to: u32) -> Result<f64, LabelError> {
    if to == 0 {
        return Err(LabelError::InvalidSamplerate { samplerate: 0.0 });
    }
    Ok(to as f64 / from)
}
