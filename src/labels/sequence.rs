use std::cmp::Ordering;
use std::ops::Range;

/// Structural errors in label data.
///
/// These always mean malformed input that violates a representation
/// invariant; they are propagated to the caller and never repaired.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("shape mismatch: {message}")]
    ShapeMismatch { message: String },
    #[error("samplerate must be positive and finite, got {samplerate}")]
    InvalidSamplerate { samplerate: f64 },
    #[error("invalid interval at index {index}: [{start}, {end})")]
    InvalidInterval { index: usize, start: f64, end: f64 },
    #[error("interval at index {index} does not start where its predecessor ends")]
    NotContiguous { index: usize },
}

/// A time-ordered sequence of labeled half-open intervals `[start, end)`
/// anchored to a sample rate (samples per time unit).
///
/// The sequence owns its intervals and labels. No operation mutates them in
/// place; rescaling and slicing return new values.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceLabels<L> {
    starts_ends: Vec<(f64, f64)>,
    labels: Vec<L>,
    samplerate: f64,
}

impl<L> SequenceLabels<L> {
    /// Build a sequence from parallel interval and label lists.
    ///
    /// Intervals are stably sorted by ascending start, so insertion order
    /// among equal starts is preserved.
    pub fn new(
        starts_ends: Vec<(f64, f64)>,
        labels: Vec<L>,
        samplerate: f64,
    ) -> Result<Self, LabelError> {
        if starts_ends.len() != labels.len() {
            return Err(LabelError::ShapeMismatch {
                message: format!(
                    "{} intervals but {} labels",
                    starts_ends.len(),
                    labels.len()
                ),
            });
        }
        check_samplerate(samplerate)?;
        for (index, &(start, end)) in starts_ends.iter().enumerate() {
            if !start.is_finite() || !end.is_finite() || end <= start {
                return Err(LabelError::InvalidInterval { index, start, end });
            }
        }

        let mut paired: Vec<((f64, f64), L)> = starts_ends.into_iter().zip(labels).collect();
        paired.sort_by(|a, b| a.0 .0.partial_cmp(&b.0 .0).unwrap_or(Ordering::Equal));
        let (starts_ends, labels) = paired.into_iter().unzip();

        Ok(Self {
            starts_ends,
            labels,
            samplerate,
        })
    }

    /// The ordered `(start, end)` pairs.
    pub fn starts_ends(&self) -> &[(f64, f64)] {
        &self.starts_ends
    }

    /// Labels parallel to `starts_ends`.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn samplerate(&self) -> f64 {
        self.samplerate
    }

    pub fn len(&self) -> usize {
        self.starts_ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts_ends.is_empty()
    }

    /// Start of the earliest interval, 0 for an empty sequence.
    pub fn min_start(&self) -> f64 {
        self.starts_ends.first().map_or(0.0, |&(start, _)| start)
    }

    /// End of the latest interval, 0 for an empty sequence.
    pub fn duration(&self) -> f64 {
        self.starts_ends
            .iter()
            .fold(0.0, |max, &(_, end)| f64::max(max, end))
    }
}

impl<L: Clone> SequenceLabels<L> {
    /// A copy of this sequence rescaled to `samplerate`.
    ///
    /// Every start and end is multiplied by `samplerate / self.samplerate()`.
    /// The original sequence is untouched.
    pub fn with_samplerate(&self, samplerate: f64) -> Result<Self, LabelError> {
        check_samplerate(samplerate)?;
        let factor = samplerate / self.samplerate;
        Ok(Self {
            starts_ends: self
                .starts_ends
                .iter()
                .map(|&(start, end)| (start * factor, end * factor))
                .collect(),
            labels: self.labels.clone(),
            samplerate,
        })
    }

    /// A new sequence over the selected index sub-range, at the same
    /// samplerate.
    ///
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            starts_ends: self.starts_ends[range.clone()].to_vec(),
            labels: self.labels[range].to_vec(),
            samplerate: self.samplerate,
        }
    }
}

pub(crate) fn check_samplerate(samplerate: f64) -> Result<(), LabelError> {
    if samplerate > 0.0 && samplerate.is_finite() {
        Ok(())
    } else {
        Err(LabelError::InvalidSamplerate { samplerate })
    }
}
