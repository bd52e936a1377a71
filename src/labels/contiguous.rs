use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView2};

use super::sequence::{LabelError, SequenceLabels};

/// A [`SequenceLabels`] whose intervals tile the time axis: gap-free,
/// non-overlapping, `end[i] == start[i + 1]` for all consecutive `i`.
///
/// This is the output of run-length compression and the required input of
/// [`overlay`](super::raster::overlay).
#[derive(Debug, Clone, PartialEq)]
pub struct ContiguousSequenceLabels<L> {
    inner: SequenceLabels<L>,
}

impl<L> ContiguousSequenceLabels<L> {
    /// Build from parallel interval and label lists, validating contiguity
    /// on top of the [`SequenceLabels`] invariants.
    pub fn new(
        starts_ends: Vec<(f64, f64)>,
        labels: Vec<L>,
        samplerate: f64,
    ) -> Result<Self, LabelError> {
        Self::from_sequence(SequenceLabels::new(starts_ends, labels, samplerate)?)
    }

    /// Validate that an already-ordered sequence is contiguous.
    pub fn from_sequence(inner: SequenceLabels<L>) -> Result<Self, LabelError> {
        let starts_ends = inner.starts_ends();
        for index in 1..starts_ends.len() {
            if starts_ends[index].0 != starts_ends[index - 1].1 {
                return Err(LabelError::NotContiguous { index });
            }
        }
        Ok(Self { inner })
    }

    pub fn as_sequence(&self) -> &SequenceLabels<L> {
        &self.inner
    }

    pub fn into_sequence(self) -> SequenceLabels<L> {
        self.inner
    }

    pub fn starts_ends(&self) -> &[(f64, f64)] {
        self.inner.starts_ends()
    }

    pub fn labels(&self) -> &[L] {
        self.inner.labels()
    }

    pub fn samplerate(&self) -> f64 {
        self.inner.samplerate()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn min_start(&self) -> f64 {
        self.inner.min_start()
    }

    pub fn duration(&self) -> f64 {
        self.inner.duration()
    }
}

impl<L: Clone> ContiguousSequenceLabels<L> {
    /// A copy rescaled to `samplerate`.
    ///
    /// Scaling multiplies equal boundary values by the same factor, so
    /// contiguity is preserved exactly.
    pub fn with_samplerate(&self, samplerate: f64) -> Result<Self, LabelError> {
        Ok(Self {
            inner: self.inner.with_samplerate(samplerate)?,
        })
    }

    /// A new contiguous sequence over the selected index sub-range.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            inner: self.inner.slice(range),
        }
    }
}

impl ContiguousSequenceLabels<Array1<u32>> {
    /// Run-length compress a dense occupancy matrix (rows are time units,
    /// columns are channels) into the minimal contiguous sequence whose
    /// intervals are the maximal runs of consecutive identical rows.
    ///
    /// The first row always opens a run; a new interval begins wherever any
    /// column differs from the immediately preceding row; the final end is
    /// the row count. A zero-row matrix yields an empty sequence. The
    /// compression is lossless: [`to_matrix`](Self::to_matrix) reproduces
    /// the input exactly.
    pub fn from_matrix(matrix: ArrayView2<u32>, samplerate: f64) -> Result<Self, LabelError> {
        let rows = matrix.nrows();

        let mut starts = Vec::new();
        for row in 0..rows {
            if row == 0 || matrix.row(row) != matrix.row(row - 1) {
                starts.push(row);
            }
        }

        let mut starts_ends = Vec::with_capacity(starts.len());
        let mut labels = Vec::with_capacity(starts.len());
        for (run, &start) in starts.iter().enumerate() {
            let end = starts.get(run + 1).copied().unwrap_or(rows);
            starts_ends.push((start as f64, end as f64));
            labels.push(matrix.row(start).to_owned());
        }

        Self::new(starts_ends, labels, samplerate)
    }

    /// Re-expand to the dense occupancy matrix this sequence compresses.
    ///
    /// Boundaries are rounded to the nearest sample index; for a sequence
    /// produced by [`from_matrix`](Self::from_matrix) they are integral
    /// already. Fails with `ShapeMismatch` if the label vectors disagree in
    /// width.
    pub fn to_matrix(&self) -> Result<Array2<u32>, LabelError> {
        let channels = self.labels().first().map_or(0, |label| label.len());
        for (index, label) in self.labels().iter().enumerate() {
            if label.len() != channels {
                return Err(LabelError::ShapeMismatch {
                    message: format!(
                        "label {index} has {} channels, expected {channels}",
                        label.len()
                    ),
                });
            }
        }

        let rows = self.duration().round() as usize;
        let mut matrix = Array2::zeros((rows, channels));
        for (&(start, end), label) in self.starts_ends().iter().zip(self.labels()) {
            let start = start.round() as usize;
            let end = (end.round() as usize).min(rows);
            for row in start..end {
                matrix.row_mut(row).assign(label);
            }
        }
        Ok(matrix)
    }
}
