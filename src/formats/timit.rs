//! TIMIT phonetic boundary files.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array1;

use super::FormatError;
use crate::labels::{overlay, rasterize, Advisory, ContiguousSequenceLabels, SequenceLabels};

/// TIMIT boundaries are sample indices at 16 kHz.
pub const DEFAULT_SAMPLERATE: u32 = 16_000;

/// Parsed boundary annotations for one single-speaker recording.
#[derive(Debug, Clone)]
pub struct Annotations {
    pub source: PathBuf,
    labels: SequenceLabels<String>,
}

impl Annotations {
    /// Parse a whitespace-delimited boundary file: `start end label` per
    /// line, where the label may itself contain spaces.
    pub fn from_file(path: impl AsRef<Path>, samplerate: f64) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        let mut starts_ends = Vec::new();
        let mut labels = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let lineno = lineno + 1;

            let mut fields = line.split_whitespace();
            let (Some(start), Some(end)) = (fields.next(), fields.next()) else {
                return Err(FormatError::parse(path, lineno, "expected `start end label`"));
            };
            let start: f64 = start
                .parse()
                .map_err(|_| FormatError::parse(path, lineno, format!("malformed start `{start}`")))?;
            let end: f64 = end
                .parse()
                .map_err(|_| FormatError::parse(path, lineno, format!("malformed end `{end}`")))?;

            starts_ends.push((start, end));
            labels.push(fields.collect::<Vec<_>>().join(" "));
        }

        Ok(Self {
            source: path.to_path_buf(),
            labels: SequenceLabels::new(starts_ends, labels, samplerate)?,
        })
    }

    pub fn labels(&self) -> &SequenceLabels<String> {
        &self.labels
    }
}

/// Speech activity for one recording; single channel until overlaid.
#[derive(Debug, Clone)]
pub struct ActiveSpeakers {
    pub source: PathBuf,
    /// Data-quality conditions raised while rasterizing, already logged.
    pub advisories: Vec<Advisory>,
    labels: ContiguousSequenceLabels<Array1<u32>>,
}

impl ActiveSpeakers {
    pub fn from_annotations(ann: &Annotations, samplerate: u32) -> Result<Self, FormatError> {
        let source = ann.source.display().to_string();
        let raster = rasterize(ann.labels(), samplerate, 1, |_| 0, &source)?;
        let labels = ContiguousSequenceLabels::from_matrix(raster.matrix.view(), samplerate as f64)?;
        Ok(Self {
            source: ann.source.clone(),
            advisories: raster.advisories,
            labels,
        })
    }

    pub fn from_file(path: impl AsRef<Path>, samplerate: u32) -> Result<Self, FormatError> {
        let ann = Annotations::from_file(path, f64::from(DEFAULT_SAMPLERATE))?;
        Self::from_annotations(&ann, samplerate)
    }

    pub fn labels(&self) -> &ContiguousSequenceLabels<Array1<u32>> {
        &self.labels
    }

    /// Overlay another recording as a synthetic conversation partner.
    ///
    /// The other track is clipped to this one's duration; the result has two
    /// channels, self first. Advisories from both inputs and from the
    /// overlay itself are carried forward.
    pub fn overlay(&self, other: &Self, samplerate: u32) -> Result<Self, FormatError> {
        let joined = overlay(
            &self.labels,
            &other.labels,
            samplerate,
            &self.source.display().to_string(),
            &other.source.display().to_string(),
        )?;

        let mut advisories = self.advisories.clone();
        advisories.extend(other.advisories.iter().cloned());
        advisories.extend(joined.advisories);
        Ok(Self {
            source: self.source.clone(),
            advisories,
            labels: joined.labels,
        })
    }
}
