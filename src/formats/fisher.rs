//! Fisher conversational telephone speech transcripts and call metadata.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::FormatError;
use crate::labels::{rasterize, Advisory, ContiguousSequenceLabels, SequenceLabels};

/// Default rasterization rate: 10 ms resolution, the finest the transcript
/// timestamps use.
pub const DEFAULT_SAMPLERATE: u32 = 100;

/// One side of a recorded call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpeaker {
    pub pin: String,
    pub gender: String,
    pub dialect: String,
    pub phone_service: String,
}

/// Per-call metadata from the call table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallData {
    pub callid: String,
    pub topicid: String,
    pub signal_grade: f64,
    pub conv_grade: f64,
    /// Channel speakers in order [A, B].
    pub speakers: [ChannelSpeaker; 2],
}

/// The full call table, indexed by call id.
#[derive(Debug, Clone)]
pub struct AllCallData {
    calls: Vec<CallData>,
    by_callid: HashMap<String, usize>,
}

impl AllCallData {
    /// Parse the comma-delimited call table. The first row is a header.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let mut calls = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record
                .position()
                .map_or(0, |position| position.line() as usize);
            if record.len() < 15 {
                return Err(FormatError::parse(
                    path,
                    line,
                    format!("expected 15 call table columns, found {}", record.len()),
                ));
            }

            let field = |index: usize| record.get(index).unwrap_or("").trim();
            let grade = |index: usize| {
                field(index).parse::<f64>().map_err(|_| {
                    FormatError::parse(path, line, format!("malformed grade `{}`", field(index)))
                })
            };
            // Speaker blocks are 5 columns each: pin, gender.dialect, two
            // unused columns, phone service. A occupies 5..10, B 10..15.
            let speaker = |offset: usize| -> Result<ChannelSpeaker, FormatError> {
                let (gender, dialect) = field(offset + 1).split_once('.').ok_or_else(|| {
                    FormatError::parse(
                        path,
                        line,
                        format!("malformed gender.dialect `{}`", field(offset + 1)),
                    )
                })?;
                Ok(ChannelSpeaker {
                    pin: field(offset).to_string(),
                    gender: gender.to_string(),
                    dialect: dialect.to_string(),
                    phone_service: field(offset + 4).to_string(),
                })
            };

            calls.push(CallData {
                callid: field(0).to_string(),
                topicid: field(2).to_string(),
                signal_grade: grade(3)?,
                conv_grade: grade(4)?,
                speakers: [speaker(5)?, speaker(10)?],
            });
        }

        calls.sort_by(|a, b| a.callid.cmp(&b.callid));
        let by_callid = calls
            .iter()
            .enumerate()
            .map(|(index, call)| (call.callid.clone(), index))
            .collect();
        Ok(Self { calls, by_callid })
    }

    pub fn calls(&self) -> &[CallData] {
        &self.calls
    }

    pub fn calldata_for_callid(&self, callid: &str) -> Option<&CallData> {
        self.by_callid.get(callid).map(|&index| &self.calls[index])
    }

    pub fn calldata_for_filename(&self, path: &Path) -> Option<&CallData> {
        self.calldata_for_callid(&callid_from_filename(path)?)
    }
}

/// Call ids are embedded in filenames as `fe_03_<CALLID>.<ext>`.
pub fn callid_from_filename(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('_').next().map(str::to_string)
}

/// A transcribed utterance attributed to channel A (0) or B (1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    pub channel: usize,
    pub content: String,
}

/// Parsed transcript for one call.
#[derive(Debug, Clone)]
pub struct Annotations {
    pub source: PathBuf,
    pub calldata: Option<CallData>,
    labels: SequenceLabels<Transcription>,
}

impl Annotations {
    /// Parse a colon-delimited transcript: `start end speaker: content` per
    /// line, `#` comments and blank lines ignored. Timestamps are seconds,
    /// so the sequence samplerate is 1.
    pub fn from_file(
        path: impl AsRef<Path>,
        allcalldata: Option<&AllCallData>,
    ) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;

        let mut starts_ends = Vec::new();
        let mut labels = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = lineno + 1;

            let (head, content) = line.split_once(':').ok_or_else(|| {
                FormatError::parse(path, lineno, "missing `:` before transcription")
            })?;
            let mut fields = head.split_whitespace();
            let (Some(start), Some(end), Some(speaker)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(FormatError::parse(
                    path,
                    lineno,
                    "expected `start end speaker:` before transcription",
                ));
            };

            let start: f64 = start
                .parse()
                .map_err(|_| FormatError::parse(path, lineno, format!("malformed start `{start}`")))?;
            let end: f64 = end
                .parse()
                .map_err(|_| FormatError::parse(path, lineno, format!("malformed end `{end}`")))?;
            let channel = match speaker.to_ascii_uppercase().as_str() {
                "A" => 0,
                "B" => 1,
                other => {
                    return Err(FormatError::parse(
                        path,
                        lineno,
                        format!("speaker channel other than A and B: `{other}`"),
                    ))
                }
            };

            starts_ends.push((start, end));
            labels.push(Transcription {
                channel,
                content: content.trim().to_string(),
            });
        }

        let calldata = allcalldata
            .and_then(|all| all.calldata_for_filename(path))
            .cloned();
        Ok(Self {
            source: path.to_path_buf(),
            calldata,
            labels: SequenceLabels::new(starts_ends, labels, 1.0)?,
        })
    }

    pub fn labels(&self) -> &SequenceLabels<Transcription> {
        &self.labels
    }

    pub fn callid(&self) -> Option<String> {
        match &self.calldata {
            Some(calldata) => Some(calldata.callid.clone()),
            None => callid_from_filename(&self.source),
        }
    }
}

/// Two-channel speech activity derived from a call transcript.
#[derive(Debug, Clone)]
pub struct ActiveSpeakers {
    pub source: PathBuf,
    pub calldata: Option<CallData>,
    /// Data-quality conditions raised while rasterizing, already logged.
    pub advisories: Vec<Advisory>,
    labels: ContiguousSequenceLabels<Array1<u32>>,
}

impl ActiveSpeakers {
    /// Fisher calls always have exactly two channels.
    pub const CHANNELS: usize = 2;

    pub fn from_annotations(ann: &Annotations, samplerate: u32) -> Result<Self, FormatError> {
        let source = ann.source.display().to_string();
        let raster = rasterize(
            ann.labels(),
            samplerate,
            Self::CHANNELS,
            |transcription| transcription.channel,
            &source,
        )?;
        let labels = ContiguousSequenceLabels::from_matrix(raster.matrix.view(), samplerate as f64)?;
        Ok(Self {
            source: ann.source.clone(),
            calldata: ann.calldata.clone(),
            advisories: raster.advisories,
            labels,
        })
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        samplerate: u32,
        allcalldata: Option<&AllCallData>,
    ) -> Result<Self, FormatError> {
        let ann = Annotations::from_file(path, allcalldata)?;
        Self::from_annotations(&ann, samplerate)
    }

    pub fn labels(&self) -> &ContiguousSequenceLabels<Array1<u32>> {
        &self.labels
    }

    pub fn callid(&self) -> Option<String> {
        match &self.calldata {
            Some(calldata) => Some(calldata.callid.clone()),
            None => callid_from_filename(&self.source),
        }
    }
}
