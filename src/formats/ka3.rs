//! KA3 MPEG-7 XML speech annotations.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};
use serde::Serialize;

use super::FormatError;
use crate::labels::{rasterize, Advisory, ContiguousSequenceLabels, SequenceLabels};

/// Default rasterization rate for KA3 annotations: 10 ms resolution.
pub const DEFAULT_SAMPLERATE: u32 = 100;

const NS_MPEG7: &str = "urn:mpeg:mpeg7:schema:2004";
const NS_IFINDER: &str = "http://www.iais.fraunhofer.de/ifinder";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

// Media time points look like `T00:00:07:680F1000`: hours, minutes, seconds,
// then n fractions of a second over the standard fractions per second.
static TIMEPOINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"T(\d+):(\d+):(\d+):(\d+)F(\d+)\s*$").unwrap());

// Durations look like `PT00H00M02S70N1000F` with every marker optional.
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?(?:(\d+)N)?(?:(\d+)F)?\s*$").unwrap()
});

/// Whole seconds and the sub-second fraction, kept apart until the final
/// sum so the fraction does not wash out in a single float accumulation.
type MediaTime = (u64, f64);

fn parse_timepoint(text: &str) -> Option<MediaTime> {
    let caps = TIMEPOINT.captures(text)?;
    let number = |index: usize| caps.get(index)?.as_str().parse::<u64>().ok();
    let (hours, minutes, seconds) = (number(1)?, number(2)?, number(3)?);
    let (numerator, per_second) = (number(4)?, number(5)?);
    if per_second == 0 {
        return None;
    }
    Some((
        hours * 3600 + minutes * 60 + seconds,
        numerator as f64 / per_second as f64,
    ))
}

fn parse_duration(text: &str) -> Option<MediaTime> {
    let caps = DURATION.captures(text)?;
    let number = |index: usize| {
        caps.get(index)
            .and_then(|group| group.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, seconds) = (number(1), number(2), number(3));
    let (numerator, per_second) = (number(4), number(5));
    let fraction = if per_second == 0 {
        0.0
    } else {
        numerator as f64 / per_second as f64
    };
    Some((hours * 3600 + minutes * 60 + seconds, fraction))
}

fn segment_span(timepoint: MediaTime, duration: MediaTime) -> (f64, f64) {
    let (point, point_fraction) = timepoint;
    let (length, length_fraction) = duration;
    (
        point as f64 + point_fraction,
        (point + length) as f64 + (point_fraction + length_fraction),
    )
}

/// A speaker appearing in the annotation's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Speaker {
    pub id: String,
    pub gender: String,
    pub givenname: String,
}

/// A transcribed segment attributed to one speaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcription {
    pub speaker_id: String,
    pub confidence: f64,
    pub content: String,
}

/// Parsed MPEG-7 annotations for one recording.
#[derive(Debug, Clone)]
pub struct Annotations {
    pub source: PathBuf,
    /// Distinct speakers, sorted by id. Channel order for rasterization.
    pub speakers: Vec<Speaker>,
    labels: SequenceLabels<Transcription>,
}

impl Annotations {
    /// Parse an MPEG-7 annotation file.
    ///
    /// A segment without a `SpokenContentType` descriptor carries no speech
    /// and is skipped. A segment whose span is empty or inverted is skipped
    /// with a warning naming the file and segment; everything else that is
    /// malformed is a hard parse error. Timestamps are seconds, so the
    /// sequence samplerate is 1.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let doc = Document::parse(&text)?;

        let segments: Vec<Node> = doc
            .descendants()
            .filter(|node| node.has_tag_name((NS_MPEG7, "AudioSegment")))
            .collect();
        if segments.is_empty() {
            return Err(FormatError::parse(path, 0, "no AudioSegment elements"));
        }

        let mut starts_ends = Vec::new();
        let mut labels = Vec::new();
        let mut roster: BTreeMap<String, Speaker> = BTreeMap::new();

        for (index, segment) in segments.iter().enumerate() {
            let line = |node: &Node| doc.text_pos_at(node.range().start).row as usize;

            let timepoint = required_text(path, segment, NS_MPEG7, "MediaTimePoint")?;
            let duration = required_text(path, segment, NS_MPEG7, "MediaDuration")?;
            let timepoint = parse_timepoint(timepoint).ok_or_else(|| {
                FormatError::parse(
                    path,
                    line(segment),
                    format!("malformed MediaTimePoint `{timepoint}`"),
                )
            })?;
            let duration = parse_duration(duration).ok_or_else(|| {
                FormatError::parse(
                    path,
                    line(segment),
                    format!("malformed MediaDuration `{duration}`"),
                )
            })?;
            let (start, end) = segment_span(timepoint, duration);

            // No descriptor means no speech in this segment.
            let Some(descriptor) = segment.descendants().find(|node| {
                node.has_tag_name((NS_MPEG7, "AudioDescriptor"))
                    && node
                        .attribute((NS_XSI, "type"))
                        .is_some_and(|kind| kind.ends_with("SpokenContentType"))
            }) else {
                continue;
            };

            if end <= start {
                log::warn!(
                    "skipping segment {} with non-positive span [{start}, {end}) in {}",
                    index + 1,
                    path.display()
                );
                continue;
            }

            let speaker_id = required_text(path, &descriptor, NS_IFINDER, "Identifier")?;
            let content = required_text(path, &descriptor, NS_IFINDER, "SpokenUnitVector")?;
            let confidence = required_text(path, &descriptor, NS_IFINDER, "ConfidenceVector")?;
            let confidence: f64 = confidence
                .split_whitespace()
                .next()
                .and_then(|first| first.parse().ok())
                .ok_or_else(|| {
                    FormatError::parse(
                        path,
                        line(&descriptor),
                        format!("malformed ConfidenceVector `{confidence}`"),
                    )
                })?;

            let speaker_info = descriptor
                .descendants()
                .find(|node| node.has_tag_name((NS_IFINDER, "Speaker")))
                .ok_or_else(|| {
                    FormatError::parse(path, line(&descriptor), "missing Speaker element")
                })?;
            let gender = speaker_info.attribute("gender").ok_or_else(|| {
                FormatError::parse(path, line(&speaker_info), "missing gender attribute")
            })?;
            let givenname = required_text(path, &speaker_info, NS_MPEG7, "GivenName")?;

            roster
                .entry(speaker_id.to_string())
                .or_insert_with(|| Speaker {
                    id: speaker_id.to_string(),
                    gender: gender.to_string(),
                    givenname: givenname.to_string(),
                });

            starts_ends.push((start, end));
            labels.push(Transcription {
                speaker_id: speaker_id.to_string(),
                confidence,
                content: content.trim().to_string(),
            });
        }

        Ok(Self {
            source: path.to_path_buf(),
            speakers: roster.into_values().collect(),
            labels: SequenceLabels::new(starts_ends, labels, 1.0)?,
        })
    }

    pub fn labels(&self) -> &SequenceLabels<Transcription> {
        &self.labels
    }

    /// Indices of the intervals attributed to `speaker`.
    pub fn indices_for_speaker<'a>(
        &'a self,
        speaker: &'a Speaker,
    ) -> impl Iterator<Item = usize> + 'a {
        self.labels
            .labels()
            .iter()
            .enumerate()
            .filter(move |(_, transcription)| transcription.speaker_id == speaker.id)
            .map(|(index, _)| index)
    }
}

fn required_text<'a>(
    path: &Path,
    node: &Node<'a, 'a>,
    namespace: &str,
    tag: &str,
) -> Result<&'a str, FormatError> {
    node.descendants()
        .find(|child| child.has_tag_name((namespace, tag)))
        .and_then(|child| child.text())
        .ok_or_else(|| FormatError::parse(path, 0, format!("missing {tag} element")))
}

/// Per-speaker speech activity, one channel per distinct speaker.
#[derive(Debug, Clone)]
pub struct ActiveSpeakers {
    pub source: PathBuf,
    pub speakers: Vec<Speaker>,
    /// Data-quality conditions raised while rasterizing, already logged.
    pub advisories: Vec<Advisory>,
    labels: ContiguousSequenceLabels<Array1<u32>>,
}

impl ActiveSpeakers {
    pub fn from_annotations(ann: &Annotations, samplerate: u32) -> Result<Self, FormatError> {
        // The roster is built from the same transcriptions, so the lookup
        // cannot miss.
        let channel_for: HashMap<&str, usize> = ann
            .speakers
            .iter()
            .enumerate()
            .map(|(channel, speaker)| (speaker.id.as_str(), channel))
            .collect();

        let source = ann.source.display().to_string();
        let raster = rasterize(
            ann.labels(),
            samplerate,
            ann.speakers.len(),
            |transcription| channel_for[transcription.speaker_id.as_str()],
            &source,
        )?;
        let labels = ContiguousSequenceLabels::from_matrix(raster.matrix.view(), samplerate as f64)?;
        Ok(Self {
            source: ann.source.clone(),
            speakers: ann.speakers.clone(),
            advisories: raster.advisories,
            labels,
        })
    }

    pub fn from_file(path: impl AsRef<Path>, samplerate: u32) -> Result<Self, FormatError> {
        let ann = Annotations::from_file(path)?;
        Self::from_annotations(&ann, samplerate)
    }

    pub fn labels(&self) -> &ContiguousSequenceLabels<Array1<u32>> {
        &self.labels
    }
}
