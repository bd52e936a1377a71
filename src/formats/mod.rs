//! Dataset front ends that reduce annotation files to active speaker labels.
//!
//! Each adapter parses one on-disk format into raw `(start, end, label)`
//! triples and runs them through the core pipeline in [`crate::labels`].
//! Format-specific metadata (call tables, speaker rosters) rides alongside
//! the label sequence on the adapter's own types; the core never sees it.
//!
//! # Available Formats
//!
//! ## Fisher
//!
//! Conversational telephone speech transcripts:
//! - **Transcripts**: colon-delimited lines, `start end speaker: content`
//! - **Metadata**: comma-delimited call table with per-channel speakers
//! - **Channels**: 2, fixed (channel A and channel B)
//!
//! ## KA3
//!
//! MPEG-7 XML speech annotations:
//! - **Segments**: `AudioSegment` with `MediaTimePoint` / `MediaDuration`
//! - **Descriptors**: `SpokenContentType` with speaker id, gender, name,
//!   confidence and transcription
//! - **Channels**: one per distinct speaker id
//!
//! ## TIMIT
//!
//! Phonetic boundary files:
//! - **Lines**: whitespace-delimited, `start end label`, sample indices
//!   at 16 kHz
//! - **Channels**: 1, plus overlaying two tracks into a synthetic
//!   two-speaker conversation

#[cfg(feature = "fisher")]
pub mod fisher;
#[cfg(feature = "ka3")]
pub mod ka3;
#[cfg(feature = "timit")]
pub mod timit;

use std::path::{Path, PathBuf};

use crate::labels::LabelError;

/// Errors from reading and parsing annotation files.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error(transparent)]
    Label(#[from] LabelError),
    #[cfg(feature = "fisher")]
    #[error("CSV error")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "ka3")]
    #[error("XML error")]
    Xml(#[from] roxmltree::Error),
}

impl FormatError {
    pub(crate) fn parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}
