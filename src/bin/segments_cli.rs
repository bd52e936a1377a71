use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ndarray::Array1;
use serde::Serialize;

use annotate_rs::labels::{Advisory, ContiguousSequenceLabels};

#[derive(Parser, Debug)]
#[command(
    about = "Reduce a speech annotation file to active speaker segments",
    version
)]
struct Args {
    /// Annotation format of the input file
    #[arg(long, value_enum)]
    format: FormatChoice,

    /// Input annotation file
    input: PathBuf,

    /// Target sample rate for rasterization (defaults per format)
    #[arg(long)]
    samplerate: Option<u32>,

    /// Fisher call table for attaching call metadata
    #[cfg(feature = "fisher")]
    #[arg(long)]
    calldata: Option<PathBuf>,

    /// Second TIMIT file overlaid as a synthetic conversation partner
    #[cfg(feature = "timit")]
    #[arg(long)]
    overlay: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FormatChoice {
    #[cfg(feature = "fisher")]
    Fisher,
    #[cfg(feature = "ka3")]
    Ka3,
    #[cfg(feature = "timit")]
    Timit,
}

impl FormatChoice {
    fn default_samplerate(self) -> u32 {
        match self {
            #[cfg(feature = "fisher")]
            FormatChoice::Fisher => annotate_rs::formats::fisher::DEFAULT_SAMPLERATE,
            #[cfg(feature = "ka3")]
            FormatChoice::Ka3 => annotate_rs::formats::ka3::DEFAULT_SAMPLERATE,
            #[cfg(feature = "timit")]
            FormatChoice::Timit => annotate_rs::formats::timit::DEFAULT_SAMPLERATE,
        }
    }
}

/// JSON document emitted on stdout.
#[derive(Debug, Serialize)]
struct Report {
    source: String,
    samplerate: u32,
    channels: usize,
    segments: Vec<Segment>,
    warnings: Vec<Advisory>,
}

#[derive(Debug, Serialize)]
struct Segment {
    start: f64,
    end: f64,
    active: Vec<u32>,
}

impl Report {
    fn new(
        source: String,
        samplerate: u32,
        labels: &ContiguousSequenceLabels<Array1<u32>>,
        warnings: Vec<Advisory>,
    ) -> Self {
        let segments = labels
            .starts_ends()
            .iter()
            .zip(labels.labels())
            .map(|(&(start, end), active)| Segment {
                start,
                end,
                active: active.to_vec(),
            })
            .collect();
        Self {
            source,
            samplerate,
            channels: labels.labels().first().map_or(0, |active| active.len()),
            segments,
            warnings,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let samplerate = args
        .samplerate
        .unwrap_or_else(|| args.format.default_samplerate());

    let report = match args.format {
        #[cfg(feature = "fisher")]
        FormatChoice::Fisher => {
            use annotate_rs::formats::fisher::{ActiveSpeakers, AllCallData};

            let allcalldata = args
                .calldata
                .as_deref()
                .map(AllCallData::from_file)
                .transpose()?;
            let active = ActiveSpeakers::from_file(&args.input, samplerate, allcalldata.as_ref())?;
            Report::new(
                active.source.display().to_string(),
                samplerate,
                active.labels(),
                active.advisories.clone(),
            )
        }
        #[cfg(feature = "ka3")]
        FormatChoice::Ka3 => {
            use annotate_rs::formats::ka3::ActiveSpeakers;

            let active = ActiveSpeakers::from_file(&args.input, samplerate)?;
            Report::new(
                active.source.display().to_string(),
                samplerate,
                active.labels(),
                active.advisories.clone(),
            )
        }
        #[cfg(feature = "timit")]
        FormatChoice::Timit => {
            use annotate_rs::formats::timit::ActiveSpeakers;

            let mut active = ActiveSpeakers::from_file(&args.input, samplerate)?;
            if let Some(other) = &args.overlay {
                let other = ActiveSpeakers::from_file(other, samplerate)?;
                active = active.overlay(&other, samplerate)?;
            }
            Report::new(
                active.source.display().to_string(),
                samplerate,
                active.labels(),
                active.advisories.clone(),
            )
        }
    };

    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
