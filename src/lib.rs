//! Reduce heterogeneous speech-annotation formats to a common abstraction:
//! a time-ordered sequence of labeled intervals anchored to a sample rate,
//! convertible to a dense per-sample activity raster and back to a
//! compressed run-length form.
//!
//! The [`labels`] module is the core every format funnels through; the
//! [`formats`] module holds the dataset front ends (Fisher, KA3, TIMIT)
//! that produce "active speaker" segments for downstream training code.
//!
//! ```rust
//! use annotate_rs::{rasterize, ContiguousSequenceLabels, SequenceLabels};
//!
//! let ann = SequenceLabels::new(
//!     vec![(0.0, 4.0), (4.0, 4.5), (4.5, 10.0)],
//!     vec![0usize, 1, 0],
//!     1.0,
//! )?;
//! let raster = rasterize(&ann, 2, 2, |&channel| channel, "example")?;
//! let segments = ContiguousSequenceLabels::from_matrix(raster.matrix.view(), 2.0)?;
//! assert_eq!(segments.len(), 3);
//! assert_eq!(segments.duration(), 20.0);
//! # Ok::<(), annotate_rs::LabelError>(())
//! ```

pub mod formats;
pub mod labels;

pub use formats::FormatError;
pub use labels::{
    overlay, rasterize, Advisory, ContiguousSequenceLabels, LabelError, Overlaid, OverlapRun,
    Raster, SequenceLabels, ROUNDING_TOLERANCE,
};
