//! Interval labels, rasterization, and run-length compression.
//!
//! This is the common abstraction every annotation format funnels through:
//! a time-ordered sequence of labeled intervals anchored to a sample rate,
//! convertible to a dense per-sample activity raster and back to a
//! compressed run-length form.
//!
//! The pipeline is: raw `(start, end, label)` triples →
//! [`SequenceLabels`] → (optional [`SequenceLabels::with_samplerate`]
//! rescale) → [`rasterize`] → dense matrix →
//! [`ContiguousSequenceLabels::from_matrix`] → contiguous labels →
//! (optional [`overlay`] with a second track).
//!
//! Everything here is a pure, synchronous transformation over owned data.
//! Malformed input surfaces as a fatal [`LabelError`]; imperfect-but-usable
//! input surfaces as [`Advisory`] values returned with the best-effort
//! result.

pub mod contiguous;
pub mod raster;
pub mod sequence;

pub use contiguous::ContiguousSequenceLabels;
pub use raster::{overlay, rasterize, Advisory, Overlaid, OverlapRun, Raster, ROUNDING_TOLERANCE};
pub use sequence::{LabelError, SequenceLabels};
