//! # Digit Draw
//!
//! Turns a freehand drawing into a digit label.
//!
//! A [RasterCanvas] accumulates strokes, its [snapshot](RasterCanvas::snapshot) goes through
//! the [StrokeNormalizer] to become a 28x28 tensor, and an [InferenceSession] feeds that tensor
//! to a small convolutional [DigitClassifier] whose trained weights are loaded once at start-up.
//!
//! ## Modules
//!
//! - `bitmap`: owned pixel buffers and grayscale conversion
//! - `canvas`: the drawing surface
//! - `normalize`: resizing and scaling into the classifier's numeric range
//! - `model`: the classifier architecture
//! - `weights`: loading and shape validation of trained parameters
//! - `session`: end-to-end classification
//! - `export`: `.npy` and `.png` output

pub mod bitmap;
pub mod canvas;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod scores;
pub mod session;
pub mod weights;

pub use bitmap::{Bitmap, PixelLayout};
pub use canvas::{Point, RasterCanvas};
pub use config::DigitDrawConfig;
pub use error::{DigitError, Result};
pub use model::{DigitClassifier, DigitClassifierConfig};
pub use normalize::{Convention, NormalizeMode, NormalizedTensor, Polarity, StrokeNormalizer};
pub use scores::{ClassScores, Prediction};
pub use session::{CpuBackend, InferenceSession};
pub use weights::WeightFormat;
