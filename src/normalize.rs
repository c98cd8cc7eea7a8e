//! Conversion of raw drawings into the 28x28 tensors the classifier was trained on.
//!
//! The pipeline is, in order: grayscale (respecting the source channel order),
//! Lanczos resampling down to 28x28, scaling into `[0, 1]` and, for classification only,
//! the affine standardization `(v - 0.5) / 0.5` into `[-1, 1]`.

use crate::bitmap::Bitmap;
use burn::config::Config;
use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::imageops::{self, FilterType};
use image::GrayImage;

/// Side length of the normalized digit.
pub const DIGIT_SIZE: usize = 28;

const STANDARD_MEAN: f32 = 0.5;
const STANDARD_STD: f32 = 0.5;

/// Which intensity means ink once the drawing is scaled into `[0, 1]`.
#[derive(Config, Debug, PartialEq)]
pub enum Polarity {
    /// Ink is 1.0 and background 0.0, the way strokes are drawn.
    InkHigh,
    /// Ink is 0.0 and background 1.0.
    InkLow,
}

/// Numeric convention requested from the [normalizer](StrokeNormalizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Intensities in `[0, 1]`, used for array export.
    Export,
    /// Standardized values in `[-1, 1]`, fed to the classifier.
    Classification,
}

/// Value convention carried by a [NormalizedTensor].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Intensity,
    Standardized,
}

/// A 28x28 single-channel grid of `f32` in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    values: Vec<f32>,
    convention: Convention,
}

impl NormalizedTensor {
    /// The shape `[height, width, channels]`, always `[28, 28, 1]`.
    pub fn shape(&self) -> [usize; 3] {
        [DIGIT_SIZE, DIGIT_SIZE, 1]
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * DIGIT_SIZE + col]
    }

    /// Derives the standardized convention from intensities.
    ///
    /// A tensor that is already standardized is returned unchanged.
    pub fn standardized(&self) -> NormalizedTensor {
        match self.convention {
            Convention::Standardized => self.clone(),
            Convention::Intensity => NormalizedTensor {
                values: self
                    .values
                    .iter()
                    .map(|v| (v - STANDARD_MEAN) / STANDARD_STD)
                    .collect(),
                convention: Convention::Standardized,
            },
        }
    }

    /// Builds a `[1, 1, 28, 28]` tensor ready for the classifier.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(self.values.clone(), [1, 1, DIGIT_SIZE, DIGIT_SIZE]);

        Tensor::from_data(data.convert::<B::FloatElem>(), device)
    }

    /// Renders the intensities as an 8-bit image scaled up `scale` times with
    /// nearest-neighbor sampling, for on-screen preview.
    pub fn preview(&self, scale: u32) -> GrayImage {
        let intensities = match self.convention {
            Convention::Intensity => self.values.clone(),
            Convention::Standardized => self
                .values
                .iter()
                .map(|v| v * STANDARD_STD + STANDARD_MEAN)
                .collect(),
        };

        let pixels = intensities
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect();
        let small = GrayImage::from_raw(DIGIT_SIZE as u32, DIGIT_SIZE as u32, pixels)
            .expect("Digit buffer always holds 28x28 pixels");
        let size = DIGIT_SIZE as u32 * scale.max(1);

        imageops::resize(&small, size, size, FilterType::Nearest)
    }

    pub(crate) fn from_intensities(values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), DIGIT_SIZE * DIGIT_SIZE);

        Self {
            values,
            convention: Convention::Intensity,
        }
    }
}

/// Deterministic converter from ink bitmaps to [normalized tensors](NormalizedTensor).
#[derive(Debug, Clone)]
pub struct StrokeNormalizer {
    polarity: Polarity,
}

impl Default for StrokeNormalizer {
    fn default() -> Self {
        Self::new(Polarity::InkHigh)
    }
}

impl StrokeNormalizer {
    pub fn new(polarity: Polarity) -> Self {
        Self { polarity }
    }

    pub fn polarity(&self) -> &Polarity {
        &self.polarity
    }

    /// Normalizes a bitmap into the convention required by `mode`.
    ///
    /// The bitmap is only read; calling this twice on the same bitmap yields identical output.
    pub fn normalize(
        &self,
        bitmap: &Bitmap,
        mode: NormalizeMode,
    ) -> crate::Result<NormalizedTensor> {
        let gray = bitmap.to_luma();
        let small = imageops::resize(
            &gray,
            DIGIT_SIZE as u32,
            DIGIT_SIZE as u32,
            FilterType::Lanczos3,
        );

        let values = small
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .map(|v| match self.polarity {
                Polarity::InkHigh => v,
                Polarity::InkLow => 1.0 - v,
            })
            .collect();
        let tensor = NormalizedTensor::from_intensities(values);

        log::debug!(
            "Normalized {}x{} {:?} bitmap for {mode:?}",
            bitmap.width(),
            bitmap.height(),
            bitmap.layout()
        );

        Ok(match mode {
            NormalizeMode::Export => tensor,
            NormalizeMode::Classification => tensor.standardized(),
        })
    }
}
