use crate::normalize::Polarity;
use crate::weights::WeightFormat;
use burn::config::Config;

/// Application settings; the only persisted state besides the weight artifact itself.
#[derive(Config, Debug)]
pub struct DigitDrawConfig {
    /// Location of the trained classifier parameters.
    pub weights: String,
    #[config(default = "WeightFormat::Auto")]
    pub weight_format: WeightFormat,
    /// Side length of the square drawing surface, in pixels.
    #[config(default = 400)]
    pub canvas_size: usize,
    #[config(default = 24.0)]
    pub pen_width: f32,
    /// Ink convention of the `[0, 1]` intensities.
    #[config(default = "Polarity::InkHigh")]
    pub polarity: Polarity,
    /// Upscaling factor of the 28x28 preview.
    #[config(default = 5)]
    pub preview_scale: u32,
}
