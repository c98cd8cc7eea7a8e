use crate::error::{DigitError, Result};
use image::{DynamicImage, GrayImage, RgbImage};

/// Memory layout of the pixels in a [bitmap](Bitmap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// One intensity byte per pixel.
    Gray,
    /// Three bytes per pixel in red, green, blue order.
    Rgb,
    /// Three bytes per pixel in blue, green, red order, as stored by 32-bit RGB surfaces.
    Bgr,
}

impl PixelLayout {
    /// Number of bytes per pixel.
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Gray => 1,
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
        }
    }
}

/// Owned row-major pixel grid with its origin at the top-left corner.
///
/// A bitmap is always a copy: the canvas hands one out per snapshot and the
/// normalization pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl Bitmap {
    /// Creates a bitmap from raw bytes laid out as `layout`.
    ///
    /// # Errors
    ///
    /// Returns [DigitError::InvalidBitmap] when a dimension is zero or above `u32::MAX`,
    /// or the buffer length is not `width * height * channels`.
    pub fn new(width: usize, height: usize, layout: PixelLayout, data: Vec<u8>) -> Result<Self> {
        let expected = Self::byte_len(width, height, layout.channels())?;
        if data.len() != expected {
            return Err(DigitError::invalid_bitmap(format!(
                "expected {expected} bytes for a {width}x{height} {layout:?} bitmap, got {}",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    /// Creates a bitmap from a channel count, assuming red, green, blue order for 3 channels.
    pub fn from_channels(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let layout = match channels {
            1 => PixelLayout::Gray,
            3 => PixelLayout::Rgb,
            _ => {
                return Err(DigitError::invalid_bitmap(format!(
                    "unsupported channel count {channels}, expected 1 or 3"
                )))
            }
        };

        Self::new(width, height, layout, data)
    }

    /// Creates a bitmap from a 4-bytes-per-pixel buffer stored as blue, green, red, padding.
    ///
    /// The padding byte is dropped and the blue, green, red order is kept.
    pub fn from_bgrx(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        let expected = Self::byte_len(width, height, 4)?;
        if data.len() != expected {
            return Err(DigitError::invalid_bitmap(format!(
                "expected {expected} bytes for a {width}x{height} BGRX buffer, got {}",
                data.len()
            )));
        }

        let bgr = data
            .chunks_exact(4)
            .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
            .collect();

        Self::new(width, height, PixelLayout::Bgr, bgr)
    }

    /// Creates a bitmap from a decoded image, dropping any alpha channel.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width() as usize, image.height() as usize);

        if image.color().has_color() {
            Self::new(width, height, PixelLayout::Rgb, image.to_rgb8().into_raw())
        } else {
            Self::new(width, height, PixelLayout::Gray, image.to_luma8().into_raw())
        }
    }

    /// Number of bytes needed for `width * height` pixels of `channels` bytes each.
    ///
    /// Dimensions must be positive and fit in `u32`, the limit of the `image` buffers.
    pub(crate) fn byte_len(width: usize, height: usize, channels: usize) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(DigitError::invalid_bitmap(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        if u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            return Err(DigitError::invalid_bitmap(format!(
                "dimensions must not exceed {}, got {width}x{height}",
                u32::MAX
            )));
        }

        width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(channels))
            .ok_or_else(|| {
                DigitError::invalid_bitmap(format!(
                    "a {width}x{height} bitmap with {channels} channels does not fit in memory"
                ))
            })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Raw pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Converts to an 8-bit grayscale image.
    ///
    /// Color pixels go through the ITU-R 601-2 luma transform
    /// `L = R * 299/1000 + G * 587/1000 + B * 114/1000`, evaluated in 16-bit fixed point
    /// so results match the imaging library the classifier was trained with.
    pub fn to_luma(&self) -> GrayImage {
        let pixels = match self.layout {
            PixelLayout::Gray => self.data.clone(),
            PixelLayout::Rgb => self
                .data
                .chunks_exact(3)
                .map(|p| luma(p[0], p[1], p[2]))
                .collect(),
            PixelLayout::Bgr => self
                .data
                .chunks_exact(3)
                .map(|p| luma(p[2], p[1], p[0]))
                .collect(),
        };

        GrayImage::from_raw(self.width as u32, self.height as u32, pixels)
            .expect("Buffer length is validated on construction")
    }

    /// Converts to an RGB image with channels in red, green, blue order.
    pub fn to_rgb(&self) -> RgbImage {
        let pixels = match self.layout {
            PixelLayout::Gray => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            PixelLayout::Rgb => self.data.clone(),
            PixelLayout::Bgr => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[2], p[1], p[0]])
                .collect(),
        };

        RgbImage::from_raw(self.width as u32, self.height as u32, pixels)
            .expect("Buffer length is validated on construction")
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let value = r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000;
    (value >> 16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 10)]
    #[case(10, 0)]
    #[case(0, 0)]
    fn zero_dimension_is_invalid(#[case] width: usize, #[case] height: usize) {
        let result = Bitmap::new(width, height, PixelLayout::Gray, vec![]);

        assert!(matches!(result, Err(DigitError::InvalidBitmap { .. })));
    }

    #[rstest]
    #[case(2)]
    #[case(4)]
    fn unsupported_channel_count_is_invalid(#[case] channels: usize) {
        let result = Bitmap::from_channels(4, 4, channels, vec![0; 4 * 4 * channels]);

        assert!(matches!(result, Err(DigitError::InvalidBitmap { .. })));
    }

    #[rstest]
    #[case::overflowing_product(usize::MAX, 2)]
    #[case::width_above_u32(u32::MAX as usize + 1, 1)]
    #[case::height_above_u32(1, u32::MAX as usize + 1)]
    fn oversized_dimensions_are_invalid(#[case] width: usize, #[case] height: usize) {
        let result = Bitmap::new(width, height, PixelLayout::Gray, vec![0; 2]);

        assert!(matches!(result, Err(DigitError::InvalidBitmap { .. })));
    }

    #[test]
    fn oversized_bgrx_buffer_is_invalid() {
        let result = Bitmap::from_bgrx(usize::MAX / 2, 3, &[0; 12]);

        assert!(matches!(result, Err(DigitError::InvalidBitmap { .. })));
    }

    #[test]
    fn buffer_length_must_match_dimensions() {
        let result = Bitmap::new(4, 4, PixelLayout::Rgb, vec![0; 4 * 4]);

        assert!(matches!(result, Err(DigitError::InvalidBitmap { .. })));
    }

    #[test]
    fn luma_of_extremes_is_exact() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(255, 0, 0), 76);
        assert_eq!(luma(0, 255, 0), 150);
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn bgr_is_reversed_before_grayscale() {
        let rgb = Bitmap::new(1, 1, PixelLayout::Rgb, vec![255, 0, 0]).unwrap();
        let bgr = Bitmap::new(1, 1, PixelLayout::Bgr, vec![0, 0, 255]).unwrap();

        assert_eq!(rgb.to_luma().into_raw(), vec![76]);
        assert_eq!(bgr.to_luma().into_raw(), vec![76]);
        assert_eq!(bgr.to_rgb().into_raw(), vec![255, 0, 0]);
    }

    #[test]
    fn bgrx_drops_padding() {
        let bitmap = Bitmap::from_bgrx(2, 1, &[1, 2, 3, 255, 4, 5, 6, 255]).unwrap();

        assert_eq!(bitmap.layout(), PixelLayout::Bgr);
        assert_eq!(bitmap.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn from_image_keeps_grayscale() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, image::Luma([9])));

        let bitmap = Bitmap::from_image(&image).unwrap();

        assert_eq!(bitmap.layout(), PixelLayout::Gray);
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert!(bitmap.as_bytes().iter().all(|&v| v == 9));
    }
}
