//! Persisting drawings: the normalized digit as a NumPy array and the raw snapshot as PNG.

use crate::bitmap::{Bitmap, PixelLayout};
use crate::error::{DigitError, Result};
use crate::normalize::{Convention, NormalizedTensor, DIGIT_SIZE};
use image::ImageFormat;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGNMENT: usize = 64;

/// Writes the tensor as a `(28, 28)` little-endian `float32` `.npy` file (format version 1.0).
///
/// Only intensities in `[0, 1]` are exported; standardized tensors are rejected.
pub fn write_npy(path: &Path, tensor: &NormalizedTensor) -> Result<()> {
    if tensor.convention() != Convention::Intensity {
        return Err(DigitError::Export {
            reason: "only [0, 1] intensities can be exported as an array".to_string(),
        });
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&npy_header())?;
    for value in tensor.values() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;

    let (min, max) = tensor
        .values()
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    log::info!(
        "Saved {} (shape=({DIGIT_SIZE}, {DIGIT_SIZE}), min={min:.3}, max={max:.3})",
        path.display()
    );

    Ok(())
}

fn npy_header() -> Vec<u8> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({DIGIT_SIZE}, {DIGIT_SIZE}), }}"
    );
    // magic + version (2) + header length (2) + dict + newline, padded to the alignment.
    let unpadded = NPY_MAGIC.len() + 4 + dict.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    let header_len = dict.len() + padding + 1;

    let mut header = Vec::with_capacity(unpadded + padding);
    header.extend_from_slice(NPY_MAGIC);
    header.extend_from_slice(&[1, 0]);
    header.extend_from_slice(&(header_len as u16).to_le_bytes());
    header.extend_from_slice(dict.as_bytes());
    header.extend(std::iter::repeat(b' ').take(padding));
    header.push(b'\n');
    header
}

/// Saves the snapshot as a PNG at its native resolution.
///
/// Grayscale snapshots stay single-channel; color snapshots are written in red,
/// green, blue order whatever their in-memory layout.
pub fn save_png(path: &Path, bitmap: &Bitmap) -> Result<()> {
    match bitmap.layout() {
        PixelLayout::Gray => bitmap.to_luma().save_with_format(path, ImageFormat::Png)?,
        PixelLayout::Rgb | PixelLayout::Bgr => {
            bitmap.to_rgb().save_with_format(path, ImageFormat::Png)?
        }
    }

    log::info!("Saved {}", path.display());

    Ok(())
}
