use crate::bitmap::{Bitmap, PixelLayout};
use crate::error::Result;

/// A point on the canvas in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Mutable drawing surface accumulating white ink strokes on a black background.
///
/// The canvas is owned by the input layer, which calls [add_stroke](RasterCanvas::add_stroke)
/// for every pointer movement and hands [snapshots](RasterCanvas::snapshot) to the
/// normalization pipeline. Its size never changes after construction.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    bitmap: Bitmap,
}

const INK: u8 = 255;
const BACKGROUND: u8 = 0;

impl RasterCanvas {
    /// Creates a blank canvas.
    pub fn new(width: usize, height: usize, layout: PixelLayout) -> Result<Self> {
        let data = vec![BACKGROUND; Bitmap::byte_len(width, height, layout.channels())?];
        let bitmap = Bitmap::new(width, height, layout, data)?;

        Ok(Self { bitmap })
    }

    pub fn width(&self) -> usize {
        self.bitmap.width()
    }

    pub fn height(&self) -> usize {
        self.bitmap.height()
    }

    /// Paints a segment with round caps: every pixel whose center lies within
    /// `width / 2` of the segment is inked. Parts outside the canvas are clipped.
    pub fn add_stroke(&mut self, from: Point, to: Point, width: f32) {
        let radius = (width / 2.0).max(0.5);
        let (canvas_w, canvas_h) = (self.width(), self.height());

        let x_min = (from.x.min(to.x) - radius).floor().max(0.0) as usize;
        let y_min = (from.y.min(to.y) - radius).floor().max(0.0) as usize;
        let x_max = ((from.x.max(to.x) + radius).ceil().max(0.0) as usize).min(canvas_w);
        let y_max = ((from.y.max(to.y) + radius).ceil().max(0.0) as usize).min(canvas_h);

        let channels = self.bitmap.channels();
        let data = self.bitmap.as_bytes_mut();

        for y in y_min..y_max {
            for x in x_min..x_max {
                let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(center, from, to) <= radius {
                    let offset = (y * canvas_w + x) * channels;
                    data[offset..offset + channels].fill(INK);
                }
            }
        }
    }

    /// Paints a single round dot.
    pub fn add_point(&mut self, at: Point, width: f32) {
        self.add_stroke(at, at, width);
    }

    /// Resets every pixel to the background.
    pub fn clear(&mut self) {
        self.bitmap.as_bytes_mut().fill(BACKGROUND);
    }

    /// Whether no ink has been drawn since creation or the last clear.
    pub fn is_blank(&self) -> bool {
        self.bitmap.as_bytes().iter().all(|&v| v == BACKGROUND)
    }

    /// Returns an immutable copy of the current pixels.
    pub fn snapshot(&self) -> Bitmap {
        self.bitmap.clone()
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;

    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
    };

    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
