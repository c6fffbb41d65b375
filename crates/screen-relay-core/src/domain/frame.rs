//! Raw captured pixels, the cursor overlay, and the compressed [`Frame`].
//!
//! # Pixel layout
//!
//! Raw pixels are stored one `u32` per pixel in `0xAARRGGBB` order, which is
//! how a 32-bit X11 ZPixmap image and an XFixes cursor image both present
//! their pixels once read as native-endian words.  The alpha byte of a
//! captured frame is undefined (X11 leaves it zero for depth-24 visuals);
//! the alpha byte of a cursor pixel decides whether that pixel is drawn.

use std::fmt;
use std::sync::Arc;

// ── Frame ─────────────────────────────────────────────────────────────────────

/// One compressed image: the output of a single capture cycle.
///
/// Cloning is O(1); all clones share the same immutable bytes, so the
/// broadcast thread can fan a frame out to many viewers without copying it
/// and nobody can mutate it after it was produced.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Arc<[u8]>,
}

impl Frame {
    /// Wraps an encoded byte buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if the encoder produced no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies the bytes into an owned buffer (transport messages own their
    /// payload).
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("len", &self.len()).finish()
    }
}

// ── RawFrame ──────────────────────────────────────────────────────────────────

/// An uncompressed captured image, `width * height` pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl RawFrame {
    /// Builds a frame from row-major `0xAARRGGBB` pixels.
    ///
    /// Returns `None` if `pixels.len()` does not equal `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?;
        if pixels.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame where every pixel has the same value.
    pub fn filled(width: u32, height: u32, pixel: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Draws `cursor` over the frame and returns how many pixels were written.
    ///
    /// The cursor's top-left corner sits at its reported position minus its
    /// hotspot.  A cursor pixel is copied only when its alpha byte is
    /// non-zero and its translated position lies inside
    /// `[0, width) × [0, height)`; everything else is skipped silently.
    pub fn composite_cursor(&mut self, cursor: &CursorImage) -> usize {
        let origin_x = i64::from(cursor.x) - i64::from(cursor.hotspot_x);
        let origin_y = i64::from(cursor.y) - i64::from(cursor.hotspot_y);
        let frame_w = i64::from(self.width);
        let frame_h = i64::from(self.height);
        let mut written = 0;

        for cy in 0..cursor.height {
            let dest_y = origin_y + i64::from(cy);
            if dest_y < 0 || dest_y >= frame_h {
                continue;
            }
            for cx in 0..cursor.width {
                let dest_x = origin_x + i64::from(cx);
                if dest_x < 0 || dest_x >= frame_w {
                    continue;
                }
                let Some(&pixel) = cursor
                    .pixels
                    .get(cy as usize * cursor.width as usize + cx as usize)
                else {
                    continue;
                };
                if pixel >> 24 == 0 {
                    continue;
                }
                let index = dest_y as usize * self.width as usize + dest_x as usize;
                self.pixels[index] = pixel;
                written += 1;
            }
        }

        written
    }

    /// Packs the frame into tightly-packed 8-bit RGB triples, dropping alpha.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
        for &pixel in &self.pixels {
            rgb.push((pixel >> 16) as u8); // R
            rgb.push((pixel >> 8) as u8); // G
            rgb.push(pixel as u8); // B
        }
        rgb
    }
}

// ── CursorImage ───────────────────────────────────────────────────────────────

/// The pointer image reported by the capture primitive.
///
/// `x` / `y` is the pointer position on the captured surface; the hotspot is
/// the pixel inside the image that sits exactly at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    pub x: i32,
    pub y: i32,
    pub hotspot_x: i32,
    pub hotspot_y: i32,
    pub width: u32,
    pub height: u32,
    /// Row-major `0xAARRGGBB` pixels, `width * height` entries.
    pub pixels: Vec<u32>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
