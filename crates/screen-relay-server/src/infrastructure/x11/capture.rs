//! Screen capture via `XGetImage`, pointer image via XFixes.
//!
//! # Pixel layout (for beginners)
//!
//! `XGetImage(..., ZPixmap)` returns the window contents in the server's
//! native layout.  On every 24/32-bit TrueColor visual in practice that means
//! 32 bits per pixel, one row every `bytes_per_line` bytes (rows may be
//! padded), and each pixel laid out as `0x00RRGGBB` in the image's byte
//! order.  We read each row, honour the byte order, and force the alpha byte
//! to `0xFF` so the frame is fully opaque.
//!
//! Any other depth (16-bit, 8-bit palette) is reported as
//! [`CaptureError::UnsupportedFormat`] and the cycle is skipped.
//!
//! # Pointer image
//!
//! The captured image never contains the pointer; it lives in a hardware
//! overlay.  `XFixesGetCursorImage` returns the current pointer bitmap in
//! root-window coordinates, which we translate into the capture target's
//! coordinates for single-window captures.  A missing pointer image is not
//! an error: the frame simply goes out without one.

use std::os::raw::{c_int, c_ulong};
use std::slice;
use std::sync::Arc;

use screen_relay_core::{CursorImage, RawFrame};
use tracing::debug;
use x11::{xfixes, xlib};

use super::{X11Display, X11Error};
use crate::application::gateways::{CaptureError, CapturedScreen, ScreenCapturer};
use crate::domain::CaptureTarget;

/// The only pixel size this capturer converts.
const SUPPORTED_BITS_PER_PIXEL: c_int = 32;

const OPAQUE: u32 = 0xFF00_0000;

/// Captures one X window (or the whole root window) with `XGetImage`.
pub struct X11ScreenCapturer {
    display: Arc<X11Display>,
    window: xlib::Window,
    root: xlib::Window,
    width: u32,
    height: u32,
}

impl X11ScreenCapturer {
    /// Resolves `target` and reads its size once; every later frame has
    /// exactly these dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`X11Error`] if the window does not exist or has no area.
    pub fn new(display: Arc<X11Display>, target: CaptureTarget) -> Result<Self, X11Error> {
        let root = display.root_window();
        let window = display.resolve(target);
        let (width, height) = display.window_size(window)?;
        debug!("capturing {target} ({width}x{height})");
        Ok(Self {
            display,
            window,
            root,
            width,
            height,
        })
    }

    /// The X window id frames are captured from.
    pub fn window(&self) -> xlib::Window {
        self.window
    }

    fn grab_pixels(&self) -> Result<RawFrame, CaptureError> {
        let guard = self.display.lock();

        // SAFETY: the display is locked; the returned image is owned by us and
        // destroyed below on every path.
        let image = unsafe {
            xlib::XGetImage(
                guard.raw(),
                self.window,
                0,
                0,
                self.width,
                self.height,
                xlib::XAllPlanes(),
                xlib::ZPixmap,
            )
        };
        if image.is_null() {
            return Err(CaptureError::NoImage);
        }

        // SAFETY: `image` is non-null and was produced by XGetImage above.
        let result = unsafe { convert_image(&*image) };

        // SAFETY: `image` came from XGetImage; destroy_image frees both the
        // struct and its data buffer.
        unsafe {
            if let Some(destroy) = (*image).funcs.destroy_image {
                destroy(image);
            }
        }
        result
    }

    fn grab_cursor(&self) -> Option<CursorImage> {
        let guard = self.display.lock();

        // SAFETY: the display is locked; the image is freed with XFree below.
        let raw = unsafe { xfixes::XFixesGetCursorImage(guard.raw()) };
        if raw.is_null() {
            return None;
        }

        // SAFETY: non-null result of XFixesGetCursorImage.
        let cursor = unsafe { &*raw };
        let (width, height) = (u32::from(cursor.width), u32::from(cursor.height));
        let count = width as usize * height as usize;
        let pixels = if cursor.pixels.is_null() || count == 0 {
            Vec::new()
        } else {
            // SAFETY: XFixes allocates exactly width*height longs, each
            // holding one 0xAARRGGBB pixel in its low 32 bits.
            unsafe { slice::from_raw_parts(cursor.pixels as *const c_ulong, count) }
                .iter()
                .map(|&p| p as u32)
                .collect()
        };

        let (mut x, mut y) = (c_int::from(cursor.x), c_int::from(cursor.y));
        if self.window != self.root {
            let (mut wx, mut wy): (c_int, c_int) = (0, 0);
            let mut child: xlib::Window = 0;
            // SAFETY: display locked; out-pointers are valid locals.
            let same_screen = unsafe {
                xlib::XTranslateCoordinates(
                    guard.raw(),
                    self.root,
                    self.window,
                    x,
                    y,
                    &mut wx,
                    &mut wy,
                    &mut child,
                )
            };
            if same_screen != 0 {
                x = wx;
                y = wy;
            }
        }

        let image = CursorImage {
            x,
            y,
            hotspot_x: c_int::from(cursor.xhot),
            hotspot_y: c_int::from(cursor.yhot),
            width,
            height,
            pixels,
        };

        // SAFETY: `raw` came from XFixesGetCursorImage and is freed once.
        unsafe { xlib::XFree(raw.cast()) };

        (image.pixels.len() == count && count > 0).then_some(image)
    }
}

impl ScreenCapturer for X11ScreenCapturer {
    fn capture(&mut self) -> Result<CapturedScreen, CaptureError> {
        let frame = self.grab_pixels()?;
        let cursor = self.grab_cursor();
        Ok(CapturedScreen { frame, cursor })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Reads an `XImage` into an opaque [`RawFrame`].
///
/// # Safety
///
/// `image` must be a live image returned by `XGetImage` whose `data` holds
/// `height * bytes_per_line` bytes.
unsafe fn convert_image(image: &xlib::XImage) -> Result<RawFrame, CaptureError> {
    if image.bits_per_pixel != SUPPORTED_BITS_PER_PIXEL {
        return Err(CaptureError::UnsupportedFormat(format!(
            "{} bits per pixel (depth {})",
            image.bits_per_pixel, image.depth
        )));
    }
    let (Ok(width), Ok(height), Ok(stride)) = (
        u32::try_from(image.width),
        u32::try_from(image.height),
        usize::try_from(image.bytes_per_line),
    ) else {
        return Err(CaptureError::UnsupportedFormat("negative image geometry".into()));
    };
    if image.data.is_null() {
        return Err(CaptureError::NoImage);
    }

    let data = slice::from_raw_parts(image.data as *const u8, stride * height as usize);
    pixels_from_rows(data, width, height, stride, image.byte_order == xlib::LSBFirst)
}

/// Converts padded 32-bit rows to opaque `0xAARRGGBB` pixels.
fn pixels_from_rows(
    data: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    lsb_first: bool,
) -> Result<RawFrame, CaptureError> {
    let row_bytes = width as usize * 4;
    if stride < row_bytes || data.len() < stride * height as usize {
        return Err(CaptureError::UnsupportedFormat(format!(
            "row stride {stride} too small for width {width}"
        )));
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for row in data.chunks_exact(stride).take(height as usize) {
        pixels.extend(row[..row_bytes].chunks_exact(4).map(|px| {
            let bytes = [px[0], px[1], px[2], px[3]];
            let value = if lsb_first {
                u32::from_le_bytes(bytes)
            } else {
                u32::from_be_bytes(bytes)
            };
            value | OPAQUE
        }));
    }

    RawFrame::from_pixels(width, height, pixels)
        .ok_or_else(|| CaptureError::UnsupportedFormat("pixel count mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsb_rows_become_opaque_argb() {
        // Arrange: 2x1, BGRX byte order as an LSBFirst server sends it
        let data = [0x30, 0x20, 0x10, 0x00, 0xFF, 0x00, 0x00, 0x00];

        // Act
        let frame = pixels_from_rows(&data, 2, 1, 8, true).unwrap();

        // Assert
        assert_eq!(frame.pixels(), &[0xFF10_2030, 0xFF00_00FF]);
    }

    #[test]
    fn test_msb_rows_are_read_big_endian() {
        let data = [0x00, 0x10, 0x20, 0x30];

        let frame = pixels_from_rows(&data, 1, 1, 4, false).unwrap();

        assert_eq!(frame.pixels(), &[0xFF10_2030]);
    }

    #[test]
    fn test_row_padding_is_skipped() {
        // Arrange: 1 pixel wide, 8-byte stride, 2 rows
        let data = [
            0x01, 0x00, 0x00, 0x00, 0xAA, 0xAA, 0xAA, 0xAA, //
            0x02, 0x00, 0x00, 0x00, 0xBB, 0xBB, 0xBB, 0xBB,
        ];

        let frame = pixels_from_rows(&data, 1, 2, 8, true).unwrap();

        assert_eq!(frame.pixels(), &[0xFF00_0001, 0xFF00_0002]);
    }

    #[test]
    fn test_short_stride_is_unsupported() {
        let data = [0u8; 12];

        let result = pixels_from_rows(&data, 4, 1, 12, true);

        assert!(matches!(result, Err(CaptureError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_truncated_buffer_is_unsupported() {
        let data = [0u8; 4];

        let result = pixels_from_rows(&data, 1, 2, 4, true);

        assert!(matches!(result, Err(CaptureError::UnsupportedFormat(_))));
    }
}
