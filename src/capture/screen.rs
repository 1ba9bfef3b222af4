//! Screen capture backends.

use anyhow::{bail, Result};

use crate::geometry::Rect;

use super::{Frame, ScreenCapturer};

#[cfg(windows)]
pub use gdi::GdiCapturer;

/// Capturer for platforms without a backend. Every capture fails.
#[derive(Debug, Default)]
pub struct UnsupportedCapturer;

impl ScreenCapturer for UnsupportedCapturer {
    fn capture(&self, rect: Rect) -> Result<Frame> {
        bail!("Screen capture is not supported on this platform ({})", rect)
    }
}

#[cfg(windows)]
mod gdi {
    use anyhow::{anyhow, bail, Result};
    use image::{ImageBuffer, Rgba};
    use std::ffi::c_void;

    use windows::Win32::Foundation::HWND;
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
        GetDIBits, ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB,
        DIB_RGB_COLORS, HBITMAP, HDC, SRCCOPY,
    };

    use crate::capture::{Frame, ScreenCapturer};
    use crate::geometry::Rect;

    /// Copies a rectangle of the desktop with GDI `BitBlt`.
    #[derive(Debug, Default)]
    pub struct GdiCapturer;

    /// Releases the screen DC, memory DC and bitmap in reverse order.
    struct GdiResources {
        screen_dc: HDC,
        mem_dc: HDC,
        bitmap: HBITMAP,
    }

    impl Drop for GdiResources {
        fn drop(&mut self) {
            unsafe {
                if !self.bitmap.is_invalid() {
                    let _ = DeleteObject(self.bitmap);
                }
                if !self.mem_dc.is_invalid() {
                    let _ = DeleteDC(self.mem_dc);
                }
                ReleaseDC(HWND::default(), self.screen_dc);
            }
        }
    }

    impl ScreenCapturer for GdiCapturer {
        fn capture(&self, rect: Rect) -> Result<Frame> {
            let rect = rect.normalized();
            let (x, y, width, height) = rect.to_xywh();
            if width == 0 || height == 0 {
                bail!("Cannot capture empty rectangle {}", rect);
            }

            let pixels = unsafe { blit(x, y, width as i32, height as i32)? };

            // BGRA -> RGBA
            let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(width, height);
            for (i, pixel) in img.pixels_mut().enumerate() {
                let offset = i * 4;
                *pixel = Rgba([
                    pixels[offset + 2],
                    pixels[offset + 1],
                    pixels[offset],
                    255,
                ]);
            }

            Ok(Frame::new(img, (x, y)))
        }
    }

    unsafe fn blit(x: i32, y: i32, width: i32, height: i32) -> Result<Vec<u8>> {
        unsafe {
            let screen_dc = GetDC(HWND::default());
            if screen_dc.is_invalid() {
                bail!("GetDC failed for the screen");
            }
            let mut res = GdiResources {
                screen_dc,
                mem_dc: HDC::default(),
                bitmap: HBITMAP::default(),
            };

            res.mem_dc = CreateCompatibleDC(res.screen_dc);
            if res.mem_dc.is_invalid() {
                bail!("CreateCompatibleDC failed");
            }
            res.bitmap = CreateCompatibleBitmap(res.screen_dc, width, height);
            if res.bitmap.is_invalid() {
                bail!("CreateCompatibleBitmap failed for {}x{}", width, height);
            }

            let previous = SelectObject(res.mem_dc, res.bitmap);
            let blitted = BitBlt(
                res.mem_dc,
                0,
                0,
                width,
                height,
                res.screen_dc,
                x,
                y,
                // No CAPTUREBLT: the layered overlay must stay out of the frame.
                SRCCOPY,
            );
            SelectObject(res.mem_dc, previous);
            blitted.map_err(|e| anyhow!("BitBlt failed: {}", e))?;

            // Negative height requests a top-down DIB.
            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut buffer = vec![0u8; (width * height * 4) as usize];
            let lines = GetDIBits(
                res.mem_dc,
                res.bitmap,
                0,
                height as u32,
                Some(buffer.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            );
            if lines != height {
                bail!("GetDIBits copied {} of {} lines", lines, height);
            }

            Ok(buffer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_capturer_fails() {
        let err = UnsupportedCapturer
            .capture(Rect::from_xywh(0, 0, 10, 10))
            .unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
