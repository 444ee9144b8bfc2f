use crate::geometry::Rect;
use anyhow::{bail, Result};

/// Row stride for `width` pixels of `channels` bytes, padded to 4 bytes.
pub fn padded_stride(width: usize, channels: usize) -> usize {
    (width * channels + 3) & !3
}

/// Decoded pixels: row-major, channel-interleaved RGB or RGBA, rows padded to
/// a 4-byte stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl ImageBuffer {
    /// Zeroed buffer. Channel count is not checked here; `fit` rejects
    /// anything other than 3 or 4.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        let stride = padded_stride(width, channels);
        Self {
            width,
            height,
            stride,
            channels,
            data: vec![0; stride * height],
        }
    }

    /// Pack tightly laid out rows into a padded buffer.
    pub fn from_packed(width: usize, height: usize, channels: usize, packed: &[u8]) -> Self {
        let mut image = Self::new(width, height, channels);
        let row_len = width * channels;
        if row_len == 0 {
            return image;
        }
        for (y, row) in packed.chunks_exact(row_len).take(height).enumerate() {
            let start = y * image.stride;
            image.data[start..start + row_len].copy_from_slice(row);
        }
        image
    }

    pub fn solid(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        let mut image = Self::new(width, height, 3);
        for y in 0..height {
            let row = &mut image.data[y * image.stride..y * image.stride + width * 3];
            for px in row.chunks_exact_mut(3) {
                px.copy_from_slice(&rgb);
            }
        }
        image
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let at = y * self.stride + x * self.channels;
        &self.data[at..at + self.channels]
    }

    /// Box-filter downscale so the image fits within `max_w x max_h`.
    ///
    /// Uses the smallest integer factor `f` that makes both axes fit and
    /// averages each `f x f` block (truncating). Images that already fit are
    /// left untouched. Callers must pass bounds of at least 1.
    pub fn fit(&mut self, max_w: usize, max_h: usize) -> Result<()> {
        if self.channels != 3 && self.channels != 4 {
            bail!("unsupported channel count {}", self.channels);
        }
        if max_w >= self.width && max_h >= self.height {
            return Ok(());
        }
        let f = self.width.div_ceil(max_w).max(self.height.div_ceil(max_h));
        let channels = self.channels;
        let width = self.width / f;
        let height = self.height / f;
        let stride = padded_stride(width, channels);
        let area = (f * f) as u32;

        let mut data = vec![0u8; stride * height];
        let mut sum = [0u32; 4];
        for y in 0..height {
            for x in 0..width {
                sum.fill(0);
                for j in 0..f {
                    let row = (y * f + j) * self.stride;
                    for i in 0..f {
                        let at = row + (x * f + i) * channels;
                        for (c, s) in sum.iter_mut().take(channels).enumerate() {
                            *s += u32::from(self.data[at + c]);
                        }
                    }
                }
                let dst = y * stride + x * channels;
                for c in 0..channels {
                    data[dst + c] = (sum[c] / area) as u8;
                }
            }
        }

        log::trace!(
            "fit {}x{} -> {width}x{height} (factor {f})",
            self.width,
            self.height
        );
        self.width = width;
        self.height = height;
        self.stride = stride;
        self.data = data;
        Ok(())
    }
}

/// 0RGB frame buffer as presented by the window surface.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Frame {
    pub fn new(width: usize, height: usize, background: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width * height],
        }
    }

    /// Copy `src_rect` of `image` to `dest` (same extents, see
    /// [`crate::geometry::center_rects`]). Four-channel sources are alpha
    /// blended over the frame; pixels outside the frame are clipped.
    pub fn blit(&mut self, image: &ImageBuffer, src_rect: Rect, dest: Rect) {
        for row in 0..dest.h.min(src_rect.h) {
            let (sy, dy) = (src_rect.y + row, dest.y + row);
            if sy < 0 || dy < 0 || sy as usize >= image.height || dy as usize >= self.height {
                continue;
            }
            for col in 0..dest.w.min(src_rect.w) {
                let (sx, dx) = (src_rect.x + col, dest.x + col);
                if sx < 0 || dx < 0 || sx as usize >= image.width || dx as usize >= self.width {
                    continue;
                }
                let px = image.pixel(sx as usize, sy as usize);
                let at = dy as usize * self.width + dx as usize;
                self.pixels[at] = if image.channels == 4 {
                    blend(self.pixels[at], px[0], px[1], px[2], px[3])
                } else {
                    pack_rgb(px[0], px[1], px[2])
                };
            }
        }
    }
}

pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

fn blend(dst: u32, r: u8, g: u8, b: u8, a: u8) -> u32 {
    let a = u32::from(a);
    let inv = 255 - a;
    let mix = |d: u32, s: u8| (d * inv + u32::from(s) * a + 127) / 255;
    let dr = (dst >> 16) & 0xff;
    let dg = (dst >> 8) & 0xff;
    let db = dst & 0xff;
    (mix(dr, r) << 16) | (mix(dg, g) << 8) | mix(db, b)
}
