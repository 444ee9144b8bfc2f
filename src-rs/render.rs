use crate::geometry::{center_rects, Rect};
use crate::input::{DisplayRef, Record};
use crate::layout::Layout;
use crate::raster::{Frame, ImageBuffer};
use anyhow::{bail, Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::GenericImageView;
use std::path::Path;

/// Tilt applied to rendered text labels, in degrees.
pub const LABEL_ANGLE_DEGREES: f64 = 15.0;

const BACKGROUND: u32 = 0x0010_1010;
const PLACEHOLDER_RGB: [u8; 3] = [96, 96, 96];
const TEXT_RGB: [u8; 3] = [255, 255, 255];

/// Rasterises labels and the prompt. Falls back to the built-in 8x8 bitmap
/// font when no usable font file is given.
pub enum TextRenderer {
    Bitmap,
    Font(Box<fontdue::Font>),
}

impl TextRenderer {
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return TextRenderer::Bitmap;
        };
        match load_font(path) {
            Ok(font) => {
                log::debug!("loaded font {}", path.display());
                TextRenderer::Font(Box::new(font))
            }
            Err(err) => {
                log::warn!("{err:#}; using built-in bitmap font");
                TextRenderer::Bitmap
            }
        }
    }

    /// White-on-transparent RGBA rendering of `text`, sized for a box of
    /// `max_w x max_h`. The result may still exceed the box; callers `fit` it.
    pub fn render(&self, text: &str, max_w: usize, max_h: usize) -> Result<ImageBuffer> {
        self.render_rotated(text, max_w, max_h, 0.0)
    }

    /// Like [`TextRenderer::render`], tilted by [`LABEL_ANGLE_DEGREES`]. The
    /// bitmap font is scaled so the rotated bounding box fits the box.
    pub fn render_label(&self, text: &str, max_w: usize, max_h: usize) -> Result<ImageBuffer> {
        self.render_rotated(text, max_w, max_h, LABEL_ANGLE_DEGREES)
    }

    fn render_rotated(
        &self,
        text: &str,
        max_w: usize,
        max_h: usize,
        degrees: f64,
    ) -> Result<ImageBuffer> {
        if text.trim().is_empty() {
            bail!("empty label");
        }
        if max_w == 0 || max_h == 0 {
            bail!("no room to render {text:?}");
        }
        let image = match self {
            TextRenderer::Bitmap => {
                let chars = text.chars().count();
                render_bitmap_text(text, bitmap_scale(chars, max_w, max_h, degrees))
            }
            TextRenderer::Font(font) => render_font_text(font, text, max_h)?,
        };
        if degrees == 0.0 {
            return Ok(image);
        }
        Ok(rotate(&image, degrees))
    }
}

fn load_font(path: &Path) -> Result<fontdue::Font> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|err| anyhow::anyhow!("failed to parse font {}: {err}", path.display()))
}

/// Largest glyph scale (at least 1) for which a run of `chars` 8x8 glyphs,
/// turned by `degrees`, still fits in `max_w x max_h`.
fn bitmap_scale(chars: usize, max_w: usize, max_h: usize, degrees: f64) -> usize {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let n = chars as f64;
    let unit_w = 8.0 * (n * cos + sin);
    let unit_h = 8.0 * (n * sin + cos);
    let scale = (max_w as f64 / unit_w).min(max_h as f64 / unit_h).floor();
    (scale as usize).max(1)
}

fn render_bitmap_text(text: &str, scale: usize) -> ImageBuffer {
    let chars: Vec<char> = text.chars().collect();
    let mut image = ImageBuffer::new(chars.len() * 8 * scale, 8 * scale, 4);
    for (index, ch) in chars.iter().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(*ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = index * 8 * scale;
        for (row_idx, &row_bits) in glyph.iter().enumerate() {
            for col_idx in 0..8 {
                if (row_bits >> col_idx) & 1 == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = origin_x + col_idx * scale + sx;
                        let y = row_idx * scale + sy;
                        put_text_pixel(&mut image, x, y, 255);
                    }
                }
            }
        }
    }
    image
}

fn render_font_text(font: &fontdue::Font, text: &str, max_h: usize) -> Result<ImageBuffer> {
    let size = ((max_h / 2) as f32).clamp(8.0, 256.0);
    let (ascent, descent) = match font.horizontal_line_metrics(size) {
        Some(line) => (line.ascent, line.descent),
        None => (size, 0.0),
    };
    let glyphs: Vec<_> = text.chars().map(|ch| font.rasterize(ch, size)).collect();
    let width = glyphs
        .iter()
        .map(|(metrics, _)| metrics.advance_width)
        .sum::<f32>()
        .ceil() as usize;
    let height = (ascent - descent).ceil() as usize;
    if width == 0 || height == 0 {
        bail!("font produced an empty rendering for {text:?}");
    }

    let mut image = ImageBuffer::new(width, height, 4);
    let mut pen_x = 0.0f32;
    for (metrics, coverage) in &glyphs {
        let left = (pen_x + metrics.xmin as f32).round() as i64;
        let top = (ascent - (metrics.ymin + metrics.height as i32) as f32).round() as i64;
        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let alpha = coverage[gy * metrics.width + gx];
                let (x, y) = (left + gx as i64, top + gy as i64);
                if alpha == 0 || x < 0 || y < 0 {
                    continue;
                }
                put_text_pixel(&mut image, x as usize, y as usize, alpha);
            }
        }
        pen_x += metrics.advance_width;
    }
    Ok(image)
}

fn put_text_pixel(image: &mut ImageBuffer, x: usize, y: usize, alpha: u8) {
    if x >= image.width || y >= image.height {
        return;
    }
    let at = y * image.stride + x * 4;
    image.data[at..at + 3].copy_from_slice(&TEXT_RGB);
    image.data[at + 3] = image.data[at + 3].max(alpha);
}

/// Nearest-neighbour rotation about the image centre. The output is the
/// bounding box of the rotated image; uncovered pixels are transparent for
/// RGBA input and black for RGB input.
pub fn rotate(image: &ImageBuffer, degrees: f64) -> ImageBuffer {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (w, h) = (image.width as f64, image.height as f64);
    let out_w = (w * cos.abs() + h * sin.abs()).round().max(1.0) as usize;
    let out_h = (w * sin.abs() + h * cos.abs()).round().max(1.0) as usize;
    let mut out = ImageBuffer::new(out_w, out_h, image.channels);
    let (half_out_w, half_out_h) = (out_w as f64 / 2.0, out_h as f64 / 2.0);
    let channels = image.channels;

    for dy in 0..out_h {
        for dx in 0..out_w {
            let x = dx as f64 + 0.5 - half_out_w;
            let y = dy as f64 + 0.5 - half_out_h;
            let sx = (cos * x + sin * y + w / 2.0).floor();
            let sy = (-sin * x + cos * y + h / 2.0).floor();
            if sx < 0.0 || sy < 0.0 || sx >= w || sy >= h {
                continue;
            }
            let src = image.pixel(sx as usize, sy as usize);
            let at = dy * out.stride + dx * channels;
            out.data[at..at + channels].copy_from_slice(src);
        }
    }
    out
}

/// Decode an image file into 3 or 4 channels, depending on whether the
/// source carries alpha.
pub fn decode_image(path: &Path) -> Result<ImageBuffer> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to decode image: {}", path.display()))?;
    let (width, height) = decoded.dimensions();
    let (width, height) = (width as usize, height as usize);
    let image = if decoded.color().has_alpha() {
        ImageBuffer::from_packed(width, height, 4, &decoded.to_rgba8().into_raw())
    } else {
        ImageBuffer::from_packed(width, height, 3, &decoded.to_rgb8().into_raw())
    };
    Ok(image)
}

/// Solid stand-in for a reference that could not be shown: half the cell.
pub fn placeholder(cell: Rect) -> ImageBuffer {
    let w = (cell.w / 2).max(1) as usize;
    let h = (cell.h / 2).max(1) as usize;
    ImageBuffer::solid(w, h, PLACEHOLDER_RGB)
}

fn load_display(display: &DisplayRef, cell: Rect, text: &TextRenderer) -> Result<ImageBuffer> {
    match display {
        DisplayRef::Path(path) => decode_image(path),
        DisplayRef::Label(label) => text.render_label(label, cell.w as usize, cell.h as usize),
    }
}

/// Shrink `image` into `cell`, center it and blit it. Returns false when the
/// image could not be fitted.
fn place(frame: &mut Frame, mut image: ImageBuffer, cell: Rect) -> bool {
    if let Err(err) = image.fit(cell.w as usize, cell.h as usize) {
        log::warn!("cannot fit image into {}x{}: {err:#}", cell.w, cell.h);
        return false;
    }
    let mut dest = cell;
    let mut src = image.rect();
    center_rects(&mut dest, &mut src);
    frame.blit(&image, src, dest);
    true
}

/// Draw every record (and the prompt, if any) into a fresh frame.
pub fn compose(
    layout: &Layout,
    records: &[Record],
    text: &TextRenderer,
    prompt: Option<&str>,
) -> Frame {
    let mut frame = Frame::new(
        layout.screen.w.max(0) as usize,
        layout.screen.h.max(0) as usize,
        BACKGROUND,
    );

    for (record, cell) in records.iter().zip(&layout.cells) {
        if cell.w < 1 || cell.h < 1 {
            log::warn!("cell for {:?} is empty, not drawn", record.display.describe());
            continue;
        }
        let image = load_display(&record.display, *cell, text).unwrap_or_else(|err| {
            log::warn!("{err:#}; drawing placeholder");
            placeholder(*cell)
        });
        if !place(&mut frame, image, *cell) {
            place(&mut frame, placeholder(*cell), *cell);
        }
    }

    if let (Some(band), Some(prompt)) = (layout.prompt_band, prompt) {
        match text.render(prompt, band.w.max(0) as usize, band.h.max(0) as usize) {
            Ok(image) => {
                place(&mut frame, image, band);
            }
            Err(err) => log::warn!("prompt not drawn: {err:#}"),
        }
    }

    frame
}
