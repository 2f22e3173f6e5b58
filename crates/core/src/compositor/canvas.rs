//! Drawing surfaces.
//!
//! [`Canvas`] is the small set of 2D operations caption rendering needs.
//! Text calls use centre alignment on both axes: `(x, y)` is the middle of
//! the drawn line.

use crate::error::{AppError, Result};
use crate::fonts::FontBook;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::io::Cursor;

pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Blits `image` at the origin.
    fn draw_image(&mut self, image: &DynamicImage) -> Result<()>;

    /// Selects the font used by subsequent text calls. `size_px` is the em
    /// size in pixels.
    fn set_font(&mut self, family: &str, size_px: f32) -> Result<()>;

    /// Rendered width of `text` in the current font.
    fn measure_text(&self, text: &str) -> f32;

    /// Draws the outline of `text` with the given line width.
    fn stroke_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>, line_width: f32);

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>);

    fn encode_png(&self) -> Result<Vec<u8>>;
}

/// CPU raster canvas backed by an RGBA buffer.
pub struct RasterCanvas<'a> {
    surface: RgbaImage,
    fonts: &'a FontBook,
    font: Option<(FontArc, PxScale)>,
}

impl<'a> RasterCanvas<'a> {
    /// Creates a transparent canvas.
    pub fn new(fonts: &'a FontBook, width: u32, height: u32) -> Self {
        Self {
            surface: RgbaImage::new(width, height),
            fonts,
            font: None,
        }
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Top-left origin for `text` centred on `(x, y)`.
    fn origin(&self, text: &str, x: f32, y: f32) -> Option<(f32, f32)> {
        let (font, scale) = self.font.as_ref()?;
        let line_height = font.as_scaled(*scale).height();
        Some((x - self.measure_text(text) / 2.0, y - line_height / 2.0))
    }
}

impl Canvas for RasterCanvas<'_> {
    fn width(&self) -> u32 {
        self.surface.width()
    }

    fn height(&self) -> u32 {
        self.surface.height()
    }

    fn draw_image(&mut self, image: &DynamicImage) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AppError::composition("source image has no pixels"));
        }
        image::imageops::overlay(&mut self.surface, &image.to_rgba8(), 0, 0);
        Ok(())
    }

    fn set_font(&mut self, family: &str, size_px: f32) -> Result<()> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(AppError::composition(format!("invalid font size {}", size_px)));
        }
        let font = self.fonts.resolve(family)?;
        // Convert the CSS em size into ab_glyph's ascent-to-descent scale.
        let scale = font
            .pt_to_px_scale(size_px * 0.75)
            .unwrap_or_else(|| PxScale::from(size_px));
        self.font = Some((font, scale));
        Ok(())
    }

    fn measure_text(&self, text: &str) -> f32 {
        let Some((font, scale)) = self.font.as_ref() else {
            return 0.0;
        };
        let scaled = font.as_scaled(*scale);
        let mut width = 0.0;
        let mut prev = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    fn stroke_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>, line_width: f32) {
        let Some((left, top)) = self.origin(text, x, y) else {
            return;
        };
        let Some((font, scale)) = self.font.clone() else {
            return;
        };
        // Stamp the glyphs over a disc of offsets to fake a centred outline.
        let radius = (line_width / 2.0).max(1.0);
        let reach = radius.ceil() as i32;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if ((dx * dx + dy * dy) as f32) > radius * radius {
                    continue;
                }
                draw_text_mut(
                    &mut self.surface,
                    color,
                    left.round() as i32 + dx,
                    top.round() as i32 + dy,
                    scale,
                    &font,
                    text,
                );
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>) {
        let Some((left, top)) = self.origin(text, x, y) else {
            return;
        };
        let Some((font, scale)) = self.font.as_ref() else {
            return;
        };
        draw_text_mut(
            &mut self.surface,
            color,
            left.round() as i32,
            top.round() as i32,
            *scale,
            font,
            text,
        );
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.surface
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| AppError::composition(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }
}
