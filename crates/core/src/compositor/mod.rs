//! Caption compositing.
//!
//! Turns an image and up to two captions into the final meme. Each caption
//! is uppercased, greedily wrapped to the image width minus padding, centred
//! on its anchor, and drawn as a black outline with a coloured fill on top.
//! Captions are drawn in order, so later ones cover earlier ones.
//!
//! # Example
//!
//! ```ignore
//! use ai_meme_core::caption::{CaptionSpec, Slot};
//! use ai_meme_core::compositor::Compositor;
//! use ai_meme_core::fonts::FontBook;
//!
//! let compositor = Compositor::new(FontBook::discover(None));
//! let top = CaptionSpec::for_slot(Slot::Top).with_text("one does not simply");
//! let png = compositor.compose(&image, &[top])?;
//! ```

mod canvas;
pub mod layout;

pub use canvas::{Canvas, RasterCanvas};
pub use layout::{CaptionLayout, LaidOutLine, layout_caption, wrap_words};

use crate::caption::CaptionSpec;
use crate::error::Result;
use crate::fonts::FontBook;
use crate::image_processing::ImageHandle;
use image::Rgba;
use tracing::{debug, warn};

/// File name the exported meme is saved under by default.
pub const EXPORT_FILE_NAME: &str = "ai-meme.png";

/// Outline colour for every caption.
pub const OUTLINE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Draws `image` and `captions` onto `canvas` and returns the PNG bytes.
///
/// Captions with no text are skipped. The output depends only on the inputs.
pub fn render<C: Canvas>(canvas: &mut C, image: &ImageHandle, captions: &[CaptionSpec]) -> Result<Vec<u8>> {
    canvas.draw_image(image.pixels())?;
    for caption in captions {
        draw_caption(canvas, caption)?;
    }
    canvas.encode_png()
}

/// Draws one caption. A caption with no text is a no-op.
pub fn draw_caption<C: Canvas>(canvas: &mut C, caption: &CaptionSpec) -> Result<()> {
    if caption.is_empty() {
        return Ok(());
    }

    canvas.set_font(&caption.font_family, caption.font_size)?;
    let fill = parse_hex_color(&caption.color).unwrap_or_else(|| {
        warn!(color = %caption.color, "Invalid caption colour, drawing in black");
        Rgba([0, 0, 0, 255])
    });

    let (width, height) = (canvas.width(), canvas.height());
    let Some(layout) = layout_caption(caption, width, height, |text| canvas.measure_text(text)) else {
        return Ok(());
    };
    debug!(lines = layout.lines.len(), size = caption.font_size, "Drawing caption");

    for line in &layout.lines {
        canvas.stroke_text(&line.text, line.x, line.y, OUTLINE_COLOR, layout.stroke_width);
        canvas.fill_text(&line.text, line.x, line.y, fill);
    }
    Ok(())
}

/// Renders with system fonts onto a fresh raster canvas.
pub struct Compositor {
    fonts: FontBook,
}

impl Compositor {
    pub fn new(fonts: FontBook) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Composes at the image's native resolution.
    pub fn compose(&self, image: &ImageHandle, captions: &[CaptionSpec]) -> Result<Vec<u8>> {
        let mut canvas = RasterCanvas::new(&self.fonts, image.width(), image.height());
        render(&mut canvas, image, captions)
    }
}

/// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
pub fn parse_hex_color(input: &str) -> Option<Rgba<u8>> {
    let hex = input.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Some(Rgba([byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, 255])),
        8 => Some(Rgba([
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        ])),
        _ => None,
    }
}
