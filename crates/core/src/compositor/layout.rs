//! Caption line breaking and placement.
//!
//! Layout is independent of any drawing backend: it only needs a way to
//! measure the rendered width of a string at the caption's font.

use crate::caption::CaptionSpec;

/// Horizontal padding kept clear on each side of the image.
pub const HORIZONTAL_PADDING: f32 = 20.0;

/// Line advance as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// A single wrapped line, centred on `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub lines: Vec<LaidOutLine>,
    pub line_height: f32,
    pub stroke_width: f32,
}

impl CaptionLayout {
    pub fn block_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Top edge of line `index`.
    pub fn line_top(&self, index: usize) -> Option<f32> {
        self.lines
            .get(index)
            .map(|line| line.y - self.line_height / 2.0)
    }
}

/// Outline width for a font size: one pixel per 15px of text, at least one.
pub fn stroke_width(font_size: f32) -> f32 {
    (font_size / 15.0).floor().max(1.0)
}

/// Width available to a line on an image `image_width` pixels wide.
pub fn available_width(image_width: u32) -> f32 {
    image_width as f32 - HORIZONTAL_PADDING * 2.0
}

/// Greedy single-pass word wrap.
///
/// A word joins the current line only if the joined line measures strictly
/// less than `max_width`. A word that is too wide on its own still gets a
/// line to itself.
pub fn wrap_words<F>(text: &str, max_width: f32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> f32,
{
    let mut words = text.split(' ');
    let Some(first) = words.next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{} {}", current, word);
        if measure(&candidate) < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}

/// Lays out a caption on an image of the given size.
///
/// Returns `None` for captions with no text. The text is uppercased, wrapped
/// to the padded image width, and the block of lines is vertically centred
/// on the anchor with each line horizontally centred on it.
pub fn layout_caption<F>(caption: &CaptionSpec, width: u32, height: u32, measure: F) -> Option<CaptionLayout>
where
    F: FnMut(&str) -> f32,
{
    if caption.is_empty() {
        return None;
    }

    let text = caption.text.to_uppercase();
    let wrapped = wrap_words(&text, available_width(width), measure);

    let line_height = caption.font_size * LINE_HEIGHT_FACTOR;
    let block_height = wrapped.len() as f32 * line_height;
    let (anchor_x, anchor_y) = caption.anchor.to_pixels(width, height);
    let first_y = anchor_y - block_height / 2.0 + line_height / 2.0;

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| LaidOutLine {
            text,
            x: anchor_x,
            y: first_y + i as f32 * line_height,
        })
        .collect();

    Some(CaptionLayout {
        lines,
        line_height,
        stroke_width: stroke_width(caption.font_size),
    })
}
