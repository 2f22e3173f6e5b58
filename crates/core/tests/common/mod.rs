#![allow(dead_code)]

use ai_meme_core::compositor::Canvas;
use ai_meme_core::error::{AppError, Result};
use ai_meme_core::image_processing::{ImageHandle, ImageProcessor, ImageSource};
use ai_meme_core::services::{CaptionService, EditedImage, ImageEditService, ImageFetcher, TemplateSource};
use ai_meme_core::templates::MemeTemplate;
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Build a solid-colour PNG-backed image handle.
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> ImageHandle {
    let pixels = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)));
    ImageProcessor::from_pixels(pixels).expect("encode test image")
}

// ---------------------------------------------------------------------------
// Image fetcher
// ---------------------------------------------------------------------------

/// Serves images keyed by the source's display string; anything else fails.
#[derive(Default)]
pub struct FakeFetcher {
    images: HashMap<String, ImageHandle>,
}

impl FakeFetcher {
    pub fn with(mut self, source: &str, image: ImageHandle) -> Self {
        let key = ImageSource::parse(source).unwrap().to_string();
        self.images.insert(key, image);
        self
    }
}

impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, source: &ImageSource) -> Result<ImageHandle> {
        self.images
            .get(&source.to_string())
            .cloned()
            .ok_or_else(|| AppError::image_load(source.kind(), "not found"))
    }
}

// ---------------------------------------------------------------------------
// AI services
// ---------------------------------------------------------------------------

/// Caption and edit service with canned answers that records its inputs.
pub struct FakeAi {
    pub captions: std::result::Result<Vec<String>, String>,
    pub edit_result: Option<ImageHandle>,
    pub caption_inputs: Mutex<Vec<String>>,
    pub edit_inputs: Mutex<Vec<(String, String)>>,
}

impl FakeAi {
    pub fn new() -> Self {
        Self {
            captions: Ok(vec!["ONE DOES NOT SIMPLY".to_string(), "MUCH WOW".to_string()]),
            edit_result: Some(solid_image(8, 8, [255, 0, 0, 255])),
            caption_inputs: Mutex::new(Vec::new()),
            edit_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            captions: Err("quota exceeded".to_string()),
            edit_result: None,
            ..Self::new()
        }
    }
}

impl CaptionService for FakeAi {
    async fn generate_captions(&self, base64_image: String, _mime_type: String) -> Result<Vec<String>> {
        self.caption_inputs.lock().unwrap().push(base64_image);
        self.captions.clone().map_err(AppError::gemini)
    }
}

impl ImageEditService for FakeAi {
    async fn edit_image(
        &self,
        base64_image: String,
        _mime_type: String,
        instruction: String,
    ) -> Result<EditedImage> {
        self.edit_inputs.lock().unwrap().push((base64_image, instruction));
        match &self.edit_result {
            Some(image) => Ok(EditedImage {
                base64_image: image.to_base64(),
                mime_type: image.mime_type().to_string(),
            }),
            None => Err(AppError::gemini("No image received from Gemini")),
        }
    }
}

// ---------------------------------------------------------------------------
// Template catalog
// ---------------------------------------------------------------------------

pub struct FakeCatalog {
    pub templates: Option<Vec<MemeTemplate>>,
    pub calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(templates: Vec<MemeTemplate>) -> Self {
        Self {
            templates: Some(templates),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            templates: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TemplateSource for FakeCatalog {
    async fn trending_memes(&self) -> Result<Vec<MemeTemplate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.templates
            .clone()
            .ok_or_else(|| AppError::CatalogFetch("connection refused".to_string()))
    }
}

pub fn numbered_templates(count: usize) -> Vec<MemeTemplate> {
    (0..count)
        .map(|i| MemeTemplate::new(format!("Template {}", i), format!("https://example.com/{}.png", i)))
        .collect()
}

// ---------------------------------------------------------------------------
// Recording canvas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Image { width: u32, height: u32 },
    Font { family: String, size: f32 },
    Stroke { text: String, x: f32, y: f32, color: Rgba<u8>, width: f32 },
    Fill { text: String, x: f32, y: f32, color: Rgba<u8> },
}

/// Canvas that records draw calls. Every glyph is `0.6 × size` wide.
pub struct RecordingCanvas {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<Op>,
    pub fail_image: bool,
    size: f32,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            fail_image: false,
            size: 0.0,
        }
    }

    pub fn strokes(&self) -> Vec<&Op> {
        self.ops.iter().filter(|op| matches!(op, Op::Stroke { .. })).collect()
    }

    pub fn fills(&self) -> Vec<&Op> {
        self.ops.iter().filter(|op| matches!(op, Op::Fill { .. })).collect()
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_image(&mut self, image: &DynamicImage) -> Result<()> {
        if self.fail_image {
            return Err(AppError::composition("image failed to load"));
        }
        self.ops.push(Op::Image {
            width: image.width(),
            height: image.height(),
        });
        Ok(())
    }

    fn set_font(&mut self, family: &str, size_px: f32) -> Result<()> {
        self.size = size_px;
        self.ops.push(Op::Font {
            family: family.to_string(),
            size: size_px,
        });
        Ok(())
    }

    fn measure_text(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.size * 0.6
    }

    fn stroke_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>, line_width: f32) {
        self.ops.push(Op::Stroke {
            text: text.to_string(),
            x,
            y,
            color,
            width: line_width,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>) {
        self.ops.push(Op::Fill {
            text: text.to_string(),
            x,
            y,
            color,
        });
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        Ok(format!("{:?}", self.ops).into_bytes())
    }
}
