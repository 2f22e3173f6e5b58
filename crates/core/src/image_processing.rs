//! Image acquisition, decoding and encoding.
//!
//! Every image the session touches (an uploaded file, a template URL, an AI
//! edit result) becomes an [`ImageHandle`]: the encoded bytes as they were
//! received, plus the decoded pixels and their dimensions. Handles are never
//! mutated; a new image always means a new handle.
//!
//! # Sources
//!
//! [`ImageSource`] covers the three ways an image can arrive:
//!
//! - a local file path
//! - an `http(s)` URL (template catalog entries)
//! - a `data:<mime>;base64,<payload>` URL

use crate::error::{AppError, Result, SourceKind};
use crate::services::ImageFetcher;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// A decoded image together with the bytes it was decoded from.
#[derive(Clone)]
pub struct ImageHandle {
    bytes: Vec<u8>,
    mime_type: String,
    pixels: DynamicImage,
}

impl ImageHandle {
    /// Encoded bytes as received from the source.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type of [`Self::bytes`], e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Base64 form of the encoded bytes, as sent to the AI services.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// `data:` URL for the encoded bytes.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// File extension matching the encoded format.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.mime_type)
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("png")
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("mime_type", &self.mime_type)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.mime_type == other.mime_type && self.bytes == other.bytes
    }
}

/// Where an image should be loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    File(PathBuf),
    Url(Url),
    Data { mime_type: String, base64: String },
}

impl ImageSource {
    /// Classifies a user-supplied string as a data URL, web URL or file path.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            return Self::parse_data_url(rest);
        }
        if let Ok(url) = Url::parse(trimmed) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(Self::Url(url));
            }
            if url.scheme() == "file" {
                let path = url
                    .to_file_path()
                    .map_err(|_| AppError::image_load(SourceKind::File, "invalid file URL"))?;
                return Ok(Self::File(path));
            }
        }
        Ok(Self::File(PathBuf::from(trimmed)))
    }

    fn parse_data_url(rest: &str) -> Result<Self> {
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| AppError::image_load(SourceKind::Url, "data URL has no payload"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| AppError::image_load(SourceKind::Url, "data URL is not base64"))?;
        Ok(Self::Data {
            mime_type: mime_type.to_string(),
            base64: payload.to_string(),
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::File(_) => SourceKind::File,
            Self::Url(_) | Self::Data { .. } => SourceKind::Url,
        }
    }
}

impl FromStr for ImageSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
            Self::Data { mime_type, .. } => write!(f, "data:{};base64,…", mime_type),
        }
    }
}

/// Decoding and encoding helpers shared by every image path.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decodes encoded bytes into a handle.
    ///
    /// The format is sniffed from the bytes first; `mime_hint` is only used
    /// when sniffing fails.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ImageLoad`] tagged with `kind` if the format is
    /// unsupported or the data is corrupt.
    pub fn decode(bytes: Vec<u8>, mime_hint: Option<&str>, kind: SourceKind) -> Result<ImageHandle> {
        let format = image::guess_format(&bytes)
            .ok()
            .or_else(|| mime_hint.and_then(ImageFormat::from_mime_type))
            .ok_or_else(|| AppError::image_load(kind, "unrecognized image format"))?;

        let pixels = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| AppError::image_load(kind, format!("Failed to decode image: {}", e)))?;

        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(AppError::image_load(kind, "image has no pixels"));
        }

        debug!(
            width = pixels.width(),
            height = pixels.height(),
            mime = format.to_mime_type(),
            "Decoded image"
        );

        Ok(ImageHandle {
            bytes,
            mime_type: format.to_mime_type().to_string(),
            pixels,
        })
    }

    /// Decodes a base64 payload, as returned by the edit service or a data URL.
    pub fn decode_base64(data: &str, mime_hint: &str, kind: SourceKind) -> Result<ImageHandle> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| AppError::image_load(kind, format!("Invalid base64 payload: {}", e)))?;
        Self::decode(bytes, Some(mime_hint), kind)
    }

    /// Wraps already-decoded pixels, encoding them as PNG.
    pub fn from_pixels(pixels: DynamicImage) -> Result<ImageHandle> {
        let bytes = Self::encode_png(&pixels)?;
        Ok(ImageHandle {
            bytes,
            mime_type: ImageFormat::Png.to_mime_type().to_string(),
            pixels,
        })
    }

    /// Encodes an image as PNG.
    pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| AppError::composition(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }
}

/// Loads images from disk, the web, or inline data URLs.
#[derive(Clone, Default)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_url(&self, url: &Url) -> Result<ImageHandle> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::image_load(SourceKind::Url, format!("Request failed: {}", e)))?;

        let mime_hint = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::image_load(SourceKind::Url, format!("Failed to read body: {}", e)))?;

        ImageProcessor::decode(bytes.to_vec(), mime_hint.as_deref(), SourceKind::Url)
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, source: &ImageSource) -> Result<ImageHandle> {
        match source {
            ImageSource::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    AppError::image_load(
                        SourceKind::File,
                        format!("Failed to read {}: {}", path.display(), e),
                    )
                })?;
                ImageProcessor::decode(bytes, None, SourceKind::File)
            }
            ImageSource::Url(url) => self.fetch_url(url).await,
            ImageSource::Data { mime_type, base64 } => {
                ImageProcessor::decode_base64(base64, mime_type, SourceKind::Url)
            }
        }
    }
}
