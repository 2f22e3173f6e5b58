//! Seams to the external collaborators a session talks to.
//!
//! The session never names a concrete client. Production implementations
//! live in [`crate::gemini`], [`crate::templates`] and
//! [`crate::image_processing`]; tests substitute in-memory fakes.

use crate::error::Result;
use crate::image_processing::{ImageHandle, ImageSource};
use crate::templates::MemeTemplate;
use std::future::Future;

/// Suggests captions for an image.
pub trait CaptionService {
    /// Returns suggested captions, best first.
    fn generate_captions(
        &self,
        base64_image: String,
        mime_type: String,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// An edited image as returned by an [`ImageEditService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    pub base64_image: String,
    pub mime_type: String,
}

/// Applies a natural-language edit to an image.
pub trait ImageEditService {
    fn edit_image(
        &self,
        base64_image: String,
        mime_type: String,
        instruction: String,
    ) -> impl Future<Output = Result<EditedImage>> + Send;
}

/// Lists meme templates.
pub trait TemplateSource {
    fn trending_memes(&self) -> impl Future<Output = Result<Vec<MemeTemplate>>> + Send;
}

/// Turns an [`ImageSource`] into a decoded [`ImageHandle`].
pub trait ImageFetcher {
    fn fetch(&self, source: &ImageSource) -> impl Future<Output = Result<ImageHandle>> + Send;
}
