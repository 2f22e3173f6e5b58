//! Meme editing session.
//!
//! A [`Session`] owns everything the editor shows: the loaded image (and its
//! unedited original), both captions, AI caption suggestions, the template
//! catalog, in-flight request flags and the one error message on display.
//!
//! Failures never discard valid state. Every operation either clears the
//! error slot on success or replaces it with the failure's user message.
//!
//! # Usage
//!
//! ```ignore
//! use ai_meme_core::session::Session;
//! use ai_meme_core::caption::Slot;
//!
//! let mut session = Session::new();
//! session.load_image(source, &fetcher).await?;
//! session.request_caption_suggestions(&gemini).await?;
//! session.use_suggestion(Slot::Top, 0);
//! let png = session.export(&compositor)?;
//! ```

mod state;

pub use state::{CaptionTicket, CatalogTicket, EditTicket, ImageState, InFlight, LoadTicket, Outcome};

use crate::caption::{Anchor, CaptionSpec, Slot, default_captions};
use crate::compositor::{self, Canvas, Compositor};
use crate::error::{AppError, Precondition, Result, SourceKind};
use crate::image_processing::{ImageHandle, ImageProcessor, ImageSource};
use crate::services::{CaptionService, EditedImage, ImageEditService, ImageFetcher, TemplateSource};
use crate::templates::{MemeTemplate, TemplateCatalog};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Session {
    image: ImageState,
    captions: [CaptionSpec; 2],
    suggestions: Vec<String>,
    edit_text: String,
    catalog: TemplateCatalog,
    in_flight: InFlight,
    error: Option<String>,
    /// Bumped on every image load; results stamped with an older value
    /// belong to a replaced image.
    generation: u64,
    rng: StdRng,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a session whose template sampling is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            image: ImageState::Empty,
            captions: default_captions(),
            suggestions: Vec::new(),
            edit_text: String::new(),
            catalog: TemplateCatalog::default(),
            in_flight: InFlight::default(),
            error: None,
            generation: 0,
            rng,
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn image_state(&self) -> &ImageState {
        &self.image
    }

    pub fn original(&self) -> Option<&ImageHandle> {
        self.image.original().map(Arc::as_ref)
    }

    pub fn current(&self) -> Option<&ImageHandle> {
        self.image.current().map(Arc::as_ref)
    }

    pub fn caption(&self, slot: Slot) -> &CaptionSpec {
        &self.captions[slot.index()]
    }

    pub fn captions(&self) -> &[CaptionSpec; 2] {
        &self.captions
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn edit_text(&self) -> &str {
        &self.edit_text
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// The templates currently offered to the user.
    pub fn templates(&self) -> &[MemeTemplate] {
        self.catalog.displayed()
    }

    pub fn in_flight(&self) -> InFlight {
        self.in_flight
    }

    pub fn is_generating_captions(&self) -> bool {
        self.in_flight.generating_captions
    }

    pub fn is_editing_image(&self) -> bool {
        self.in_flight.editing_image
    }

    /// The message currently shown to the user, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // ---------------------------------------------------------------------
    // Caption fields
    // ---------------------------------------------------------------------

    fn caption_mut(&mut self, slot: Slot) -> &mut CaptionSpec {
        &mut self.captions[slot.index()]
    }

    pub fn set_caption_text(&mut self, slot: Slot, text: impl Into<String>) {
        self.caption_mut(slot).text = text.into();
    }

    pub fn set_font_family(&mut self, slot: Slot, family: impl Into<String>) {
        self.caption_mut(slot).font_family = family.into();
    }

    /// Sets the font size in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::InvalidFontSize`] and leaves the size
    /// unchanged if `size` is not a positive finite number.
    pub fn set_font_size(&mut self, slot: Slot, size: f32) -> Result<()> {
        if !size.is_finite() || size <= 0.0 {
            return Err(Precondition::InvalidFontSize.into());
        }
        self.caption_mut(slot).font_size = size;
        Ok(())
    }

    pub fn set_color(&mut self, slot: Slot, color: impl Into<String>) {
        self.caption_mut(slot).color = color.into();
    }

    /// Moves a caption. Coordinates are not clamped.
    pub fn set_anchor(&mut self, slot: Slot, anchor: Anchor) {
        self.caption_mut(slot).anchor = anchor;
    }

    pub fn set_active(&mut self, slot: Slot, active: bool) {
        self.caption_mut(slot).active = active;
    }

    pub fn set_edit_text(&mut self, text: impl Into<String>) {
        self.edit_text = text.into();
    }

    /// Copies suggestion `index` into a caption. Returns `false` if there is
    /// no such suggestion.
    pub fn use_suggestion(&mut self, slot: Slot, index: usize) -> bool {
        match self.suggestions.get(index).cloned() {
            Some(text) => {
                self.set_caption_text(slot, text);
                true
            }
            None => false,
        }
    }

    fn fail<T>(&mut self, err: AppError) -> Result<T> {
        warn!(error = %err, "Session operation failed");
        self.error = Some(err.user_message());
        Err(err)
    }

    // ---------------------------------------------------------------------
    // Image loading
    // ---------------------------------------------------------------------

    /// Starts loading a new image.
    ///
    /// Resets both captions, suggestions, the edit instruction and the
    /// error, and clears the image until the load finishes.
    pub fn begin_load(&mut self, source: ImageSource) -> LoadTicket {
        self.generation += 1;
        self.image = ImageState::Empty;
        self.captions = default_captions();
        self.suggestions.clear();
        self.edit_text.clear();
        self.error = None;
        self.in_flight.loading_image = true;
        // Requests for the replaced image finish as discarded.
        self.in_flight.generating_captions = false;
        self.in_flight.editing_image = false;
        debug!(source = %source, generation = self.generation, "Loading image");
        LoadTicket {
            generation: self.generation,
            source,
        }
    }

    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<ImageHandle>) -> Result<Outcome> {
        if ticket.generation != self.generation {
            debug!(source = %ticket.source, "Discarding superseded image load");
            return Ok(Outcome::Discarded);
        }
        self.in_flight.loading_image = false;

        match result {
            Ok(image) => {
                info!(
                    width = image.width(),
                    height = image.height(),
                    mime = image.mime_type(),
                    "Image loaded"
                );
                self.image = ImageState::Unedited(Arc::new(image));
                Ok(Outcome::Applied)
            }
            Err(err) => {
                let err = match err {
                    e @ AppError::ImageLoad { .. } => e,
                    other => AppError::image_load(ticket.source.kind(), other.to_string()),
                };
                self.fail(err)
            }
        }
    }

    /// Loads an image from a file, URL or data URL.
    pub async fn load_image<F: ImageFetcher>(&mut self, source: ImageSource, fetcher: &F) -> Result<()> {
        let ticket = self.begin_load(source);
        let result = fetcher.fetch(ticket.source()).await;
        self.finish_load(ticket, result).map(|_| ())
    }

    // ---------------------------------------------------------------------
    // Caption suggestions
    // ---------------------------------------------------------------------

    /// Starts a caption suggestion request for the current image.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::NoImageForCaptions`] if no image is loaded.
    pub fn begin_caption_suggestions(&mut self) -> Result<CaptionTicket> {
        let Some(image) = self.image.current().cloned() else {
            return self.fail(Precondition::NoImageForCaptions.into());
        };
        self.in_flight.generating_captions = true;
        self.error = None;
        self.suggestions.clear();
        Ok(CaptionTicket {
            generation: self.generation,
            image,
        })
    }

    pub fn finish_caption_suggestions(
        &mut self,
        ticket: CaptionTicket,
        result: Result<Vec<String>>,
    ) -> Result<Outcome> {
        if ticket.generation != self.generation {
            debug!("Discarding caption suggestions for a replaced image");
            return Ok(Outcome::Discarded);
        }
        self.in_flight.generating_captions = false;

        match result {
            Ok(captions) => {
                info!(count = captions.len(), "Caption suggestions received");
                self.suggestions = captions;
                self.error = None;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.suggestions.clear();
                let err = match err {
                    e @ AppError::SuggestionGeneration(_) => e,
                    other => AppError::SuggestionGeneration(other.to_string()),
                };
                self.fail(err)
            }
        }
    }

    /// Asks the caption service for suggestions for the current image.
    pub async fn request_caption_suggestions<S: CaptionService>(&mut self, service: &S) -> Result<()> {
        let ticket = self.begin_caption_suggestions()?;
        let result = service
            .generate_captions(ticket.image().to_base64(), ticket.image().mime_type().to_string())
            .await;
        self.finish_caption_suggestions(ticket, result).map(|_| ())
    }

    // ---------------------------------------------------------------------
    // Image edits
    // ---------------------------------------------------------------------

    /// Starts an edit of the original image.
    ///
    /// The instruction is remembered as the session's edit text.
    ///
    /// # Errors
    ///
    /// Returns [`Precondition::NoImageForEdit`] if no image is loaded, or
    /// [`Precondition::BlankInstruction`] if `instruction` is blank.
    pub fn begin_image_edit(&mut self, instruction: &str) -> Result<EditTicket> {
        self.edit_text = instruction.to_string();
        let Some(original) = self.image.original().cloned() else {
            return self.fail(Precondition::NoImageForEdit.into());
        };
        if instruction.trim().is_empty() {
            return self.fail(Precondition::BlankInstruction.into());
        }
        self.in_flight.editing_image = true;
        self.error = None;
        Ok(EditTicket {
            generation: self.generation,
            original,
            instruction: instruction.to_string(),
        })
    }

    /// Applies an edit result. Only the current image changes.
    pub fn finish_image_edit(&mut self, ticket: EditTicket, result: Result<EditedImage>) -> Result<Outcome> {
        if ticket.generation != self.generation {
            debug!(instruction = %ticket.instruction, "Discarding edit for a replaced image");
            return Ok(Outcome::Discarded);
        }
        self.in_flight.editing_image = false;

        let decoded = result.and_then(|edited| {
            ImageProcessor::decode_base64(&edited.base64_image, &edited.mime_type, SourceKind::Generated)
        });

        match decoded {
            Ok(current) => {
                info!(
                    width = current.width(),
                    height = current.height(),
                    instruction = %ticket.instruction,
                    "Edit applied"
                );
                self.image = ImageState::Edited {
                    original: ticket.original,
                    current: Arc::new(current),
                };
                self.error = None;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                let err = match err {
                    e @ AppError::ImageEdit(_) => e,
                    other => AppError::ImageEdit(other.to_string()),
                };
                self.fail(err)
            }
        }
    }

    /// Asks the edit service to apply `instruction` to the original image.
    pub async fn request_image_edit<S: ImageEditService>(&mut self, service: &S, instruction: &str) -> Result<()> {
        let ticket = self.begin_image_edit(instruction)?;
        let result = service
            .edit_image(
                ticket.original().to_base64(),
                ticket.original().mime_type().to_string(),
                ticket.instruction().to_string(),
            )
            .await;
        self.finish_image_edit(ticket, result).map(|_| ())
    }

    // ---------------------------------------------------------------------
    // Templates
    // ---------------------------------------------------------------------

    pub fn begin_template_fetch(&mut self) -> CatalogTicket {
        self.in_flight.fetching_templates = true;
        self.error = None;
        CatalogTicket { _private: () }
    }

    /// Replaces the catalog. On failure the catalog and displayed set are
    /// left empty so the next refresh fetches again.
    pub fn finish_template_fetch(
        &mut self,
        _ticket: CatalogTicket,
        result: Result<Vec<MemeTemplate>>,
    ) -> Result<()> {
        self.in_flight.fetching_templates = false;
        match result {
            Ok(all) => {
                info!(count = all.len(), "Template catalog loaded");
                self.catalog.replace(all, &mut self.rng);
                Ok(())
            }
            Err(err) => {
                self.catalog.replace(Vec::new(), &mut self.rng);
                let err = match err {
                    e @ AppError::CatalogFetch(_) => e,
                    other => AppError::CatalogFetch(other.to_string()),
                };
                self.fail(err)
            }
        }
    }

    /// Fetches the full template catalog and samples the displayed set.
    pub async fn fetch_templates<T: TemplateSource>(&mut self, source: &T) -> Result<()> {
        let ticket = self.begin_template_fetch();
        let result = source.trending_memes().await;
        self.finish_template_fetch(ticket, result)
    }

    /// Shows a fresh random sample, fetching the catalog first if it is empty.
    pub async fn refresh_templates<T: TemplateSource>(&mut self, source: &T) -> Result<()> {
        if self.catalog.is_empty() {
            return self.fetch_templates(source).await;
        }
        self.catalog.resample(&mut self.rng);
        Ok(())
    }

    /// Filters the catalog by name. A blank query refreshes instead.
    pub async fn search_templates<T: TemplateSource>(&mut self, query: &str, source: &T) -> Result<()> {
        if query.trim().is_empty() {
            return self.refresh_templates(source).await;
        }
        self.catalog.filter(query);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    fn exportable(&mut self) -> Result<Arc<ImageHandle>> {
        let Some(image) = self.image.current().cloned() else {
            return self.fail(Precondition::NoImageForExport.into());
        };
        if self.captions.iter().all(CaptionSpec::is_empty) {
            return self.fail(Precondition::NoCaptions.into());
        }
        Ok(image)
    }

    /// Composes the current image with both captions as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if there is no image or both captions
    /// are empty, and [`AppError::Composition`] if drawing fails.
    pub fn export(&mut self, compositor: &Compositor) -> Result<Vec<u8>> {
        let image = self.exportable()?;
        let result = compositor.compose(&image, &self.captions);
        self.settle_export(result)
    }

    /// Like [`Self::export`] but draws onto a caller-supplied canvas.
    pub fn export_to<C: Canvas>(&mut self, canvas: &mut C) -> Result<Vec<u8>> {
        let image = self.exportable()?;
        let result = compositor::render(canvas, &image, &self.captions);
        self.settle_export(result)
    }

    fn settle_export(&mut self, result: Result<Vec<u8>>) -> Result<Vec<u8>> {
        match result {
            Ok(png) => {
                self.error = None;
                info!(bytes = png.len(), "Meme exported");
                Ok(png)
            }
            Err(err) => {
                let err = match err {
                    e @ AppError::Composition(_) => e,
                    other => AppError::composition(other.to_string()),
                };
                self.fail(err)
            }
        }
    }
}
