//! AI-Meme Core Library
//!
//! This library provides the core functionality for the AI-Meme generator:
//! loading images and templates, asking Gemini for caption ideas or image
//! edits, and compositing outlined captions onto the final PNG.
//!
//! # Overview
//!
//! - **Session**: editor state and the asynchronous operations on it via [`session`]
//! - **Compositing**: caption wrapping and outlined text rendering via [`compositor`]
//! - **AI Integration**: Gemini caption and edit calls via [`gemini`]
//! - **Templates**: trending template catalog via [`templates`]
//!
//! # Quick Start
//!
//! ```ignore
//! use ai_meme_core::{AiMeme, Session, caption::Slot, image_processing::ImageSource};
//!
//! let app = AiMeme::new()?;
//! let mut session = Session::new();
//!
//! session.load_image(ImageSource::parse("cat.png")?, app.fetcher()).await?;
//! session.set_caption_text(Slot::Top, "i can haz");
//! let png = session.export(app.compositor())?;
//! ```
//!
//! # Module Structure
//!
//! - [`caption`]: Caption styling and placement
//! - [`compositor`]: Layout and rendering of captions
//! - [`config`]: Configuration loading and management
//! - [`error`]: Error types and result aliases
//! - [`fonts`]: Font choices and font file discovery
//! - [`gemini`]: Gemini AI client
//! - [`image_processing`]: Image sources, decoding and encoding
//! - [`services`]: Traits for the external collaborators
//! - [`session`]: The editing session state machine
//! - [`templates`]: Template catalog

pub mod caption;
pub mod compositor;
pub mod config;
pub mod error;
pub mod fonts;
pub mod gemini;
pub mod image_processing;
pub mod services;
pub mod session;
pub mod templates;

// Re-export primary types for convenience
pub use compositor::Compositor;
pub use config::Config;
pub use error::{AppError, Result};
pub use gemini::GeminiClient;
pub use session::Session;

use fonts::FontBook;
use image_processing::HttpImageFetcher;
use templates::ImgflipClient;

/// Main entry point for the AI-Meme application.
///
/// Bundles the production collaborators a [`Session`] needs. The Gemini
/// client is created on demand so that template browsing and exporting work
/// without an API key.
pub struct AiMeme {
    config: Config,
    fetcher: HttpImageFetcher,
    templates: ImgflipClient,
    compositor: Compositor,
}

impl AiMeme {
    /// Creates a new instance with configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self::with_config(config))
    }

    /// Creates an instance with custom configuration.
    ///
    /// Use this when you need to override environment-based configuration,
    /// such as specifying a different model or font directory.
    pub fn with_config(config: Config) -> Self {
        let fonts = FontBook::discover(config.font_dir.as_deref());
        Self {
            fetcher: HttpImageFetcher::new(),
            templates: ImgflipClient::new(config.templates_url.clone()),
            compositor: Compositor::new(fonts),
            config,
        }
    }

    /// Creates a Gemini client for caption suggestions and edits.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingEnvVar`] if no API key is configured.
    pub fn gemini(&self) -> Result<GeminiClient> {
        GeminiClient::new(&self.config)
    }

    pub fn fetcher(&self) -> &HttpImageFetcher {
        &self.fetcher
    }

    pub fn templates(&self) -> &ImgflipClient {
        &self.templates
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    ///
    /// Allows modifying settings like the model name after initialization.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
