//! Error types for the ai-meme-core library.
//!
//! Every failure a session can surface maps to one variant here. The
//! [`AppError::user_message`] mapping produces the single line of text the
//! session keeps in its error slot.

use thiserror::Error;

/// Errors that can occur within the ai-meme-core library.
///
/// Each variant represents a specific failure mode with contextual information
/// to help diagnose and handle errors appropriately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// A source image could not be read or decoded.
    #[error("Image load failed ({source_kind}): {message}")]
    ImageLoad {
        /// What kind of source failed, used to pick the user-facing message.
        source_kind: SourceKind,
        message: String,
    },

    /// An operation was invoked without its inputs in place.
    #[error("{0}")]
    Precondition(Precondition),

    /// The caption service failed or returned something unusable.
    #[error("Caption generation failed: {0}")]
    SuggestionGeneration(String),

    /// The image edit service failed or returned no image.
    #[error("Image edit failed: {0}")]
    ImageEdit(String),

    /// The template catalog could not be fetched.
    #[error("Template catalog fetch failed: {0}")]
    CatalogFetch(String),

    /// Drawing or encoding the final meme failed.
    #[error("Composition failed: {0}")]
    Composition(String),

    /// General Gemini API error.
    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    /// Rate limited by the Gemini API.
    #[error("Rate limited by Gemini API, please retry later")]
    RateLimited,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Url,
    Generated,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::Url => write!(f, "url"),
            SourceKind::Generated => write!(f, "generated"),
        }
    }
}

/// Missing inputs reported by [`AppError::Precondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("no image loaded for caption generation")]
    NoImageForCaptions,
    #[error("no image loaded for editing")]
    NoImageForEdit,
    #[error("edit instruction is blank")]
    BlankInstruction,
    #[error("no image loaded for export")]
    NoImageForExport,
    #[error("add at least one caption")]
    NoCaptions,
    #[error("font size must be a positive number")]
    InvalidFontSize,
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an image load error for the given source kind.
    pub fn image_load(source_kind: SourceKind, msg: impl Into<String>) -> Self {
        Self::ImageLoad {
            source_kind,
            message: msg.into(),
        }
    }

    /// Creates a composition error with the given message.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Creates a Gemini API error with the given message.
    pub fn gemini(msg: impl Into<String>) -> Self {
        Self::GeminiApi(msg.into())
    }

    /// Returns `true` for precondition failures.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// The single line shown to the user in the session error slot.
    pub fn user_message(&self) -> String {
        match self {
            Self::ImageLoad {
                source_kind: SourceKind::File,
                ..
            } => "Failed to process image file.".to_string(),
            Self::ImageLoad { .. } => {
                "Failed to load template image. Please try another or upload your own.".to_string()
            }
            Self::Precondition(p) => match p {
                Precondition::NoImageForCaptions => {
                    "Please select and wait for an image to load before generating captions."
                        .to_string()
                }
                Precondition::NoImageForEdit => {
                    "Please select and wait for an image to load before editing.".to_string()
                }
                Precondition::BlankInstruction => {
                    "Please enter a description of the edit you want to make.".to_string()
                }
                Precondition::NoImageForExport | Precondition::NoCaptions => {
                    "Please add at least one caption before downloading.".to_string()
                }
                Precondition::InvalidFontSize => "Font size must be a positive number.".to_string(),
            },
            Self::SuggestionGeneration(_) => {
                "Couldn't generate captions. The AI might be busy. Please try again.".to_string()
            }
            Self::ImageEdit(_) => {
                "Couldn't edit the image. Please try again with a different prompt.".to_string()
            }
            Self::CatalogFetch(_) => {
                "Could not load trending memes. Please check your connection and try refreshing."
                    .to_string()
            }
            Self::Composition(_) => {
                "Failed to load image for download. An unexpected error occurred.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<Precondition> for AppError {
    fn from(p: Precondition) -> Self {
        Self::Precondition(p)
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
