//! Session state types and request tickets.
//!
//! Each asynchronous session operation is split in two: a `begin_*` call
//! that validates inputs, raises the in-flight flag and hands back a ticket,
//! and a `finish_*` call that takes the ticket plus the service result. The
//! service call in between does not borrow the session, so different
//! operations can overlap.

use crate::image_processing::{ImageHandle, ImageSource};
use std::sync::Arc;

/// Which images are loaded.
///
/// `Empty` -> `Unedited` (load) -> `Edited` (AI edit)
///        \<- any state on the next load
#[derive(Debug, Clone, Default)]
pub enum ImageState {
    #[default]
    Empty,
    /// Original and current are the same image.
    Unedited(Arc<ImageHandle>),
    /// The current image is an AI edit of the original.
    Edited {
        original: Arc<ImageHandle>,
        current: Arc<ImageHandle>,
    },
}

impl ImageState {
    /// The unedited image, used as the base for every edit.
    pub fn original(&self) -> Option<&Arc<ImageHandle>> {
        match self {
            Self::Empty => None,
            Self::Unedited(image) => Some(image),
            Self::Edited { original, .. } => Some(original),
        }
    }

    /// The image that is displayed and exported.
    pub fn current(&self) -> Option<&Arc<ImageHandle>> {
        match self {
            Self::Empty => None,
            Self::Unedited(image) => Some(image),
            Self::Edited { current, .. } => Some(current),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_edited(&self) -> bool {
        matches!(self, Self::Edited { .. })
    }
}

/// Requests currently awaiting a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    pub loading_image: bool,
    pub generating_captions: bool,
    pub editing_image: bool,
    pub fetching_templates: bool,
}

/// Whether a finished request changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The image was replaced while the request was running.
    Discarded,
}

/// A pending image load.
#[derive(Debug)]
pub struct LoadTicket {
    pub(crate) generation: u64,
    pub(crate) source: ImageSource,
}

impl LoadTicket {
    pub fn source(&self) -> &ImageSource {
        &self.source
    }
}

/// A pending caption suggestion request for a snapshot of the current image.
#[derive(Debug)]
pub struct CaptionTicket {
    pub(crate) generation: u64,
    pub(crate) image: Arc<ImageHandle>,
}

impl CaptionTicket {
    pub fn image(&self) -> &ImageHandle {
        &self.image
    }
}

/// A pending edit of the original image.
#[derive(Debug)]
pub struct EditTicket {
    pub(crate) generation: u64,
    pub(crate) original: Arc<ImageHandle>,
    pub(crate) instruction: String,
}

impl EditTicket {
    pub fn original(&self) -> &ImageHandle {
        &self.original
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// A pending catalog fetch.
#[derive(Debug)]
pub struct CatalogTicket {
    pub(crate) _private: (),
}
