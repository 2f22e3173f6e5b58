//! Meme template catalog.
//!
//! The full catalog is fetched once per session. What the user sees is a
//! small window over it: either a random sample or the first few search
//! hits. Neither operation touches the full list.

use crate::error::{AppError, Result};
use crate::services::TemplateSource;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on how many templates are shown at once.
pub const MAX_DISPLAYED: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeTemplate {
    pub name: String,
    pub url: String,
}

impl MemeTemplate {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    all: Vec<MemeTemplate>,
    displayed: Vec<MemeTemplate>,
}

impl TemplateCatalog {
    pub fn new(all: Vec<MemeTemplate>) -> Self {
        Self {
            all,
            displayed: Vec::new(),
        }
    }

    pub fn all(&self) -> &[MemeTemplate] {
        &self.all
    }

    pub fn displayed(&self) -> &[MemeTemplate] {
        &self.displayed
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Replaces the full catalog and resamples the displayed set.
    pub fn replace<R: Rng + ?Sized>(&mut self, all: Vec<MemeTemplate>, rng: &mut R) {
        self.all = all;
        self.resample(rng);
    }

    /// Shows a uniform random sample of up to [`MAX_DISPLAYED`] templates.
    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut shuffled = self.all.clone();
        shuffled.shuffle(rng);
        shuffled.truncate(MAX_DISPLAYED);
        self.displayed = shuffled;
    }

    /// Shows the first [`MAX_DISPLAYED`] templates whose name contains
    /// `query`, ignoring case, in catalog order.
    ///
    /// A blank query is not handled here; callers resample instead.
    pub fn filter(&mut self, query: &str) {
        let needle = query.to_lowercase();
        self.displayed = self
            .all
            .iter()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .take(MAX_DISPLAYED)
            .cloned()
            .collect();
        debug!(query, hits = self.displayed.len(), "Filtered templates");
    }
}

#[derive(Deserialize)]
struct ImgflipResponse {
    success: bool,
    data: Option<ImgflipData>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct ImgflipData {
    memes: Vec<MemeTemplate>,
}

/// Parses an imgflip `get_memes` response body.
pub fn parse_imgflip(body: &str) -> Result<Vec<MemeTemplate>> {
    let response: ImgflipResponse = serde_json::from_str(body)?;
    if !response.success {
        return Err(AppError::CatalogFetch(
            response
                .error_message
                .unwrap_or_else(|| "service reported failure".to_string()),
        ));
    }
    response
        .data
        .map(|d| d.memes)
        .ok_or_else(|| AppError::CatalogFetch("response has no data".to_string()))
}

/// Fetches trending templates from an imgflip-compatible endpoint.
#[derive(Clone)]
pub struct ImgflipClient {
    client: reqwest::Client,
    url: String,
}

impl ImgflipClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl TemplateSource for ImgflipClient {
    async fn trending_memes(&self) -> Result<Vec<MemeTemplate>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::CatalogFetch(format!("Request failed: {}", e)))?
            .text()
            .await
            .map_err(|e| AppError::CatalogFetch(format!("Failed to read body: {}", e)))?;

        let memes = parse_imgflip(&body)?;
        debug!(count = memes.len(), url = %self.url, "Fetched template catalog");
        Ok(memes)
    }
}
