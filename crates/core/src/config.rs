use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CAPTION_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TEMPLATES_URL: &str = "https://api.imgflip.com/get_memes";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    /// Model used for caption suggestions.
    pub model_name: String,
    /// Model used for image edits; must be able to return inline image data.
    pub image_model_name: String,
    pub templates_url: String,
    pub font_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let model_name =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_CAPTION_MODEL.to_string());
        let image_model_name =
            env::var("GEMINI_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());

        let templates_url =
            env::var("MEME_TEMPLATES_URL").unwrap_or_else(|_| DEFAULT_TEMPLATES_URL.to_string());
        url::Url::parse(&templates_url)
            .map_err(|e| AppError::config(format!("MEME_TEMPLATES_URL is not a valid URL: {}", e)))?;

        let font_dir = env::var_os("MEME_FONT_DIR").map(PathBuf::from);

        Ok(Self {
            gemini_api_key,
            model_name,
            image_model_name,
            templates_url,
            font_dir,
        })
    }

    /// The Gemini API key, required only when an AI call is made.
    pub fn api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model_name: DEFAULT_CAPTION_MODEL.to_string(),
            image_model_name: DEFAULT_IMAGE_MODEL.to_string(),
            templates_url: DEFAULT_TEMPLATES_URL.to_string(),
            font_dir: None,
        }
    }
}
