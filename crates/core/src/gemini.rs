use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::{CaptionService, EditedImage, ImageEditService};
use gemini_rust::{Blob, Content, Gemini, Message, Part, Role};
use tracing::{debug, warn};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

const CAPTION_SYSTEM_PROMPT: &str = "You are a witty meme writer. Look at the image and write \
five short, funny meme captions for it. Each caption must be under 12 words. Reply with a JSON \
array of strings and nothing else.";

const EDIT_SYSTEM_PROMPT: &str = "You edit images for memes. Apply the requested change to the \
image and return the edited image. Keep the composition recognizable.";

pub struct GeminiClient {
    caption_client: Gemini,
    image_client: Gemini,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self {
            caption_client: Self::build(api_key, &config.model_name)?,
            image_client: Self::build(api_key, &config.image_model_name)?,
        })
    }

    fn build(api_key: &str, model: &str) -> Result<Gemini> {
        // Explicitly set the base URL to avoid BadScheme error
        let base_url = url::Url::parse(BASE_URL)
            .map_err(|e| AppError::Config(format!("Invalid base URL: {}", e)))?;

        let model_name = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        let model_url = format!("{}{}", BASE_URL, model_name);

        Gemini::with_model_and_base_url(api_key, model_url, base_url)
            .map_err(|e| AppError::Config(format!("Failed to create Gemini client: {}", e)))
    }

    fn image_message(base64_image: String, mime_type: String, prompt: String) -> Message {
        let image_part = Part::InlineData {
            inline_data: Blob {
                mime_type,
                data: base64_image,
            },
        };

        let text_part = Part::Text {
            text: prompt,
            thought: None,
            thought_signature: None,
        };

        Message {
            role: Role::User,
            content: Content {
                role: Some(Role::User),
                parts: Some(vec![text_part, image_part]),
            },
        }
    }
}

fn classify(e: impl std::fmt::Debug) -> AppError {
    let detail = format!("{:?}", e);
    if detail.contains("429") || detail.contains("RESOURCE_EXHAUSTED") {
        AppError::RateLimited
    } else {
        AppError::gemini(format!("API request failed: {}", detail))
    }
}

impl CaptionService for GeminiClient {
    async fn generate_captions(&self, base64_image: String, mime_type: String) -> Result<Vec<String>> {
        let message = Self::image_message(
            base64_image,
            mime_type,
            "Generate meme captions for this image.".to_string(),
        );

        let response = self
            .caption_client
            .generate_content()
            .with_system_prompt(CAPTION_SYSTEM_PROMPT)
            .with_messages(vec![message])
            .execute()
            .await
            .map_err(classify)?;

        let text: String = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.as_ref())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::Text { text, thought, .. } if !thought.unwrap_or(false) => {
                            Some(text.as_str())
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::gemini("No text response received from Gemini"));
        }
        debug!(chars = text.len(), "Caption response received");
        parse_caption_list(&text)
    }
}

impl ImageEditService for GeminiClient {
    async fn edit_image(
        &self,
        base64_image: String,
        mime_type: String,
        instruction: String,
    ) -> Result<EditedImage> {
        let message = Self::image_message(base64_image, mime_type, instruction);

        let response = self
            .image_client
            .generate_content()
            .with_system_prompt(EDIT_SYSTEM_PROMPT)
            .with_messages(vec![message])
            .execute()
            .await
            .map_err(classify)?;

        let mut refusal = String::new();
        if let Some(parts) = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.as_ref())
        {
            for part in parts {
                match part {
                    Part::InlineData { inline_data, .. } => {
                        return Ok(EditedImage {
                            base64_image: inline_data.data.clone(),
                            mime_type: inline_data.mime_type.clone(),
                        });
                    }
                    Part::Text { text, .. } => refusal.push_str(text),
                    _ => {}
                }
            }
        }

        if !refusal.trim().is_empty() {
            warn!(reply = %refusal.trim(), "Edit model replied without an image");
        }
        Err(AppError::gemini("No image received from Gemini"))
    }
}

/// Extracts caption strings from a model reply.
///
/// Accepts a JSON array, a JSON object with a `captions` array, either one
/// wrapped in a fenced code block, or a plain list with one caption per line.
pub fn parse_caption_list(text: &str) -> Result<Vec<String>> {
    let body = strip_code_fence(text.trim());

    let from_json = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => Some(items),
        Ok(serde_json::Value::Object(mut map)) => match map.remove("captions") {
            Some(serde_json::Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    };

    let captions: Vec<String> = match from_json {
        Some(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect(),
        None => body
            .lines()
            .map(clean_list_line)
            .filter(|s| !s.is_empty())
            .collect(),
    };

    if captions.is_empty() {
        return Err(AppError::SuggestionGeneration(
            "response contained no captions".to_string(),
        ));
    }
    Ok(captions)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn clean_list_line(line: &str) -> String {
    let line = line.trim();
    let line = line.trim_start_matches(|c: char| c.is_ascii_digit());
    let line = line.trim_start_matches(['.', ')', '-', '*', ' ']);
    line.trim_matches(|c: char| c == '"' || c.is_whitespace())
        .to_string()
}
