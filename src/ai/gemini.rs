use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{
    Draft, DraftContent, FreshnessReport, ImagePayload, PostSample, StyleGuide,
};

use super::parse::{parse_json, parse_titles};
use super::{prompts, ContentGenerator, IdeaRequest};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
        }
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, model);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::GeminiApi(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response.json().await?)
    }

    /// Text completion with JSON output requested from the model.
    async fn generate_json_text(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![user_content(prompt)],
            system_instruction: Some(Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompts::EDITOR_SYSTEM_PROMPT.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: 0.8,
                response_mime_type: Some("application/json".to_string()),
                response_modalities: None,
            },
        };

        let response = self.generate(&self.model, &request).await?;
        let text = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(AppError::GeminiApi("empty response".to_string()));
        }
        tracing::debug!("Gemini returned {} chars", text.len());
        Ok(text)
    }
}

fn user_content(text: String) -> Content {
    Content {
        role: "user".to_string(),
        parts: vec![Part { text }],
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn analyze_style(&self, samples: &[PostSample]) -> Result<StyleGuide> {
        let text = self.generate_json_text(prompts::analyze_style(samples)).await?;
        parse_json(&text)
    }

    async fn generate_ideas(&self, request: IdeaRequest<'_>) -> Result<Vec<String>> {
        let text = self.generate_json_text(prompts::generate_ideas(&request)).await?;
        parse_titles(&text)
    }

    async fn generate_similar_ideas(
        &self,
        base_title: &str,
        request: IdeaRequest<'_>,
    ) -> Result<Vec<String>> {
        let text = self
            .generate_json_text(prompts::generate_similar_ideas(base_title, &request))
            .await?;
        parse_titles(&text)
    }

    async fn create_draft(&self, title: &str, style_guide: &StyleGuide) -> Result<DraftContent> {
        let text = self
            .generate_json_text(prompts::create_draft(title, style_guide))
            .await?;
        let draft: DraftContent = parse_json(&text)?;
        if draft.content.trim().is_empty() {
            return Err(AppError::MalformedResponse(
                "draft has no content".to_string(),
            ));
        }
        Ok(draft)
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload> {
        let request = GenerateRequest {
            contents: vec![user_content(prompt.to_string())],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 1.0,
                response_mime_type: None,
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            },
        };

        let response = self.generate(IMAGE_MODEL, &request).await?;
        response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
            .map(|inline| ImagePayload {
                mime_type: inline.mime_type,
                data: inline.data,
            })
            .ok_or_else(|| AppError::ImageProvider("Gemini returned no image".to_string()))
    }

    async fn analyze_content_freshness(&self, post: &Draft) -> Result<FreshnessReport> {
        let text = self
            .generate_json_text(prompts::content_freshness(post))
            .await?;
        parse_json(&text)
    }
}
