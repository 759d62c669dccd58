use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;

use crate::ai::ContentGenerator;
use crate::error::{AppError, Result};
use crate::models::{AutomationSettings, ImagePayload, ImageSource};

const PEXELS_SEARCH_URL: &str = "https://api.pexels.com/v1/search";
const UNSPLASH_SEARCH_URL: &str = "https://api.unsplash.com/search/photos";
const PIXABAY_SEARCH_URL: &str = "https://pixabay.com/api/";

/// Something that can produce a featured image for a post.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `query` is a short search phrase; `prompt` a full description for
    /// generative providers.
    async fn fetch_image(&self, query: &str, prompt: &str) -> Result<ImagePayload>;
}

/// Picks the provider for the configured source. Validation only, no I/O,
/// so a missing key is reported before any generation starts.
#[derive(Clone)]
pub struct ImageProviders {
    client: Client,
}

impl ImageProviders {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub fn select(
        &self,
        settings: &AutomationSettings,
        generator: Arc<dyn ContentGenerator>,
    ) -> Result<Arc<dyn ImageProvider>> {
        let source = settings.image_source;
        let client = self.client.clone();

        let provider: Arc<dyn ImageProvider> = match source {
            ImageSource::Ai => Arc::new(AiImageProvider { generator }),
            ImageSource::Pexels => Arc::new(PexelsProvider {
                client,
                api_key: required_key(settings, source)?,
            }),
            ImageSource::Unsplash => Arc::new(UnsplashProvider {
                client,
                api_key: required_key(settings, source)?,
            }),
            ImageSource::Pixabay => Arc::new(PixabayProvider {
                client,
                api_key: required_key(settings, source)?,
            }),
        };
        Ok(provider)
    }
}

fn required_key(settings: &AutomationSettings, source: ImageSource) -> Result<String> {
    settings
        .stock_api_key(source)
        .map(str::to_string)
        .ok_or_else(|| AppError::MissingApiKey(source.display_name().to_string()))
}

impl Default for ImageProviders {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AiImageProvider {
    generator: Arc<dyn ContentGenerator>,
}

#[async_trait]
impl ImageProvider for AiImageProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn fetch_image(&self, _query: &str, prompt: &str) -> Result<ImagePayload> {
        self.generator.generate_image(prompt).await
    }
}

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    large: String,
}

pub struct PexelsProvider {
    client: Client,
    api_key: String,
}

#[async_trait]
impl ImageProvider for PexelsProvider {
    fn name(&self) -> &'static str {
        "pexels"
    }

    async fn fetch_image(&self, query: &str, _prompt: &str) -> Result<ImagePayload> {
        let response = self
            .client
            .get(PEXELS_SEARCH_URL)
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await?;
        let body: PexelsResponse = check_status(response, "Pexels").await?.json().await?;

        let url = body
            .photos
            .into_iter()
            .next()
            .map(|p| p.src.large)
            .ok_or_else(|| no_results("Pexels", query))?;
        download(&self.client, &url).await
    }
}

#[derive(Debug, Deserialize)]
struct UnsplashResponse {
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

pub struct UnsplashProvider {
    client: Client,
    api_key: String,
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    fn name(&self) -> &'static str {
        "unsplash"
    }

    async fn fetch_image(&self, query: &str, _prompt: &str) -> Result<ImagePayload> {
        let response = self
            .client
            .get(UNSPLASH_SEARCH_URL)
            .header("Authorization", format!("Client-ID {}", self.api_key))
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await?;
        let body: UnsplashResponse = check_status(response, "Unsplash").await?.json().await?;

        let url = body
            .results
            .into_iter()
            .next()
            .map(|p| p.urls.regular)
            .ok_or_else(|| no_results("Unsplash", query))?;
        download(&self.client, &url).await
    }
}

#[derive(Debug, Deserialize)]
struct PixabayResponse {
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
}

pub struct PixabayProvider {
    client: Client,
    api_key: String,
}

#[async_trait]
impl ImageProvider for PixabayProvider {
    fn name(&self) -> &'static str {
        "pixabay"
    }

    async fn fetch_image(&self, query: &str, _prompt: &str) -> Result<ImagePayload> {
        let response = self
            .client
            .get(PIXABAY_SEARCH_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("image_type", "photo"),
                ("orientation", "horizontal"),
                ("per_page", "3"),
            ])
            .send()
            .await?;
        let body: PixabayResponse = check_status(response, "Pixabay").await?.json().await?;

        let url = body
            .hits
            .into_iter()
            .next()
            .map(|h| h.large_image_url)
            .ok_or_else(|| no_results("Pixabay", query))?;
        download(&self.client, &url).await
    }
}

async fn check_status(response: reqwest::Response, provider: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(AppError::ImageProvider(format!(
        "{} returned HTTP {}: {}",
        provider, status, text
    )))
}

fn no_results(provider: &str, query: &str) -> AppError {
    AppError::ImageProvider(format!("{} found no images for \"{}\"", provider, query))
}

async fn download(client: &Client, url: &str) -> Result<ImagePayload> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow::anyhow!("Failed to download image: HTTP {}", response.status()).into());
    }
    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("image/"))
        .unwrap_or("image/jpeg")
        .to_string();
    let bytes = response.bytes().await?;

    Ok(ImagePayload {
        mime_type,
        data: BASE64.encode(&bytes),
    })
}
