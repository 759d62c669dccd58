use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::config::PublisherConfig;
use crate::error::{AppError, Result};
use crate::models::{Draft, PostSample};

/// Result of handing a post to the host CMS.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishReceipt {
    pub url: String,
}

/// The host CMS. It receives finished posts and supplies existing ones for
/// style analysis.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, draft: &Draft) -> Result<PublishReceipt>;

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostSample>>;
}

pub fn publisher_from_config(config: &PublisherConfig) -> Result<Arc<dyn Publisher>> {
    match config.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(endpoint) => {
            let username = config
                .username
                .clone()
                .ok_or_else(|| AppError::Config("publisher.username is required".to_string()))?;
            let password = config.application_password.clone().ok_or_else(|| {
                AppError::Config("publisher.application_password is required".to_string())
            })?;
            Ok(Arc::new(RestPublisher::new(endpoint, username, password)?))
        }
        None => Ok(Arc::new(SimulatedPublisher::new(Duration::from_millis(
            config.simulated_delay_ms,
        )))),
    }
}

/// Local stand-in for a CMS: waits, then reports `/blog/<slug>`.
pub struct SimulatedPublisher {
    delay: Duration,
    published: Mutex<Vec<PostSample>>,
}

impl SimulatedPublisher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            published: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Publisher for SimulatedPublisher {
    async fn publish(&self, draft: &Draft) -> Result<PublishReceipt> {
        tokio::time::sleep(self.delay).await;

        self.published.lock().await.push(PostSample {
            title: draft.title.clone(),
            content: draft.content.clone(),
        });
        Ok(PublishReceipt {
            url: format!("/blog/{}", draft.slug()),
        })
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostSample>> {
        let published = self.published.lock().await;
        Ok(published.iter().rev().take(limit).cloned().collect())
    }
}

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    title: &'a str,
    content: &'a str,
    excerpt: &'a str,
    status: &'a str,
    slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    featured_media: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    link: String,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RemotePost {
    title: Rendered,
    content: Rendered,
}

#[derive(Debug, Deserialize)]
struct Rendered {
    rendered: String,
}

/// WordPress REST API (`wp/v2`) with application-password auth.
pub struct RestPublisher {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

impl RestPublisher {
    pub fn new(endpoint: &str, username: String, password: String) -> Result<Self> {
        let mut base = Url::parse(endpoint)
            .map_err(|e| AppError::Config(format!("invalid publisher endpoint: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("content-agent/1.0")
            .build()
            .unwrap_or_default();
        Ok(Self {
            client,
            base,
            username,
            password,
        })
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.base
            .join(&format!("wp-json/wp/v2/{}", path))
            .map_err(|e| AppError::Config(format!("invalid publisher endpoint: {}", e)))
    }

    async fn upload_featured_image(&self, draft: &Draft) -> Result<Option<i64>> {
        let bytes = match BASE64.decode(draft.featured_image.data.as_bytes()) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::warn!("Skipping featured image for draft {}: {}", draft.id, e);
                return Ok(None);
            }
        };
        let extension = draft
            .featured_image
            .mime_type
            .rsplit('/')
            .next()
            .unwrap_or("jpg");

        let response = self
            .client
            .post(self.api_url("media")?)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, &draft.featured_image.mime_type)
            .header(
                reqwest::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.{}\"", draft.slug(), extension),
            )
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Publish(format!("media upload failed: {}", error_text)));
        }
        let media: MediaResponse = response.json().await?;
        Ok(Some(media.id))
    }
}

#[async_trait]
impl Publisher for RestPublisher {
    async fn publish(&self, draft: &Draft) -> Result<PublishReceipt> {
        let featured_media = self.upload_featured_image(draft).await?;

        let request = CreatePostRequest {
            title: &draft.title,
            content: &draft.content,
            excerpt: &draft.meta_description,
            status: "publish",
            slug: draft.slug(),
            featured_media,
        };

        let response = self
            .client
            .post(self.api_url("posts")?)
            .basic_auth(&self.username, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Publish(format!("API error: {}", error_text)));
        }

        let created: CreatedPost = response.json().await?;
        Ok(PublishReceipt { url: created.link })
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostSample>> {
        let response = self
            .client
            .get(self.api_url("posts")?)
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("per_page", limit.clamp(1, 100).to_string()),
                ("_fields", "title,content".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch posts: HTTP {}", response.status()).into());
        }

        let posts: Vec<RemotePost> = response.json().await?;
        Ok(posts
            .into_iter()
            .map(|p| PostSample {
                title: p.title.rendered,
                content: p.content.rendered,
            })
            .collect())
    }
}
