use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// A fetched news article, normalized from the wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub source_name: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
}

/// Source of candidate articles for a pipeline tick.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_candidates(&self, language: &str) -> Result<Vec<Article>>;
}

/// Technology outlets queried first; a broader query runs only if these
/// yield nothing.
const TECH_DOMAINS: &[&str] = &[
    "techcrunch.com",
    "theverge.com",
    "wired.com",
    "arstechnica.com",
    "engadget.com",
    "zdnet.com",
    "venturebeat.com",
    "thenextweb.com",
];

const DEFAULT_API_URL: &str = "https://newsapi.org/v2/everything";

/// NewsAPI `everything` endpoint client.
pub struct NewsApiClient {
    api_url: String,
    api_key: String,
    page_size: u32,
    client: reqwest::Client,
}

impl NewsApiClient {
    pub fn new(api_key: impl Into<String>, page_size: u32) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, api_key, page_size)
    }

    /// Same as `new` but against a custom endpoint, used by tests.
    pub fn with_api_url(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        page_size: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("techdigest/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            page_size,
            client,
        })
    }

    async fn query(&self, language: &str, domains: Option<String>) -> Result<Vec<Article>> {
        let mut params = vec![
            ("language".to_string(), language.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
            ("sortBy".to_string(), "publishedAt".to_string()),
            ("q".to_string(), "technology".to_string()),
        ];
        if let Some(domains) = domains {
            params.push(("domains".to_string(), domains));
        }

        let response = self
            .client
            .get(&self.api_url)
            .query(&params)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("news API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("news API returned status {}: {}", status, body);
        }

        let body: NewsApiResponse = response
            .json()
            .await
            .context("failed to decode news API response")?;

        debug!(count = body.articles.len(), "news: fetched candidate batch");
        Ok(body.articles.into_iter().map(Article::from).collect())
    }
}

#[async_trait::async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch_candidates(&self, language: &str) -> Result<Vec<Article>> {
        let articles = self
            .query(language, Some(TECH_DOMAINS.join(",")))
            .await?;
        if !articles.is_empty() {
            return Ok(articles);
        }

        // Nothing from the preferred outlets; widen to the whole index.
        info!("news: no articles from technology domains, widening query");
        self.query(language, None).await
    }
}

// NewsAPI wire structures. Every field may be null in practice, so the
// wire types carry Options and `Article::from` normalizes them.
#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[allow(dead_code)]
    status: Option<String>,
    #[serde(default)]
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    source: Option<WireSource>,
}

#[derive(Debug, Default, Deserialize)]
struct WireSource {
    #[serde(default)]
    name: Option<String>,
}

impl From<WireArticle> for Article {
    fn from(wire: WireArticle) -> Self {
        Article {
            title: wire.title.unwrap_or_default(),
            description: wire.description.unwrap_or_default(),
            content: wire.content.unwrap_or_default(),
            url: wire.url.unwrap_or_default(),
            source_name: wire.source.and_then(|s| s.name).unwrap_or_default(),
            author: wire.author.unwrap_or_default(),
            // Missing timestamps read as ancient so they earn no recency bonus.
            published_at: wire.published_at.unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}
