use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::subscribers::{ChatId, Registry};

/// Outbound delivery capability used by the broadcast fan-out.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()>;
}

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const GREETING: &str =
    "Привет! Я буду присылать тебе дайджест технологических новостей. Жди первую новость!";

/// Telegram Bot API client over plain HTTP.
pub struct TelegramClient {
    api_base: String,
    token: String,
    poll_timeout_seconds: u64,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, poll_timeout_seconds: u64) -> Result<Self> {
        Self::with_api_base(DEFAULT_API_BASE, token, poll_timeout_seconds)
    }

    /// Same as `new` but against a custom API base, used by tests.
    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        poll_timeout_seconds: u64,
    ) -> Result<Self> {
        // Client timeout must outlast the long-poll window.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_seconds + 15))
            .user_agent("techdigest/0.1.0")
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            api_base: api_base.into(),
            token: token.into(),
            poll_timeout_seconds,
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Deliver one message with Telegram HTML formatting.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let body = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(Duration::from_secs(10))
            .json(&body)
            .send()
            .await
            .context("sendMessage request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage returned status {}: {}", status, body);
        }

        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .context("failed to decode sendMessage response")?;
        if !body.ok {
            anyhow::bail!(
                "sendMessage rejected: {}",
                body.description.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(())
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout_seconds.to_string()),
            ])
            .send()
            .await
            .context("getUpdates request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("getUpdates returned status {}: {}", status, body);
        }

        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .context("failed to decode getUpdates response")?;
        if !body.ok {
            anyhow::bail!(
                "getUpdates rejected: {}",
                body.description.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(body.result.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Transport for TelegramClient {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await
    }
}

/// Service inbound subscription events until shutdown is signalled.
///
/// A `/start` command registers the chat; the greeting goes out only on
/// first registration. Poll failures back off and retry, they are never
/// fatal to the listener.
pub async fn run_listener(client: Arc<TelegramClient>, registry: Registry, shutdown: Arc<Notify>) {
    let mut offset = 0i64;
    info!("listener: ready for subscription commands");

    loop {
        let updates = tokio::select! {
            result = client.get_updates(offset) => result,
            _ = shutdown.notified() => {
                info!("listener: shutdown requested, exiting");
                return;
            }
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    handle_update(&client, &registry, update).await;
                }
            }
            Err(e) => {
                warn!(%e, "listener: getUpdates failed, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                    _ = shutdown.notified() => {
                        info!("listener: shutdown requested, exiting");
                        return;
                    }
                }
            }
        }
    }
}

async fn handle_update(client: &TelegramClient, registry: &Registry, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    if !is_start_command(message.text.as_deref()) {
        return;
    }

    let chat_id = message.chat.id;
    let username = message.from.and_then(|from| from.username);
    if registry.add(chat_id).await {
        match username {
            Some(username) => info!(chat_id, %username, "subscriber registered"),
            None => info!(chat_id, "subscriber registered"),
        }
        if let Err(e) = client.send_message(chat_id, GREETING).await {
            warn!(chat_id, %e, "failed to send greeting");
        }
    }
}

fn is_start_command(text: Option<&str>) -> bool {
    text.map(|t| t.split_whitespace().next() == Some("/start"))
        .unwrap_or(false)
}

// Telegram Bot API wire structures (only the fields this bot reads).
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: Option<String>,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}
