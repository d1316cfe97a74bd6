use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::notify::NotifySink;
use crate::source::http::post_json;

pub struct StdoutSink;

#[async_trait]
impl NotifySink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// Sends plain-text messages through the Telegram bot API.
pub struct TelegramSink {
    url: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            url: format!("https://api.telegram.org/bot{}/sendMessage", bot_token.into()),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl NotifySink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        post_json(&self.url, &body, None).await?;
        Ok(())
    }
}

/// Posts the message as JSON to an arbitrary webhook endpoint.
pub struct WebhookSink {
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl NotifySink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, text: &str) -> Result<()> {
        let body = json!({ "content": text });
        post_json(&self.url, &body, None).await?;
        Ok(())
    }
}
