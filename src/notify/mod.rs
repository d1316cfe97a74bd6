pub mod sink;
pub mod summary;

use anyhow::Result;
use async_trait::async_trait;

pub use sink::{StdoutSink, TelegramSink, WebhookSink};
pub use summary::summarize_changes;

#[async_trait]
pub trait NotifySink: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, text: &str) -> Result<()>;
}
