//! What a command or redemption handler runs against.

use std::sync::Arc;

use zergling_core::{ChatMessage, Result};
use zergling_stream::StreamInterface;

/// Per-event context: the shared stream interface plus where the event came from.
#[derive(Clone)]
pub struct ActionContext {
    pub stream: Arc<StreamInterface>,
    /// Channel the triggering message was posted in.
    pub target: String,
    /// The triggering chat message; `None` for redemptions.
    pub message: Option<ChatMessage>,
}

impl ActionContext {
    pub fn for_message(stream: Arc<StreamInterface>, message: ChatMessage) -> Self {
        Self {
            stream,
            target: message.channel.clone(),
            message: Some(message),
        }
    }

    /// Context for an event that has no chat line; replies go to the default channel.
    pub fn for_default_channel(stream: Arc<StreamInterface>) -> Self {
        let target = stream.config().chat.channel_name(None);
        Self {
            stream,
            target,
            message: None,
        }
    }

    /// Reply in the channel the event came from.
    pub async fn reply(&self, text: &str, quiet: bool) -> Result<()> {
        self.stream.chat().say(&self.target, text, quiet).await
    }

    /// Display name of whoever triggered the event, if known.
    pub fn user_name(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.display_name.as_deref().unwrap_or(&m.user))
    }
}
