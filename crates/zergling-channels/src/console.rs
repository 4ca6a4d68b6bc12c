//! Console channel: a local stand-in for the chat platform.
//!
//! Every stdin line is a chat message from the local user. Lines of the form
//! `@redeem <reward-uuid> [text]` simulate a channel-point redemption instead.
//! Chat output goes to stdout, one line per message.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use zergling_actions::Dispatcher;
use zergling_core::{ChatMessage, ChatSink, RedemptionEvent, Result, ZerglingError};

const REDEEM_PREFIX: &str = "@redeem";

/// Chat output written to any async writer (stdout by default).
pub struct ConsoleSink<W = tokio::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Send + Unpin> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    async fn write_line(&self, line: String) -> Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

/// `[#channel] message`, with quiet lines marked.
pub fn format_line(channel: &str, message: &str, quiet: bool) -> String {
    if quiet {
        format!("[{channel}] (quiet) {message}")
    } else {
        format!("[{channel}] {message}")
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> ChatSink for ConsoleSink<W> {
    async fn say(&self, channel: &str, message: &str, quiet: bool) -> Result<()> {
        self.write_line(format_line(channel, message, quiet)).await
    }

    async fn announce(&self, channel: &str, message: &str, color: &str) -> Result<()> {
        self.write_line(format!("[{channel}] 📢 ({color}) {message}")).await
    }
}

/// One parsed console line.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    Chat(ChatMessage),
    Redemption(RedemptionEvent),
}

/// Turn a console line into an event. Blank lines yield `None`.
pub fn parse_line(line: &str, channel: &str, user: &str) -> Result<Option<ConsoleEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(REDEEM_PREFIX) else {
        return Ok(Some(ConsoleEvent::Chat(ChatMessage::new(channel, user, line))));
    };

    let rest = rest.trim_start();
    let (reward_id, message) = match rest.split_once(char::is_whitespace) {
        Some((id, text)) => (id, Some(text.trim()).filter(|t| !t.is_empty())),
        None => (rest, None),
    };
    if reward_id.is_empty() {
        return Err(ZerglingError::Channel(format!("usage: {REDEEM_PREFIX} <reward-uuid> [text]")));
    }
    Ok(Some(ConsoleEvent::Redemption(RedemptionEvent {
        reward_id: reward_id.to_string(),
        reward_title: "console redemption".into(),
        user_name: user.to_string(),
        user_id: "0".into(),
        message: message.map(str::to_string),
        reward_cost: 0,
    })))
}

/// Feeds console lines into the dispatcher.
pub struct ConsoleReader {
    dispatcher: Arc<Dispatcher>,
    channel: String,
    user: String,
}

impl ConsoleReader {
    pub fn new(dispatcher: Arc<Dispatcher>, user: &str) -> Self {
        let channel = dispatcher.stream().config().chat.channel_name(None);
        Self {
            dispatcher,
            channel,
            user: user.to_string(),
        }
    }

    /// Read lines until EOF. Each event runs on its own task; the outcome is
    /// only logged. Returns the number of events dispatched.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<usize> {
        let mut lines = reader.lines();
        let mut dispatched = 0;
        while let Some(line) = lines.next_line().await? {
            let event = match parse_line(&line, &self.channel, &self.user) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("⚠️ {e}");
                    continue;
                }
            };
            let handle = match event {
                ConsoleEvent::Chat(msg) => self.dispatcher.spawn_chat_message(msg),
                ConsoleEvent::Redemption(ev) => self.dispatcher.spawn_redemption(ev),
            };
            dispatched += 1;
            tokio::spawn(async move {
                match handle.await {
                    Ok(outcome) => tracing::debug!("Console event: {outcome:?}"),
                    Err(e) => tracing::warn!("⚠️ Console event task failed: {e}"),
                }
            });
        }
        tracing::info!("🖥️ Console input closed");
        Ok(dispatched)
    }
}
