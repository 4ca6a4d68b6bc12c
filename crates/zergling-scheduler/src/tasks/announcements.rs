//! Recurring chat announcements.
//!
//! ```toml
//! [[tasks.announcements.messages]]
//! message = "Follow the stream!"
//! color = "random"       # optional
//! delay = 900000         # ms between repeats
//! enabled = true
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use zergling_core::{Result, ZerglingError};

use crate::engine::{CronTask, TickContext};
use crate::queue::TaskQueue;

pub const NAME: &str = "announcements";
pub const DELAY_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Announcement {
    pub message: String,
    #[serde(default)]
    pub color: Option<String>,
    pub delay: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
struct AnnouncementsConfig {
    #[serde(default)]
    messages: Vec<Announcement>,
}

/// Holds the queue, built from config on the first tick.
#[derive(Default)]
pub struct Announcements {
    queue: Mutex<Option<TaskQueue<Announcement>>>,
}

impl Announcements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post every announcement due at `now`. Returns how many were posted.
    pub async fn run_due(&self, ctx: &TickContext, now: DateTime<Utc>) -> Result<usize> {
        let mut guard = self.queue.lock().await;
        if guard.is_none() {
            let config: AnnouncementsConfig = ctx
                .config
                .clone()
                .try_into()
                .map_err(|e| ZerglingError::Config(format!("[tasks.announcements]: {e}")))?;
            let mut queue = TaskQueue::new();
            queue.add_tasks(
                config.messages.into_iter().filter(|m| m.enabled).map(|m| {
                    let delay = chrono::Duration::milliseconds(m.delay as i64);
                    (m, delay)
                }),
                now,
            );
            ctx.log.info(format!("Queued {} announcement(s)", queue.len()));
            *guard = Some(queue);
        }
        let Some(queue) = guard.as_mut() else {
            return Ok(0);
        };

        let due = queue.todo_tasks(now);
        for item in &due {
            ctx.stream
                .make_announcement(&item.data.message, item.data.color.as_deref())
                .await?;
            queue.mark_task_as_done(&item.id, now);
        }
        Ok(due.len())
    }
}

#[async_trait]
impl CronTask for Announcements {
    async fn tick(&self, ctx: &TickContext) -> Result<()> {
        self.run_due(ctx, Utc::now()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskLogger;
    use zergling_core::ZerglingConfig;
    use zergling_stream::testing;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_announces_enabled_messages_on_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let config = ZerglingConfig::parse(
            r#"
            [[tasks.announcements.messages]]
            message = "Follow!"
            delay = 60000

            [[tasks.announcements.messages]]
            message = "Discord!"
            color = "purple"
            delay = 120000

            [[tasks.announcements.messages]]
            message = "Off"
            delay = 1000
            enabled = false
            "#,
        )
        .unwrap();
        let (stream, sink) = testing::interface_with(config, dir.path(), None).unwrap();
        let ctx = TickContext {
            config: stream.config().task_config(NAME),
            stream: stream.clone(),
            log: TaskLogger::new(NAME),
        };
        let task = Announcements::new();

        assert_eq!(task.run_due(&ctx, at(0)).await.unwrap(), 0);
        assert_eq!(task.run_due(&ctx, at(59)).await.unwrap(), 0);
        assert_eq!(task.run_due(&ctx, at(60)).await.unwrap(), 1);
        assert_eq!(task.run_due(&ctx, at(61)).await.unwrap(), 0);
        assert_eq!(task.run_due(&ctx, at(120)).await.unwrap(), 2);

        let lines = sink.lines();
        assert_eq!(sink.messages(), vec!["Follow!", "Follow!", "Discord!"]);
        assert!(lines[0].quiet && lines[0].color.is_none());
        assert_eq!(lines[2].color.as_deref(), Some("purple"));
    }

    #[tokio::test]
    async fn test_missing_config_means_no_announcements() {
        let dir = tempfile::tempdir().unwrap();
        let (stream, sink) = testing::interface(dir.path()).unwrap();
        let ctx = TickContext {
            config: stream.config().task_config(NAME),
            stream: stream.clone(),
            log: TaskLogger::new(NAME),
        };
        let task = Announcements::new();
        assert_eq!(task.run_due(&ctx, at(1_000_000)).await.unwrap(), 0);
        assert!(sink.lines().is_empty());
    }
}
