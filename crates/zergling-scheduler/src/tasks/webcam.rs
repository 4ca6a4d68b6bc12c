//! Keeps the decorative webcam frame in sync with the webcam itself.

use async_trait::async_trait;
use tokio::sync::Mutex;
use zergling_core::{Result, ZerglingError};

use crate::engine::{CronTask, TickContext};

pub const NAME: &str = "webcam";
pub const DELAY_MS: u64 = 1000;

#[derive(Default)]
pub struct Webcam {
    /// Last frame state we set; `None` until the first tick.
    status: Mutex<Option<bool>>,
}

impl Webcam {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CronTask for Webcam {
    async fn tick(&self, ctx: &TickContext) -> Result<()> {
        let Some(obs) = ctx.stream.obs() else {
            return Ok(());
        };
        if !obs.is_connected() {
            return Err(ZerglingError::NotConnected("obs".into()));
        }

        let cam = obs.is_webcam_active().await? || obs.is_webcam_testing().await?;
        let mut status = self.status.lock().await;
        if *status != Some(cam) {
            obs.set_webcam_frame(cam).await?;
            *status = Some(cam);
            ctx.log.info(format!("Toggled webcam: {cam}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TaskLogger;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use zergling_core::ZerglingConfig;
    use zergling_stream::testing::{self, FakeObs};

    #[tokio::test]
    async fn test_frame_follows_webcam() {
        let dir = tempfile::tempdir().unwrap();
        let obs = Arc::new(FakeObs::connected());
        let (stream, _) = testing::interface_with(ZerglingConfig::default(), dir.path(), Some(obs.clone())).unwrap();
        let ctx = TickContext {
            config: stream.config().task_config(NAME),
            stream,
            log: TaskLogger::new(NAME),
        };
        let task = Webcam::new();

        task.tick(&ctx).await.unwrap();
        assert_eq!(obs.frame_changes.load(Ordering::SeqCst), 1);
        assert!(!obs.frame_visible.load(Ordering::SeqCst));

        task.tick(&ctx).await.unwrap();
        assert_eq!(obs.frame_changes.load(Ordering::SeqCst), 1);

        obs.webcam_active.store(true, Ordering::SeqCst);
        task.tick(&ctx).await.unwrap();
        assert_eq!(obs.frame_changes.load(Ordering::SeqCst), 2);
        assert!(obs.frame_visible.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_disconnected_obs_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let obs = Arc::new(FakeObs::default());
        let (stream, _) = testing::interface_with(ZerglingConfig::default(), dir.path(), Some(obs)).unwrap();
        let ctx = TickContext {
            config: stream.config().task_config(NAME),
            stream,
            log: TaskLogger::new(NAME),
        };
        let err = Webcam::new().tick(&ctx).await.unwrap_err();
        assert!(err.is_transient());
    }
}
