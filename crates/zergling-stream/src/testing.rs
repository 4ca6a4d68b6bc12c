//! In-memory collaborators for exercising handlers and tasks without a
//! chat platform or OBS.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zergling_core::{ChatSink, ObsControl, Result, ZerglingConfig, ZerglingError};

use crate::bus::EventBus;
use crate::interface::StreamInterface;

/// One line captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub channel: String,
    pub message: String,
    pub quiet: bool,
    /// Set for announcements.
    pub color: Option<String>,
}

/// Chat sink that records every line instead of sending it.
#[derive(Default)]
pub struct RecordingSink {
    posted: Mutex<Vec<Posted>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<Posted> {
        self.posted.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|p| p.message).collect()
    }

    fn push(&self, posted: Posted) {
        if let Ok(mut lines) = self.posted.lock() {
            lines.push(posted);
        }
    }
}

#[async_trait]
impl ChatSink for RecordingSink {
    async fn say(&self, channel: &str, message: &str, quiet: bool) -> Result<()> {
        self.push(Posted {
            channel: channel.into(),
            message: message.into(),
            quiet,
            color: None,
        });
        Ok(())
    }

    async fn announce(&self, channel: &str, message: &str, color: &str) -> Result<()> {
        self.push(Posted {
            channel: channel.into(),
            message: message.into(),
            quiet: false,
            color: Some(color.into()),
        });
        Ok(())
    }
}

/// Scriptable OBS stand-in.
#[derive(Default)]
pub struct FakeObs {
    pub connected: AtomicBool,
    pub webcam_active: AtomicBool,
    pub frame_visible: AtomicBool,
    pub frame_changes: AtomicUsize,
    /// Machines the DOSBox capture was switched to, in order.
    pub dosbox_machines: Mutex<Vec<String>>,
}

impl FakeObs {
    pub fn connected() -> Self {
        let obs = Self::default();
        obs.connected.store(true, Ordering::SeqCst);
        obs
    }

    pub fn captured_machines(&self) -> Vec<String> {
        self.dosbox_machines.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ObsControl for FakeObs {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn is_webcam_active(&self) -> Result<bool> {
        if !self.is_connected() {
            return Err(ZerglingError::NotConnected("obs".into()));
        }
        Ok(self.webcam_active.load(Ordering::SeqCst))
    }

    async fn set_webcam_frame(&self, visible: bool) -> Result<()> {
        if !self.is_connected() {
            return Err(ZerglingError::NotConnected("obs".into()));
        }
        self.frame_visible.store(visible, Ordering::SeqCst);
        self.frame_changes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn capture_dosbox(&self, machine: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(ZerglingError::NotConnected("obs".into()));
        }
        if let Ok(mut machines) = self.dosbox_machines.lock() {
            machines.push(machine.to_string());
        }
        Ok(())
    }
}

/// Build a stream interface over `data_dir` that records its chat output.
/// Must be called inside a tokio runtime.
pub fn interface_with(
    config: ZerglingConfig,
    data_dir: &Path,
    obs: Option<Arc<dyn ObsControl>>,
) -> Result<(Arc<StreamInterface>, Arc<RecordingSink>)> {
    let sink = Arc::new(RecordingSink::default());
    let mut iface = StreamInterface::new(Arc::new(config), data_dir.to_path_buf(), sink.clone(), EventBus::new())?;
    if let Some(obs) = obs {
        iface = iface.with_obs(obs);
    }
    Ok((Arc::new(iface), sink))
}

/// [`interface_with`] using the default config and no OBS.
pub fn interface(data_dir: &Path) -> Result<(Arc<StreamInterface>, Arc<RecordingSink>)> {
    interface_with(ZerglingConfig::default(), data_dir, None)
}
