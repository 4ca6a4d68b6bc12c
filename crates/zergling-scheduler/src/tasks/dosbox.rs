//! Keeps the OBS DOSBox capture pointed at the running emulator.
//!
//! Every tick looks up the newest DOSBox-X process. When it is a process we
//! haven't set OBS up for yet, the capture is switched to it and only the
//! source filters labelled for its machine are left on.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;
use zergling_core::{DosboxInstance, ProcessProbe, Result, ZerglingError};

use crate::engine::{CronTask, TickContext};

pub const NAME: &str = "dosbox";
pub const DELAY_MS: u64 = 1000;

#[derive(Default)]
struct Active {
    pid: Option<u32>,
    /// Set once OBS has been switched to this process.
    machine: Option<String>,
}

#[derive(Default)]
pub struct Dosbox {
    active: Mutex<Active>,
}

impl Dosbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CronTask for Dosbox {
    async fn tick(&self, ctx: &TickContext) -> Result<()> {
        let (Some(obs), Some(processes)) = (ctx.stream.obs(), ctx.stream.processes()) else {
            return Ok(());
        };
        if !obs.is_connected() {
            return Err(ZerglingError::NotConnected("obs".into()));
        }
        let Some(instance) = processes.dosbox_instance().await? else {
            return Ok(());
        };

        let mut active = self.active.lock().await;
        if active.pid == Some(instance.pid) && active.machine.is_some() {
            return Ok(());
        }
        active.pid = Some(instance.pid);
        active.machine = None;

        let Some(machine) = processes.dosbox_machine(&instance).await? else {
            ctx.log.debug(format!("DOSBox {} has no machine name yet", instance.pid));
            return Ok(());
        };
        obs.capture_dosbox(&machine).await?;
        ctx.log.info(format!("Switched DOSBox to active machine: {machine}"));
        active.machine = Some(machine);
        Ok(())
    }
}

/// Reads the process table with `ps`.
///
/// The machine name is the stem of the `-conf` file the emulator was started
/// with, or `default` when it was started without one.
#[derive(Debug, Default, Clone, Copy)]
pub struct PsProbe;

#[async_trait]
impl ProcessProbe for PsProbe {
    async fn dosbox_instance(&self) -> Result<Option<DosboxInstance>> {
        let output = tokio::process::Command::new("ps")
            .args(["-axo", "pid=,etime=,command="])
            .output()
            .await?;
        if !output.status.success() {
            return Err(ZerglingError::Task(format!("ps exited with {}", output.status)));
        }
        Ok(latest_dosbox(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn dosbox_machine(&self, instance: &DosboxInstance) -> Result<Option<String>> {
        Ok(Some(machine_from_command(&instance.command)))
    }
}

/// One row of `ps -o pid=,etime=,command=`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub elapsed_secs: u64,
    pub command: String,
}

pub fn parse_ps_output(text: &str) -> Vec<ProcessRow> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pid = parts.next()?.parse().ok()?;
            let elapsed_secs = parse_etime(parts.next()?)?;
            let command = parts.collect::<Vec<_>>().join(" ");
            Some(ProcessRow {
                pid,
                elapsed_secs,
                command,
            })
        })
        .collect()
}

/// `[[dd-]hh:]mm:ss` → seconds.
pub fn parse_etime(etime: &str) -> Option<u64> {
    let (days, clock) = match etime.split_once('-') {
        Some((days, clock)) => (days.parse::<u64>().ok()?, clock),
        None => (0, etime),
    };
    let mut secs = 0u64;
    for part in clock.split(':') {
        secs = secs * 60 + part.parse::<u64>().ok()?;
    }
    Some(days * 86_400 + secs)
}

/// Whether a command line runs DOSBox-X (`.../dosbox-x` followed by more path).
pub fn is_dosbox_command(command: &str) -> bool {
    let lower = command.to_ascii_lowercase();
    lower.match_indices("/dosbox-x").any(|(at, needle)| {
        lower[at + needle.len()..]
            .chars()
            .next()
            .is_some_and(|c| !c.is_whitespace())
    })
}

/// The most recently started DOSBox-X process in a `ps` listing.
pub fn latest_dosbox(ps_output: &str) -> Option<DosboxInstance> {
    parse_ps_output(ps_output)
        .into_iter()
        .filter(|row| is_dosbox_command(&row.command))
        .min_by_key(|row| row.elapsed_secs)
        .map(|row| DosboxInstance {
            pid: row.pid,
            command: row.command,
        })
}

pub fn machine_from_command(command: &str) -> String {
    let mut args = command.split_whitespace();
    while let Some(arg) = args.next() {
        let conf = match arg.strip_prefix("-conf=") {
            Some(path) => Some(path),
            None if arg == "-conf" => args.next(),
            None => None,
        };
        if let Some(stem) = conf.and_then(|path| Path::new(path).file_stem()) {
            return stem.to_string_lossy().into_owned();
        }
    }
    "default".to_string()
}
