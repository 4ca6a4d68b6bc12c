//! Scheduler engine: one independent loop per periodic task.
//!
//! Each loop sleeps for its task's delay, checks the stop flag, then runs one
//! tick. Stop is cooperative: a sleeping loop wakes and exits, a loop in the
//! middle of a tick finishes that tick first.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use zergling_core::config::SchedulerConfig;
use zergling_core::{Result, ZerglingError};
use zergling_stream::StreamInterface;

/// A periodic task. Any state it keeps between ticks lives in `self`.
#[async_trait]
pub trait CronTask: Send + Sync {
    async fn tick(&self, ctx: &TickContext) -> Result<()>;
}

/// An entry of the task table.
#[derive(Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub delay: Duration,
    pub task: Arc<dyn CronTask>,
}

impl TaskDescriptor {
    pub fn new(name: &str, delay_ms: u64, task: impl CronTask + 'static) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::from_millis(delay_ms),
            task: Arc::new(task),
        }
    }
}

impl std::fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("delay", &self.delay)
            .finish()
    }
}

/// Logger that tags every line with the task name.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task: Arc<str>,
}

impl TaskLogger {
    pub fn new(task: &str) -> Self {
        Self { task: task.into() }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn debug(&self, msg: impl Display) {
        tracing::debug!(task = %self.task, "{msg}");
    }

    pub fn info(&self, msg: impl Display) {
        tracing::info!(task = %self.task, "{msg}");
    }

    pub fn warn(&self, msg: impl Display) {
        tracing::warn!(task = %self.task, "{msg}");
    }

    pub fn error(&self, msg: impl Display) {
        tracing::error!(task = %self.task, "{msg}");
    }
}

/// What one tick gets to work with. Built fresh for every tick.
pub struct TickContext {
    pub stream: Arc<StreamInterface>,
    /// `[tasks.<name>]`, or an empty table.
    pub config: toml::Value,
    pub log: TaskLogger,
}

/// What a loop does when a tick reports a lost connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Skip quietly; try again next tick.
    #[default]
    Tolerate,
    /// End this task's loop.
    Exit,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    /// Ticks running longer than this count as failed.
    pub tick_timeout: Option<Duration>,
    pub disconnect: DisconnectPolicy,
    /// Task names that are not started.
    pub disabled: Vec<String>,
}

impl SchedulerOptions {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            tick_timeout: config.tick_timeout_ms.map(Duration::from_millis),
            disconnect: if config.exit_on_disconnect {
                DisconnectPolicy::Exit
            } else {
                DisconnectPolicy::Tolerate
            },
            disabled: config.disabled.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    /// Stop requested; finishing the current tick.
    Exiting,
    Stopped,
}

/// Snapshot of one task's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub state: TaskState,
    pub ticks: u64,
    pub failures: u64,
    /// Failures that were logged: one per failure streak.
    pub reported_errors: u64,
    pub has_errored: bool,
}

struct TaskRun {
    state: Mutex<TaskState>,
    ticks: AtomicU64,
    failures: AtomicU64,
    reported_errors: AtomicU64,
    has_errored: AtomicBool,
}

impl TaskRun {
    fn new() -> Self {
        Self {
            state: Mutex::new(TaskState::Created),
            ticks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            reported_errors: AtomicU64::new(0),
            has_errored: AtomicBool::new(false),
        }
    }

    fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: TaskState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn stats(&self) -> TaskStats {
        TaskStats {
            state: self.state(),
            ticks: self.ticks.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            reported_errors: self.reported_errors.load(Ordering::Relaxed),
            has_errored: self.has_errored.load(Ordering::Relaxed),
        }
    }
}

/// Owns the run state of every started task.
pub struct Scheduler {
    stream: Arc<StreamInterface>,
    options: SchedulerOptions,
    exit: watch::Sender<bool>,
    runs: Mutex<HashMap<String, Arc<TaskRun>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(stream: Arc<StreamInterface>, options: SchedulerOptions) -> Self {
        let (exit, _) = watch::channel(false);
        Self {
            stream,
            options,
            exit,
            runs: Mutex::new(HashMap::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Scheduler configured from `[scheduler]`.
    pub fn from_config(stream: Arc<StreamInterface>) -> Self {
        let options = SchedulerOptions::from_config(&stream.config().scheduler);
        Self::new(stream, options)
    }

    /// Start one loop per descriptor. The whole table is checked before
    /// anything starts: an empty name, a zero delay, or a name used twice is
    /// an error. Returns the number of loops started.
    pub fn start(&self, tasks: Vec<TaskDescriptor>) -> Result<usize> {
        {
            let runs = self.lock_runs();
            let mut seen = std::collections::HashSet::new();
            for desc in &tasks {
                if desc.name.is_empty() {
                    return Err(ZerglingError::Task("task without a name".into()));
                }
                if desc.delay.is_zero() {
                    return Err(ZerglingError::Task(format!("task '{}' has no delay", desc.name)));
                }
                if !seen.insert(desc.name.as_str()) || runs.contains_key(&desc.name) {
                    return Err(ZerglingError::Task(format!("task '{}' registered twice", desc.name)));
                }
            }
        }

        let mut started = 0;
        for desc in tasks {
            if self.options.disabled.contains(&desc.name) {
                tracing::info!("⏸️ Task '{}' is disabled", desc.name);
                continue;
            }
            let run = Arc::new(TaskRun::new());
            self.lock_runs().insert(desc.name.clone(), run.clone());

            let handle = tokio::spawn(run_loop(
                desc,
                self.stream.clone(),
                run,
                self.options.clone(),
                self.exit.subscribe(),
            ));
            self.handles
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(handle);
            started += 1;
        }
        tracing::info!("⏰ Scheduler started {started} task(s)");
        Ok(started)
    }

    /// Ask every loop to exit. Sleeping loops exit right away; a loop that is
    /// mid-tick finishes it first.
    pub fn stop(&self) {
        self.exit.send_replace(true);
        for run in self.lock_runs().values() {
            if run.state() == TaskState::Running {
                run.set_state(TaskState::Exiting);
            }
        }
        tracing::info!("⏰ Scheduler stopping");
    }

    pub fn is_stopping(&self) -> bool {
        *self.exit.borrow()
    }

    /// Wait for every loop to end.
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("⚠️ Task loop ended abnormally: {e}");
            }
        }
    }

    pub fn stats(&self, name: &str) -> Option<TaskStats> {
        self.lock_runs().get(name).map(|run| run.stats())
    }

    /// Names of started tasks, sorted.
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock_runs().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock_runs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<TaskRun>>> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.exit.send_replace(true);
    }
}

async fn run_loop(
    desc: TaskDescriptor,
    stream: Arc<StreamInterface>,
    run: Arc<TaskRun>,
    options: SchedulerOptions,
    mut exit: watch::Receiver<bool>,
) {
    let log = TaskLogger::new(&desc.name);
    run.set_state(TaskState::Running);
    log.info(format!("Task started (every {}ms)", desc.delay.as_millis()));

    loop {
        tokio::select! {
            biased;
            // Also fires when the scheduler is gone.
            _ = exit.wait_for(|stop| *stop) => break,
            _ = tokio::time::sleep(desc.delay) => {}
        }
        if *exit.borrow() {
            break;
        }

        let ctx = TickContext {
            stream: stream.clone(),
            config: stream.config().task_config(&desc.name),
            log: log.clone(),
        };
        run.ticks.fetch_add(1, Ordering::Relaxed);
        let outcome = match options.tick_timeout {
            Some(limit) => match tokio::time::timeout(limit, desc.task.tick(&ctx)).await {
                Ok(result) => result,
                Err(_) => Err(ZerglingError::TaskTimeout {
                    name: desc.name.clone(),
                    millis: limit.as_millis() as u64,
                }),
            },
            None => desc.task.tick(&ctx).await,
        };

        match outcome {
            Ok(()) => {
                if run.has_errored.swap(false, Ordering::Relaxed) {
                    log.info("Task is running successfully again.");
                }
            }
            Err(e) if e.is_transient() => match options.disconnect {
                DisconnectPolicy::Tolerate => log.debug(format!("Skipped tick: {e}")),
                DisconnectPolicy::Exit => {
                    log.warn(format!("Lost connection, stopping task: {e}"));
                    break;
                }
            },
            Err(e) => {
                run.failures.fetch_add(1, Ordering::Relaxed);
                if !run.has_errored.swap(true, Ordering::Relaxed) {
                    run.reported_errors.fetch_add(1, Ordering::Relaxed);
                    log.error(format!("❌ Error in task: {e}"));
                    log.warn("Further errors will be silenced until the task executes successfully again.");
                }
            }
        }
    }

    run.set_state(TaskState::Stopped);
    log.info("Task stopped.");
}
