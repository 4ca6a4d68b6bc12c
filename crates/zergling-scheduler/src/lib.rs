//! # Zergling Scheduler
//!
//! Periodic task loops for the bot. Every task runs in its own tokio task
//! with its own delay; nothing is coordinated between them.
//!
//! ## Architecture
//! ```text
//! Scheduler::start(tasks)
//!   ├── announcements (500ms)  → TaskQueue → make_announcement
//!   ├── winampnp      (250ms)  → is_playing.txt / song.txt → np_data realm
//!   ├── ladderinfo    (5000ms) → LadderSource → sc_status / sc_user / sc_rank.json
//!   ├── webcam        (1000ms) → ObsControl → webcam frame
//!   └── dosbox        (1000ms) → ProcessProbe → ObsControl DOSBox capture
//!
//! loop: sleep(delay) → stop? → tick(TickContext) → error streak bookkeeping
//! ```

pub mod engine;
pub mod queue;
pub mod tasks;

pub use engine::{
    CronTask, DisconnectPolicy, Scheduler, SchedulerOptions, TaskDescriptor, TaskLogger, TaskState, TaskStats,
    TickContext,
};
pub use queue::{QueueItem, TaskQueue};
