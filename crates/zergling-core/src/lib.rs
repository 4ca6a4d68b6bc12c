//! # Zergling Core
//!
//! Shared building blocks for the livestream bot: configuration, the error
//! type, the messages that travel between components, and the traits that
//! stand in for vendor clients (chat, OBS).
//!
//! ## Architecture
//! ```text
//! chat message / redemption ──► zergling-actions (resolver) ──► handler
//!                                                                  │
//! scheduler tick ──► zergling-scheduler (task loops) ─────────────┤
//!                                                                  ▼
//!                                        zergling-stream (StreamInterface)
//!                                          ├── ChatSink (say / announce)
//!                                          ├── RealmManager ──► EventBus ──► widgets
//!                                          ├── ObsControl, ProcessProbe (optional)
//!                                          └── LadderSource, StreamInfoSource (optional)
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ZerglingConfig;
pub use error::{Result, ZerglingError};
pub use traits::{ChatSink, DosboxInstance, LadderSource, LadderStatus, ObsControl, ProcessProbe, StreamInfoSource};
pub use types::{BusAction, BusMessage, ChatMessage, ForceMode, RedemptionEvent};
