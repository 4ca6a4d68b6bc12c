//! # Zergling Gateway
//! Puts the event bus on the network for overlay widgets.
//!
//! ```text
//! widget ──ws text frame──► BusMessage ──► EventBus ──► realm listeners
//! widget ◄──ws text frame── broadcastData ◄── EventBus ◄── realms
//! ```

pub mod server;
pub mod ws;

pub use server::{GatewayState, router, serve, start};
