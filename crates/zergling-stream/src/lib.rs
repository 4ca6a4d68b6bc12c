//! # Zergling Stream
//!
//! Data realms shared with browser-source widgets, and the runtime context
//! every command handler and periodic task works through.
//!
//! - [`Cache`]: time-windowed memoization of an async fetch
//! - [`EventBus`]: the shared inbound/outbound message stream
//! - [`ListenerBroadcaster`]: read-only realm over a fetch function
//! - [`CachedStore`]: read/write realm over a JSON file
//! - [`RealmManager`]: unique realm names, one listener per realm
//! - [`StreamInterface`]: config, chat, OBS and the bot's realms in one place

pub mod bus;
pub mod cache;
pub mod cached_store;
pub mod document;
pub mod interface;
pub mod listener_broadcaster;
pub mod manager;
pub mod realm;
pub mod realms;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bus::EventBus;
pub use cache::Cache;
pub use cached_store::CachedStore;
pub use document::JsonDocument;
pub use interface::StreamInterface;
pub use listener_broadcaster::ListenerBroadcaster;
pub use manager::RealmManager;
pub use realm::Realm;
pub use realms::{ChatterMetadata, NowPlaying, NpData, StreamInfo, WebampData};
