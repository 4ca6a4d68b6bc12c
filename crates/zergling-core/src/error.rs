//! Error types for the bot.

/// Top-level error type shared by every Zergling crate.
#[derive(Debug, thiserror::Error)]
pub enum ZerglingError {
    /// Configuration could not be read, parsed or interpreted.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Chat or notification channel failure.
    #[error("channel error: {0}")]
    Channel(String),

    /// An external service (OBS, chat) is not connected right now.
    /// Periodic tasks treat this as transient.
    #[error("not connected: {0}")]
    NotConnected(String),

    /// A realm name was registered twice.
    #[error("realm already registered: \"{0}\"")]
    DuplicateRealm(String),

    /// A realm was looked up by a name nobody registered.
    #[error("unknown realm: \"{0}\"")]
    UnknownRealm(String),

    /// A command or redemption registry is malformed.
    #[error("registry error: {0}")]
    Registry(String),

    /// A periodic task failed.
    #[error("task error: {0}")]
    Task(String),

    /// A periodic task tick exceeded its time budget.
    #[error("task '{name}' timed out after {millis}ms")]
    TaskTimeout { name: String, millis: u64 },

    /// A command or redemption handler failed.
    #[error("handler '{name}' failed: {source}")]
    Handler {
        name: String,
        #[source]
        source: Box<ZerglingError>,
    },
}

impl ZerglingError {
    /// Whether this error is a dropped or missing connection to an external service.
    pub fn is_transient(&self) -> bool {
        matches!(self, ZerglingError::NotConnected(_))
    }

    /// Wrap an error raised by the named handler.
    pub fn handler(name: &str, source: ZerglingError) -> Self {
        ZerglingError::Handler {
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ZerglingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ZerglingError::NotConnected("obs".into()).is_transient());
        assert!(!ZerglingError::Task("boom".into()).is_transient());
    }

    #[test]
    fn test_handler_wraps_source() {
        let err = ZerglingError::handler("help", ZerglingError::Channel("down".into()));
        assert_eq!(err.to_string(), "handler 'help' failed: channel error: down");
    }
}
