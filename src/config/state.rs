// Application state module
// Shared, read-only runtime state handed to every connection

use std::sync::Arc;
use tokio::sync::{watch, Notify};

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,

    /// Whether each request gets an access-log line
    pub access_log: bool,

    /// Fired once when the server should stop accepting connections
    pub shutdown: Arc<Notify>,

    /// Set to `true` once the listener is closed; open connections watch it
    /// to finish their current request and close
    pub closing: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            access_log: config.logging.access_log,
            shutdown: Arc::new(Notify::new()),
            closing: watch::channel(false).0,
        }
    }
}
