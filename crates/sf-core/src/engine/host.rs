//! Host environment the engine runs in

use serde::Deserialize;

use crate::dom::Dom;
use crate::message::{Message, SendError};

/// One content-script execution context: a document plus the browser
/// services the engine needs from it.
pub trait Host {
    type Dom: Dom;

    fn dom(&self) -> &Self::Dom;

    /// Current `location.href`.
    fn location_href(&self) -> String;

    /// Wall-clock milliseconds. Only differences are used.
    fn now_ms(&self) -> u64;

    /// Send a message to the background page and popup.
    fn send_message(&self, message: &Message) -> Result<(), SendError>;
}

pub const DEFAULT_POLL_INTERVAL_MS: u32 = 200;
pub const DEFAULT_DEADLINE_MS: u64 = 30_000;

/// Engine tuning, overridable from the content-script entry point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Interval of the poll timer driving navigation checks and retries
    pub poll_interval_ms: u32,
    /// Time after a navigation after which unconfigured concerns are
    /// abandoned
    pub deadline_ms: u64,
    /// Only the top frame reports tab state
    pub top_frame: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            deadline_ms: DEFAULT_DEADLINE_MS,
            top_frame: true,
        }
    }
}
