//! Messages exchanged between the content script, background page and popup

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, StoredChannel};
use crate::platform::Platform;
use crate::types::SfmState;

/// Spoiler-relevant summary of one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    /// Platform name
    pub platform: String,
    pub channel: Option<StoredChannel>,
    /// `None` while undetermined
    pub sfm_state: Option<SfmState>,
}

impl TabInfo {
    pub fn new(platform: Platform, channel: Option<&Channel>, sfm_state: Option<SfmState>) -> Self {
        Self {
            platform: platform.name().to_string(),
            channel: channel.map(Channel::to_stored),
            sfm_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    /// Pushed by the content script whenever its state changes
    TabInfo(TabInfo),
    /// Pulled by the popup when it opens
    TabInfoRequest,
}

impl Message {
    pub fn to_json(&self) -> Result<String, SendError> {
        serde_json::to_string(self).map_err(|e| SendError::Encode(e.to_string()))
    }

    /// Decode a message; unknown message types yield `None`.
    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// Error sending a message to another extension context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Expected whenever no popup or background listener is active
    #[error("No receiver listening")]
    NoReceiver,
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Failed to encode message: {0}")]
    Encode(String),
}
