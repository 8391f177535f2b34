//! Channel identity
//!
//! A channel is identified by its qualified name `<platform>/<name>`. The
//! display name is a label that may be learned later from the page and is
//! not part of identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::platform::{self, Platform};

/// Separator between platform name and local channel name.
pub const QUALIFIED_SEPARATOR: char = '/';

#[derive(Debug, Clone)]
pub struct Channel {
    platform: Platform,
    name: String,
    display_name: Option<String>,
}

impl Channel {
    /// Construct a channel from an already-normalized local name.
    ///
    /// Does not validate `name`; use [`Platform::parse_channel_by_name`]
    /// for untrusted input.
    pub fn new(platform: Platform, name: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            platform,
            name: name.into(),
            display_name: display_name.filter(|d| !d.trim().is_empty()),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Display name if known, local name otherwise.
    pub fn label(&self) -> &str {
        self.display_name().unwrap_or(&self.name)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}{}{}", self.platform.name(), QUALIFIED_SEPARATOR, self.name)
    }

    /// A new channel value carrying `display_name`.
    pub fn with_display_name(&self, display_name: impl Into<String>) -> Self {
        Self::new(self.platform, self.name.clone(), Some(display_name.into()))
    }

    pub fn url(&self) -> String {
        self.platform.build_channel_url(self)
    }

    pub fn to_stored(&self) -> StoredChannel {
        StoredChannel {
            qualified_name: self.qualified_name(),
            display_name: self.display_name.clone(),
        }
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.platform == other.platform && self.name == other.name
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.platform.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(display) => write!(f, "{} ({})", display, self.qualified_name()),
            None => f.write_str(&self.qualified_name()),
        }
    }
}

// =============================================================================
// Persisted form
// =============================================================================

/// Serialized channel as stored in options and sent in messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChannel {
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl StoredChannel {
    /// Re-parse through the platform registry.
    pub fn resolve(&self) -> Option<Channel> {
        let channel = platform::parse_qualified_name(&self.qualified_name)?;
        Some(match &self.display_name {
            Some(display) => channel.with_display_name(display.clone()),
            None => channel,
        })
    }
}

impl From<&Channel> for StoredChannel {
    fn from(channel: &Channel) -> Self {
        channel.to_stored()
    }
}
