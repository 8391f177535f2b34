//! Core type definitions for SpoilerFree
//!
//! These types are shared between the engine, the options bag and the
//! messages exchanged with the background page and popup.

use serde::{Deserialize, Serialize};

// =============================================================================
// Page Types
// =============================================================================

/// Classification of a page on a supported platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageType {
    /// Platform front page
    Root,
    /// A channel's live stream
    Live,
    /// A channel's video listing
    Channel,
    /// A single recorded video
    Video,
    /// Browse/directory listing with items from many channels
    Directory,
    /// Same-host page we do not know how to handle
    Unknown,
}

impl PageType {
    /// Pages that belong to exactly one channel.
    pub fn expects_channel(self) -> bool {
        matches!(self, Self::Live | Self::Channel | Self::Video)
    }

    /// Pages with a player we may configure.
    pub fn has_player(self) -> bool {
        matches!(self, Self::Live | Self::Video)
    }

    /// Pages that may show a video list.
    pub fn has_video_list(self) -> bool {
        matches!(self, Self::Root | Self::Channel | Self::Directory | Self::Video)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Live => "live",
            Self::Channel => "channel",
            Self::Video => "video",
            Self::Directory => "directory",
            Self::Unknown => "unknown",
        }
    }
}

// =============================================================================
// SFM Mode (user setting)
// =============================================================================

/// Global or per-platform spoiler-free setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SfmMode {
    Never,
    #[default]
    Always,
    /// Defer to the next, more specific level (platform, then channel)
    Custom,
}

impl SfmMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Always => "always",
            Self::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "never" => Some(Self::Never),
            "always" => Some(Self::Always),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

// =============================================================================
// SFM State (derived)
// =============================================================================

/// Derived spoiler-free state for a page.
///
/// "Undetermined" is represented as `Option::<SfmState>::None` wherever it
/// can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SfmState {
    Active,
    Inactive,
    /// Cannot be resolved for the page; resolve per displayed item
    ChannelDependent,
}

impl SfmState {
    pub fn from_bool(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

// =============================================================================
// Concerns (configured flags)
// =============================================================================

bitflags::bitflags! {
    /// DOM features the engine drives to a configured state.
    ///
    /// A set bit means the DOM reflects the latest known inputs for that
    /// feature. Bits are cleared whenever an input changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Concern: u8 {
        /// Duration and seek bar visibility in the player
        const PLAYER_DURATION = 1 << 0;
        /// Jump toolbar injected next to the player controls
        const PLAYER_TOOLBAR = 1 << 1;
        /// Video-list item titles
        const LIST_TITLE = 1 << 2;
        /// Video-list item previews
        const LIST_PREVIEW = 1 << 3;
        /// Video-list item durations
        const LIST_DURATION = 1 << 4;
        /// Theatre mode
        const THEATRE = 1 << 5;

        const PLAYER = Self::PLAYER_DURATION.bits() | Self::PLAYER_TOOLBAR.bits();
        const VIDEO_LIST = Self::LIST_TITLE.bits() | Self::LIST_PREVIEW.bits() | Self::LIST_DURATION.bits();
        /// Everything that reads the SFM state
        const SFM_DEPENDENT = Self::PLAYER.bits() | Self::VIDEO_LIST.bits();
    }
}

impl Concern {
    /// Human-readable names of the set bits, for diagnostics.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
