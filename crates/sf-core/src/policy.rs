//! Spoiler-free policy
//!
//! Resolution order: global mode, then platform override, then channel
//! membership. A platform-level `always`/`never` beats channel membership.

use crate::channel::Channel;
use crate::options::Options;
use crate::platform::Platform;
use crate::types::{SfmMode, SfmState};

/// Evaluate the SFM state for a page or list item.
///
/// Returns [`SfmState::ChannelDependent`] only in custom mode when neither
/// the platform nor a channel decides; callers then evaluate per item.
pub fn evaluate(options: &Options, platform: Option<Platform>, channel: Option<&Channel>) -> SfmState {
    match options.sfm_mode {
        SfmMode::Always => return SfmState::Active,
        SfmMode::Never => return SfmState::Inactive,
        SfmMode::Custom => {}
    }

    if let Some(platform) = platform {
        match options.platform_mode(platform) {
            SfmMode::Always => return SfmState::Active,
            SfmMode::Never => return SfmState::Inactive,
            SfmMode::Custom => {}
        }
    }

    match channel {
        Some(channel) => SfmState::from_bool(options.is_channel_enabled(channel)),
        None => SfmState::ChannelDependent,
    }
}

/// Resolve a page-level state against one item's channel.
///
/// Items whose channel cannot be parsed are treated as inactive.
pub fn resolve_for_item(
    page_state: SfmState,
    options: &Options,
    platform: Platform,
    item_channel: Option<&Channel>,
) -> bool {
    match page_state {
        SfmState::Active => true,
        SfmState::Inactive => false,
        SfmState::ChannelDependent => {
            evaluate(options, Some(platform), item_channel) == SfmState::Active
        }
    }
}
