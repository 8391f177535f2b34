//! Supported streaming platforms
//!
//! Each platform knows how to classify its own URLs, validate local channel
//! names and build channel URLs. The registry is the fixed, ordered list
//! [`PLATFORMS`]; lookups try each platform in order and the first match wins.
//! Hosts and qualified-name prefixes are disjoint between the current
//! platforms, so order only matters for bare local names typed by the user
//! (see [`parse_channel_input`]). Keep that in mind when adding a platform.

use crate::channel::{Channel, QUALIFIED_SEPARATOR};
use crate::selectors::{self, Selectors};
use crate::types::PageType;
use crate::url::{extract_host, path_segments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Twitch,
    Mlg,
}

/// Registry of all supported platforms, in lookup order.
pub const PLATFORMS: &[Platform] = &[Platform::Twitch, Platform::Mlg];

/// Result of classifying a URL on a platform's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page_type: PageType,
    /// Channel identity, when the URL alone reveals it
    pub channel: Option<Channel>,
}

impl PageInfo {
    fn new(page_type: PageType) -> Self {
        Self { page_type, channel: None }
    }

    fn with_channel(page_type: PageType, channel: Option<Channel>) -> Self {
        match channel {
            Some(channel) => Self { page_type, channel: Some(channel) },
            None => Self::new(PageType::Unknown),
        }
    }
}

// Twitch first path segments that are not channel names.
const TWITCH_RESERVED: &[&str] = &[
    "directory", "videos", "settings", "subscriptions", "inventory", "wallet", "search",
    "downloads", "jobs", "p", "friends", "messages", "turbo", "prime", "store", "u",
    "moderator", "popout",
];

impl Platform {
    /// Stable identifier used in persisted data and qualified names.
    /// Never rename without a storage migration.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Mlg => "mlg",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::Mlg => "MLG",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PLATFORMS.iter().copied().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    const fn hosts(self) -> &'static [&'static str] {
        match self {
            Self::Twitch => &["twitch.tv", "www.twitch.tv", "m.twitch.tv"],
            Self::Mlg => &["mlg.com", "www.mlg.com"],
        }
    }

    /// Whether the channel display name has to be read from the page.
    pub const fn display_name_from_dom(self) -> bool {
        matches!(self, Self::Twitch)
    }

    pub fn selectors(self) -> &'static Selectors {
        match self {
            Self::Twitch => &selectors::TWITCH,
            Self::Mlg => &selectors::MLG,
        }
    }

    pub fn owns_host(self, host: &str) -> bool {
        self.hosts().iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    /// Classify `url`.
    ///
    /// Returns `None` if the host does not belong to this platform. Any path
    /// on an owned host classifies, falling back to [`PageType::Unknown`].
    pub fn classify_url(self, url: &str) -> Option<PageInfo> {
        let host = extract_host(url)?;
        if !self.owns_host(host) {
            return None;
        }

        let segments: Vec<String> = path_segments(url).map(|s| s.to_ascii_lowercase()).collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        Some(match self {
            Self::Twitch => self.classify_twitch_path(&segments),
            Self::Mlg => self.classify_mlg_path(&segments),
        })
    }

    fn classify_twitch_path(self, segments: &[&str]) -> PageInfo {
        match segments {
            [] => PageInfo::new(PageType::Root),
            ["directory", ..] => PageInfo::new(PageType::Directory),
            ["videos", id] if is_numeric(id) => PageInfo::new(PageType::Video),
            [first, ..] if TWITCH_RESERVED.contains(first) => PageInfo::new(PageType::Unknown),
            [name] => PageInfo::with_channel(PageType::Live, self.parse_channel_by_name(name)),
            [name, "videos", ..] => {
                PageInfo::with_channel(PageType::Channel, self.parse_channel_by_name(name))
            }
            [name, "video" | "v", id] if is_numeric(id) => {
                PageInfo::with_channel(PageType::Video, self.parse_channel_by_name(name))
            }
            [name, "clip", _] => {
                PageInfo::with_channel(PageType::Video, self.parse_channel_by_name(name))
            }
            [name, ..] => PageInfo {
                page_type: PageType::Unknown,
                channel: self.parse_channel_by_name(name),
            },
        }
    }

    fn classify_mlg_path(self, segments: &[&str]) -> PageInfo {
        match segments {
            [] => PageInfo::new(PageType::Root),
            ["videos", ..] => PageInfo::new(PageType::Directory),
            ["channel", name, ..] => {
                PageInfo::with_channel(PageType::Channel, self.parse_channel_by_name(name))
            }
            ["video", _] => PageInfo::new(PageType::Video),
            _ => PageInfo::new(PageType::Unknown),
        }
    }

    /// Parse a local or qualified channel name.
    ///
    /// Returns `None` if the name fails this platform's grammar or is
    /// qualified with another platform's prefix. Failure is an expected
    /// outcome for user input.
    pub fn parse_channel_by_name(self, input: &str) -> Option<Channel> {
        let input = input.trim();
        let local = match input.split_once(QUALIFIED_SEPARATOR) {
            Some((prefix, local)) if prefix.eq_ignore_ascii_case(self.name()) => local,
            Some(_) => return None,
            None => input,
        };

        let name = local.to_ascii_lowercase();
        let valid = match self {
            Self::Twitch => is_valid_twitch_name(&name),
            Self::Mlg => is_valid_mlg_name(&name),
        };
        valid.then(|| Channel::new(self, name, None))
    }

    pub fn build_channel_url(self, channel: &Channel) -> String {
        match self {
            Self::Twitch => format!("https://www.twitch.tv/{}", channel.name()),
            Self::Mlg => format!("https://www.mlg.com/channel/{}", channel.name()),
        }
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// 4-25 chars of `[a-z0-9_]`, not starting with `_`.
fn is_valid_twitch_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    (4..=25).contains(&bytes.len())
        && bytes[0] != b'_'
        && bytes.iter().all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// 1-50 chars of `[a-z0-9-]`, no leading or trailing `-`.
fn is_valid_mlg_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    (1..=50).contains(&bytes.len())
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
        && bytes.iter().all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

// =============================================================================
// Registry helpers
// =============================================================================

/// Classify `url` against every platform; first match wins.
pub fn classify_url(url: &str) -> Option<(Platform, PageInfo)> {
    PLATFORMS.iter().find_map(|&p| p.classify_url(url).map(|info| (p, info)))
}

/// Parse a `<platform>/<name>` string.
pub fn parse_qualified_name(qualified: &str) -> Option<Channel> {
    let (prefix, _) = qualified.trim().split_once(QUALIFIED_SEPARATOR)?;
    Platform::from_name(prefix)?.parse_channel_by_name(qualified)
}

/// Parse free-form channel input from the options UI.
///
/// Accepts a channel URL, a qualified name, or a bare local name. Bare names
/// go to the first platform whose grammar accepts them.
pub fn parse_channel_input(input: &str) -> Option<Channel> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input.contains("://") {
        return classify_url(input).and_then(|(_, info)| info.channel);
    }
    if input.contains(QUALIFIED_SEPARATOR) {
        return parse_qualified_name(input);
    }
    PLATFORMS.iter().find_map(|p| p.parse_channel_by_name(input))
}
