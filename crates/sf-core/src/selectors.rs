//! Per-platform selector tables
//!
//! Pure configuration data: where each platform's markup keeps the elements
//! the engine hides, reads or anchors onto. Selectors stick to compound
//! selectors (tag, `#id`, `.class`, `[attr]`, `[attr="value"]`) joined by
//! descendant combinators.

/// How an element is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideStrategy {
    /// Wrap the element in an extension-owned container and hide that.
    Wrap,
    /// Hide the element's parent. For elements the host page re-creates on
    /// every render, which would escape a wrapper.
    ParentMarker,
}

#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub selector: &'static str,
    pub strategy: HideStrategy,
}

#[derive(Debug)]
pub struct PlayerSelectors {
    pub root: &'static str,
    /// Where the jump toolbar is appended
    pub controls: &'static str,
    pub video: &'static str,
    pub duration: Target,
    pub seek_bar: Target,
}

#[derive(Debug)]
pub struct ListSelectors {
    pub container: &'static str,
    /// Relative to the container
    pub item: &'static str,
    /// Relative to an item
    pub title: &'static str,
    pub preview: &'static str,
    pub duration: &'static str,
    pub channel_link: &'static str,
}

#[derive(Debug)]
pub struct TheatreSelectors {
    pub button: &'static str,
    /// Matches while theatre mode is on
    pub active: &'static str,
}

#[derive(Debug)]
pub struct Selectors {
    /// Channel header link: `href` identifies the channel, text is the display name
    pub channel_link: &'static str,
    pub player: PlayerSelectors,
    pub video_list: ListSelectors,
    pub theatre: Option<TheatreSelectors>,
}

pub static TWITCH: Selectors = Selectors {
    channel_link: "a.channel-header__user",
    player: PlayerSelectors {
        root: ".video-player",
        controls: ".video-player .player-controls__left-control-group",
        video: ".video-player video",
        duration: Target {
            selector: "[data-a-target=\"player-seekbar-duration\"]",
            strategy: HideStrategy::Wrap,
        },
        seek_bar: Target {
            selector: "[data-a-target=\"player-seekbar\"]",
            strategy: HideStrategy::Wrap,
        },
    },
    video_list: ListSelectors {
        container: ".tw-tower",
        item: "article",
        title: "h3",
        preview: ".preview-card-thumbnail__image",
        duration: ".preview-card-stat",
        channel_link: "a[data-a-target=\"preview-card-channel-link\"]",
    },
    theatre: Some(TheatreSelectors {
        button: "[data-a-target=\"player-theatre-mode-button\"]",
        active: ".video-player--theatre",
    }),
};

pub static MLG: Selectors = Selectors {
    channel_link: ".video-info a.channel-name",
    player: PlayerSelectors {
        root: ".mlg-player",
        controls: ".mlg-player .vjs-control-bar",
        video: ".mlg-player video",
        duration: Target {
            selector: ".mlg-player .vjs-duration-display",
            strategy: HideStrategy::ParentMarker,
        },
        seek_bar: Target {
            selector: ".mlg-player .vjs-progress-control",
            strategy: HideStrategy::Wrap,
        },
    },
    video_list: ListSelectors {
        container: ".video-grid",
        item: ".video-card",
        title: ".video-card-title",
        preview: ".video-card-thumbnail",
        duration: ".video-card-duration",
        channel_link: "a.video-card-channel",
    },
    theatre: None,
};
