//! Channel determination
//!
//! The URL is tried first. Pages whose URL does not name the channel, and
//! platforms whose display names only exist in the page, fall back to the
//! channel header link. The link's `href` is watched so an SPA swapping the
//! link after a navigation re-enters this step.

use crate::channel::Channel;
use crate::dom::Dom;
use crate::platform::Platform;
use crate::url::resolve_href;

use super::state::TabState;

pub fn determine<D: Dom>(dom: &D, state: &mut TabState<D::Node>) {
    if state.channel_determined {
        return;
    }

    let Some(platform) = state.platform else {
        state.set_channel(None);
        return;
    };

    if !state.page_type.expects_channel() {
        state.set_channel(state.url_channel.clone());
        return;
    }

    if let Some(channel) = &state.url_channel {
        if !platform.display_name_from_dom() {
            state.set_channel(Some(channel.clone()));
            return;
        }
        // Provisional until the header renders the display name. Policy
        // reads it; TabInfo waits for `channel_determined`.
        if state.channel.is_none() {
            state.channel = Some(channel.clone());
        }
    }

    let Some(link) = dom.query(None, platform.selectors().channel_link) else {
        log::debug!("Channel link not present yet on {}", state.href);
        return;
    };
    watch_link(dom, state, &link);

    let from_link = dom
        .attribute(&link, "href")
        .and_then(|href| channel_from_href(platform, &state.href, &href));

    let channel = match (&state.url_channel, from_link) {
        (Some(from_url), Some(from_link)) if *from_url != from_link => {
            log::debug!("Channel link still points at {}, waiting for {}", from_link, from_url);
            return;
        }
        (Some(from_url), _) => from_url.clone(),
        (None, Some(from_link)) => from_link,
        (None, None) => {
            log::debug!("Channel link has no usable href");
            return;
        }
    };

    let channel = if platform.display_name_from_dom() {
        let text = dom.text(&link);
        let text = text.trim();
        if text.is_empty() {
            log::debug!("Display name for {} not rendered yet", channel);
            return;
        }
        channel.with_display_name(text)
    } else {
        channel
    };

    log::debug!("Determined channel {}", channel.qualified_name());
    state.set_channel(Some(channel));
}

/// Parse a channel from a link found on a page of `platform`.
pub fn channel_from_href(platform: Platform, base: &str, href: &str) -> Option<Channel> {
    let url = resolve_href(base, href)?;
    platform.classify_url(&url)?.channel
}

fn watch_link<D: Dom>(dom: &D, state: &mut TabState<D::Node>, link: &D::Node) {
    if let Some((id, watched)) = &state.channel_link_observer {
        if watched == link {
            return;
        }
        state.resources.release_observer(dom, *id);
        state.channel_link_observer = None;
    }

    match dom.observe_attribute(link, "href") {
        Ok(id) => {
            state.resources.track_observer(id);
            state.channel_link_observer = Some((id, link.clone()));
        }
        Err(e) => log::warn!("Failed to observe channel link: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::memory::MemoryDom;

    fn state(url: &str) -> TabState<crate::dom::memory::NodeId> {
        TabState::new(url, 0)
    }

    #[test]
    fn test_url_channel_without_dom_display_name() {
        let dom = MemoryDom::new();
        let mut s = state("https://www.mlg.com/channel/overwatch-league");
        determine(&dom, &mut s);
        assert!(s.channel_determined);
        assert_eq!(s.channel.as_ref().map(Channel::name), Some("overwatch-league"));
        assert_eq!(dom.observer_count(), 0);
    }

    #[test]
    fn test_pages_without_channel() {
        let dom = MemoryDom::new();
        let mut s = state("https://www.twitch.tv/directory/game/Overwatch");
        determine(&dom, &mut s);
        assert!(s.channel_determined);
        assert_eq!(s.channel, None);
    }

    #[test]
    fn test_twitch_waits_for_display_name() {
        let dom = MemoryDom::new();
        let mut s = state("https://www.twitch.tv/esl_csgo");
        determine(&dom, &mut s);
        assert!(!s.channel_determined);
        assert_eq!(s.channel, s.url_channel);

        let link = dom.add(&dom.root(), "a.channel-header__user[href=\"/esl_csgo\"]");
        determine(&dom, &mut s);
        assert!(!s.channel_determined);

        dom.set_text(&link, " ESL_CSGO ");
        determine(&dom, &mut s);
        assert!(s.channel_determined);
        let channel = s.channel.clone().unwrap();
        assert_eq!(channel.qualified_name(), "twitch/esl_csgo");
        assert_eq!(channel.display_name(), Some("ESL_CSGO"));
        assert_eq!(dom.observer_count(), 1);
    }

    #[test]
    fn test_stale_link_is_ignored() {
        let dom = MemoryDom::new();
        let mut s = state("https://www.twitch.tv/esl_csgo");
        let link = dom.add_text(&dom.root(), "a.channel-header__user[href=\"/other_channel\"]", "Other");
        determine(&dom, &mut s);
        assert!(!s.channel_determined);

        dom.set_attribute(&link, "href", "/esl_csgo");
        dom.set_text(&link, "ESL_CSGO");
        determine(&dom, &mut s);
        assert!(s.channel_determined);
    }

    #[test]
    fn test_channel_from_dom_only() {
        let dom = MemoryDom::new();
        let mut s = state("https://www.twitch.tv/videos/123456");
        assert_eq!(s.url_channel, None);
        dom.add_text(&dom.root(), "a.channel-header__user[href=\"https://www.twitch.tv/esl_csgo\"]", "ESL_CSGO");
        determine(&dom, &mut s);
        assert_eq!(s.channel.as_ref().map(Channel::label), Some("ESL_CSGO"));
    }

    #[test]
    fn test_watch_link_once_per_element() {
        let dom = MemoryDom::new();
        let mut s = state("https://www.twitch.tv/esl_csgo");
        let first = dom.add(&dom.root(), "a.channel-header__user[href=\"/esl_csgo\"]");
        determine(&dom, &mut s);
        determine(&dom, &mut s);
        assert_eq!(dom.observer_count(), 1);

        dom.remove(&first);
        dom.add_text(&dom.root(), "a.channel-header__user[href=\"/esl_csgo\"]", "ESL_CSGO");
        determine(&dom, &mut s);
        assert_eq!(dom.observer_count(), 1);
        assert!(s.channel_determined);
    }

    #[test]
    fn test_channel_from_href() {
        let base = "https://www.mlg.com/video/some-match";
        let channel = channel_from_href(Platform::Mlg, base, "/channel/overwatch-league").unwrap();
        assert_eq!(channel.qualified_name(), "mlg/overwatch-league");
        assert_eq!(channel_from_href(Platform::Twitch, base, "/channel/overwatch-league"), None);
    }
}
