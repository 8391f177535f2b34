//! Video-list concern
//!
//! Every item's title, preview and duration are wrapped in marked containers
//! whose visibility follows the item's verdict. Items with anything hidden
//! get a Show/Hide toggle. A child-list observer on the list container
//! invalidates this concern when the host appends items.
//!
//! A pass reapplies state to every item, including items the user revealed
//! with their toggle. Per-item tracking would avoid that but is not done.
//!
//! In channel-dependent mode an item is only decided once its channel link
//! has rendered. Until then the concern stays unconfigured and polling
//! revisits just the undecided items.

use crate::channel::Channel;
use crate::dom::{ensure_container, marker, set_visible, Dom, DomError, CONTAINER_CLASS, ITEM_TOGGLE_CLASS};
use crate::options::Options;
use crate::platform::Platform;
use crate::policy;
use crate::selectors::ListSelectors;
use crate::types::{Concern, SfmState};

use super::channel::channel_from_href;
use super::state::{ClickAction, TabState};

pub const SHOW_LABEL: &str = "Show";
pub const HIDE_LABEL: &str = "Hide";

pub fn configure<D: Dom>(dom: &D, state: &mut TabState<D::Node>, options: &Options) {
    if state.configured.contains(Concern::VIDEO_LIST) {
        return;
    }
    let Some(sfm_state) = state.sfm_state else {
        return;
    };
    let Some(platform) = state.platform else {
        state.configured.insert(Concern::VIDEO_LIST);
        return;
    };
    if !state.page_type.has_video_list() {
        state.configured.insert(Concern::VIDEO_LIST);
        return;
    }

    let selectors = &platform.selectors().video_list;
    let Some(container) = dom.query(None, selectors.container) else {
        log::debug!("Video list not present yet");
        return;
    };
    watch_container(dom, state, &container);
    state.prune_detached_items(dom);

    let items = match state.pending_items.take() {
        Some(pending) => pending,
        None => dom.query_all(Some(&container), selectors.item),
    };
    let mut unresolved = Vec::new();
    for item in &items {
        let verdict = match sfm_state {
            SfmState::Active => true,
            SfmState::Inactive => false,
            SfmState::ChannelDependent => match item_channel(dom, selectors, platform, &state.href, item) {
                Some(channel) => policy::resolve_for_item(sfm_state, options, platform, Some(&channel)),
                None => {
                    unresolved.push(item.clone());
                    continue;
                }
            },
        };
        if let Err(e) = configure_item(dom, state, selectors, options, item, verdict) {
            log::warn!("Failed to configure video list item: {}", e);
            return;
        }
    }

    if !unresolved.is_empty() {
        log::debug!("{} video list items have no channel yet", unresolved.len());
        state.pending_items = Some(unresolved);
        return;
    }
    log::debug!("Configured {} video list items", items.len());
    state.configured.insert(Concern::VIDEO_LIST);
}

/// Toggle the hideable parts of `item` together and relabel its button.
pub fn toggle_item<D: Dom>(dom: &D, options: &Options, item: &D::Node) {
    let containers: Vec<D::Node> = hideable_parts(options)
        .filter(|&(_, _, hide)| hide)
        .filter_map(|(_, marker, _)| dom.query(Some(item), &format!(".{}.{}", CONTAINER_CLASS, marker)))
        .collect();

    let Some(visible) = set_visible(dom, &containers, None) else {
        return;
    };
    if let Some(button) = dom.query(Some(item), &format!(".{}", ITEM_TOGGLE_CLASS)) {
        dom.set_text(&button, if visible { HIDE_LABEL } else { SHOW_LABEL });
    }
}

fn hideable_parts(options: &Options) -> impl Iterator<Item = (Part, &'static str, bool)> {
    [
        (Part::Title, marker::TITLE, options.list_hide_title),
        (Part::Preview, marker::PREVIEW, options.list_hide_preview),
        (Part::Duration, marker::LIST_DURATION, options.list_hide_duration),
    ]
    .into_iter()
}

#[derive(Debug, Clone, Copy)]
enum Part {
    Title,
    Preview,
    Duration,
}

impl Part {
    fn selector(self, selectors: &ListSelectors) -> &'static str {
        match self {
            Self::Title => selectors.title,
            Self::Preview => selectors.preview,
            Self::Duration => selectors.duration,
        }
    }
}

fn configure_item<D: Dom>(
    dom: &D,
    state: &mut TabState<D::Node>,
    selectors: &ListSelectors,
    options: &Options,
    item: &D::Node,
    verdict: bool,
) -> Result<(), DomError> {
    let mut any_hidden = false;
    for (part, marker, hide_option) in hideable_parts(options) {
        let Some(element) = dom.query(Some(item), part.selector(selectors)) else {
            continue;
        };
        let hide = verdict && hide_option;
        let container = ensure_container(dom, &element, Some(marker))?;
        set_visible(dom, std::slice::from_ref(&container), Some(!hide));
        any_hidden |= hide;
    }

    let toggle = dom.query(Some(item), &format!(".{}", ITEM_TOGGLE_CLASS));
    match (any_hidden, toggle) {
        (true, Some(button)) => dom.set_text(&button, SHOW_LABEL),
        (true, None) => {
            let button = dom.create_element("button")?;
            dom.add_class(&button, ITEM_TOGGLE_CLASS);
            dom.set_text(&button, SHOW_LABEL);
            dom.append_child(item, &button)?;
            state.resources.track_node(button.clone());
            state.listen(dom, &button, ClickAction::ToggleItem(item.clone()))?;
        }
        (false, Some(button)) => state.release_injected(dom, &button),
        (false, None) => {}
    }
    Ok(())
}

fn item_channel<D: Dom>(
    dom: &D,
    selectors: &ListSelectors,
    platform: Platform,
    base: &str,
    item: &D::Node,
) -> Option<Channel> {
    let link = dom.query(Some(item), selectors.channel_link)?;
    let href = dom.attribute(&link, "href")?;
    channel_from_href(platform, base, &href)
}

fn watch_container<D: Dom>(dom: &D, state: &mut TabState<D::Node>, container: &D::Node) {
    if let Some((id, watched)) = &state.list_observer {
        if watched == container {
            return;
        }
        state.resources.release_observer(dom, *id);
        state.list_observer = None;
    }

    match dom.observe_children(container) {
        Ok(id) => {
            state.resources.track_observer(id);
            state.list_observer = Some((id, container.clone()));
        }
        Err(e) => log::warn!("Failed to observe video list: {}", e),
    }
}
