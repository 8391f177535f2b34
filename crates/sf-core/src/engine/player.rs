//! Player concern: duration/seek bar visibility and the jump toolbar

use crate::dom::{apply_hide, marker, Dom, DomError, TOOLBAR_BUTTON_CLASS, TOOLBAR_CLASS};
use crate::duration;
use crate::options::Options;
use crate::selectors::PlayerSelectors;
use crate::types::{Concern, PageType, SfmState};

use super::state::{ClickAction, TabState};

pub fn configure<D: Dom>(dom: &D, state: &mut TabState<D::Node>, options: &Options) {
    if state.configured.contains(Concern::PLAYER) {
        return;
    }
    let Some(sfm_state) = state.sfm_state else {
        return;
    };
    let Some(platform) = state.platform else {
        state.configured.insert(Concern::PLAYER);
        return;
    };
    if !state.page_type.has_player() {
        state.configured.insert(Concern::PLAYER);
        return;
    }

    let selectors = &platform.selectors().player;
    if dom.query(None, selectors.root).is_none() {
        log::debug!("Player not present yet");
        return;
    }

    let active = sfm_state == SfmState::Active;

    if !state.configured.contains(Concern::PLAYER_DURATION) {
        let hide = active && options.player_hide_duration;
        match configure_duration(dom, selectors, state.page_type, hide) {
            Ok(true) => state.configured.insert(Concern::PLAYER_DURATION),
            Ok(false) => log::debug!("Player duration not present yet"),
            Err(e) => log::warn!("Failed to configure player duration: {}", e),
        }
    }

    if !state.configured.contains(Concern::PLAYER_TOOLBAR) {
        let distance = if active { options.jump_distance_secs() } else { 0 };
        match configure_toolbar(dom, state, selectors, distance) {
            Ok(true) => state.configured.insert(Concern::PLAYER_TOOLBAR),
            Ok(false) => log::debug!("Player controls not present yet"),
            Err(e) => log::warn!("Failed to configure jump toolbar: {}", e),
        }
    }
}

/// Returns `Ok(false)` when a required element is missing.
fn configure_duration<D: Dom>(
    dom: &D,
    selectors: &PlayerSelectors,
    page_type: PageType,
    hide: bool,
) -> Result<bool, DomError> {
    let duration = dom.query(None, selectors.duration.selector);

    // Live streams have no duration; recorded videos always render one.
    if hide && duration.is_none() && page_type == PageType::Video {
        return Ok(false);
    }

    let seek_bar = dom.query(None, selectors.seek_bar.selector);
    let targets = [
        (duration, selectors.duration.strategy, marker::DURATION),
        (seek_bar, selectors.seek_bar.strategy, marker::SEEK_BAR),
    ];
    for (element, strategy, marker) in targets {
        if let Some(element) = element {
            apply_hide(dom, &element, strategy, marker, !hide)?;
        }
    }
    Ok(true)
}

/// Replace the toolbar. `distance` of 0 means no toolbar.
fn configure_toolbar<D: Dom>(
    dom: &D,
    state: &mut TabState<D::Node>,
    selectors: &PlayerSelectors,
    distance: u64,
) -> Result<bool, DomError> {
    if let Some(toolbar) = state.toolbar.take() {
        state.release_injected(dom, &toolbar);
    }
    if distance == 0 {
        return Ok(true);
    }

    let Some(controls) = dom.query(None, selectors.controls) else {
        return Ok(false);
    };

    let toolbar = dom.create_element("div")?;
    dom.add_class(&toolbar, TOOLBAR_CLASS);
    state.resources.track_node(toolbar.clone());
    state.toolbar = Some(toolbar.clone());

    let distance = i64::try_from(distance).unwrap_or(i64::MAX);
    for delta in [-distance, distance] {
        let button = dom.create_element("button")?;
        dom.add_class(&button, TOOLBAR_BUTTON_CLASS);
        dom.set_text(&button, &duration::format_signed(delta));
        dom.append_child(&toolbar, &button)?;
        state.listen(dom, &button, ClickAction::Jump(delta))?;
    }

    dom.append_child(&controls, &toolbar)?;
    Ok(true)
}

/// Seek the page's video by `delta` seconds.
pub fn jump<D: Dom>(dom: &D, selectors: &PlayerSelectors, delta: i64) {
    let Some(video) = dom.query(None, selectors.video) else {
        log::debug!("No video element to seek");
        return;
    };
    if let Err(e) = dom.seek_media_by(&video, delta as f64) {
        log::warn!("Seek by {}s failed: {}", delta, e);
    }
}
