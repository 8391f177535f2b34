//! Per-tab reconciliation state
//!
//! One [`TabState`] exists per navigation. It is replaced wholesale when the
//! page navigates, after [`TabState::release_all`] has torn down everything
//! the previous page acquired.

use std::collections::HashMap;

use crate::channel::Channel;
use crate::dom::{Dom, DomError, ObserverId};
use crate::platform::{self, Platform};
use crate::types::{Concern, PageType, SfmState};
use crate::url::navigation_identifier;

/// What a click on an injected control does.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction<N> {
    /// Seek the player by a signed number of seconds
    Jump(i64),
    /// Toggle the hidden parts of one video-list item
    ToggleItem(N),
}

#[derive(Debug, Clone)]
pub struct Listener<N> {
    /// Element the listener is attached to
    pub target: N,
    pub action: ClickAction<N>,
}

/// Observers and injected nodes owned by the current page.
#[derive(Debug)]
pub struct Disposer<N> {
    observers: Vec<ObserverId>,
    nodes: Vec<N>,
}

impl<N> Default for Disposer<N> {
    fn default() -> Self {
        Self { observers: Vec::new(), nodes: Vec::new() }
    }
}

impl<N: Clone + PartialEq> Disposer<N> {
    pub fn track_observer(&mut self, id: ObserverId) {
        self.observers.push(id);
    }

    pub fn track_node(&mut self, node: N) {
        self.nodes.push(node);
    }

    pub fn release_observer<D: Dom<Node = N>>(&mut self, dom: &D, id: ObserverId) {
        dom.disconnect(id);
        self.observers.retain(|&o| o != id);
    }

    pub fn release_node<D: Dom<Node = N>>(&mut self, dom: &D, node: &N) {
        dom.remove(node);
        self.nodes.retain(|n| n != node);
    }

    /// Stop tracking a node the host already removed.
    pub fn forget_node(&mut self, node: &N) {
        self.nodes.retain(|n| n != node);
    }

    pub fn release_all<D: Dom<Node = N>>(&mut self, dom: &D) {
        for id in self.observers.drain(..) {
            dom.disconnect(id);
        }
        for node in self.nodes.drain(..) {
            dom.remove(&node);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Working memory of the reconciliation engine for one page.
#[derive(Debug)]
pub struct TabState<N> {
    pub href: String,
    /// Normalized location used to detect client-side navigations
    pub navigation_id: String,
    pub platform: Option<Platform>,
    pub page_type: PageType,
    /// Channel as revealed by the URL alone
    pub url_channel: Option<Channel>,
    pub channel: Option<Channel>,
    pub channel_determined: bool,
    /// `None` while undetermined
    pub sfm_state: Option<SfmState>,
    pub configured: Concern,
    pub tab_info_dirty: bool,
    pub navigated_at: u64,
    pub deadline_reported: bool,

    pub resources: Disposer<N>,
    pub listeners: HashMap<ObserverId, Listener<N>>,
    pub toolbar: Option<N>,
    pub list_observer: Option<(ObserverId, N)>,
    /// Items whose channel link had not rendered on the last video-list
    /// pass. While `Some`, the next pass only revisits these.
    pub pending_items: Option<Vec<N>>,
    pub channel_link_observer: Option<(ObserverId, N)>,
}

impl<N: Clone + PartialEq> TabState<N> {
    /// Fresh state for a page at `href`, classified synchronously.
    pub fn new(href: &str, now: u64) -> Self {
        let (platform, page_type, url_channel) = match platform::classify_url(href) {
            Some((platform, info)) => (Some(platform), info.page_type, info.channel),
            None => (None, PageType::Unknown, None),
        };

        Self {
            href: href.to_string(),
            navigation_id: navigation_identifier(href),
            platform,
            page_type,
            url_channel,
            channel: None,
            channel_determined: false,
            sfm_state: None,
            configured: Concern::empty(),
            tab_info_dirty: true,
            navigated_at: now,
            deadline_reported: false,
            resources: Disposer::default(),
            listeners: HashMap::new(),
            toolbar: None,
            list_observer: None,
            pending_items: None,
            channel_link_observer: None,
        }
    }

    /// Every concern configured and nothing left to report.
    pub fn is_settled(&self) -> bool {
        self.channel_determined
            && self.sfm_state.is_some()
            && self.configured.is_all()
            && !self.tab_info_dirty
    }

    /// Concerns not yet configured.
    pub fn outstanding(&self) -> Concern {
        Concern::all().difference(self.configured)
    }

    pub fn invalidate(&mut self, concerns: Concern) {
        self.configured.remove(concerns);
        if concerns.contains(Concern::VIDEO_LIST) {
            self.pending_items = None;
        }
    }

    pub fn set_channel(&mut self, channel: Option<Channel>) {
        if self.channel != channel || self.channel_display_changed(channel.as_ref()) {
            self.tab_info_dirty = true;
        }
        self.channel = channel;
        self.channel_determined = true;
    }

    fn channel_display_changed(&self, channel: Option<&Channel>) -> bool {
        self.channel.as_ref().and_then(Channel::display_name) != channel.and_then(Channel::display_name)
    }

    /// Forget the channel and everything derived from it.
    pub fn reset_channel(&mut self) {
        self.channel = None;
        self.channel_determined = false;
        self.reset_sfm_state();
    }

    /// Forget the SFM state and the concerns that read it.
    pub fn reset_sfm_state(&mut self) {
        self.sfm_state = None;
        self.invalidate(Concern::SFM_DEPENDENT);
        self.tab_info_dirty = true;
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Attach a click listener to `target` and record its action.
    pub fn listen<D: Dom<Node = N>>(
        &mut self,
        dom: &D,
        target: &N,
        action: ClickAction<N>,
    ) -> Result<ObserverId, DomError> {
        let id = dom.listen_click(target)?;
        self.resources.track_observer(id);
        self.listeners.insert(id, Listener { target: target.clone(), action });
        Ok(id)
    }

    /// Remove an injected node along with the listeners attached to it.
    pub fn release_injected<D: Dom<Node = N>>(&mut self, dom: &D, node: &N) {
        let ids: Vec<ObserverId> = self
            .listeners
            .iter()
            .filter(|(_, l)| l.target == *node || dom_contains(dom, node, &l.target))
            .map(|(&id, _)| id)
            .collect();
        for id in ids {
            self.listeners.remove(&id);
            self.resources.release_observer(dom, id);
        }
        self.resources.release_node(dom, node);
    }

    /// Drop item toggles and pending items the host has taken out of the
    /// document, as virtualized lists do while scrolling.
    pub fn prune_detached_items<D: Dom<Node = N>>(&mut self, dom: &D) {
        let detached: Vec<(ObserverId, N)> = self
            .listeners
            .iter()
            .filter(|(_, l)| matches!(l.action, ClickAction::ToggleItem(_)) && !dom.is_connected(&l.target))
            .map(|(&id, l)| (id, l.target.clone()))
            .collect();
        for (id, button) in detached {
            self.listeners.remove(&id);
            self.resources.release_observer(dom, id);
            self.resources.forget_node(&button);
        }
        if let Some(items) = &mut self.pending_items {
            items.retain(|item| dom.is_connected(item));
        }
    }

    pub fn release_all<D: Dom<Node = N>>(&mut self, dom: &D) {
        self.resources.release_all(dom);
        self.listeners.clear();
        self.toolbar = None;
        self.list_observer = None;
        self.pending_items = None;
        self.channel_link_observer = None;
    }
}

/// Whether `node` is a strict descendant of `ancestor`.
fn dom_contains<D: Dom>(dom: &D, ancestor: &D::Node, node: &D::Node) -> bool {
    let mut current = dom.parent(node);
    while let Some(parent) = current {
        if parent == *ancestor {
            return true;
        }
        current = dom.parent(&parent);
    }
    false
}
