//! Page Reconciliation Engine
//!
//! One [`Engine`] runs per content-script context. It is driven from outside
//! by three triggers:
//!
//! - [`Engine::tick`] on a fixed poll interval: detects client-side
//!   navigations, drains DOM events and retries unconfigured concerns until
//!   the deadline.
//! - [`Engine::process_events`] whenever an observer or listener fires.
//! - [`Engine::apply_option_changes`] on storage change notifications.
//!
//! Each pass runs the steps in a fixed order: channel, SFM state, player,
//! video list, theatre mode, outbound TabInfo. Every step checks its own
//! configured flag first, so a pass over a settled page does nothing.

mod channel;
mod host;
mod player;
mod state;
mod theatre;
mod video_list;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use crate::dom::{Dom, DomEvent, ObserverId};
use crate::message::{Message, SendError, TabInfo};
use crate::options::{OptionMap, Options};
use crate::policy;
use crate::types::{Concern, SfmState};
use crate::url::navigation_identifier;

pub use channel::channel_from_href;
pub use host::{EngineConfig, Host, DEFAULT_DEADLINE_MS, DEFAULT_POLL_INTERVAL_MS};
pub use state::{ClickAction, Disposer, Listener, TabState};
pub use video_list::{HIDE_LABEL, SHOW_LABEL};

type NodeOf<H> = <<H as Host>::Dom as Dom>::Node;

pub struct Engine<H: Host> {
    host: H,
    config: EngineConfig,
    /// Replaced on change; each pass works from one snapshot
    options: Rc<Options>,
    state: TabState<NodeOf<H>>,
    last_sent: Option<TabInfo>,
}

impl<H: Host> Engine<H> {
    /// Create an engine for the page the host is currently showing.
    ///
    /// Nothing touches the DOM until [`start`](Self::start) or the first
    /// [`tick`](Self::tick).
    pub fn new(host: H, config: EngineConfig, options: Options) -> Self {
        let state = TabState::new(&host.location_href(), host.now_ms());
        log::debug!(
            "Engine created for {} ({:?}, {})",
            state.href,
            state.platform.map(|p| p.name()),
            state.page_type.as_str()
        );
        Self {
            host,
            config,
            options: Rc::new(options),
            state,
            last_sent: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> &TabState<NodeOf<H>> {
        &self.state
    }

    /// Run the first pass.
    pub fn start(&mut self) {
        self.reconcile();
    }

    /// Poll timer callback.
    pub fn tick(&mut self) {
        self.check_navigation();
        self.process_events();

        if self.state.is_settled() {
            return;
        }

        let elapsed = self.host.now_ms().saturating_sub(self.state.navigated_at);
        if elapsed >= self.config.deadline_ms {
            self.report_deadline(elapsed);
            return;
        }

        self.reconcile();
    }

    /// Compare the current location with the last one seen and reset all
    /// per-page state on change. Returns whether a navigation happened.
    pub fn check_navigation(&mut self) -> bool {
        let href = self.host.location_href();
        if navigation_identifier(&href) == self.state.navigation_id {
            return false;
        }
        self.navigate(&href);
        true
    }

    fn navigate(&mut self, href: &str) {
        log::debug!("Navigation from {} to {}", self.state.href, href);
        let dom = self.host.dom();
        self.state.release_all(dom);
        self.state = TabState::new(href, self.host.now_ms());
        self.last_sent = None;
        self.reconcile();
    }

    /// Drain queued DOM events and react to the ones we own. Events from
    /// observers released since they were queued are dropped.
    pub fn process_events(&mut self) {
        let events = self.host.dom().drain_events();
        let mut rerun = false;

        for event in events {
            match event {
                DomEvent::ChildrenAdded(id) if owns(&self.state.list_observer, id) => {
                    log::debug!("Video list grew");
                    self.state.invalidate(Concern::VIDEO_LIST);
                    rerun = true;
                }
                DomEvent::AttributeChanged(id) if owns(&self.state.channel_link_observer, id) => {
                    if self.state.deadline_reported {
                        log::trace!("Ignoring channel link change after the deadline");
                        continue;
                    }
                    log::debug!("Channel link changed");
                    self.state.reset_channel();
                    rerun = true;
                }
                DomEvent::Clicked(id) => match self.state.listeners.get(&id) {
                    Some(listener) => {
                        let action = listener.action.clone();
                        self.on_click(action);
                    }
                    None => log::trace!("Ignoring click from released {}", id),
                },
                other => log::trace!("Ignoring event from released {}", other.observer()),
            }
        }

        if !rerun {
            return;
        }
        if self.state.deadline_reported {
            self.reconfigure_video_list();
        } else {
            self.reconcile();
        }
    }

    /// Past the deadline the list observer still drives the video list, but
    /// nothing else is retried.
    fn reconfigure_video_list(&mut self) {
        let options = Rc::clone(&self.options);
        video_list::configure(self.host.dom(), &mut self.state, &options);
    }

    fn on_click(&mut self, action: ClickAction<NodeOf<H>>) {
        let dom = self.host.dom();
        match action {
            ClickAction::Jump(delta) => {
                if let Some(platform) = self.state.platform {
                    player::jump(dom, &platform.selectors().player, delta);
                }
            }
            ClickAction::ToggleItem(item) => video_list::toggle_item(dom, &self.options, &item),
        }
    }

    /// Apply a storage change delta and reconfigure what depends on it.
    pub fn apply_option_changes(&mut self, changes: &OptionMap) {
        let changed = Rc::make_mut(&mut self.options).apply_changes(changes);
        if changed.is_empty() {
            return;
        }

        for key in &changed {
            if key.affects_sfm_state() {
                self.state.reset_sfm_state();
            }
            self.state.invalidate(key.concerns());
        }
        log::debug!(
            "Options changed: {:?}",
            changed.iter().map(|k| k.storage_key()).collect::<Vec<_>>()
        );
        self.reconcile();
    }

    /// One reconciliation pass.
    pub fn reconcile(&mut self) {
        if self.state.is_settled() {
            return;
        }

        let options = Rc::clone(&self.options);
        let dom = self.host.dom();

        channel::determine(dom, &mut self.state);
        determine_sfm_state(&mut self.state, &options);
        player::configure(dom, &mut self.state, &options);
        video_list::configure(dom, &mut self.state, &options);
        theatre::configure(dom, &mut self.state, &options);

        self.send_tab_info();
    }

    fn send_tab_info(&mut self) {
        if !self.state.tab_info_dirty {
            return;
        }
        if !self.state.channel_determined || self.state.sfm_state.is_none() {
            return;
        }
        let Some(info) = self.tab_info().filter(|_| self.config.top_frame) else {
            self.state.tab_info_dirty = false;
            return;
        };
        self.state.tab_info_dirty = false;

        if self.last_sent.as_ref() == Some(&info) {
            return;
        }

        match self.host.send_message(&Message::TabInfo(info.clone())) {
            Ok(()) => log::debug!("Sent tab info: {:?}", info),
            Err(SendError::NoReceiver) => log::debug!("No receiver for tab info"),
            Err(e) => log::warn!("Failed to send tab info: {}", e),
        }
        self.last_sent = Some(info);
    }

    fn report_deadline(&mut self, elapsed: u64) {
        if self.state.deadline_reported {
            return;
        }
        self.state.deadline_reported = true;
        log::warn!(
            "Giving up after {}ms on {}: page={} channel={} sfm_state={:?} unconfigured={:?} channel_determined={}",
            elapsed,
            self.state.href,
            self.state.page_type.as_str(),
            self.state
                .channel
                .as_ref()
                .map(|c| c.qualified_name())
                .unwrap_or_else(|| "-".to_string()),
            self.state.sfm_state,
            self.state.outstanding().names(),
            self.state.channel_determined,
        );
    }

    /// Current tab summary, `None` off supported platforms.
    pub fn tab_info(&self) -> Option<TabInfo> {
        let platform = self.state.platform?;
        Some(TabInfo::new(platform, self.state.channel.as_ref(), self.state.sfm_state))
    }

    /// Answer a message from another extension context.
    pub fn handle_message(&self, message: &Message) -> Option<Message> {
        match message {
            Message::TabInfoRequest if self.config.top_frame => self.tab_info().map(Message::TabInfo),
            _ => None,
        }
    }

    /// Release everything the current page acquired.
    pub fn shutdown(&mut self) {
        let dom = self.host.dom();
        self.state.release_all(dom);
    }
}

/// Evaluate the SFM state once enough is known.
///
/// Before the channel is determined only a verdict that does not depend on
/// the channel is accepted. A channel taken from the URL is enough for that.
fn determine_sfm_state<N: Clone + PartialEq>(state: &mut TabState<N>, options: &Options) {
    if state.sfm_state.is_some() {
        return;
    }
    let verdict = policy::evaluate(options, state.platform, state.channel.as_ref());
    if !state.channel_determined && verdict == SfmState::ChannelDependent {
        return;
    }
    log::debug!("SFM state: {:?}", verdict);
    state.sfm_state = Some(verdict);
    state.tab_info_dirty = true;
}

fn owns<N>(slot: &Option<(ObserverId, N)>, id: ObserverId) -> bool {
    matches!(slot, Some((owned, _)) if *owned == id)
}
