//! Theatre-mode concern
//!
//! Independent of the SFM state: the option only ever enters theatre mode,
//! and only once per navigation.

use crate::dom::Dom;
use crate::options::Options;
use crate::types::Concern;

use super::state::TabState;

pub fn configure<D: Dom>(dom: &D, state: &mut TabState<D::Node>, options: &Options) {
    if state.configured.contains(Concern::THEATRE) {
        return;
    }

    let theatre = state.platform.and_then(|p| p.selectors().theatre.as_ref());
    let Some(theatre) = theatre.filter(|_| state.page_type.has_player() && options.theatre_mode) else {
        state.configured.insert(Concern::THEATRE);
        return;
    };

    if dom.query(None, theatre.active).is_some() {
        state.configured.insert(Concern::THEATRE);
        return;
    }

    let Some(button) = dom.query(None, theatre.button) else {
        log::debug!("Theatre mode button not present yet");
        return;
    };
    log::debug!("Entering theatre mode");
    dom.click(&button);
    state.configured.insert(Concern::THEATRE);
}
