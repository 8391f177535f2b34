//! DOM abstraction
//!
//! The engine never touches browser bindings directly. It drives a [`Dom`]
//! implementation: `web_sys` in the extension, an in-memory tree in tests.
//! All methods take `&self`; implementations use interior mutability the same
//! way the browser DOM does.
//!
//! Observers do not call back into the engine. They queue [`DomEvent`]s that
//! the engine drains and matches against the observers it currently owns, so
//! an event from a disconnected observer is simply ignored.

mod container;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::fmt;

pub use container::{apply_hide, ensure_container, is_visible, set_parent_visible, set_visible};

// =============================================================================
// Class names
// =============================================================================

/// Extension-owned wrapper around a hidden element
pub const CONTAINER_CLASS: &str = "sfm-container";
/// Applied to a container to hide its contents
pub const HIDDEN_CLASS: &str = "sfm-hidden";
/// Applied to a host element whose children we hide wholesale
pub const SOME_CHILDREN_HIDDEN_CLASS: &str = "sfm-some-children-hidden";
pub const TOOLBAR_CLASS: &str = "sfm-toolbar";
pub const TOOLBAR_BUTTON_CLASS: &str = "sfm-toolbar-button";
pub const ITEM_TOGGLE_CLASS: &str = "sfm-item-toggle";

/// Container markers, one per hidden element kind
pub mod marker {
    pub const DURATION: &str = "sfm-duration";
    pub const SEEK_BAR: &str = "sfm-seek-bar";
    pub const TITLE: &str = "sfm-title";
    pub const PREVIEW: &str = "sfm-preview";
    pub const LIST_DURATION: &str = "sfm-list-duration";
}

/// Injected once per document by the content script.
pub const STYLESHEET: &str = "\
.sfm-container { display: contents; }
.sfm-hidden, .sfm-some-children-hidden { display: none !important; }
.sfm-toolbar { display: inline-flex; gap: 4px; align-items: center; }
.sfm-toolbar-button, .sfm-item-toggle { cursor: pointer; font-size: 12px; }
";

// =============================================================================
// Events
// =============================================================================

/// Handle for a registered observer or listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEvent {
    /// Children were added to an observed node
    ChildrenAdded(ObserverId),
    /// An observed attribute changed
    AttributeChanged(ObserverId),
    /// A listened element was clicked
    Clicked(ObserverId),
}

impl DomEvent {
    pub fn observer(self) -> ObserverId {
        match self {
            Self::ChildrenAdded(id) | Self::AttributeChanged(id) | Self::Clicked(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Failed to create <{0}> element")]
    CreateElement(String),
    #[error("DOM operation failed: {0}")]
    Operation(String),
}

// =============================================================================
// Dom trait
// =============================================================================

pub trait Dom {
    type Node: Clone + PartialEq + fmt::Debug;

    /// First descendant of `root` (or the document) matching `selector`.
    fn query(&self, root: Option<&Self::Node>, selector: &str) -> Option<Self::Node>;

    /// All descendants of `root` (or the document) matching `selector`, in
    /// document order.
    fn query_all(&self, root: Option<&Self::Node>, selector: &str) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn is_connected(&self, node: &Self::Node) -> bool;

    fn create_element(&self, tag: &str) -> Result<Self::Node, DomError>;

    fn insert_before(
        &self,
        parent: &Self::Node,
        node: &Self::Node,
        reference: &Self::Node,
    ) -> Result<(), DomError>;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), DomError>;

    /// Detach `node` from its parent. No-op if already detached.
    fn remove(&self, node: &Self::Node);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    fn add_class(&self, node: &Self::Node, class: &str);

    fn remove_class(&self, node: &Self::Node, class: &str);

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn text(&self, node: &Self::Node) -> String;

    fn set_text(&self, node: &Self::Node, text: &str);

    /// Dispatch a click on a host element.
    fn click(&self, node: &Self::Node);

    /// Move a media element's playback position by `seconds`.
    fn seek_media_by(&self, media: &Self::Node, seconds: f64) -> Result<(), DomError>;

    /// Watch `target`'s direct child list for additions.
    fn observe_children(&self, target: &Self::Node) -> Result<ObserverId, DomError>;

    /// Watch one attribute of `target`.
    fn observe_attribute(&self, target: &Self::Node, attribute: &str) -> Result<ObserverId, DomError>;

    /// Listen for clicks on `target`.
    fn listen_click(&self, target: &Self::Node) -> Result<ObserverId, DomError>;

    /// Release an observer or listener. Unknown ids are ignored.
    fn disconnect(&self, id: ObserverId);

    /// Take all events queued since the last call.
    fn drain_events(&self) -> Vec<DomEvent>;
}
