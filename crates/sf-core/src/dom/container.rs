//! Visibility containers
//!
//! Hiding a host element by mutating its style does not survive the host
//! page re-rendering that subtree. Instead each element is moved into an
//! extension-owned container once, and the container's class is toggled.
//! Host re-renders reparent the container at worst; they never rewrite it.

use crate::selectors::HideStrategy;

use super::{Dom, DomError, CONTAINER_CLASS, HIDDEN_CLASS, SOME_CHILDREN_HIDDEN_CLASS};

/// Wrap `element` in a container, or return the container it is already in.
///
/// Calling this repeatedly on the same element never nests wrappers.
/// `marker` is added to the container so it can be found by kind later.
pub fn ensure_container<D: Dom>(
    dom: &D,
    element: &D::Node,
    marker: Option<&str>,
) -> Result<D::Node, DomError> {
    let parent = dom.parent(element);

    if let Some(parent) = &parent {
        if dom.has_class(parent, CONTAINER_CLASS) {
            if let Some(marker) = marker {
                dom.add_class(parent, marker);
            }
            return Ok(parent.clone());
        }
    }

    let container = dom.create_element("div")?;
    dom.add_class(&container, CONTAINER_CLASS);
    if let Some(marker) = marker {
        dom.add_class(&container, marker);
    }

    if let Some(parent) = &parent {
        dom.insert_before(parent, &container, element)?;
    }
    dom.append_child(&container, element)?;

    Ok(container)
}

pub fn is_visible<D: Dom>(dom: &D, container: &D::Node) -> bool {
    !dom.has_class(container, HIDDEN_CLASS)
}

/// Show or hide a batch of containers.
///
/// `None` toggles: the first container's state decides, and the resulting
/// state is applied to every container in the batch. Returns the state
/// applied, or `None` for an empty batch.
pub fn set_visible<D: Dom>(dom: &D, containers: &[D::Node], desired: Option<bool>) -> Option<bool> {
    let first = containers.first()?;
    let visible = desired.unwrap_or_else(|| !is_visible(dom, first));

    for container in containers {
        if visible {
            dom.remove_class(container, HIDDEN_CLASS);
        } else {
            dom.add_class(container, HIDDEN_CLASS);
        }
    }

    Some(visible)
}

/// Hide `element` by hiding its parent.
///
/// Returns false if the element is detached.
pub fn set_parent_visible<D: Dom>(dom: &D, element: &D::Node, visible: bool) -> bool {
    let Some(parent) = dom.parent(element) else {
        return false;
    };
    if visible {
        dom.remove_class(&parent, SOME_CHILDREN_HIDDEN_CLASS);
    } else {
        dom.add_class(&parent, SOME_CHILDREN_HIDDEN_CLASS);
    }
    true
}

/// Apply visibility to `element` with the given strategy.
pub fn apply_hide<D: Dom>(
    dom: &D,
    element: &D::Node,
    strategy: HideStrategy,
    marker: &str,
    visible: bool,
) -> Result<(), DomError> {
    match strategy {
        HideStrategy::Wrap => {
            let container = ensure_container(dom, element, Some(marker))?;
            set_visible(dom, std::slice::from_ref(&container), Some(visible));
            Ok(())
        }
        HideStrategy::ParentMarker => {
            if set_parent_visible(dom, element, visible) {
                Ok(())
            } else {
                Err(DomError::Operation(format!("{} element has no parent", marker)))
            }
        }
    }
}
