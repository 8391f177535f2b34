//! `Dom` over the live document
//!
//! Observer and listener callbacks only push a [`DomEvent`] and poke the
//! notifier; the engine drains the queue later. Callback closures stay owned
//! by the registry until the engine disconnects them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Array;
use sf_core::dom::{Dom, DomError, DomEvent, ObserverId};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, HtmlElement, HtmlMediaElement, MutationObserver, MutationObserverInit,
    MutationRecord,
};

type MutationCallback = Closure<dyn FnMut(Array, MutationObserver)>;
type ClickCallback = Closure<dyn FnMut(Event)>;

enum Registration {
    Mutation {
        observer: MutationObserver,
        _callback: MutationCallback,
    },
    Click {
        target: Element,
        callback: ClickCallback,
    },
}

#[derive(Default)]
struct Shared {
    events: RefCell<Vec<DomEvent>>,
    notify: RefCell<Option<Rc<dyn Fn()>>>,
}

impl Shared {
    fn push(&self, event: DomEvent) {
        self.events.borrow_mut().push(event);
        let notify = self.notify.borrow().clone();
        if let Some(notify) = notify {
            notify();
        }
    }
}

pub struct WebDom {
    document: Document,
    next_id: Cell<u32>,
    registry: RefCell<HashMap<ObserverId, Registration>>,
    shared: Rc<Shared>,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            next_id: Cell::new(0),
            registry: RefCell::new(HashMap::new()),
            shared: Rc::new(Shared::default()),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Called after every queued event. Must not re-enter the engine
    /// synchronously.
    pub fn set_notify(&self, notify: impl Fn() + 'static) {
        *self.shared.notify.borrow_mut() = Some(Rc::new(notify));
    }

    /// Add a `<style>` element with `css` to the document head.
    pub fn inject_stylesheet(&self, css: &str) -> Result<(), DomError> {
        let style = self.create_element("style")?;
        style.set_text_content(Some(css));
        let parent: Element = match self.document.head() {
            Some(head) => head.into(),
            None => self
                .document
                .document_element()
                .ok_or_else(|| DomError::Operation("document has no root element".into()))?,
        };
        self.append_child(&parent, &style)
    }

    fn allocate(&self) -> ObserverId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ObserverId(id)
    }

    fn observe(
        &self,
        target: &Element,
        init: &MutationObserverInit,
        make_event: fn(ObserverId) -> DomEvent,
        filter: fn(&MutationRecord) -> bool,
    ) -> Result<ObserverId, DomError> {
        let id = self.allocate();
        let shared = Rc::clone(&self.shared);
        let callback: MutationCallback = Closure::wrap(Box::new(move |records: Array, _: MutationObserver| {
            let relevant = records
                .iter()
                .filter_map(|r| r.dyn_into::<MutationRecord>().ok())
                .any(|r| filter(&r));
            if relevant {
                shared.push(make_event(id));
            }
        }) as Box<dyn FnMut(Array, MutationObserver)>);

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(js_error)?;
        observer.observe_with_options(target, init).map_err(js_error)?;
        self.registry.borrow_mut().insert(
            id,
            Registration::Mutation {
                observer,
                _callback: callback,
            },
        );
        Ok(id)
    }
}

fn js_error(e: JsValue) -> DomError {
    DomError::Operation(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

impl Dom for WebDom {
    type Node = Element;

    fn query(&self, root: Option<&Element>, selector: &str) -> Option<Element> {
        let result = match root {
            Some(root) => root.query_selector(selector),
            None => self.document.query_selector(selector),
        };
        result.unwrap_or_else(|e| {
            log::debug!("Bad selector '{}': {:?}", selector, e);
            None
        })
    }

    fn query_all(&self, root: Option<&Element>, selector: &str) -> Vec<Element> {
        let result = match root {
            Some(root) => root.query_selector_all(selector),
            None => self.document.query_selector_all(selector),
        };
        let Ok(list) = result else {
            log::debug!("Bad selector '{}'", selector);
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn is_connected(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn create_element(&self, tag: &str) -> Result<Element, DomError> {
        self.document
            .create_element(tag)
            .map_err(|_| DomError::CreateElement(tag.to_string()))
    }

    fn insert_before(&self, parent: &Element, node: &Element, reference: &Element) -> Result<(), DomError> {
        parent.insert_before(node, Some(reference)).map(|_| ()).map_err(js_error)
    }

    fn append_child(&self, parent: &Element, child: &Element) -> Result<(), DomError> {
        parent.append_child(child).map(|_| ()).map_err(js_error)
    }

    fn remove(&self, node: &Element) {
        node.remove();
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) {
        let _ = node.class_list().add_1(class);
    }

    fn remove_class(&self, node: &Element, class: &str) {
        let _ = node.class_list().remove_1(class);
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        if let Err(e) = node.set_attribute(name, value) {
            log::debug!("Failed to set {}: {:?}", name, e);
        }
    }

    fn text(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn click(&self, node: &Element) {
        match node.dyn_ref::<HtmlElement>() {
            Some(element) => element.click(),
            None => log::debug!("Cannot click <{}>", node.tag_name()),
        }
    }

    fn seek_media_by(&self, media: &Element, seconds: f64) -> Result<(), DomError> {
        let media = media
            .dyn_ref::<HtmlMediaElement>()
            .ok_or_else(|| DomError::Operation(format!("<{}> is not a media element", media.tag_name())))?;
        media.set_current_time((media.current_time() + seconds).max(0.0));
        Ok(())
    }

    fn observe_children(&self, target: &Element) -> Result<ObserverId, DomError> {
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        self.observe(target, &init, DomEvent::ChildrenAdded, |r| r.added_nodes().length() > 0)
    }

    fn observe_attribute(&self, target: &Element, attribute: &str) -> Result<ObserverId, DomError> {
        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_attribute_filter(&Array::of1(&JsValue::from_str(attribute)));
        self.observe(target, &init, DomEvent::AttributeChanged, |_| true)
    }

    fn listen_click(&self, target: &Element) -> Result<ObserverId, DomError> {
        let id = self.allocate();
        let shared = Rc::clone(&self.shared);
        let callback: ClickCallback = Closure::wrap(Box::new(move |event: Event| {
            event.prevent_default();
            event.stop_propagation();
            shared.push(DomEvent::Clicked(id));
        }) as Box<dyn FnMut(Event)>);

        target
            .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
            .map_err(js_error)?;
        self.registry.borrow_mut().insert(
            id,
            Registration::Click {
                target: target.clone(),
                callback,
            },
        );
        Ok(id)
    }

    fn disconnect(&self, id: ObserverId) {
        let Some(registration) = self.registry.borrow_mut().remove(&id) else {
            return;
        };
        match registration {
            Registration::Mutation { observer, .. } => observer.disconnect(),
            Registration::Click { target, callback } => {
                let _ = target.remove_event_listener_with_callback("click", callback.as_ref().unchecked_ref());
            }
        }
        self.shared.events.borrow_mut().retain(|e| e.observer() != id);
    }

    fn drain_events(&self) -> Vec<DomEvent> {
        std::mem::take(&mut *self.shared.events.borrow_mut())
    }
}
