#![cfg(target_arch = "wasm32")]

use sf_core::dom::{ensure_container, is_visible, set_visible, Dom, DomEvent, CONTAINER_CLASS, HIDDEN_CLASS};
use sf_wasm::dom::WebDom;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Element, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn fixture() -> (WebDom, Element) {
    let document = web_sys::window().unwrap().document().unwrap();
    let dom = WebDom::new(document);
    let root = dom.create_element("div").unwrap();
    let body: Element = dom.document().body().unwrap().into();
    dom.append_child(&body, &root).unwrap();
    (dom, root)
}

async fn next_microtask() {
    let promise = js_sys::Promise::resolve(&wasm_bindgen::JsValue::NULL);
    wasm_bindgen_futures::JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
fn query_and_classes() {
    let (dom, root) = fixture();
    let child = dom.create_element("span").unwrap();
    dom.add_class(&child, "duration");
    dom.append_child(&root, &child).unwrap();

    assert_eq!(dom.query(Some(&root), "span.duration"), Some(child.clone()));
    assert_eq!(dom.query_all(Some(&root), "span").len(), 1);
    assert_eq!(dom.query(Some(&root), "[[bad"), None);

    let container = ensure_container(&dom, &child, Some("sfm-duration")).unwrap();
    assert!(dom.has_class(&container, CONTAINER_CLASS));
    assert_eq!(dom.parent(&child), Some(container.clone()));
    assert_eq!(dom.parent(&container), Some(root.clone()));

    set_visible(&dom, std::slice::from_ref(&container), Some(false));
    assert!(dom.has_class(&container, HIDDEN_CLASS));
    assert!(!is_visible(&dom, &container));
    dom.remove(&root);
    assert!(!dom.is_connected(&child));
}

#[wasm_bindgen_test]
async fn children_observer_queues_event() {
    let (dom, root) = fixture();
    let id = dom.observe_children(&root).unwrap();

    let item = dom.create_element("article").unwrap();
    dom.append_child(&root, &item).unwrap();
    next_microtask().await;

    assert_eq!(dom.drain_events(), vec![DomEvent::ChildrenAdded(id)]);
    assert!(dom.drain_events().is_empty());
    dom.disconnect(id);
    dom.remove(&root);
}

#[wasm_bindgen_test]
async fn attribute_observer_filters_by_name() {
    let (dom, root) = fixture();
    let link = dom.create_element("a").unwrap();
    dom.append_child(&root, &link).unwrap();
    let id = dom.observe_attribute(&link, "href").unwrap();

    dom.set_attribute(&link, "title", "ignored");
    next_microtask().await;
    assert!(dom.drain_events().is_empty());

    dom.set_attribute(&link, "href", "/esl_csgo");
    next_microtask().await;
    assert_eq!(dom.drain_events(), vec![DomEvent::AttributeChanged(id)]);
    dom.disconnect(id);
    dom.remove(&root);
}

#[wasm_bindgen_test]
fn click_listener_and_disconnect() {
    let (dom, root) = fixture();
    let button = dom.create_element("button").unwrap();
    dom.append_child(&root, &button).unwrap();
    let id = dom.listen_click(&button).unwrap();

    button.dyn_ref::<HtmlElement>().unwrap().click();
    assert_eq!(dom.drain_events(), vec![DomEvent::Clicked(id)]);

    dom.disconnect(id);
    button.dyn_ref::<HtmlElement>().unwrap().click();
    assert!(dom.drain_events().is_empty());
    dom.remove(&root);
}

#[wasm_bindgen_test]
fn seek_requires_media_element() {
    let (dom, root) = fixture();
    assert!(dom.seek_media_by(&root, 10.0).is_err());

    let video = dom.create_element("video").unwrap();
    dom.append_child(&root, &video).unwrap();
    assert!(dom.seek_media_by(&video, -30.0).is_ok());
    dom.remove(&root);
}

#[wasm_bindgen_test]
fn classify_export() {
    let info = sf_wasm::classify_url("https://www.twitch.tv/esl_csgo");
    let platform = js_sys::Reflect::get(&info, &"platform".into()).unwrap();
    assert_eq!(platform.as_string().as_deref(), Some("twitch"));
    assert!(sf_wasm::classify_url("https://example.com/").is_null());
}
