//! Content-script runtime
//!
//! Wires one [`Engine`] to the live page: a poll timer, DOM observers, storage
//! change notifications and runtime messages.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use sf_core::dom::STYLESHEET;
use sf_core::{Engine, EngineConfig, Host, Message, Options, SendError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::chrome::{self, StorageError};
use crate::dom::WebDom;

pub struct WebHost {
    window: Window,
    dom: WebDom,
}

impl WebHost {
    pub fn new(window: Window) -> Result<Self, StorageError> {
        let document = window
            .document()
            .ok_or_else(|| StorageError::Unavailable("window.document".into()))?;
        Ok(Self { window, dom: WebDom::new(document) })
    }

    pub fn is_top_frame(&self) -> bool {
        matches!(self.window.top(), Ok(Some(top)) if top == self.window)
    }
}

impl Host for WebHost {
    type Dom = WebDom;

    fn dom(&self) -> &WebDom {
        &self.dom
    }

    fn location_href(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn send_message(&self, message: &Message) -> Result<(), SendError> {
        chrome::send_message(message)
    }
}

type SharedEngine = Rc<RefCell<Engine<WebHost>>>;

/// Run `f` on the engine unless a pass is already in progress. Skipped work
/// is picked up by the next poll.
fn with_engine(engine: &Weak<RefCell<Engine<WebHost>>>, f: impl FnOnce(&mut Engine<WebHost>)) {
    let Some(engine) = engine.upgrade() else {
        return;
    };
    let Ok(mut engine) = engine.try_borrow_mut() else {
        log::trace!("Engine busy; deferring");
        return;
    };
    f(&mut engine);
}

/// Start the content script on the current page.
pub async fn start(config: EngineConfig) -> Result<(), StorageError> {
    let window = web_sys::window().ok_or_else(|| StorageError::Unavailable("window".into()))?;
    let host = WebHost::new(window.clone())?;

    let config = EngineConfig {
        top_frame: config.top_frame && host.is_top_frame(),
        ..config
    };
    let options = match chrome::storage_get_all().await {
        Ok(stored) => Options::from_storage(&stored),
        Err(e) => {
            log::warn!("Failed to read options, using defaults: {}", e);
            Options::default()
        }
    };

    if let Err(e) = host.dom.inject_stylesheet(STYLESHEET) {
        log::warn!("Failed to inject stylesheet: {}", e);
    }

    let poll_interval = config.poll_interval_ms;
    let engine: SharedEngine = Rc::new(RefCell::new(Engine::new(host, config, options)));

    let weak = Rc::downgrade(&engine);
    engine.borrow().host().dom().set_notify(move || {
        let weak = weak.clone();
        wasm_bindgen_futures::spawn_local(async move {
            with_engine(&weak, |engine| engine.process_events());
        });
    });

    engine.borrow_mut().start();

    install_timer(&window, &engine, poll_interval)?;
    if let Err(e) = install_storage_listener(&engine) {
        log::warn!("Option changes will not be applied: {}", e);
    }
    if let Err(e) = install_message_listener(&engine) {
        log::warn!("Tab info requests will not be answered: {}", e);
    }

    log::info!("Content script started on {}", engine.borrow().state().href);
    Ok(())
}

fn install_timer(window: &Window, engine: &SharedEngine, interval_ms: u32) -> Result<(), StorageError> {
    let weak = Rc::downgrade(engine);
    let tick = Closure::wrap(Box::new(move || {
        with_engine(&weak, |engine| engine.tick());
    }) as Box<dyn FnMut()>);

    window
        .set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            interval_ms.try_into().unwrap_or(i32::MAX),
        )
        .map_err(|e| StorageError::Call(format!("setInterval: {:?}", e)))?;
    tick.forget();
    Ok(())
}

fn install_storage_listener(engine: &SharedEngine) -> Result<(), StorageError> {
    let weak = Rc::downgrade(engine);
    let callback = Closure::wrap(Box::new(move |changes: JsValue, area: JsValue| {
        if area.as_string().as_deref() != Some(chrome::STORAGE_AREA) {
            return;
        }
        let changes = chrome::changes_to_option_map(&changes);
        let weak = weak.clone();
        // Deferred so a busy engine never drops a change.
        wasm_bindgen_futures::spawn_local(async move {
            if let Some(engine) = weak.upgrade() {
                engine.borrow_mut().apply_option_changes(&changes);
            }
        });
    }) as Box<dyn FnMut(JsValue, JsValue)>);

    chrome::on_storage_changed(callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

fn install_message_listener(engine: &SharedEngine) -> Result<(), StorageError> {
    let weak = Rc::downgrade(engine);
    let callback = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: js_sys::Function| -> JsValue {
            let Some(message) = chrome::message_from_js(&message) else {
                return JsValue::FALSE;
            };
            let Some(engine) = weak.upgrade() else {
                return JsValue::FALSE;
            };
            let Ok(engine) = engine.try_borrow() else {
                return JsValue::FALSE;
            };
            let Some(response) = engine.handle_message(&message) else {
                return JsValue::FALSE;
            };
            match chrome::message_to_js(&response) {
                Ok(payload) => {
                    let _ = send_response.call1(&JsValue::NULL, &payload);
                }
                Err(e) => log::warn!("Failed to encode response: {}", e),
            }
            JsValue::FALSE
        },
    ) as Box<dyn FnMut(JsValue, JsValue, js_sys::Function) -> JsValue>);

    chrome::on_runtime_message(callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}
