//! Extension API interop
//!
//! `chrome.*` is not covered by `web_sys`, so every call walks the global
//! object with `Reflect` and invokes the function it finds.

use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use serde_json::Value;
use sf_core::options::OptionMap;
use sf_core::{Message, SendError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Storage area that holds the options.
pub const STORAGE_AREA: &str = "sync";

/// Substring of the runtime error raised when nothing listens for a message.
const NO_RECEIVER: &str = "Receiving end does not exist";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Extension API not available: {0}")]
    Unavailable(String),
    #[error("Storage call failed: {0}")]
    Call(String),
    #[error("Failed to convert storage data: {0}")]
    Convert(String),
}

impl From<StorageError> for JsValue {
    fn from(e: StorageError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Resolve a dotted path below the global `chrome` object.
pub fn api(path: &[&str]) -> Result<JsValue, StorageError> {
    let mut current: JsValue = js_sys::global().into();
    for name in std::iter::once(&"chrome").chain(path) {
        current = Reflect::get(&current, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
            .ok_or_else(|| StorageError::Unavailable(format!("chrome.{}", path.join("."))))?;
    }
    Ok(current)
}

fn method(target: &JsValue, name: &str) -> Result<Function, StorageError> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| StorageError::Unavailable(name.to_string()))
}

fn describe(error: &JsValue) -> String {
    if let Some(message) = Reflect::get(error, &"message".into()).ok().and_then(|m| m.as_string()) {
        return message;
    }
    error.as_string().unwrap_or_else(|| format!("{:?}", error))
}

// =============================================================================
// Conversion
// =============================================================================

pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, StorageError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| StorageError::Convert(e.to_string()))
}

pub fn to_option_map(value: JsValue) -> Result<OptionMap, StorageError> {
    if value.is_undefined() || value.is_null() {
        return Ok(OptionMap::new());
    }
    match serde_wasm_bindgen::from_value::<Value>(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StorageError::Convert(format!("expected an object, got {}", other))),
        Err(e) => Err(StorageError::Convert(e.to_string())),
    }
}

/// Flatten a `storage.onChanged` payload to the new values. Removed keys map
/// to `null`, which resets the option to its default.
pub fn changes_to_option_map(changes: &JsValue) -> OptionMap {
    let mut map = OptionMap::new();
    let Some(object) = changes.dyn_ref::<Object>() else {
        return map;
    };
    for key in Object::keys(object).iter() {
        let Some(name) = key.as_string() else {
            continue;
        };
        let new_value = Reflect::get(changes, &key)
            .and_then(|change| Reflect::get(&change, &"newValue".into()))
            .unwrap_or(JsValue::UNDEFINED);
        let value = if new_value.is_undefined() {
            Value::Null
        } else {
            serde_wasm_bindgen::from_value(new_value).unwrap_or(Value::Null)
        };
        map.insert(name, value);
    }
    map
}

// =============================================================================
// chrome.storage
// =============================================================================

async fn call_storage(name: &str, arg: &JsValue) -> Result<JsValue, StorageError> {
    let area = api(&["storage", STORAGE_AREA])?;
    let result = method(&area, name)?
        .call1(&area, arg)
        .map_err(|e| StorageError::Call(describe(&e)))?;
    let promise = result
        .dyn_into::<Promise>()
        .map_err(|_| StorageError::Call(format!("storage.{} did not return a promise", name)))?;
    JsFuture::from(promise).await.map_err(|e| StorageError::Call(describe(&e)))
}

/// Everything in the options storage area.
pub async fn storage_get_all() -> Result<OptionMap, StorageError> {
    to_option_map(call_storage("get", &JsValue::NULL).await?)
}

pub async fn storage_set(items: &OptionMap) -> Result<(), StorageError> {
    if items.is_empty() {
        return Ok(());
    }
    call_storage("set", &to_js(items)?).await.map(|_| ())
}

pub async fn storage_remove(keys: &[String]) -> Result<(), StorageError> {
    if keys.is_empty() {
        return Ok(());
    }
    let array: Array = keys.iter().map(|k| JsValue::from_str(k)).collect();
    call_storage("remove", &array).await.map(|_| ())
}

/// Register `callback(changes, areaName)` on `chrome.storage.onChanged`.
pub fn on_storage_changed(callback: &Function) -> Result<(), StorageError> {
    let event = api(&["storage", "onChanged"])?;
    method(&event, "addListener")?
        .call1(&event, callback)
        .map_err(|e| StorageError::Call(describe(&e)))?;
    Ok(())
}

// =============================================================================
// chrome.runtime
// =============================================================================

/// Register `callback(message, sender, sendResponse)` on
/// `chrome.runtime.onMessage`.
pub fn on_runtime_message(callback: &Function) -> Result<(), StorageError> {
    let event = api(&["runtime", "onMessage"])?;
    method(&event, "addListener")?
        .call1(&event, callback)
        .map_err(|e| StorageError::Call(describe(&e)))?;
    Ok(())
}

pub fn message_to_js(message: &Message) -> Result<JsValue, SendError> {
    let json = message.to_json()?;
    js_sys::JSON::parse(&json).map_err(|e| SendError::Encode(describe(&e)))
}

pub fn message_from_js(value: &JsValue) -> Option<Message> {
    let json = js_sys::JSON::stringify(value).ok()?.as_string()?;
    Message::from_json(&json)
}

/// Fire-and-forget `chrome.runtime.sendMessage`.
///
/// A missing receiver only surfaces as an asynchronous rejection, which is
/// logged and swallowed.
pub fn send_message(message: &Message) -> Result<(), SendError> {
    let payload = message_to_js(message)?;
    let runtime = api(&["runtime"]).map_err(|_| SendError::NoReceiver)?;
    let send = method(&runtime, "sendMessage").map_err(|e| SendError::Transport(e.to_string()))?;
    let result = send.call1(&runtime, &payload).map_err(|e| {
        let reason = describe(&e);
        if reason.contains(NO_RECEIVER) {
            SendError::NoReceiver
        } else {
            SendError::Transport(reason)
        }
    })?;

    if let Ok(promise) = result.dyn_into::<Promise>() {
        let on_rejected = Closure::wrap(Box::new(move |error: JsValue| {
            let reason = describe(&error);
            if reason.contains(NO_RECEIVER) {
                log::debug!("No receiver for message");
            } else {
                log::warn!("Message delivery failed: {}", reason);
            }
        }) as Box<dyn FnMut(JsValue)>);
        let _ = promise.catch(&on_rejected);
        on_rejected.forget();
    }
    Ok(())
}
