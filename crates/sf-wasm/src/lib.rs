//! WebAssembly bindings for SpoilerFree
//!
//! Entry points for the three extension contexts: the content script
//! ([`start_content_script`]), the background script ([`run_migration`]) and
//! the popup (channel parsing and option writes).

pub mod chrome;
pub mod content;
pub mod dom;

use sf_core::{
    migration, parse_channel_input as parse_channel, parse_qualified_name, EngineConfig, Options, Platform, SfmMode,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Start the engine on the current page. `config` may be `undefined` or a
/// partial `{ pollIntervalMs, deadlineMs, topFrame }` object.
#[wasm_bindgen]
pub async fn start_content_script(config: JsValue) -> Result<(), JsValue> {
    let config: EngineConfig = if config.is_undefined() || config.is_null() {
        EngineConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid engine config: {}", e)))?
    };
    content::start(config).await.map_err(|e| {
        log::error!("Content script failed to start: {}", e);
        JsValue::from(e)
    })
}

/// Bring stored options up to the current schema. Resolves to whether
/// anything was written.
#[wasm_bindgen]
pub async fn run_migration() -> Result<bool, JsValue> {
    let stored = chrome::storage_get_all().await?;
    let plan = migration::plan(&stored);
    if plan.is_empty() {
        log::debug!("Storage already at version {}", migration::stored_version(&stored));
        return Ok(false);
    }

    chrome::storage_set(&plan.set).await?;
    chrome::storage_remove(&plan.remove).await?;
    log::info!(
        "Migrated storage from version {}: {} written, {} removed",
        migration::stored_version(&stored),
        plan.set.len(),
        plan.remove.len()
    );
    Ok(true)
}

/// Parse user input into a stored channel, or `null` when it names no
/// supported channel.
#[wasm_bindgen]
pub fn parse_channel_input(text: &str) -> Result<JsValue, JsValue> {
    match parse_channel(text) {
        Some(channel) => Ok(chrome::to_js(&channel.to_stored())?),
        None => Ok(JsValue::NULL),
    }
}

/// Every option key with its default value.
#[wasm_bindgen]
pub fn default_options() -> Result<JsValue, JsValue> {
    Ok(chrome::to_js(&Options::default().to_storage())?)
}

/// Classify a URL. Returns `{ platform, pageType, channel }` or `null` for
/// unsupported hosts.
#[wasm_bindgen]
pub fn classify_url(url: &str) -> JsValue {
    let Some((platform, info)) = sf_core::classify_url(url) else {
        return JsValue::NULL;
    };
    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"platform".into(), &JsValue::from_str(platform.name()));
    let _ = js_sys::Reflect::set(&result, &"pageType".into(), &JsValue::from_str(info.page_type.as_str()));
    let channel = info
        .channel
        .map(|c| JsValue::from_str(&c.qualified_name()))
        .unwrap_or(JsValue::NULL);
    let _ = js_sys::Reflect::set(&result, &"channel".into(), &channel);
    result.into()
}

/// Add or remove a channel from the enabled set in storage.
#[wasm_bindgen]
pub async fn set_channel_enabled(qualified_name: String, enabled: bool) -> Result<(), JsValue> {
    let channel = parse_qualified_name(&qualified_name)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown channel: {}", qualified_name)))?;
    let options = Options::from_storage(&chrome::storage_get_all().await?);
    chrome::storage_set(&options.with_channel_enabled(&channel, enabled)).await?;
    Ok(())
}

/// Set the global SFM mode (`"always"`, `"never"` or `"custom"`).
#[wasm_bindgen]
pub async fn set_mode(mode: String) -> Result<(), JsValue> {
    let mode = SfmMode::from_str(&mode).ok_or_else(|| JsValue::from_str(&format!("Unknown mode: {}", mode)))?;
    let options = Options::from_storage(&chrome::storage_get_all().await?);
    chrome::storage_set(&options.with_mode(mode)).await?;
    Ok(())
}

/// Override the SFM mode for one platform. `"custom"` removes the override.
#[wasm_bindgen]
pub async fn set_platform_mode(platform: String, mode: String) -> Result<(), JsValue> {
    let platform =
        Platform::from_name(&platform).ok_or_else(|| JsValue::from_str(&format!("Unknown platform: {}", platform)))?;
    let mode = SfmMode::from_str(&mode).ok_or_else(|| JsValue::from_str(&format!("Unknown mode: {}", mode)))?;
    let options = Options::from_storage(&chrome::storage_get_all().await?);
    chrome::storage_set(&options.with_platform_mode(platform, mode)).await?;
    Ok(())
}
