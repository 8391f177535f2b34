use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;

/// Page the content script runs on without needing a live stream.
const DIRECTORY_URL: &str = "https://www.twitch.tv/directory";

pub struct E2eOptions {
    pub chromedriver_url: String,
    pub extension_path: String,
    pub headless: bool,
}

pub fn run_e2e(opts: E2eOptions) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    runtime.block_on(run_e2e_async(opts))
}

async fn run_e2e_async(opts: E2eOptions) -> Result<(), String> {
    let extension_path = canonicalize_path(&opts.extension_path)?;

    let mut caps = ChromeCapabilities::new();
    let mut args = vec![
        format!("--disable-extensions-except={}", extension_path.display()),
        format!("--load-extension={}", extension_path.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];
    if opts.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    for arg in &args {
        caps.add_arg(arg).map_err(|e| format!("Failed to set chrome arg: {}", e))?;
    }

    let driver = WebDriver::new(&opts.chromedriver_url, caps)
        .await
        .map_err(|e| format!("Failed to connect to chromedriver: {}", e))?;

    let cdp = ChromeDevTools::new(driver.handle.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let extension_id = find_extension_id(&cdp)
        .await
        .ok_or_else(|| "Failed to locate extension service worker".to_string())?;
    log::debug!("Extension id: {}", extension_id);

    let mut errors = Vec::new();

    if let Err(e) = check_popup_wasm(&driver, &extension_id).await {
        errors.push(format!("Popup wasm check failed: {}", e));
    }

    if let Err(e) = check_content_script(&driver).await {
        errors.push(format!("Content script check failed: {}", e));
    }

    driver.quit().await.ok();

    if errors.is_empty() {
        println!("E2E checks passed");
        Ok(())
    } else {
        Err(format!("E2E failed:\n- {}", errors.join("\n- ")))
    }
}

async fn find_extension_id(cdp: &ChromeDevTools) -> Option<String> {
    let targets = cdp.execute_cdp("Target.getTargets").await.ok()?;
    let infos = targets.get("targetInfos")?.as_array()?;
    infos.iter().find_map(|info| {
        let target_type = info.get("type").and_then(Value::as_str).unwrap_or("");
        let url = info.get("url").and_then(Value::as_str).unwrap_or("");
        if !matches!(target_type, "service_worker" | "background_page") {
            return None;
        }
        let id = url.strip_prefix("chrome-extension://")?.split('/').next()?;
        (!id.is_empty()).then(|| id.to_string())
    })
}

async fn check_popup_wasm(driver: &WebDriver, extension_id: &str) -> Result<(), String> {
    let url = format!("chrome-extension://{}/popup/popup.html", extension_id);
    driver.goto(&url).await.map_err(|e| format!("Failed to open popup: {}", e))?;

    let parsed = eval_bool(
        driver,
        "return window.wasm?.parse_channel_input?.('https://www.twitch.tv/esl_csgo')?.qualifiedName === 'twitch/esl_csgo';",
    )
    .await
    .map_err(|e| format!("Failed to call wasm: {}", e))?;
    if !parsed {
        return Err("Channel URL was not parsed".to_string());
    }
    Ok(())
}

async fn check_content_script(driver: &WebDriver) -> Result<(), String> {
    driver
        .goto(DIRECTORY_URL)
        .await
        .map_err(|e| format!("Failed to navigate to {}: {}", DIRECTORY_URL, e))?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    let injected = eval_bool(
        driver,
        "return [...document.querySelectorAll('style')].some(s => s.textContent.includes('.sfm-container'));",
    )
    .await
    .map_err(|e| format!("Failed to inspect stylesheets: {}", e))?;
    if !injected {
        return Err("Content script did not inject its stylesheet".to_string());
    }
    Ok(())
}

async fn eval_bool(driver: &WebDriver, script: &str) -> WebDriverResult<bool> {
    let result = driver.execute(script, Vec::<Value>::new()).await?;
    Ok(result.json().as_bool().unwrap_or(false))
}

fn canonicalize_path(path: &str) -> Result<PathBuf, String> {
    std::fs::canonicalize(path).map_err(|e| format!("Failed to resolve '{}': {}", path, e))
}
