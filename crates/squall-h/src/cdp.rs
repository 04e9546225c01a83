use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// Owns one Chromium process and one page context. `close` always tears the
/// process down and reaps the handler task.
pub struct CdpClient {
    pub browser: Browser,
    pub handler_task: JoinHandle<()>,
    pub page: Page,
    user_data_dir: Option<PathBuf>,
    cleanup_user_data_dir: bool,
}

impl CdpClient {
    pub async fn launch(visible: bool) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut config_builder = BrowserConfig::builder();
        config_builder = config_builder.no_sandbox(); // docker/CI/restricted envs
        config_builder = config_builder.window_size(1280, 800);

        let (user_data_dir, cleanup_user_data_dir) = resolve_user_data_dir()?;
        config_builder = config_builder.user_data_dir(&user_data_dir);

        if visible {
            tracing::info!("Launching browser in visible mode");
            config_builder = config_builder.with_head();
        } else {
            tracing::info!("Launching browser in headless mode");
        }

        // Custom Chrome path via CHROME_BIN
        if let Ok(chrome_bin) = std::env::var("CHROME_BIN") {
            tracing::info!("Using custom Chrome binary: {}", chrome_bin);
            config_builder = config_builder.chrome_executable(chrome_bin);
        }

        let (browser, mut handler) = Browser::launch(
            config_builder
                .build()
                .map_err(|e| format!("Failed to build browser config: {}", e))?,
        )
        .await
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(e) = h {
                    tracing::error!("Browser handler error (ignoring): {}", e);
                    continue;
                }
            }
            tracing::info!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to create page: {}", e))?;

        relay_console_messages(&page).await?;
        auto_accept_dialogs(&page).await?;

        if should_enable_network_logging() {
            if let Err(e) = enable_network_logging(&page).await {
                tracing::warn!("Failed to enable network logging: {}", e);
            }
        } else {
            tracing::info!(
                "Network logging disabled (set SQUALL_ENABLE_NETWORK_LOG=1 to enable)"
            );
        }

        Ok(Self {
            browser,
            handler_task,
            page,
            user_data_dir: Some(user_data_dir),
            cleanup_user_data_dir,
        })
    }

    pub async fn close(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;

        if self.cleanup_user_data_dir
            && let Some(dir) = &self.user_data_dir
            && let Err(e) = std::fs::remove_dir_all(dir)
        {
            tracing::debug!("Failed to clean up user-data-dir {}: {}", dir.display(), e);
        }

        Ok(())
    }
}

/// Relays page console output into the run log; the hazard tool reports
/// widget state there.
async fn relay_console_messages(
    page: &Page,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut console_events = page
        .event_listener::<chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled>()
        .await
        .map_err(|e| format!("Failed to subscribe to console events: {}", e))?;

    tokio::spawn(async move {
        while let Some(event) = console_events.next().await {
            let args_str: Vec<String> = event
                .args
                .iter()
                .map(|arg| {
                    arg.description
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string())
                })
                .collect();
            tracing::debug!(
                "Browser Console [{:?}]: {}",
                event.r#type,
                args_str.join(" ")
            );
        }
    });

    Ok(())
}

/// Auto-accepts JavaScript dialogs (alert/confirm/prompt). A pending dialog
/// blocks the page's JS thread and with it every probe evaluation.
async fn auto_accept_dialogs(page: &Page) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut dialog_events = page
        .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening>()
        .await
        .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

    let page_clone = page.clone();
    tokio::spawn(async move {
        while let Some(event) = dialog_events.next().await {
            tracing::info!(
                "Handling JavaScript dialog: {} ({:?})",
                event.message,
                event.r#type
            );
            let cmd =
                chromiumoxide::cdp::browser_protocol::page::HandleJavaScriptDialogParams::new(true);
            if let Err(e) = page_clone.execute(cmd).await {
                tracing::error!("Failed to accept dialog: {}", e);
            }
        }
    });

    Ok(())
}

/// Passive request log; fire-and-forget, never awaited by the pipeline.
async fn enable_network_logging(
    page: &Page,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut request_events = page
        .event_listener::<chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent>()
        .await
        .map_err(|e| format!("Failed to subscribe to network events: {}", e))?;

    tokio::spawn(async move {
        while let Some(event) = request_events.next().await {
            tracing::debug!(
                "Network Request: [{}] {}",
                event.request.method,
                event.request.url
            );
        }
    });

    Ok(())
}

fn should_enable_network_logging() -> bool {
    if let Ok(value) = std::env::var("SQUALL_ENABLE_NETWORK_LOG") {
        let normalized = value.trim().to_ascii_lowercase();
        return normalized == "1"
            || normalized == "true"
            || normalized == "yes"
            || normalized == "on";
    }
    false
}

fn resolve_user_data_dir() -> Result<(PathBuf, bool), Box<dyn std::error::Error + Send + Sync>> {
    if let Ok(dir) = std::env::var("SQUALL_USER_DATA_DIR") {
        let path = PathBuf::from(dir);
        std::fs::create_dir_all(&path)?;
        tracing::info!(
            "Using user data dir from SQUALL_USER_DATA_DIR: {}",
            path.display()
        );
        return Ok((path, false));
    }

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("System clock error: {}", e))?
        .as_nanos();
    let unique = format!("squall-chromium-profile-{}-{}", std::process::id(), nanos);
    let path = std::env::temp_dir().join(unique);
    std::fs::create_dir_all(&path)?;
    tracing::info!("Using isolated user data dir: {}", path.display());
    Ok((path, true))
}
