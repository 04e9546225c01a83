use crate::capture::ScreenRecorder;
use crate::cdp::CdpClient;
use crate::inject;
use async_trait::async_trait;
use squall_common::protocol::{ProbeAction, ProbeResponse};
use squall_engine::backend::{Backend, BackendError, NavigationResult};
use std::path::{Path, PathBuf};

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    recorder: Option<ScreenRecorder>,
    visible: bool,
    record: bool,
    recording: Option<PathBuf>,
}

impl HeadlessBackend {
    pub fn new(visible: bool, record: bool) -> Self {
        Self {
            client: None,
            recorder: None,
            visible,
            record,
            recording: None,
        }
    }

    /// Path of the sealed screen recording, available after `close`.
    pub fn recording_path(&self) -> Option<&Path> {
        self.recording.as_deref()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(false, false)
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        tracing::info!("Launching headless backend (Chromium)...");
        let client = CdpClient::launch(self.visible)
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;

        if self.record {
            let path = std::env::temp_dir()
                .join(format!("squall-recording-{}.webm", std::process::id()));
            match ScreenRecorder::start(&client.page, path).await {
                Ok(recorder) => self.recorder = Some(recorder),
                // Recording is telemetry; the run proceeds without it.
                Err(e) => tracing::warn!("Screen recording unavailable: {}", e),
            }
        }

        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Some(recorder) = self.recorder.take() {
            self.recording = Some(recorder.stop().await);
        }
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;

        tracing::info!("Navigating to: {}", url);
        client
            .page
            .goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        let title = client
            .page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = client
            .page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn execute_probe(
        &mut self,
        action: ProbeAction,
    ) -> Result<ProbeResponse, BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;

        let value = inject::execute_probe(&client.page, &action)
            .await
            .map_err(|e| BackendError::Probe(e.to_string()))?;

        let response: ProbeResponse = serde_json::from_value(value)?;
        Ok(response)
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        let bytes = client
            .page
            .screenshot(
                chromiumoxide::page::ScreenshotParams::builder()
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| BackendError::Other(format!("Screenshot failed: {}", e)))?;

        Ok(bytes)
    }

    async fn content(&mut self) -> Result<String, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        client
            .page
            .content()
            .await
            .map_err(|e| BackendError::Other(format!("Content failed: {}", e)))
    }

    async fn press_key(&mut self, key: &str) -> Result<(), BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;

        use chromiumoxide::cdp::browser_protocol::input::{
            DispatchKeyEventParams, DispatchKeyEventType,
        };

        let virtual_key = match key {
            "Tab" => Some(9),
            "Enter" => Some(13),
            "Escape" => Some(27),
            _ => None,
        };

        let mut down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key);
        if let Some(code) = virtual_key {
            down = down.windows_virtual_key_code(code);
        }
        if key == "Enter" {
            down = down.text("\r");
        }
        let down = down
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build key event: {:?}", e)))?;

        client
            .page
            .execute(down)
            .await
            .map_err(|e| BackendError::Other(format!("press_key down failed: {}", e)))?;

        let mut up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key);
        if let Some(code) = virtual_key {
            up = up.windows_virtual_key_code(code);
        }
        let up = up
            .build()
            .map_err(|e| BackendError::Other(format!("Failed to build key event: {:?}", e)))?;

        client
            .page
            .execute(up)
            .await
            .map_err(|e| BackendError::Other(format!("press_key up failed: {}", e)))?;

        Ok(())
    }

    async fn insert_text(&mut self, text: &str) -> Result<(), BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotReady)?;

        use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;

        client
            .page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(|e| BackendError::Other(format!("insert_text failed: {}", e)))?;
        Ok(())
    }
}
