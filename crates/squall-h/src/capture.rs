//! Passive screen recording over CDP screencast frames.
//!
//! Frames flow through a bounded channel that the pipeline never awaits: a
//! full buffer drops the frame, and the writer task drains independently.
//! The file is sealed with a bounded wait on stop.

use base64::Engine as _;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    EventScreencastFrame, ScreencastFrameAckParams, StartScreencastFormat, StartScreencastParams,
    StopScreencastParams,
};
use futures::StreamExt;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const FRAME_BUFFER: usize = 64;
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ScreenRecorder {
    page: Page,
    path: PathBuf,
    listener: JoinHandle<u64>,
    writer: JoinHandle<u64>,
}

impl ScreenRecorder {
    pub async fn start(
        page: &Page,
        path: PathBuf,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let mut frames = page
            .event_listener::<EventScreencastFrame>()
            .await
            .map_err(|e| format!("Failed to subscribe to screencast frames: {}", e))?;

        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| format!("Failed to create recording file: {}", e))?;

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(FRAME_BUFFER);

        let writer = tokio::spawn(async move {
            let mut file = file;
            let mut written: u64 = 0;
            while let Some(frame) = rx.recv().await {
                if file.write_all(&frame).await.is_err() {
                    break;
                }
                written += 1;
            }
            let _ = file.flush().await;
            written
        });

        let ack_page = page.clone();
        let listener = tokio::spawn(async move {
            let mut dropped: u64 = 0;
            while let Some(event) = frames.next().await {
                // Ack first; an unacknowledged frame stalls the stream.
                let ack = ScreencastFrameAckParams::new(event.session_id);
                if let Err(e) = ack_page.execute(ack).await {
                    tracing::debug!("Screencast ack failed: {}", e);
                }
                match decode_frame(event.as_ref()) {
                    Some(bytes) => {
                        if tx.try_send(bytes).is_err() {
                            dropped += 1;
                        }
                    }
                    None => dropped += 1,
                }
            }
            if dropped > 0 {
                tracing::debug!(dropped, "screencast frames dropped");
            }
            dropped
        });

        page.execute(
            StartScreencastParams::builder()
                .format(StartScreencastFormat::Png)
                .quality(80)
                .every_nth_frame(1)
                .build(),
        )
        .await
        .map_err(|e| format!("Failed to start screencast: {}", e))?;

        tracing::info!("Screen recording started: {}", path.display());

        Ok(Self {
            page: page.clone(),
            path,
            listener,
            writer,
        })
    }

    /// Stops the screencast and seals the file. Bounded: teardown must not
    /// hang on a stuck frame stream.
    pub async fn stop(self) -> PathBuf {
        if let Err(e) = self.page.execute(StopScreencastParams::default()).await {
            tracing::debug!("Stopping screencast failed: {}", e);
        }

        // Ending the listener drops the sender, which lets the writer drain
        // and exit.
        self.listener.abort();
        let _ = self.listener.await;

        match tokio::time::timeout(FLUSH_TIMEOUT, self.writer).await {
            Ok(Ok(written)) => tracing::info!(frames = written, "screen recording sealed"),
            Ok(Err(e)) => tracing::warn!("Recording writer task failed: {}", e),
            Err(_) => tracing::warn!("Recording flush timed out"),
        }

        self.path
    }
}

/// The frame payload is base64 in the CDP wire shape; read it through JSON.
fn decode_frame(event: &EventScreencastFrame) -> Option<Vec<u8>> {
    let value = serde_json::to_value(event).ok()?;
    let b64 = value.get("data")?.as_str()?;
    base64::engine::general_purpose::STANDARD.decode(b64).ok()
}
