//! Failure diagnostics: a markup + screenshot bundle per failure key,
//! forwarded to an external artifact store.

use crate::backend::Backend;
use async_trait::async_trait;
use squall_common::job::ResultRecord;
use std::collections::HashSet;

/// Markup snapshots are size-capped before upload.
pub const MARKUP_SNAPSHOT_CAP: usize = 500_000;

/// Passive side-channel for debug artifacts; never read back.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&mut self, key: &str, bytes: &[u8], content_type: &str) -> std::io::Result<()>;
}

/// Destination for the job's single terminal record.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn push(&mut self, record: &ResultRecord) -> std::io::Result<()>;
}

/// Captures at most one bundle per failure key per run. Capture problems
/// are logged and swallowed so they can never mask the failure that
/// triggered them.
pub struct DiagnosticsCollector<'a> {
    store: &'a mut dyn ArtifactStore,
    captured: HashSet<String>,
}

impl<'a> DiagnosticsCollector<'a> {
    pub fn new(store: &'a mut dyn ArtifactStore) -> Self {
        Self {
            store,
            captured: HashSet::new(),
        }
    }

    pub async fn capture(&mut self, backend: &mut dyn Backend, key: &str) {
        if !self.captured.insert(key.to_string()) {
            tracing::debug!(key, "bundle already captured for this key");
            return;
        }
        tracing::info!(key, "capturing diagnostics bundle");

        match backend.content().await {
            Ok(html) => {
                let capped = cap_markup(html);
                if let Err(e) = self
                    .store
                    .put(&format!("{key}_HTML"), capped.as_bytes(), "text/html")
                    .await
                {
                    tracing::warn!(key, error = %e, "failed to store markup snapshot");
                }
            }
            Err(e) => tracing::warn!(key, error = %e, "failed to serialize markup"),
        }

        match backend.screenshot().await {
            Ok(png) => {
                if let Err(e) = self
                    .store
                    .put(&format!("{key}_SCREENSHOT"), &png, "image/png")
                    .await
                {
                    tracing::warn!(key, error = %e, "failed to store screenshot");
                }
            }
            Err(e) => tracing::warn!(key, error = %e, "failed to capture screenshot"),
        }
    }
}

fn cap_markup(mut html: String) -> String {
    if html.len() > MARKUP_SNAPSHOT_CAP {
        let mut end = MARKUP_SNAPSHOT_CAP;
        while !html.is_char_boundary(end) {
            end -= 1;
        }
        html.truncate(end);
    }
    html
}
