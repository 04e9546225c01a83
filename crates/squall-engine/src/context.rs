use crate::backend::Backend;
use crate::config::PipelineConfig;
use std::time::Duration;

/// Everything a stage strategy may touch, passed explicitly. The page is
/// shared mutable state across stages; nothing here is captured ambiently.
pub struct PipelineContext<'a> {
    pub backend: &'a mut dyn Backend,
    pub address: &'a str,
    pub config: &'a PipelineConfig,
    /// Set by the extraction stage.
    pub wind_speed: Option<String>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        backend: &'a mut dyn Backend,
        address: &'a str,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            backend,
            address,
            config,
            wind_speed: None,
        }
    }

    pub async fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
