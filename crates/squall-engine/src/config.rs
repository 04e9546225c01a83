use std::time::Duration;

/// Pipeline timings and bounds. The defaults mirror the observed behavior of
/// the target application: a client-rendered map widget that hydrates
/// several seconds after load, and a results computation that can take tens
/// of seconds on the remote end.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub target_url: String,
    /// Substring in rendered text that marks a completed computation.
    pub marker: String,
    pub navigation_timeout: Duration,
    /// Pause after initial load before touching anything.
    pub initial_settle: Duration,
    /// Map widget hydration delay before the address input exists.
    pub hydration_settle: Duration,
    /// Delay before the locator retries a full walk.
    pub locator_settle: Duration,
    /// How long to wait for the suggestion list before falling back to Enter.
    pub suggestion_wait: Duration,
    /// Map update delay after the address is submitted.
    pub post_search_settle: Duration,
    pub ui_settle: Duration,
    pub short_settle: Duration,
    /// Outer bound on the result-marker wait.
    pub marker_timeout: Duration,
    /// Render delay after the marker first appears.
    pub post_marker_settle: Duration,
    /// Poll cadence for wait-for-condition loops.
    pub poll_interval: Duration,
    /// Hard bound on any single strategy attempt.
    pub stage_timeout: Duration,
    /// Visited-node cap for the probe's DOM walk.
    pub max_nodes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_url: "https://ascehazardtool.org/".into(),
            marker: "Vmph".into(),
            navigation_timeout: Duration::from_secs(60),
            initial_settle: Duration::from_secs(3),
            hydration_settle: Duration::from_secs(5),
            locator_settle: Duration::from_secs(2),
            suggestion_wait: Duration::from_secs(4),
            post_search_settle: Duration::from_secs(5),
            ui_settle: Duration::from_secs(2),
            short_settle: Duration::from_secs(1),
            marker_timeout: Duration::from_secs(60),
            post_marker_settle: Duration::from_secs(3),
            poll_interval: Duration::from_millis(500),
            stage_timeout: Duration::from_secs(90),
            max_nodes: 8000,
        }
    }
}
