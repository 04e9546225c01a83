//! The stage sequencer and the single-job entry point.

use crate::backend::Backend;
use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::diagnostics::{ArtifactStore, DiagnosticsCollector, ResultSink};
use crate::stages::{Stage, StageOutcome, StageSpec, default_stages};
use squall_common::error::BackendError;
use squall_common::job::{JobInput, ResultRecord};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Input must contain \"address\" field.")]
    InputMissing,

    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The computation never surfaced the marker, or no qualifying text
    /// node carried it. Absence of the value is always a failure.
    #[error("{marker} not found.")]
    MarkerNotFound { marker: String },

    #[error("{stage} failed: {reason}")]
    StageFailed { stage: Stage, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Executes the fixed stage list strictly in order. Later stages depend on
/// DOM state left by earlier ones, so there is no skipping and no
/// parallelism between stages.
pub struct StageRunner {
    specs: Vec<StageSpec>,
}

impl StageRunner {
    pub fn new(specs: Vec<StageSpec>) -> Self {
        Self { specs }
    }

    pub fn default_pipeline() -> Self {
        Self::new(default_stages())
    }

    pub async fn run(
        &self,
        cx: &mut PipelineContext<'_>,
        diagnostics: &mut DiagnosticsCollector<'_>,
    ) -> Result<Vec<StageOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            tracing::info!(stage = %spec.stage, "stage starting");
            let outcome = run_stage(spec, cx).await;
            let failed = !outcome.success;
            let reason = outcome.error.clone();
            outcomes.push(outcome);

            if failed {
                if spec.fatal {
                    diagnostics.capture(cx.backend, spec.stage.failure_key()).await;
                    return Err(fatal_error(spec.stage, reason, &cx.config.marker));
                }
                tracing::warn!(
                    stage = %spec.stage,
                    reason = reason.as_deref().unwrap_or("no strategy succeeded"),
                    "best-effort stage failed, continuing"
                );
            }
        }
        Ok(outcomes)
    }
}

/// Strategies run in declared order; the first success ends the stage.
async fn run_stage(spec: &StageSpec, cx: &mut PipelineContext<'_>) -> StageOutcome {
    let mut last_error = None;
    for strategy in &spec.strategies {
        match tokio::time::timeout(cx.config.stage_timeout, strategy.attempt(cx)).await {
            Ok(Ok(())) => {
                tracing::info!(stage = %spec.stage, strategy = strategy.name(), "stage complete");
                return StageOutcome {
                    stage: spec.stage,
                    success: true,
                    strategy_used: Some(strategy.name()),
                    error: None,
                };
            }
            Ok(Err(e)) => {
                tracing::debug!(
                    stage = %spec.stage,
                    strategy = strategy.name(),
                    error = %e,
                    "strategy failed"
                );
                last_error = Some(e.to_string());
            }
            Err(_) => {
                tracing::debug!(
                    stage = %spec.stage,
                    strategy = strategy.name(),
                    "strategy hit the stage timeout"
                );
                last_error = Some(format!("strategy {} timed out", strategy.name()));
            }
        }
    }
    StageOutcome {
        stage: spec.stage,
        success: false,
        strategy_used: None,
        error: last_error,
    }
}

fn fatal_error(stage: Stage, reason: Option<String>, marker: &str) -> PipelineError {
    let reason = reason.unwrap_or_else(|| "no strategy succeeded".into());
    match stage {
        Stage::Navigate => PipelineError::Navigation(reason),
        Stage::AwaitResultMarker | Stage::ExtractResult => PipelineError::MarkerNotFound {
            marker: marker.to_string(),
        },
        _ => PipelineError::StageFailed { stage, reason },
    }
}

/// Runs one job end to end: input guard, session acquisition, the stage
/// sequence, and the terminal record. Exactly one record is produced for
/// every job that passes the input guard, and the browser is released on
/// every path after a successful launch.
pub async fn run_job(
    backend: &mut dyn Backend,
    store: &mut dyn ArtifactStore,
    sink: &mut dyn ResultSink,
    input: &JobInput,
    config: &PipelineConfig,
) -> Result<ResultRecord, PipelineError> {
    if input.address.trim().is_empty() {
        return Err(PipelineError::InputMissing);
    }

    tracing::info!(address = %input.address, "starting wind speed lookup");

    if let Err(e) = backend.launch().await {
        let record = ResultRecord::failed(&input.address, e.to_string());
        push_record(sink, &record).await;
        return Err(PipelineError::Backend(e));
    }

    let mut diagnostics = DiagnosticsCollector::new(store);
    let mut cx = PipelineContext::new(&mut *backend, &input.address, config);
    let runner = StageRunner::default_pipeline();

    let result = runner.run(&mut cx, &mut diagnostics).await.and_then(|_| {
        cx.wind_speed.take().ok_or_else(|| PipelineError::MarkerNotFound {
            marker: config.marker.clone(),
        })
    });

    match result {
        Ok(value) => {
            tracing::info!(wind_speed = %value, "job succeeded");
            let record = ResultRecord::success(&input.address, value);
            push_record(sink, &record).await;
            close_backend(backend).await;
            Ok(record)
        }
        Err(err) => {
            tracing::error!(error = %err, "job failed");
            diagnostics.capture(cx.backend, "FINAL_ERROR").await;
            let record = ResultRecord::failed(&input.address, err.to_string());
            push_record(sink, &record).await;
            close_backend(backend).await;
            Err(err)
        }
    }
}

async fn push_record(sink: &mut dyn ResultSink, record: &ResultRecord) {
    if let Err(e) = sink.push(record).await {
        tracing::error!(error = %e, "failed to persist result record");
    }
}

async fn close_backend(backend: &mut dyn Backend) {
    if let Err(e) = backend.close().await {
        tracing::warn!(error = %e, "browser teardown failed");
    }
}
