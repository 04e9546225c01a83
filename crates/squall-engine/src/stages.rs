//! The fixed stage list and the strategy objects behind each stage.
//!
//! A stage is a goal with an ordered fallback chain; a strategy is one
//! concrete locate-and-act technique. Variant behavior lives here as data,
//! not as forked pipelines.

use crate::actions;
use crate::context::PipelineContext;
use crate::extract;
use crate::locator::{self, ElementQuery, LocateError, Predicate};
use crate::suppress::ModalSuppressor;
use async_trait::async_trait;
use squall_common::error::BackendError;
use std::fmt;

const RISK_CATEGORY: &str = "II";
const LOAD_TYPE: &str = "Wind";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Navigate,
    SuppressPopups,
    FillAddress,
    ConfirmSuggestion,
    SetRiskCategory,
    SelectLoadType,
    TriggerResults,
    AwaitResultMarker,
    ExtractResult,
}

impl Stage {
    /// Stable key for diagnostics artifacts.
    pub fn failure_key(self) -> &'static str {
        match self {
            Stage::Navigate => "NAV_FAILURE",
            Stage::SuppressPopups => "POPUP_FAILURE",
            Stage::FillAddress => "INPUT_FAILURE",
            Stage::ConfirmSuggestion => "SUGGESTION_FAILURE",
            Stage::SetRiskCategory => "RISK_CATEGORY_FAIL",
            Stage::SelectLoadType => "LOAD_TYPE_FAIL",
            Stage::TriggerResults => "VIEW_RESULTS_FAIL",
            Stage::AwaitResultMarker => "TIMEOUT_DUMP",
            Stage::ExtractResult => "MISSING_DATA",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Navigate => "navigation",
            Stage::SuppressPopups => "popup suppression",
            Stage::FillAddress => "address input",
            Stage::ConfirmSuggestion => "suggestion confirmation",
            Stage::SetRiskCategory => "risk category selection",
            Stage::SelectLoadType => "load type selection",
            Stage::TriggerResults => "results trigger",
            Stage::AwaitResultMarker => "result marker wait",
            Stage::ExtractResult => "result extraction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("element not found")]
    ElementNotFound,
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<LocateError> for StageError {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound => StageError::ElementNotFound,
            LocateError::Backend(e) => StageError::Backend(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub success: bool,
    pub strategy_used: Option<&'static str>,
    pub error: Option<String>,
}

#[async_trait]
pub trait StageStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError>;
}

pub struct StageSpec {
    pub stage: Stage,
    /// Fatal stages fail the whole job when every strategy misses;
    /// best-effort stages log and let the pipeline continue, since the
    /// downstream marker wait is the real correctness gate.
    pub fatal: bool,
    pub strategies: Vec<Box<dyn StageStrategy>>,
}

pub fn default_stages() -> Vec<StageSpec> {
    vec![
        StageSpec {
            stage: Stage::Navigate,
            fatal: true,
            strategies: vec![Box::new(NavigateToTarget)],
        },
        StageSpec {
            stage: Stage::SuppressPopups,
            fatal: false,
            strategies: vec![Box::new(AcknowledgeAndNuke)],
        },
        StageSpec {
            stage: Stage::FillAddress,
            fatal: true,
            strategies: vec![
                Box::new(DeepLocatorType),
                Box::new(ForcedValueInject),
                Box::new(TabOrderType),
            ],
        },
        StageSpec {
            stage: Stage::ConfirmSuggestion,
            fatal: false,
            strategies: vec![Box::new(ClickFirstSuggestion), Box::new(PressEnter)],
        },
        StageSpec {
            stage: Stage::SetRiskCategory,
            fatal: false,
            strategies: vec![Box::new(SelectRiskByClass), Box::new(SelectAnyRisk)],
        },
        StageSpec {
            stage: Stage::SelectLoadType,
            fatal: false,
            strategies: vec![Box::new(ClickWindLabel), Box::new(ClickWindInput)],
        },
        StageSpec {
            stage: Stage::TriggerResults,
            fatal: true,
            strategies: vec![
                Box::new(ClickResultsByText),
                Box::new(ClickResultsByTitle),
                Box::new(ScanButtonsForResults),
            ],
        },
        StageSpec {
            stage: Stage::AwaitResultMarker,
            fatal: true,
            strategies: vec![Box::new(WaitForMarker)],
        },
        StageSpec {
            stage: Stage::ExtractResult,
            fatal: true,
            strategies: vec![Box::new(ExtractLeafValue)],
        },
    ]
}

struct NavigateToTarget;

#[async_trait]
impl StageStrategy for NavigateToTarget {
    fn name(&self) -> &'static str {
        "goto-target"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let url = cx.config.target_url.clone();
        match tokio::time::timeout(cx.config.navigation_timeout, cx.backend.navigate(&url)).await {
            Err(_) => Err(StageError::Timeout(format!("navigation to {url}"))),
            Ok(Err(e)) => Err(StageError::Backend(e)),
            Ok(Ok(nav)) => {
                tracing::info!(url = %nav.url, title = %nav.title, "page loaded");
                cx.settle(cx.config.initial_settle).await;
                Ok(())
            }
        }
    }
}

struct AcknowledgeAndNuke;

#[async_trait]
impl StageStrategy for AcknowledgeAndNuke {
    fn name(&self) -> &'static str {
        "acknowledge-and-nuke"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        // First-run acknowledgement banner; absent on revisits.
        match actions::click_by_text(cx.backend, "button", "Got it!").await {
            Ok(true) => tracing::info!("dismissed acknowledgement banner"),
            Ok(false) => {}
            Err(e) => tracing::debug!(error = %e, "acknowledgement click failed"),
        }
        ModalSuppressor::run(cx).await;
        Ok(())
    }
}

fn address_input_query() -> ElementQuery {
    ElementQuery::new(vec![
        Predicate::all(vec![
            Predicate::tag("input"),
            Predicate::attr_contains("placeholder", "Find address"),
        ]),
        Predicate::all(vec![
            Predicate::tag("input"),
            Predicate::attr_contains("placeholder", "place"),
        ]),
        Predicate::all(vec![
            Predicate::tag("input"),
            Predicate::attr_contains("placeholder", "Location"),
        ]),
        Predicate::all(vec![
            Predicate::tag("input"),
            Predicate::has_class("esri-input"),
        ]),
    ])
}

struct DeepLocatorType;

#[async_trait]
impl StageStrategy for DeepLocatorType {
    fn name(&self) -> &'static str {
        "deep-locator-type"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        cx.settle(cx.config.hydration_settle).await;
        // A late overlay would swallow the focus.
        ModalSuppressor::run(cx).await;

        let input = locator::find(cx.backend, cx.config, &address_input_query()).await?;
        tracing::info!(
            id = input.id,
            depth = input.shadow_depth,
            "address input located"
        );
        actions::focus(cx.backend, input.id).await?;
        cx.backend.insert_text(cx.address).await?;
        Ok(())
    }
}

/// Sets the input value directly and fires synthetic events, for sessions
/// where the input exists but real focus is intercepted by an overlay.
struct ForcedValueInject;

#[async_trait]
impl StageStrategy for ForcedValueInject {
    fn name(&self) -> &'static str {
        "forced-value-inject"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let input = locator::find(cx.backend, cx.config, &address_input_query()).await?;
        actions::type_into(cx.backend, input.id, cx.address, true).await?;
        Ok(())
    }
}

/// Blind fallback: the search widget is usually second in tab order.
struct TabOrderType;

#[async_trait]
impl StageStrategy for TabOrderType {
    fn name(&self) -> &'static str {
        "tab-order-type"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        for _ in 0..2 {
            cx.backend.press_key("Tab").await?;
        }
        cx.backend.insert_text(cx.address).await?;
        Ok(())
    }
}

struct ClickFirstSuggestion;

#[async_trait]
impl StageStrategy for ClickFirstSuggestion {
    fn name(&self) -> &'static str {
        "click-first-suggestion"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        cx.settle(cx.config.ui_settle).await;
        ModalSuppressor::run(cx).await;

        let deadline = tokio::time::Instant::now() + cx.config.suggestion_wait;
        loop {
            let snap = actions::snapshot(cx.backend, cx.config.max_nodes).await?;
            let list = ElementQuery::new(vec![Predicate::has_class(
                "esri-search__suggestions-list",
            )])
            .resolve(&snap)
            .map(|n| n.id);
            if let Some(list_id) = list
                && let Some(item) = ElementQuery::new(vec![Predicate::tag("li")])
                    .within(list_id)
                    .resolve(&snap)
            {
                let item_id = item.id;
                actions::click(cx.backend, item_id).await?;
                tracing::info!("clicked first suggestion");
                cx.settle(cx.config.post_search_settle).await;
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StageError::Timeout("suggestion list".into()));
            }
            cx.settle(cx.config.poll_interval).await;
        }
    }
}

struct PressEnter;

#[async_trait]
impl StageStrategy for PressEnter {
    fn name(&self) -> &'static str {
        "press-enter"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        cx.backend.press_key("Enter").await?;
        cx.settle(cx.config.post_search_settle).await;
        Ok(())
    }
}

async fn select_risk(
    cx: &mut PipelineContext<'_>,
    query: ElementQuery,
) -> Result<(), StageError> {
    let select = locator::find(cx.backend, cx.config, &query).await?;
    actions::select_option(cx.backend, select.id, RISK_CATEGORY).await?;
    cx.settle(cx.config.ui_settle).await;
    Ok(())
}

struct SelectRiskByClass;

#[async_trait]
impl StageStrategy for SelectRiskByClass {
    fn name(&self) -> &'static str {
        "risk-select-by-class"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let query = ElementQuery::new(vec![Predicate::all(vec![
            Predicate::tag("select"),
            Predicate::has_class("risk-level-selector"),
        ])]);
        select_risk(cx, query).await
    }
}

struct SelectAnyRisk;

#[async_trait]
impl StageStrategy for SelectAnyRisk {
    fn name(&self) -> &'static str {
        "risk-select-any"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        select_risk(cx, ElementQuery::new(vec![Predicate::tag("select")])).await
    }
}

struct ClickWindLabel;

#[async_trait]
impl StageStrategy for ClickWindLabel {
    fn name(&self) -> &'static str {
        "wind-label-click"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        if actions::click_by_text(cx.backend, "label", LOAD_TYPE).await? {
            cx.settle(cx.config.short_settle).await;
            Ok(())
        } else {
            Err(StageError::ElementNotFound)
        }
    }
}

struct ClickWindInput;

#[async_trait]
impl StageStrategy for ClickWindInput {
    fn name(&self) -> &'static str {
        "wind-input-click"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let query = ElementQuery::new(vec![
            Predicate::all(vec![
                Predicate::tag("input"),
                Predicate::attr_equals("value", LOAD_TYPE),
            ]),
            Predicate::all(vec![
                Predicate::tag("input"),
                Predicate::attr_equals("name", LOAD_TYPE),
            ]),
        ]);
        let input = locator::find(cx.backend, cx.config, &query).await?;
        actions::click(cx.backend, input.id).await?;
        cx.settle(cx.config.short_settle).await;
        Ok(())
    }
}

struct ClickResultsByText;

#[async_trait]
impl StageStrategy for ClickResultsByText {
    fn name(&self) -> &'static str {
        "results-text-click"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        ModalSuppressor::run(cx).await;
        if actions::click_by_text(cx.backend, "*", "View Results").await? {
            Ok(())
        } else {
            Err(StageError::ElementNotFound)
        }
    }
}

struct ClickResultsByTitle;

#[async_trait]
impl StageStrategy for ClickResultsByTitle {
    fn name(&self) -> &'static str {
        "results-title-click"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let query = ElementQuery::new(vec![Predicate::attr_equals("title", "View Results")]);
        let button = locator::find(cx.backend, cx.config, &query).await?;
        actions::click(cx.backend, button.id).await?;
        Ok(())
    }
}

/// Last resort: walk every button's text by hand.
struct ScanButtonsForResults;

#[async_trait]
impl StageStrategy for ScanButtonsForResults {
    fn name(&self) -> &'static str {
        "results-button-scan"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let query = ElementQuery::new(vec![Predicate::all(vec![
            Predicate::tag("button"),
            Predicate::text_contains("View Result"),
        ])]);
        let button = locator::find(cx.backend, cx.config, &query).await?;
        actions::click(cx.backend, button.id).await?;
        Ok(())
    }
}

struct WaitForMarker;

#[async_trait]
impl StageStrategy for WaitForMarker {
    fn name(&self) -> &'static str {
        "poll-body-text"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let deadline = tokio::time::Instant::now() + cx.config.marker_timeout;
        loop {
            let text = actions::page_text(cx.backend, None).await?;
            if text.contains(&cx.config.marker) {
                tracing::info!(marker = %cx.config.marker, "result marker appeared");
                cx.settle(cx.config.post_marker_settle).await;
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StageError::Timeout(format!(
                    "\"{}\" did not appear",
                    cx.config.marker
                )));
            }
            cx.settle(cx.config.poll_interval).await;
        }
    }
}

struct ExtractLeafValue;

#[async_trait]
impl StageStrategy for ExtractLeafValue {
    fn name(&self) -> &'static str {
        "leaf-scan"
    }

    async fn attempt(&self, cx: &mut PipelineContext<'_>) -> Result<(), StageError> {
        let snap = actions::snapshot(cx.backend, cx.config.max_nodes).await?;
        match extract::leaf_text(&snap, &cx.config.marker) {
            Some(value) => {
                tracing::info!(%value, "extracted result");
                cx.wind_speed = Some(value);
                Ok(())
            }
            None => Err(StageError::ElementNotFound),
        }
    }
}
