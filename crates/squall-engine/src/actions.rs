//! Typed wrappers over the probe wire protocol. Each helper sends one
//! request and unwraps the payload variant it expects.

use crate::backend::Backend;
use squall_common::error::BackendError;
use squall_common::protocol::{
    ActionOutcome, ClickRequest, ClickTextRequest, CloseSweepRequest, DomSnapshot, FocusRequest,
    GetTextRequest, ProbeAction, ProbeData, ProbeResponse, PurgeRequest, RemoveRequest,
    ScanRequest, SelectRequest, StyleOverrideRequest, TypeRequest,
};

fn unwrap_data(resp: ProbeResponse) -> Result<ProbeData, BackendError> {
    match resp {
        ProbeResponse::Ok { data, warnings } => {
            for warning in warnings {
                tracing::warn!(warning = %warning, "probe warning");
            }
            Ok(*data)
        }
        ProbeResponse::Error { code, message } => Err(BackendError::from_code(&code, message)),
    }
}

fn unexpected(wanted: &str, got: &ProbeData) -> BackendError {
    BackendError::Probe(format!("expected {wanted} payload, got {got:?}"))
}

fn confirm(outcome: ActionOutcome) -> Result<(), BackendError> {
    if outcome.success {
        Ok(())
    } else {
        Err(BackendError::Probe(
            outcome
                .message
                .unwrap_or_else(|| "probe action reported failure".into()),
        ))
    }
}

async fn run_action(
    backend: &mut dyn Backend,
    action: ProbeAction,
) -> Result<ActionOutcome, BackendError> {
    let resp = backend.execute_probe(action).await?;
    match unwrap_data(resp)? {
        ProbeData::Action(outcome) => Ok(outcome),
        other => Err(unexpected("action", &other)),
    }
}

/// One full walk of the live document, shadow roots included.
pub async fn snapshot(
    backend: &mut dyn Backend,
    max_nodes: usize,
) -> Result<DomSnapshot, BackendError> {
    let resp = backend
        .execute_probe(ProbeAction::Scan(ScanRequest {
            max_nodes: Some(max_nodes),
        }))
        .await?;
    match unwrap_data(resp)? {
        ProbeData::Snapshot(snap) => {
            if snap.stats.truncated {
                tracing::warn!(
                    visited = snap.stats.visited,
                    "DOM walk hit the node cap; snapshot is partial"
                );
            }
            Ok(*snap)
        }
        other => Err(unexpected("snapshot", &other)),
    }
}

pub async fn click(backend: &mut dyn Backend, id: u32) -> Result<(), BackendError> {
    confirm(run_action(backend, ProbeAction::Click(ClickRequest { id })).await?)
}

pub async fn focus(backend: &mut dyn Backend, id: u32) -> Result<(), BackendError> {
    confirm(run_action(backend, ProbeAction::Focus(FocusRequest { id })).await?)
}

pub async fn type_into(
    backend: &mut dyn Backend,
    id: u32,
    text: &str,
    clear: bool,
) -> Result<(), BackendError> {
    confirm(
        run_action(
            backend,
            ProbeAction::Type(TypeRequest {
                id,
                text: text.to_string(),
                clear,
            }),
        )
        .await?,
    )
}

pub async fn select_option(
    backend: &mut dyn Backend,
    id: u32,
    label: &str,
) -> Result<(), BackendError> {
    confirm(
        run_action(
            backend,
            ProbeAction::Select(SelectRequest {
                id,
                label: label.to_string(),
            }),
        )
        .await?,
    )
}

pub async fn remove_node(backend: &mut dyn Backend, id: u32) -> Result<(), BackendError> {
    confirm(run_action(backend, ProbeAction::Remove(RemoveRequest { id })).await?)
}

/// Click the first element of `tag` whose text matches, exact match
/// preferred over substring. `Ok(false)` means nothing matched.
pub async fn click_by_text(
    backend: &mut dyn Backend,
    tag: &str,
    text: &str,
) -> Result<bool, BackendError> {
    let outcome = run_action(
        backend,
        ProbeAction::ClickText(ClickTextRequest {
            tag: tag.to_string(),
            text: text.to_string(),
        }),
    )
    .await?;
    tracing::debug!(tag, text, success = outcome.success, "click_by_text");
    Ok(outcome.success)
}

pub async fn style_override(
    backend: &mut dyn Backend,
    selectors: &[&str],
) -> Result<(), BackendError> {
    confirm(
        run_action(
            backend,
            ProbeAction::StyleOverride(StyleOverrideRequest {
                selectors: selectors.iter().map(|s| s.to_string()).collect(),
            }),
        )
        .await?,
    )
}

pub async fn purge(backend: &mut dyn Backend, selectors: &[&str]) -> Result<(), BackendError> {
    confirm(
        run_action(
            backend,
            ProbeAction::Purge(PurgeRequest {
                selectors: selectors.iter().map(|s| s.to_string()).collect(),
            }),
        )
        .await?,
    )
}

pub async fn close_sweep(
    backend: &mut dyn Backend,
    selectors: &[&str],
) -> Result<(), BackendError> {
    confirm(
        run_action(
            backend,
            ProbeAction::CloseSweep(CloseSweepRequest {
                selectors: selectors.iter().map(|s| s.to_string()).collect(),
            }),
        )
        .await?,
    )
}

/// Rendered text of the page body, or of a selector-scoped element.
pub async fn page_text(
    backend: &mut dyn Backend,
    selector: Option<&str>,
) -> Result<String, BackendError> {
    let resp = backend
        .execute_probe(ProbeAction::GetText(GetTextRequest {
            selector: selector.map(Into::into),
        }))
        .await?;
    match unwrap_data(resp)? {
        ProbeData::Value(value) => Ok(value
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string()),
        other => Err(unexpected("text", &other)),
    }
}
