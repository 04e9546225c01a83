//! Overlay suppression. The target application ships different overlay
//! markup across sessions, so no single selector is trusted: three
//! escalating strategies run together on every invocation, and every
//! invocation must be safe on an already-clean document.

use crate::actions;
use crate::context::PipelineContext;
use squall_common::protocol::{DomNode, DomSnapshot};
use std::collections::HashSet;

pub const OVERLAY_SELECTORS: &[&str] = &[
    "calcite-modal",
    ".modal",
    ".popup",
    ".esri-popup",
    "calcite-scrim",
    ".modal-backdrop",
];

pub const BANNER_PHRASES: &[&str] = &["Welcome to the ASCE Hazard Tool"];

pub const CLOSE_SELECTORS: &[&str] = &["button[title=\"Close\"]", ".esri-popup__button--close"];

pub struct ModalSuppressor;

impl ModalSuppressor {
    /// Applies the style override, the selector purge, the banner-text
    /// ancestor sweep, and a close-affordance click pass. Sub-step failures
    /// are logged and swallowed; suppression never fails a stage.
    pub async fn run(cx: &mut PipelineContext<'_>) {
        if let Err(e) = actions::style_override(cx.backend, OVERLAY_SELECTORS).await {
            tracing::warn!(error = %e, "overlay style override failed");
        }

        if let Err(e) = actions::purge(cx.backend, OVERLAY_SELECTORS).await {
            tracing::warn!(error = %e, "overlay purge failed");
        }

        match actions::snapshot(cx.backend, cx.config.max_nodes).await {
            Ok(snap) => {
                for id in banner_containers(&snap) {
                    tracing::info!(id, "removing banner container");
                    if let Err(e) = actions::remove_node(cx.backend, id).await {
                        // A purge above may already have taken it out.
                        tracing::debug!(id, error = %e, "banner container removal failed");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "banner sweep walk failed"),
        }

        if let Err(e) = actions::close_sweep(cx.backend, CLOSE_SELECTORS).await {
            tracing::warn!(error = %e, "close-affordance sweep failed");
        }
    }
}

/// Container ids to remove for every node carrying a banner phrase. The
/// dismissible container is usually several ancestors above the text node,
/// so each carrier climbs its ancestor chain until something container-ish
/// turns up.
pub fn banner_containers(snapshot: &DomSnapshot) -> Vec<u32> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for node in &snapshot.nodes {
        if !BANNER_PHRASES.iter().any(|p| node.text.contains(p)) {
            continue;
        }
        if let Some(id) = dismissible_container(snapshot, node)
            && seen.insert(id)
        {
            out.push(id);
        }
    }
    out
}

fn dismissible_container(snapshot: &DomSnapshot, node: &DomNode) -> Option<u32> {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.tag == "body" || n.tag == "html" {
            return None;
        }
        if looks_like_container(n) {
            return Some(n.id);
        }
        current = n.parent.and_then(|id| snapshot.node(id));
    }
    None
}

/// Judgment call inherited from observed overlay markup, not a contract: a
/// modal/popup tag fragment, a `modal` class token, or inline
/// absolute/fixed positioning marks the dismissible ancestor.
pub fn looks_like_container(node: &DomNode) -> bool {
    if node.tag.contains("modal") || node.tag.contains("popup") {
        return true;
    }
    if node.has_class("modal") {
        return true;
    }
    node.attr("style").map(style_pins_position).unwrap_or(false)
}

fn style_pins_position(style: &str) -> bool {
    let squashed: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    squashed.contains("position:absolute") || squashed.contains("position:fixed")
}
