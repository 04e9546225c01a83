//! Result extraction from a probe snapshot.

use squall_common::protocol::DomSnapshot;

/// Returns the rendered text of the first element that carries the marker
/// as a leaf: exactly one child node, so the element holds the value itself
/// rather than merely containing it transitively.
///
/// Multiple qualifying leaves resolve to the document-order-first one. The
/// tie-break is an assumption inherited from observed behavior, not a
/// verified contract.
pub fn leaf_text(snapshot: &DomSnapshot, marker: &str) -> Option<String> {
    if let Some(node) = snapshot
        .nodes
        .iter()
        .find(|n| n.child_nodes == 1 && n.text.contains(marker))
    {
        return Some(node.text.clone());
    }

    // Text-walk fallback: the first node whose direct text carries the
    // marker, for markup where the value shares its parent with siblings.
    snapshot
        .nodes
        .iter()
        .find(|n| n.own_text.contains(marker))
        .map(|n| n.own_text.clone())
}
