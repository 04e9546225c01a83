//! Deep-element location over probe snapshots.
//!
//! The probe walks the whole tree, shadow roots included; this module picks
//! a target out of the flattened snapshot and owns the retry policy.

use crate::actions;
use crate::backend::Backend;
use crate::config::PipelineConfig;
use squall_common::error::BackendError;
use squall_common::protocol::{DomNode, DomSnapshot};

#[derive(Debug, Clone)]
pub enum Predicate {
    TagIs(String),
    AttrEquals { name: String, value: String },
    AttrContains { name: String, value: String },
    HasClass(String),
    TextContains(String),
    /// Conjunction of sub-predicates; still one entry in the priority list.
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn tag(tag: &str) -> Self {
        Predicate::TagIs(tag.to_string())
    }

    pub fn attr_equals(name: &str, value: &str) -> Self {
        Predicate::AttrEquals {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn attr_contains(name: &str, value: &str) -> Self {
        Predicate::AttrContains {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn has_class(class: &str) -> Self {
        Predicate::HasClass(class.to_string())
    }

    pub fn text_contains(text: &str) -> Self {
        Predicate::TextContains(text.to_string())
    }

    pub fn all(predicates: Vec<Predicate>) -> Self {
        Predicate::All(predicates)
    }

    /// A predicate that cannot evaluate (missing attribute) is a non-match,
    /// never an error.
    pub fn matches(&self, node: &DomNode) -> bool {
        match self {
            Predicate::TagIs(tag) => node.tag.eq_ignore_ascii_case(tag),
            Predicate::AttrEquals { name, value } => {
                node.attr(name).map(|v| v == value).unwrap_or(false)
            }
            Predicate::AttrContains { name, value } => node
                .attr(name)
                .map(|v| v.contains(value.as_str()))
                .unwrap_or(false),
            Predicate::HasClass(class) => node.has_class(class),
            Predicate::TextContains(text) => node.text.contains(text.as_str()),
            Predicate::All(predicates) => predicates.iter().all(|p| p.matches(node)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum QueryScope {
    #[default]
    Document,
    /// Restrict matching to descendants of a previously located node.
    Subtree(u32),
}

#[derive(Debug, Clone)]
pub struct ElementQuery {
    pub predicates: Vec<Predicate>,
    pub scope: QueryScope,
}

impl ElementQuery {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            scope: QueryScope::Document,
        }
    }

    pub fn within(mut self, root: u32) -> Self {
        self.scope = QueryScope::Subtree(root);
        self
    }

    /// Predicates form a priority list, not a conjunction: the first
    /// predicate that matches any in-scope node (in document order) wins.
    pub fn resolve<'s>(&self, snapshot: &'s DomSnapshot) -> Option<&'s DomNode> {
        for predicate in &self.predicates {
            for node in &snapshot.nodes {
                if self.in_scope(snapshot, node) && predicate.matches(node) {
                    return Some(node);
                }
            }
        }
        None
    }

    fn in_scope(&self, snapshot: &DomSnapshot, node: &DomNode) -> bool {
        match self.scope {
            QueryScope::Document => true,
            QueryScope::Subtree(root) => {
                let mut current = node.parent;
                while let Some(id) = current {
                    if id == root {
                        return true;
                    }
                    current = snapshot.node(id).and_then(|n| n.parent);
                }
                false
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("no element matched the query")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Snapshot-and-match with one retry after a settle interval: client-rendered
/// widgets often hydrate a beat after the page looks ready. A second miss is
/// reported, not raised; the caller decides whether a fallback strategy
/// applies.
pub async fn find(
    backend: &mut dyn Backend,
    config: &PipelineConfig,
    query: &ElementQuery,
) -> Result<DomNode, LocateError> {
    let snap = actions::snapshot(backend, config.max_nodes).await?;
    if let Some(node) = query.resolve(&snap) {
        return Ok(node.clone());
    }

    tracing::debug!("no match on first walk, settling before retry");
    tokio::time::sleep(config.locator_settle).await;

    let snap = actions::snapshot(backend, config.max_nodes).await?;
    query.resolve(&snap).cloned().ok_or(LocateError::NotFound)
}
