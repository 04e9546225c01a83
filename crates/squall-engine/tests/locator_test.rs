//! ElementLocator tests over synthetic snapshots: shadow depth must not
//! bound correctness, predicates are a priority list, and the retry policy
//! re-walks once before reporting a miss.

use async_trait::async_trait;
use squall_engine::backend::{Backend, BackendError, NavigationResult};
use squall_engine::config::PipelineConfig;
use squall_engine::locator::{self, ElementQuery, LocateError, Predicate};
use squall_engine::protocol::{
    DomNode, DomSnapshot, PageInfo, ProbeAction, ProbeData, ProbeResponse, WalkStats,
};
use std::collections::HashMap;
use std::time::Duration;

fn node(id: u32, tag: &str, parent: Option<u32>) -> DomNode {
    DomNode {
        id,
        tag: tag.to_string(),
        parent,
        attributes: HashMap::new(),
        text: String::new(),
        own_text: String::new(),
        child_nodes: 0,
        shadow_depth: 0,
    }
}

fn with_attr(mut n: DomNode, name: &str, value: &str) -> DomNode {
    n.attributes.insert(name.to_string(), value.to_string());
    n
}

fn snapshot(nodes: Vec<DomNode>) -> DomSnapshot {
    DomSnapshot {
        page: PageInfo {
            url: "https://ascehazardtool.org/".into(),
            title: "ASCE Hazard Tool".into(),
        },
        stats: WalkStats {
            visited: nodes.len(),
            emitted: nodes.len(),
            truncated: false,
        },
        nodes,
    }
}

fn address_query() -> ElementQuery {
    ElementQuery::new(vec![
        Predicate::all(vec![
            Predicate::tag("input"),
            Predicate::attr_contains("placeholder", "Find address"),
        ]),
        Predicate::all(vec![
            Predicate::tag("input"),
            Predicate::has_class("esri-input"),
        ]),
    ])
}

#[test]
fn resolves_targets_at_any_shadow_depth() {
    for depth in [0u32, 1, 4] {
        let mut input = with_attr(
            node(5, "input", Some(4)),
            "placeholder",
            "Find address or place",
        );
        input.shadow_depth = depth;
        let snap = snapshot(vec![node(1, "body", None), node(4, "div", Some(1)), input]);

        let hit = address_query().resolve(&snap).expect("input should resolve");
        assert_eq!(hit.id, 5, "depth {depth} changed resolution");
    }
}

#[test]
fn predicates_are_a_priority_list_not_document_order() {
    // The esri-input sits earlier in document order, but the placeholder
    // predicate has priority.
    let snap = snapshot(vec![
        node(1, "body", None),
        with_attr(node(2, "input", Some(1)), "class", "esri-input"),
        with_attr(node(3, "input", Some(1)), "placeholder", "Find address"),
    ]);

    let hit = address_query().resolve(&snap).unwrap();
    assert_eq!(hit.id, 3);
}

#[test]
fn same_predicate_ties_break_by_document_order() {
    let snap = snapshot(vec![
        node(1, "body", None),
        with_attr(node(2, "input", Some(1)), "placeholder", "Find address"),
        with_attr(node(3, "input", Some(1)), "placeholder", "Find address"),
    ]);

    assert_eq!(address_query().resolve(&snap).unwrap().id, 2);
}

#[test]
fn missing_attributes_are_non_matches_not_errors() {
    let snap = snapshot(vec![
        node(1, "body", None),
        node(2, "input", Some(1)),
        node(3, "button", Some(1)),
    ]);

    assert!(address_query().resolve(&snap).is_none());
}

#[test]
fn subtree_scope_excludes_outside_matches() {
    let snap = snapshot(vec![
        node(1, "body", None),
        node(2, "ul", Some(1)),
        node(3, "li", Some(2)),
        node(4, "li", Some(1)),
    ]);

    let scoped = ElementQuery::new(vec![Predicate::tag("li")]).within(2);
    assert_eq!(scoped.resolve(&snap).unwrap().id, 3);

    let empty_scope = ElementQuery::new(vec![Predicate::tag("li")]).within(4);
    assert!(empty_scope.resolve(&snap).is_none());
}

/// Backend that serves a queue of snapshots, one per scan.
struct SnapshotQueue {
    snapshots: Vec<DomSnapshot>,
    scans: usize,
}

#[async_trait]
impl Backend for SnapshotQueue {
    async fn launch(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
    async fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
    async fn is_ready(&self) -> bool {
        true
    }
    async fn navigate(&mut self, _url: &str) -> Result<NavigationResult, BackendError> {
        Err(BackendError::NotSupported("navigate".into()))
    }
    async fn execute_probe(
        &mut self,
        action: ProbeAction,
    ) -> Result<ProbeResponse, BackendError> {
        match action {
            ProbeAction::Scan(_) => {
                let snap = if self.scans < self.snapshots.len() {
                    self.snapshots[self.scans].clone()
                } else {
                    self.snapshots.last().unwrap().clone()
                };
                self.scans += 1;
                Ok(ProbeResponse::Ok {
                    data: Box::new(ProbeData::Snapshot(Box::new(snap))),
                    warnings: vec![],
                })
            }
            other => Err(BackendError::NotSupported(format!("{other:?}"))),
        }
    }
    async fn screenshot(&mut self) -> Result<Vec<u8>, BackendError> {
        Ok(vec![])
    }
    async fn content(&mut self) -> Result<String, BackendError> {
        Ok(String::new())
    }
    async fn press_key(&mut self, _key: &str) -> Result<(), BackendError> {
        Ok(())
    }
    async fn insert_text(&mut self, _text: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        locator_settle: Duration::ZERO,
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn find_retries_the_full_walk_once() {
    let empty = snapshot(vec![node(1, "body", None)]);
    let hydrated = snapshot(vec![
        node(1, "body", None),
        with_attr(node(2, "input", Some(1)), "placeholder", "Find address"),
    ]);
    let mut backend = SnapshotQueue {
        snapshots: vec![empty, hydrated],
        scans: 0,
    };

    let found = locator::find(&mut backend, &fast_config(), &address_query())
        .await
        .expect("second walk should find the hydrated input");
    assert_eq!(found.id, 2);
    assert_eq!(backend.scans, 2);
}

#[tokio::test]
async fn find_reports_not_found_after_two_misses() {
    let empty = snapshot(vec![node(1, "body", None)]);
    let mut backend = SnapshotQueue {
        snapshots: vec![empty],
        scans: 0,
    };

    let err = locator::find(&mut backend, &fast_config(), &address_query())
        .await
        .expect_err("no input exists");
    assert!(matches!(err, LocateError::NotFound));
    assert_eq!(backend.scans, 2, "exactly one retry");
}
