//! ModalSuppressor tests: ancestor-climb container selection and
//! idempotence against an already-clean document.

use async_trait::async_trait;
use squall_engine::backend::{Backend, BackendError, NavigationResult};
use squall_engine::config::PipelineConfig;
use squall_engine::context::PipelineContext;
use squall_engine::protocol::{
    DomNode, DomSnapshot, PageInfo, ProbeAction, ProbeData, ProbeResponse, WalkStats,
};
use squall_engine::suppress::{ModalSuppressor, banner_containers};
use std::collections::HashMap;

const BANNER: &str = "Welcome to the ASCE Hazard Tool";

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

fn snapshot(nodes: Vec<DomNode>) -> DomSnapshot {
    DomSnapshot {
        page: PageInfo {
            url: "https://ascehazardtool.org/".into(),
            title: "ASCE Hazard Tool".into(),
        },
        stats: WalkStats::default(),
        nodes,
    }
}

/// body > div > calcite-modal > div > span, banner text on the inner nodes.
fn banner_fixture() -> DomSnapshot {
    let mut wrapper = node(2, "div", Some(1));
    wrapper.text = format!("site header {BANNER} body text");
    let mut modal = node(3, "calcite-modal", Some(2));
    modal.text = format!("{BANNER} Got it!");
    let mut inner = node(4, "div", Some(3));
    inner.text = BANNER.to_string();
    let mut span = node(5, "span", Some(4));
    span.text = BANNER.to_string();
    span.own_text = BANNER.to_string();
    snapshot(vec![node(1, "body", None), wrapper, modal, inner, span])
}

#[test]
fn climbs_to_the_modal_container_not_the_text_node() {
    let ids = banner_containers(&banner_fixture());
    // Every carrier resolves to the same modal ancestor, deduplicated; the
    // plain wrapper climbs past body and is left alone.
    assert_eq!(ids, vec![3]);
}

#[test]
fn carriers_without_a_container_ancestor_are_left_alone() {
    let mut plain = node(2, "div", Some(1));
    plain.text = BANNER.to_string();
    let snap = snapshot(vec![node(1, "body", None), plain]);
    assert!(banner_containers(&snap).is_empty());
}

#[test]
fn clean_documents_produce_no_removals() {
    let snap = snapshot(vec![node(1, "body", None), node(2, "div", Some(1))]);
    assert!(banner_containers(&snap).is_empty());
}

#[test]
fn inline_positioned_ancestor_counts_as_container() {
    let mut overlay = node(2, "div", Some(1));
    overlay
        .attributes
        .insert("style".into(), "position: fixed; inset: 0".into());
    overlay.text = BANNER.to_string();
    let mut text = node(3, "p", Some(2));
    text.text = BANNER.to_string();
    let snap = snapshot(vec![node(1, "body", None), overlay, text]);

    assert_eq!(banner_containers(&snap), vec![2]);
}

/// Records suppression requests; the first scan shows the banner, every
/// later scan shows the cleaned document.
struct SuppressionLog {
    scans: usize,
    removals: Vec<u32>,
    style_overrides: usize,
    purges: usize,
    close_sweeps: usize,
}

#[async_trait]
impl Backend for SuppressionLog {
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
        let data = match action {
            ProbeAction::Scan(_) => {
                self.scans += 1;
                let snap = if self.scans == 1 {
                    banner_fixture()
                } else {
                    snapshot(vec![node(1, "body", None)])
                };
                ProbeData::Snapshot(Box::new(snap))
            }
            ProbeAction::Remove(req) => {
                self.removals.push(req.id);
                action_ok()
            }
            ProbeAction::StyleOverride(_) => {
                self.style_overrides += 1;
                action_ok()
            }
            ProbeAction::Purge(_) => {
                self.purges += 1;
                action_ok()
            }
            ProbeAction::CloseSweep(_) => {
                self.close_sweeps += 1;
                action_ok()
            }
            other => return Err(BackendError::NotSupported(format!("{other:?}"))),
        };
        Ok(ProbeResponse::Ok {
            data: Box::new(data),
            warnings: vec![],
        })
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

fn action_ok() -> ProbeData {
    ProbeData::Action(squall_engine::protocol::ActionOutcome {
        success: true,
        message: None,
    })
}

#[tokio::test]
async fn repeated_suppression_is_a_no_op_once_clean() {
    let mut backend = SuppressionLog {
        scans: 0,
        removals: vec![],
        style_overrides: 0,
        purges: 0,
        close_sweeps: 0,
    };
    let config = PipelineConfig::default();

    let mut cx = PipelineContext::new(&mut backend, "addr", &config);
    ModalSuppressor::run(&mut cx).await;
    ModalSuppressor::run(&mut cx).await;
    drop(cx);

    // The destructive step fired exactly once, on the document that still
    // had the banner; the reversible steps are safe to repeat.
    assert_eq!(backend.removals, vec![3]);
    assert_eq!(backend.style_overrides, 2);
    assert_eq!(backend.purges, 2);
    assert_eq!(backend.close_sweeps, 2);
}
