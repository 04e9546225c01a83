//! Wire protocol serialization tests for the probe request/response shapes.

use squall_common::protocol::{
    ProbeAction, ProbeData, ProbeResponse, ScanRequest, TypeRequest,
};

#[test]
fn scan_request_serializes_with_action_tag() {
    let action = ProbeAction::Scan(ScanRequest { max_nodes: Some(500) });
    let value = serde_json::to_value(&action).unwrap();
    assert_eq!(value["action"], "scan");
    assert_eq!(value["max_nodes"], 500);
}

#[test]
fn type_request_defaults_clear_to_false() {
    let json = r#"{"action": "type", "id": 3, "text": "411 Crusaders Drive"}"#;
    let action: ProbeAction = serde_json::from_str(json).unwrap();
    match action {
        ProbeAction::Type(TypeRequest { id, text, clear }) => {
            assert_eq!(id, 3);
            assert_eq!(text, "411 Crusaders Drive");
            assert!(!clear);
        }
        other => panic!("expected Type, got {other:?}"),
    }
}

#[test]
fn snapshot_response_deserializes_into_snapshot_variant() {
    let json = r#"{
        "status": "ok",
        "page": {"url": "https://ascehazardtool.org/", "title": "ASCE Hazard Tool"},
        "nodes": [
            {
                "id": 1,
                "tag": "input",
                "parent": null,
                "attributes": {"placeholder": "Find address or place", "class": null},
                "text": "",
                "own_text": "",
                "child_nodes": 0,
                "shadow_depth": 2
            }
        ],
        "stats": {"visited": 1, "emitted": 1, "truncated": false}
    }"#;

    let resp: ProbeResponse = serde_json::from_str(json).unwrap();
    let ProbeResponse::Ok { data, warnings } = resp else {
        panic!("expected ok response");
    };
    assert!(warnings.is_empty());
    let ProbeData::Snapshot(snapshot) = *data else {
        panic!("expected snapshot payload");
    };
    let node = snapshot.node(1).unwrap();
    assert_eq!(node.tag, "input");
    assert_eq!(node.shadow_depth, 2);
    // Null-valued attributes are dropped, present ones survive.
    assert_eq!(node.attr("placeholder"), Some("Find address or place"));
    assert_eq!(node.attr("class"), None);
}

#[test]
fn action_response_deserializes_into_action_variant() {
    let json = r#"{"status": "ok", "success": true, "message": "clicked"}"#;
    let resp: ProbeResponse = serde_json::from_str(json).unwrap();
    let ProbeResponse::Ok { data, .. } = resp else {
        panic!("expected ok response");
    };
    match *data {
        ProbeData::Action(outcome) => {
            assert!(outcome.success);
            assert_eq!(outcome.message.as_deref(), Some("clicked"));
        }
        other => panic!("expected action payload, got {other:?}"),
    }
}

#[test]
fn value_payload_catches_text_responses() {
    let json = r#"{"status": "ok", "text": "Results: 115 Vmph"}"#;
    let resp: ProbeResponse = serde_json::from_str(json).unwrap();
    let ProbeResponse::Ok { data, .. } = resp else {
        panic!("expected ok response");
    };
    match *data {
        ProbeData::Value(value) => {
            assert_eq!(value["text"], "Results: 115 Vmph");
        }
        other => panic!("expected value payload, got {other:?}"),
    }
}

#[test]
fn error_response_carries_code_and_message() {
    let json = r#"{"status": "error", "code": "NODE_STALE", "message": "node 4 is gone"}"#;
    let resp: ProbeResponse = serde_json::from_str(json).unwrap();
    match resp {
        ProbeResponse::Error { code, message } => {
            assert_eq!(code, "NODE_STALE");
            assert!(message.contains('4'));
        }
        other => panic!("expected error response, got {other:?}"),
    }
}
