use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Custom deserializer for HashMap<String, String> that filters out null values.
/// The probe reports every inspected attribute, with null for attributes the
/// element does not carry.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: HashMap<String, Option<String>> = HashMap::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

/// Requests executed by the in-page probe (`window.Squall.process`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProbeAction {
    Scan(ScanRequest),
    Click(ClickRequest),
    Focus(FocusRequest),
    Type(TypeRequest),
    Select(SelectRequest),
    Remove(RemoveRequest),
    ClickText(ClickTextRequest),
    StyleOverride(StyleOverrideRequest),
    Purge(PurgeRequest),
    CloseSweep(CloseSweepRequest),
    GetText(GetTextRequest),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickRequest {
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusRequest {
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRequest {
    pub id: u32,
    pub text: String,
    #[serde(default)]
    pub clear: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub id: u32,
    /// Visible option text, matched after trimming.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickTextRequest {
    /// Tag name to search, or "*" for all elements.
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleOverrideRequest {
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeRequest {
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSweepRequest {
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GetTextRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Responses received from the probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeResponse {
    Ok {
        #[serde(flatten)]
        data: Box<ProbeData>,
        #[serde(default)]
        warnings: Vec<String>,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeData {
    Snapshot(Box<DomSnapshot>),
    Action(ActionOutcome),
    Value(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// A serialized walk of the live document, shadow roots included.
///
/// Node ids ascend in visit order, which is document order with each shadow
/// root visited before its host's light children. An id is only meaningful
/// against the probe registry of the document it was scanned from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub page: PageInfo,
    pub nodes: Vec<DomNode>,
    pub stats: WalkStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub id: u32,
    pub tag: String,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub attributes: HashMap<String, String>,
    /// textContent, trimmed and capped.
    #[serde(default)]
    pub text: String,
    /// Concatenated direct child text nodes, trimmed and capped.
    #[serde(default)]
    pub own_text: String,
    /// childNodes.length (text nodes included).
    #[serde(default)]
    pub child_nodes: u32,
    /// Number of shadow boundaries between this node and the document.
    #[serde(default)]
    pub shadow_depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WalkStats {
    pub visited: usize,
    pub emitted: usize,
    pub truncated: bool,
}

impl DomSnapshot {
    pub fn node(&self, id: u32) -> Option<&DomNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl DomNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_text_request_tags_as_snake_case() {
        let action = ProbeAction::ClickText(ClickTextRequest {
            tag: "button".into(),
            text: "Got it!".into(),
        });
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["action"], "click_text");
        assert_eq!(value["tag"], "button");
    }
}
