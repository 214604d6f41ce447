use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Raw shape of a single element of the stored `elements.nodes` array.
#[derive(Debug, Clone, Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Raw shape of a single element of the stored `elements.edges` array.
#[derive(Debug, Clone, Deserialize)]
struct RawEdge {
    source: String,
    target: String,
    #[serde(default, rename = "sourceHandle")]
    source_handle: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawElements {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

/// A directed edge between two nodes, optionally labeled by an output handle.
#[derive(Debug, Clone)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
}

/// The closed set of node kinds the engine understands, each carrying its
/// own typed data. Unknown kinds are preserved as `Unknown` so flows written
/// against a newer schema still load.
#[derive(Debug, Clone)]
pub enum NodeKind {
    StartNode,
    TextMessage {
        text: Option<String>,
    },
    WaitInput {
        variable_name: Option<String>,
        message: Option<String>,
    },
    SetVariable {
        variable_name: Option<String>,
        value: Option<String>,
    },
    Condition {
        variable_name: Option<String>,
        comparison: Option<String>,
        value: Option<String>,
    },
    GptQuery {
        prompt: Option<String>,
        api_key_variable: Option<String>,
        save_response_to: Option<String>,
        system_message: Option<String>,
        model: Option<String>,
        temperature: Option<f64>,
        max_tokens: Option<u32>,
    },
    ImageMessage,
    AudioMessage,
    VideoMessage,
    FileMessage,
    LocationMessage,
    ButtonMessage {
        text: Option<String>,
    },
    ListMessage {
        text: Option<String>,
    },
    EndFlow {
        text: Option<String>,
    },
    Unknown {
        raw_type: String,
    },
}

impl NodeKind {
    /// Node kinds that produce a user-waiting session position (§8 property 1).
    pub fn is_user_waiting(&self) -> bool {
        matches!(
            self,
            NodeKind::WaitInput { .. } | NodeKind::ButtonMessage { .. } | NodeKind::ListMessage { .. }
        )
    }

    /// Node kinds eligible to produce an outbound payload on the first hop (§4.8 step 2).
    pub fn is_payload_producing(&self) -> bool {
        matches!(
            self,
            NodeKind::TextMessage { .. }
                | NodeKind::WaitInput { .. }
                | NodeKind::EndFlow { .. }
                | NodeKind::ImageMessage
                | NodeKind::AudioMessage
                | NodeKind::VideoMessage
                | NodeKind::FileMessage
                | NodeKind::LocationMessage
                | NodeKind::ButtonMessage { .. }
                | NodeKind::ListMessage { .. }
        )
    }

    /// Node kinds that produce no payload themselves but must be traversed
    /// through silently when generating a speculative next-node payload
    /// (§4.8 step 4).
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            NodeKind::SetVariable { .. }
                | NodeKind::GptQuery { .. }
                | NodeKind::Condition { .. }
                | NodeKind::StartNode
        )
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, NodeKind::ButtonMessage { .. } | NodeKind::ListMessage { .. })
    }

    fn from_raw(kind: &str, data: &Value) -> NodeKind {
        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        match kind {
            "startNode" => NodeKind::StartNode,
            "textMessage" => NodeKind::TextMessage { text: text("text") },
            "waitInput" => NodeKind::WaitInput {
                variable_name: text("variableName"),
                message: text("message"),
            },
            "setVariable" => NodeKind::SetVariable {
                variable_name: text("variableName"),
                value: text("value"),
            },
            "condition" => NodeKind::Condition {
                variable_name: text("variableName"),
                comparison: text("comparison"),
                value: text("value"),
            },
            "gptQuery" => NodeKind::GptQuery {
                prompt: text("prompt"),
                api_key_variable: text("apiKeyVariable"),
                save_response_to: text("saveResponseTo"),
                system_message: text("systemMessage"),
                model: text("model"),
                temperature: data.get("temperature").and_then(Value::as_f64),
                max_tokens: data
                    .get("maxTokens")
                    .and_then(Value::as_u64)
                    .and_then(|v| u32::try_from(v).ok()),
            },
            "imageMessage" => NodeKind::ImageMessage,
            "audioMessage" => NodeKind::AudioMessage,
            "videoMessage" => NodeKind::VideoMessage,
            "fileMessage" => NodeKind::FileMessage,
            "locationMessage" => NodeKind::LocationMessage,
            "buttonMessage" => NodeKind::ButtonMessage { text: text("text") },
            "listMessage" => NodeKind::ListMessage { text: text("text") },
            "endFlow" => NodeKind::EndFlow { text: text("text") },
            other => NodeKind::Unknown {
                raw_type: other.to_string(),
            },
        }
    }

    /// Validate the AI-call parameters once at load time rather than on every
    /// request (§9 open question 3).
    fn validate(&self, node_id: &str) -> EngineResult<()> {
        if let NodeKind::GptQuery {
            model,
            temperature,
            max_tokens,
            ..
        } = self
        {
            if let Some(t) = temperature {
                if !t.is_finite() {
                    return Err(EngineError::LoadShape {
                        reason: format!("node '{node_id}': temperature must be a finite number"),
                    });
                }
            }
            if let Some(mt) = max_tokens {
                if *mt == 0 {
                    return Err(EngineError::LoadShape {
                        reason: format!("node '{node_id}': maxTokens must be positive"),
                    });
                }
            }
            let _ = model;
        }
        Ok(())
    }
}

/// A single vertex of the flow graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
}

/// The fully loaded, immutable-until-reload flow graph.
#[derive(Debug, Clone)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub nodes: HashMap<String, Node>,
    pub edges: Vec<Edge>,
    pub start_node_id: String,
}

impl Flow {
    /// Parse the stored `elements` JSON column into a fully resolved [`Flow`].
    pub fn from_stored(id: String, name: String, elements: &Value) -> EngineResult<Flow> {
        let raw: RawElements = serde_json::from_value(elements.clone()).map_err(|err| EngineError::LoadShape {
            reason: format!("elements column did not match the expected shape: {err}"),
        })?;

        if raw.nodes.is_empty() {
            return Err(EngineError::LoadShape {
                reason: "flow has no nodes".to_string(),
            });
        }

        let mut nodes = HashMap::with_capacity(raw.nodes.len());
        let mut order = Vec::with_capacity(raw.nodes.len());
        for raw_node in &raw.nodes {
            let kind = NodeKind::from_raw(&raw_node.kind, &raw_node.data);
            kind.validate(&raw_node.id)?;
            order.push(raw_node.id.clone());
            nodes.insert(
                raw_node.id.clone(),
                Node {
                    id: raw_node.id.clone(),
                    kind,
                },
            );
        }

        let edges: Vec<Edge> = raw
            .edges
            .iter()
            .map(|e| Edge {
                source: e.source.clone(),
                target: e.target.clone(),
                source_handle: e.source_handle.clone(),
            })
            .collect();

        let start_node_id = resolve_start_node(&nodes, &order, &edges)?;

        Ok(Flow {
            id,
            name,
            nodes,
            edges,
            start_node_id,
        })
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn outgoing_edges(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }
}

/// Resolve the start node following the documented heuristic order:
/// explicit `startNode` type, then an orphan node (never an edge target),
/// then the first node in declaration order.
fn resolve_start_node(
    nodes: &HashMap<String, Node>,
    order: &[String],
    edges: &[Edge],
) -> EngineResult<String> {
    if let Some(id) = order
        .iter()
        .find(|id| matches!(nodes.get(*id).map(|n| &n.kind), Some(NodeKind::StartNode)))
    {
        return Ok(id.clone());
    }

    let targets: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
    if let Some(id) = order.iter().find(|id| !targets.contains(id.as_str())) {
        return Ok(id.clone());
    }

    tracing::warn!("no startNode or orphan node found; defaulting to the first declared node");
    order
        .first()
        .cloned()
        .ok_or_else(|| EngineError::LoadShape {
            reason: "could not resolve a start node".to_string(),
        })
}
