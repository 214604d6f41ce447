use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Node, NodeKind};
use crate::template::substitute;

/// Outbound message payload (§6, §4.8.1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Build the outbound payload for `node`, if its kind produces one.
///
/// Only `textMessage`, `waitInput`, and `endFlow` produce a payload in this
/// core; the remaining recognized message kinds (`imageMessage`,
/// `buttonMessage`, etc.) still drive traversal and edge resolution but
/// intentionally return `None` here — §4.8.1 leaves their wire shape as an
/// extension point for deployments that need it.
pub fn build_payload(node: &Node, variables: &HashMap<String, String>) -> Option<Payload> {
    let rendered = |field: &Option<String>| substitute(field.as_deref(), variables);
    match &node.kind {
        NodeKind::TextMessage { text } => rendered(text).map(Payload::text),
        NodeKind::WaitInput { message, .. } => rendered(message).map(Payload::text),
        NodeKind::EndFlow { text } => rendered(text).map(Payload::text),
        _ => None,
    }
}
