use std::sync::Arc;

use crate::ai_client;
use crate::condition::evaluate_condition;
use crate::edges::{self, TRIGGER_ERROR, TRIGGER_START_FLOW, TRIGGER_TRANSITION};
use crate::engine::payload::{self, Payload};
use crate::error::EngineResult;
use crate::model::{Edge, Flow, Node, NodeKind};
use crate::registry::FlowRegistry;
use crate::session::{Session, SessionStore};
use crate::store::FlowSource;
use crate::template::substitute;

/// User-facing strings the external contract pins exactly (§9).
pub const UNAVAILABLE_MESSAGE: &str = "Desculpe, o sistema está temporariamente indisponível.";
pub const INTERNAL_FLOW_ERROR: &str = "Erro interno no fluxo.";
pub const HOP_LIMIT_MESSAGE: &str = "Erro.";

/// Bound on node-steps per request (§4.8, §8 property 3).
const MAX_HOPS: u32 = 15;

enum NextStep {
    Goto(String, String),
    StopWaiting,
    StopEnd,
}

/// Bundles the flow registry, session store and flow store adapter behind
/// the single entry point the HTTP surface calls into.
pub struct Engine {
    registry: Arc<FlowRegistry>,
    sessions: Arc<SessionStore>,
    store: Arc<dyn FlowSource>,
    http: reqwest::Client,
    ai_query_api_url: Option<String>,
}

impl Engine {
    pub fn new(
        registry: Arc<FlowRegistry>,
        sessions: Arc<SessionStore>,
        store: Arc<dyn FlowSource>,
        ai_query_api_url: Option<String>,
    ) -> Self {
        Self {
            registry,
            sessions,
            store,
            http: reqwest::Client::new(),
            ai_query_api_url,
        }
    }

    pub fn flow_loaded(&self) -> bool {
        self.registry.current().is_some()
    }

    pub async fn db_connection_ok(&self) -> bool {
        self.store.ping().await
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Load the active flow and swap it into the registry. Returns whether
    /// the flow id changed, which callers use to decide whether to purge
    /// sessions (reload callers purge as part of this call; `/process_message`
    /// relies on the fact that a changed id always implies an empty session
    /// map by the time it re-reads the registry).
    pub async fn reload(&self) -> EngineResult<bool> {
        let flow = self.store.load_active_flow().await?;
        let new_id = flow.id.clone();
        let previous_id = self.registry.replace(flow);
        let changed = previous_id.as_deref() != Some(new_id.as_str());
        if changed {
            self.sessions.clear();
        }
        Ok(changed)
    }

    async fn ensure_flow_loaded(&self) -> Option<Arc<Flow>> {
        if let Some(flow) = self.registry.current() {
            return Some(flow);
        }
        match self.reload().await {
            Ok(_) => self.registry.current(),
            Err(err) => {
                tracing::error!(error = %err, "failed to load a flow on demand");
                None
            }
        }
    }

    /// Run the execution engine for one inbound message (§4.8).
    pub async fn process_message(&self, sender_id: &str, message: &str) -> Option<Payload> {
        let flow = match self.ensure_flow_loaded().await {
            Some(flow) => flow,
            None => return Some(Payload::text(UNAVAILABLE_MESSAGE)),
        };

        let (handle, is_new) = self.sessions.handle_for(sender_id, &flow.start_node_id);
        let mut session = handle.lock().await;

        let mut trigger = if is_new {
            TRIGGER_START_FLOW.to_string()
        } else {
            message.to_string()
        };
        let mut active_id = session.current_node_id.clone();
        let mut payload: Option<Payload> = None;
        let mut delete_session = false;
        let mut hop_cap_hit = true;
        let mut hop_count: u32 = 0;

        for _ in 0..MAX_HOPS {
            hop_count += 1;
            let Some(node) = flow.node(&active_id).cloned() else {
                tracing::error!(sender_id, node_id = %active_id, "session pointed at a node absent from the loaded flow");
                payload = Some(Payload::text(INTERNAL_FLOW_ERROR));
                delete_session = true;
                hop_cap_hit = false;
                break;
            };

            let capture_eligible = trigger == TRIGGER_START_FLOW
                || (node.kind.is_payload_producing() && hop_count == 1)
                || (node.kind.is_user_waiting() && trigger == TRIGGER_TRANSITION);
            if payload.is_none() && capture_eligible {
                payload = payload::build_payload(&node, &session.variables);
            }

            session.record(&active_id, Some(&trigger));

            match self.dispatch(&flow, &node, &trigger, &mut session).await {
                NextStep::Goto(next_id, next_trigger) => {
                    if payload.is_none() {
                        if let Some(next_node) = flow.node(&next_id) {
                            if next_node.kind.is_payload_producing() {
                                payload = payload::build_payload(next_node, &session.variables);
                            }
                        }
                    }
                    active_id = next_id.clone();
                    trigger = next_trigger;
                    session.current_node_id = next_id;
                }
                NextStep::StopWaiting => {
                    session.current_node_id = active_id.clone();
                    hop_cap_hit = false;
                    break;
                }
                NextStep::StopEnd => {
                    delete_session = true;
                    hop_cap_hit = false;
                    break;
                }
            }
        }

        if hop_cap_hit {
            tracing::error!(sender_id, "flow traversal exceeded the hop limit");
            payload = Some(Payload::text(HOP_LIMIT_MESSAGE));
            delete_session = true;
        }

        drop(session);
        if delete_session {
            self.sessions.remove(sender_id);
        }
        payload
    }

    async fn dispatch(&self, flow: &Flow, node: &Node, trigger: &str, session: &mut Session) -> NextStep {
        let outgoing: Vec<Edge> = flow.outgoing_edges(&node.id).cloned().collect();
        match &node.kind {
            NodeKind::WaitInput { variable_name, .. } => {
                if edges::is_external(trigger) {
                    let var_name = variable_name.clone().unwrap_or_else(|| "lastInput".to_string());
                    session.variables.insert(var_name, trigger.to_string());
                    goto(edges::next_edge(&outgoing, Some(trigger), true))
                } else {
                    NextStep::StopWaiting
                }
            }
            NodeKind::SetVariable { variable_name, value } => {
                if let Some(name) = substitute(variable_name.as_deref(), &session.variables) {
                    let name = name.trim().to_string();
                    if !name.is_empty() {
                        let expanded = substitute(value.as_deref(), &session.variables).unwrap_or_default();
                        session.variables.insert(name, expanded);
                    }
                }
                goto_default(&outgoing)
            }
            NodeKind::GptQuery { save_response_to, .. } => {
                let result = ai_client::call(
                    &self.http,
                    self.ai_query_api_url.as_deref(),
                    &node.kind,
                    &session.variables,
                )
                .await;
                let var_name = save_response_to.clone().unwrap_or_else(|| "gpt_error".to_string());
                let success = !result.starts_with("ERRO");
                session.variables.insert(var_name, result);
                let trigger_for_edge = if success { TRIGGER_TRANSITION } else { TRIGGER_ERROR };
                goto(edges::next_edge(&outgoing, Some(trigger_for_edge), false))
            }
            NodeKind::Condition { variable_name, comparison, value } => {
                let outcome = evaluate_condition(
                    variable_name.as_deref(),
                    comparison.as_deref(),
                    value.as_deref(),
                    &session.variables,
                );
                goto(edges::condition_edge(&outgoing, outcome))
            }
            NodeKind::ButtonMessage { .. } | NodeKind::ListMessage { .. } => {
                if edges::is_external(trigger) {
                    goto(edges::next_edge(&outgoing, Some(trigger), false))
                } else {
                    NextStep::StopWaiting
                }
            }
            NodeKind::EndFlow { .. } => NextStep::StopEnd,
            NodeKind::StartNode
            | NodeKind::TextMessage { .. }
            | NodeKind::ImageMessage
            | NodeKind::AudioMessage
            | NodeKind::VideoMessage
            | NodeKind::FileMessage
            | NodeKind::LocationMessage
            | NodeKind::Unknown { .. } => goto_default(&outgoing),
        }
    }
}

fn goto_default(outgoing: &[Edge]) -> NextStep {
    goto(edges::next_edge(outgoing, Some(TRIGGER_TRANSITION), false))
}

fn goto(edge: Option<&Edge>) -> NextStep {
    match edge {
        Some(edge) => NextStep::Goto(edge.target.clone(), TRIGGER_TRANSITION.to_string()),
        None => NextStep::StopEnd,
    }
}

