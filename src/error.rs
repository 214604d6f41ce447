use thiserror::Error;

/// Closed error taxonomy for the engine and its collaborators.
///
/// Node-level misconfiguration and AI-remote failures are deliberately absent
/// here: per the AI Query Client contract they are captured into a flow
/// variable and never escape as a Rust error (see `ai_client`).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("flow store error: {reason}")]
    Store { reason: String },

    #[error("flow has an unresolvable shape: {reason}")]
    LoadShape { reason: String },

    #[error("session error: {reason}")]
    Session { reason: String },

    #[error("flow traversal exceeded the hop limit")]
    HopLimitExceeded,

    #[error("node '{node_id}' referenced but not present in the loaded flow")]
    DanglingNode { node_id: String },

    #[error("no flow is currently loaded")]
    NoFlowLoaded,
}

pub type EngineResult<T> = Result<T, EngineError>;
