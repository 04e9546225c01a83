/// Driver-level errors, with stable string codes shared with the probe.
#[derive(thiserror::Error, Debug, Clone)]
pub enum BackendError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Node {id} not found")]
    NodeNotFound { id: u32 },

    #[error("Node {id} is stale (removed from DOM)")]
    NodeStale { id: u32 },

    #[error("Option not found: {label}")]
    OptionNotFound { label: String },

    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Timeout: {operation}")]
    Timeout { operation: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Probe execution failed: {0}")]
    Probe(String),

    #[error("Not ready")]
    NotReady,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Other: {0}")]
    Other(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

impl BackendError {
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Navigation(_) => "NAVIGATION_ERROR",
            BackendError::NodeNotFound { .. } => "NODE_NOT_FOUND",
            BackendError::NodeStale { .. } => "NODE_STALE",
            BackendError::OptionNotFound { .. } => "OPTION_NOT_FOUND",
            BackendError::ScriptError(_) => "SCRIPT_ERROR",
            BackendError::Timeout { .. } => "TIMEOUT",
            BackendError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            BackendError::Probe(_) => "PROBE_ERROR",
            BackendError::NotReady => "NOT_READY",
            BackendError::Io(_) => "IO_ERROR",
            BackendError::Serialization(_) => "SERIALIZATION_ERROR",
            BackendError::NotSupported(_) => "NOT_SUPPORTED",
            BackendError::Other(_) => "OTHER",
        }
    }

    /// Maps a probe error response back into the taxonomy. Codes the probe
    /// does not emit fall through to `Probe`.
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "NODE_NOT_FOUND" => {
                BackendError::NodeNotFound { id: parse_id(&message) }
            }
            "NODE_STALE" => BackendError::NodeStale { id: parse_id(&message) },
            "OPTION_NOT_FOUND" => BackendError::OptionNotFound { label: message },
            "SCRIPT_ERROR" => BackendError::ScriptError(message),
            "UNKNOWN_COMMAND" => BackendError::UnknownCommand(message),
            _ => BackendError::Probe(format!("{code}: {message}")),
        }
    }
}

fn parse_id(message: &str) -> u32 {
    message
        .split_whitespace()
        .find_map(|token| token.parse().ok())
        .unwrap_or(0)
}
