#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to create state path {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read state {path}: {source}")]
    ReadState {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse state {path}: {source}")]
    ParseState {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode state {path}: {source}")]
    EncodeState {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write state {path}: {source}")]
    WriteState {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove state {path}: {source}")]
    RemoveState {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a failed unit of work is presented to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed token arguments or unparseable text; re-prompt.
    Format,
    /// Role or ownership does not allow the action; nothing was changed.
    Authorization,
    /// The order is not in a state that allows the action.
    Consistency,
    /// Storage, transport or gateway failure.
    Infrastructure,
}
