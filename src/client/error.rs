/* Types */
pub type ClientResult<T> = Result<T, ClientError>;

// Every variant carries a plain string so errors stay Clone.
// Deduplicated in-flight queries broadcast one result to all callers.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Api(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Channel error: {0}")]
    Channel(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Not logged in")]
    NoSession,
}

impl From<reqwest::Error> for ClientError {
    fn from(request_error: reqwest::Error) -> ClientError {
        ClientError::Transport(request_error.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(json_error: serde_json::Error) -> ClientError {
        ClientError::Transport(json_error.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(io_error: std::io::Error) -> ClientError {
        ClientError::Storage(io_error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(ws_error: tokio_tungstenite::tungstenite::Error) -> ClientError {
        ClientError::Channel(ws_error.to_string())
    }
}
