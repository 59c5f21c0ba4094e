//! Error types for the application

use thiserror::Error;

/// Result type alias using our ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket connection errors
    #[error("WebSocket connection error: {0}")]
    WebSocketConnection(String),

    /// WebSocket send/receive errors
    #[error("WebSocket communication error: {0}")]
    WebSocketCommunication(String),

    /// A frame was sent while the socket was not open
    #[error("WebSocket is not connected")]
    NotConnected,

    /// HTTP transport errors (no response received)
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// 400: the server rejected the request parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 401: token missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403: the session lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// 500
    #[error("Server error: {0}")]
    Server(String),

    /// Any other non-success status or business code
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Channel send errors
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// A message handler reported a failure
    #[error("Message handler error: {0}")]
    Handler(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether this error means the session is no longer authenticated
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocketCommunication(err.to_string())
    }
}
