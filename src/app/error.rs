use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnelError {
    /// The document ended without a recognizable feed root element.
    #[error("Not a feed")]
    NotAFeed,

    /// XML syntax error reported by the scanner. When several were
    /// collected during one parse, `earlier` holds all but the last.
    #[error("XML error: {message}")]
    Scan {
        message: String,
        earlier: Vec<String>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl RunnelError {
    pub(crate) fn scan(message: impl Into<String>) -> Self {
        RunnelError::Scan {
            message: message.into(),
            earlier: Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnelError>;
