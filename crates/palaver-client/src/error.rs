use thiserror::Error;

/// Failures talking to the remote API. No retries happen anywhere; every
/// error is surfaced once and the operation is abandoned.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response, with the server's own message when the error body
    /// parsed. An expired token lands here as a 401 like any other
    /// rejection; the two are not told apart.
    #[error("{action} failed (status {status}){}", server_says(.message))]
    Status {
        action: &'static str,
        status: u16,
        message: Option<String>,
    },

    /// The transport failed before a response arrived.
    #[error("{action} failed: {source}")]
    Network {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response that did not carry the field it was called for.
    #[error("{action} response was missing the expected field")]
    Incomplete { action: &'static str },

    /// The bearer token does not look like a JWT at all.
    #[error("bearer token is malformed")]
    MalformedToken,
}

impl ApiError {
    /// HTTP status for transport-level rejections, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn server_says(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(". Server says: {m}"),
        None => String::new(),
    }
}
