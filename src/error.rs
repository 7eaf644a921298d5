use reqwest::StatusCode;

/// Everything that can go wrong between a user action and the refreshed board.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad or expired credential, or a rejected login/registration.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Local input rejected before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// No task (or remote resource) for the requested id.
    #[error("{0}")]
    NotFound(String),
    /// Non-success status from a task operation.
    #[error("server responded {status}: {message}")]
    Remote { status: StatusCode, message: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps a non-success response to the matching error kind, keeping the
    /// server's message text when it sent one.
    pub fn from_response(status: StatusCode, body: String) -> Self {
        let message = match body.trim() {
            "" => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            text => text.to_string(),
        };
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            _ => Error::Remote { status, message },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_decode() {
            Error::Remote {
                status: err.status().unwrap_or(StatusCode::OK),
                message: format!("malformed response: {err}"),
            }
        } else {
            Error::Transport(err)
        }
    }
}
