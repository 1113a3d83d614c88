#[derive(Debug, thiserror::Error)]
pub enum ClerkError {
    #[error("missing webhook header: {0}")]
    MissingHeader(&'static str),
    #[error("invalid webhook secret")]
    InvalidSecret,
    #[error("webhook timestamp outside tolerance")]
    TimestampOutOfRange,
    #[error("webhook signature mismatch")]
    SignatureMismatch,
    #[error("invalid session token: {0}")]
    InvalidToken(String),
    #[error("user not found in Clerk")]
    UserNotFound,
    #[error("Clerk API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}
