use thiserror::Error;

pub type Result<T> = std::result::Result<T, PocketBaseError>;

#[derive(Debug, Error)]
pub enum PocketBaseError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl PocketBaseError {
    pub fn status(&self) -> Option<u16> {
        match self {
            PocketBaseError::Api { status, .. } => Some(*status),
            PocketBaseError::Network(_) => None,
        }
    }

    /// PocketBase reports unique-index violations as a 400 with the
    /// `validation_not_unique` code in the body.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            PocketBaseError::Api { status: 400, message } if message.contains("validation_not_unique")
        )
    }
}

impl From<reqwest::Error> for PocketBaseError {
    fn from(err: reqwest::Error) -> Self {
        PocketBaseError::Network(err.to_string())
    }
}
