// errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HolodexError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Holodex returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HolodexError {
    /// Whether retrying on the next cycle has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            HolodexError::Network(_) => true,
            HolodexError::Status { status, .. } => *status == 429 || *status >= 500,
            HolodexError::InvalidUrl(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_classify_by_code() {
        let throttled = HolodexError::Status { status: 429, body: String::new() };
        let forbidden = HolodexError::Status { status: 403, body: "bad key".to_string() };
        assert!(throttled.is_transient());
        assert!(!forbidden.is_transient());
        assert_eq!(forbidden.to_string(), "Holodex returned HTTP 403: bad key");
    }
}
