use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerifyError>;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("space id and access token are still placeholders; pass --space-id and --access-token")]
    PlaceholderCredentials,

    #[error("{count} entries failed layout validation")]
    ValidationFailed { count: usize },
}

impl VerifyError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailed { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VerifyError;

    #[test]
    fn strict_failures_exit_with_two() {
        assert_eq!(VerifyError::ValidationFailed { count: 3 }.exit_code(), 2);
        assert_eq!(VerifyError::PlaceholderCredentials.exit_code(), 1);
    }

    #[test]
    fn status_error_names_the_url() {
        let error = VerifyError::Status {
            url: "https://cdn.example.com/spaces/x/entries".to_string(),
            status: 401,
        };
        assert_eq!(error.exit_code(), 1);
        assert!(error.to_string().contains("status 401"));
    }
}
