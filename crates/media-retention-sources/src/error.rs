use thiserror::Error;

/// Failure talking to one of the upstream services.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: status={status} body={body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Authorization failed: {0}")]
    Auth(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            SourceError::Api { status, .. } => *status == 404,
            SourceError::Http(e) => e.status().map(|s| s.as_u16() == 404).unwrap_or(false),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let not_found = SourceError::Api { status: 404, body: String::new() };
        let server_error = SourceError::Api { status: 503, body: "unavailable".to_string() };
        assert!(not_found.is_not_found());
        assert!(!server_error.is_not_found());
        assert_eq!(server_error.to_string(), "API error: status=503 body=unavailable");
        assert!(!SourceError::NotConfigured("Sonarr".to_string()).is_not_found());
    }
}
