/// Failure of a station API call that callers have to see.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    Network(String),
    Status { status: u16, body: String },
    Parse(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(message) => write!(formatter, "request failed: {message}"),
            ApiError::Status { status, body } => {
                write!(formatter, "request failed with status {status}: {body}")
            }
            ApiError::Parse(message) => write!(formatter, "response parse failed: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_code_and_body() {
        let error = ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "request failed with status 502: bad gateway"
        );
    }
}
