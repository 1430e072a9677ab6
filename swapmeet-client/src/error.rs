use swapmeet_shared::errors::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with its error envelope.
    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Rejected locally before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Another action on this session has not finished yet.
    #[error("another action is still in progress")]
    InFlight,

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Service error code, for `Api` errors with a known code.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => ErrorCode::from_code(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_code() {
        let err = ClientError::Api {
            status: 409,
            code: "E3005".into(),
            message: "a trade already exists for this match".into(),
        };
        assert_eq!(err.code(), Some(ErrorCode::TradeAlreadyExists));
        assert_eq!(err.to_string(), "a trade already exists for this match (E3005, HTTP 409)");
        assert_eq!(ClientError::InFlight.code(), None);
    }
}
