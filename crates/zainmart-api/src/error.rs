use thiserror::Error;

use zainmart_platform::PlatformError;
use zainmart_types::ApiResponse;

/// Failure of an operation that reports errors to its caller instead of
/// degrading to an empty result.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: PlatformError,
    },

    /// The platform answered but refused the call, or the input was rejected
    /// before any call was made.
    #[error("{0}")]
    Rejected(String),
}

impl ServiceError {
    /// Message priority: the platform's own error message, then the error's
    /// text, then `fallback`.
    pub fn from_platform(err: PlatformError, fallback: &str) -> Self {
        let message = match err.server_message() {
            Some(message) => message.to_string(),
            None => {
                let text = err.to_string();
                if text.trim().is_empty() { fallback.to_string() } else { text }
            }
        };
        ServiceError::Remote { message, source: err }
    }

    pub fn from_response(resp: &ApiResponse, fallback: &str) -> Self {
        let message = resp
            .error_message()
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback);
        ServiceError::Rejected(message.to_string())
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::Remote { message, .. } => message,
            ServiceError::Rejected(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_wins() {
        let err = ServiceError::from_platform(
            PlatformError::Api { status: 400, message: "Email already used".into() },
            "Registration failed. Please try again.",
        );
        assert_eq!(err.message(), "Email already used");
        assert_eq!(err.to_string(), "Email already used");
    }

    #[test]
    fn test_error_text_before_fallback() {
        let err = ServiceError::from_platform(PlatformError::Api { status: 502, message: String::new() }, "fallback");
        assert_eq!(err.message(), "platform returned 502: ");
        let err = ServiceError::from_platform(PlatformError::Url("ftp://x".into()), "fallback");
        assert_eq!(err.message(), "invalid url: ftp://x");
    }

    #[test]
    fn test_rejected_response_uses_fallback_when_silent() {
        let resp = ApiResponse::failed("");
        assert_eq!(ServiceError::from_response(&resp, "OTP request failed. Please try again.").message(), "OTP request failed. Please try again.");
        let resp = ApiResponse::failed("Invalid OTP");
        assert_eq!(ServiceError::from_response(&resp, "x").message(), "Invalid OTP");
    }
}
