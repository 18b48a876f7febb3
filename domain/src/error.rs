//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// Top-level domain error type.
/// Errors are modeled as a tree with `domain::error::Error` as the root holding an
/// `error_kind` that says where the failure came from. The `source` field keeps the
/// underlying error. `web` uses the kinds to pick HTTP status codes, the fetcher uses
/// them only for logging since a failed source is simply left out of a round.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Errors caused by this process: bad configuration or bad input.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Invalid,
    Other(String),
}

/// Errors caused by an upstream data source.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The source could not be reached or the connection broke.
    Transport,
    /// The source did not answer within its deadline.
    Timeout,
    /// The source answered with a non-success status code.
    UpstreamStatus(u16),
    /// The source answered with a body that is not valid JSON.
    Decode,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Domain Error ({:?}): {source}", self.error_kind),
            None => write!(f, "Domain Error ({:?})", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        let error_kind = if err.is_builder() {
            DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to build reqwest client".to_string(),
            ))
        } else if err.is_timeout() {
            DomainErrorKind::External(ExternalErrorKind::Timeout)
        } else if err.is_decode() {
            DomainErrorKind::External(ExternalErrorKind::Decode)
        } else if let Some(status) = err.status() {
            DomainErrorKind::External(ExternalErrorKind::UpstreamStatus(status.as_u16()))
        } else {
            DomainErrorKind::External(ExternalErrorKind::Transport)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Invalid),
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    }
}

/// Helper function to wrap a lower-level error as a configuration error.
pub fn config_source_error<E>(err: E) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    Error {
        source: Some(Box::new(err)),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    }
}

/// Helper function to create invalid input errors.
pub fn invalid_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Invalid),
    }
}

/// Helper function to create an error for a non-success upstream response.
pub fn upstream_status_error(status: u16, url: &str) -> Error {
    Error {
        source: Some(format!("API returned status {status} for {url}").into()),
        error_kind: DomainErrorKind::External(ExternalErrorKind::UpstreamStatus(status)),
    }
}

/// Helper function to create an error for a source that missed its deadline.
pub fn timeout_error(path: &str, limit: Duration) -> Error {
    Error {
        source: Some(format!("{path} did not answer within {limit:?}").into()),
        error_kind: DomainErrorKind::External(ExternalErrorKind::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_error_carries_code() {
        let err = upstream_status_error(503, "http://localhost:3000/users/stats/overview");
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::UpstreamStatus(503))
        );
        assert!(err.to_string().contains("status 503"));
    }

    #[test]
    fn serde_errors_are_invalid_input() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Invalid)
        );
    }

    #[test]
    fn timeout_error_names_the_path() {
        let err = timeout_error("/users/stats/overview", Duration::from_millis(250));
        assert!(err.to_string().contains("/users/stats/overview"));
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Timeout)
        );
    }
}
