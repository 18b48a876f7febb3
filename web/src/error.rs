use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use domain::error::{DomainErrorKind, Error as DomainError, InternalErrorKind};

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Invalid => {
                    debug!("Rejecting request: {}", self.0);
                    (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
                }
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    error!("Internal error: {}", self.0);
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            DomainErrorKind::External(_) => {
                warn!("Upstream error: {}", self.0);
                (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
