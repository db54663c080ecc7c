//! Request extractors that report malformed input as [Error::Validation].
//!
//! Axum's own extractors reply with plain text. These wrap them so that a bad
//! body, path or query string gets the same JSON error body as any other
//! rejected input.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection, QueryRejection},
};

use crate::{Error, validation::ValidationErrors};

/// A JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// Parameters captured from the request path.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

/// Parameters from the query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct QueryParams<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {rejection}");
        Error::Validation(ValidationErrors::single(format!(
            "body: {}",
            rejection.body_text()
        )))
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path: {rejection}");
        Error::Validation(ValidationErrors::single(format!(
            "path: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query string: {rejection}");
        Error::Validation(ValidationErrors::single(format!(
            "query: {}",
            rejection.body_text()
        )))
    }
}
