//! Fleet Profit tracks what a trucking fleet spends and earns, and works out how
//! profitable each truck and the fleet as a whole are for each month.
//!
//! The library is the calculation and cost-versioning engine. Fixed costs change
//! over time, so they are captured in immutable snapshots and every month of
//! recorded variable costs is bound to the snapshot that was in effect, which
//! keeps historical profitability reproducible after costs are edited.
//!
//! Every operation takes a [rusqlite::Connection] explicitly. The HTTP API built
//! by [build_router] is a thin JSON adapter over the same functions.

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
pub mod costs;
pub mod db;
mod endpoints;
pub mod extract;
pub mod fleet;
mod logging;
pub mod money;
mod not_found;
pub mod period;
pub mod profitability;
mod routing;
pub mod snapshot;
pub mod truck;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;

use crate::{
    costs::VariableCostsId, period::Period, snapshot::SnapshotId, truck::TruckId,
    validation::ValidationErrors,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then tells the server behind `handle` to shut down gracefully.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("could not listen for Ctrl+C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!("could not listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received ctrl+c signal, shutting down."),
        _ = terminate => tracing::info!("Received terminate signal, shutting down."),
    }

    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more inputs were rejected. Every problem is listed.
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    #[error("truck {0} does not exist")]
    TruckNotFound(TruckId),

    #[error("snapshot {0} does not exist")]
    SnapshotNotFound(SnapshotId),

    #[error("variable costs record {0} does not exist")]
    VariableCostsNotFound(VariableCostsId),

    /// Tractor numbers are unique regardless of case.
    #[error("the tractor number \"{0}\" is already registered")]
    DuplicateTractorNumber(String),

    /// A truck can have only one variable costs record per period.
    #[error("truck {truck_id} already has variable costs for {period}")]
    DuplicateVariableCosts {
        /// The truck the record was for.
        truck_id: TruckId,
        /// The period that already has a record.
        period: Period,
    },

    /// Trucks with recorded variable costs cannot be deleted, otherwise the
    /// history of the fleet's profitability would change.
    #[error("truck {truck_id} has {records} variable costs record(s) and cannot be deleted")]
    TruckHasCostHistory {
        /// The truck that was to be deleted.
        truck_id: TruckId,
        /// How many variable costs records reference the truck.
        records: i64,
    },

    #[error("cannot restore fixed costs from snapshot {0} because it does not exist")]
    RestoreMissingSnapshot(SnapshotId),

    /// An unhandled/unexpected SQL error.
    ///
    /// The details are logged on the server and never sent to clients.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

/// The broad class of an [Error], which decides how clients are told about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input was rejected.
    Validation,
    /// Something the request referred to does not exist.
    NotFound,
    /// The request conflicts with the current state of the data.
    BusinessRule,
    /// Something went wrong on the server.
    Internal,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound
            | Error::TruckNotFound(_)
            | Error::SnapshotNotFound(_)
            | Error::VariableCostsNotFound(_) => ErrorKind::NotFound,
            Error::DuplicateTractorNumber(_)
            | Error::DuplicateVariableCosts { .. }
            | Error::TruckHasCostHistory { .. }
            | Error::RestoreMissingSnapshot(_) => ErrorKind::BusinessRule,
            Error::SqlError(_) | Error::DatabaseLockError => ErrorKind::Internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match (self.kind(), self) {
            (_, Error::RestoreMissingSnapshot(_)) => StatusCode::NOT_FOUND,
            (ErrorKind::Validation, _) => StatusCode::BAD_REQUEST,
            (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
            (ErrorKind::BusinessRule, _) => StatusCode::CONFLICT,
            (ErrorKind::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorKind,
    message: String,
    details: Vec<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let body = match self {
            Error::Validation(errors) => ErrorBody {
                error: ErrorKind::Validation,
                message: "the request contained invalid input".to_owned(),
                details: errors.messages().to_vec(),
            },
            // Any errors that are internal are not intended to be shown to the client.
            error if error.kind() == ErrorKind::Internal => {
                tracing::error!("An unexpected error occurred: {}", error);
                ErrorBody {
                    error: ErrorKind::Internal,
                    message: "an unexpected error occurred, check the server logs for more details"
                        .to_owned(),
                    details: Vec::new(),
                }
            }
            error => ErrorBody {
                error: error.kind(),
                message: error.to_string(),
                details: Vec::new(),
            },
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::Value;

    use crate::{Error, ErrorKind, validation::ValidationErrors};

    async fn into_json(error: Error) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not read response body");

        (
            status,
            serde_json::from_slice(&body).expect("Response body is not JSON"),
        )
    }

    #[test]
    fn kinds_cover_every_class() {
        assert_eq!(
            Error::Validation(ValidationErrors::new()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::TruckNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::TruckHasCostHistory {
                truck_id: 1,
                records: 2
            }
            .kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(Error::DatabaseLockError.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn validation_error_lists_details() {
        let mut errors = ValidationErrors::new();
        errors.push("fuel: amount cannot be negative");
        errors.push("tolls: amount cannot exceed 1000000");

        let (status, body) = into_json(Error::Validation(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
        assert_eq!(body["details"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn business_rule_is_conflict() {
        let (status, body) = into_json(Error::DuplicateTractorNumber("T-1".to_owned())).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "business_rule");
    }

    #[tokio::test]
    async fn restore_of_missing_snapshot_is_not_found() {
        let (status, body) = into_json(Error::RestoreMissingSnapshot(9)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "business_rule");
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let (status, body) =
            into_json(Error::SqlError(rusqlite::Error::InvalidQuery)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal");
        assert!(!body["message"].as_str().unwrap_or_default().contains("SQL"));
    }
}
