use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lockledger_core::LedgerError;
use lockledger_store::StoreError;
use lockledger_types::{Generation, TypeError};
use serde::Serialize;
use thiserror::Error;

/// Hint returned with every conflict.
pub const RELOAD_HINT: &str = "reload the ledger and resubmit";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TypeError> for ServerError {
    fn from(err: TypeError) -> Self {
        ServerError::BadRequest(err.to_string())
    }
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Ledger(err) => match err {
                LedgerError::Conflict { .. } => StatusCode::CONFLICT,
                LedgerError::ContainerNotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::ReservedName { .. } | LedgerError::InvalidName(_) => {
                    StatusCode::BAD_REQUEST
                }
                LedgerError::StoreUnavailable { .. } | LedgerError::Interrupted { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                LedgerError::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::ContainerNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let mut body = ErrorBody {
            error: self.to_string(),
            ..Default::default()
        };
        match self {
            Self::Ledger(LedgerError::Conflict {
                container,
                expected,
                found,
                object,
                mutated,
            }) => {
                body.container = Some(container.clone());
                body.expected = *expected;
                body.found = *found;
                body.object = object.clone();
                body.mutated = mutated.clone();
                body.hint = Some(RELOAD_HINT);
            }
            Self::Ledger(LedgerError::Interrupted {
                container,
                object,
                mutated,
                ..
            }) => {
                body.container = Some(container.clone());
                body.object = Some(object.clone());
                body.mutated = mutated.clone();
                body.hint = Some(RELOAD_HINT);
            }
            _ => {}
        }
        body
    }
}

#[derive(Debug, Default, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<Generation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    found: Option<Generation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    object: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mutated: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
