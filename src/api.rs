//! Error and acknowledgement bodies shared by every handler.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::store::{StoreError, WriteCounters};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Missing fields: {0:?}")]
    MissingFields(Vec<&'static str>),
    #[error("{0}")]
    InvalidPayload(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Builds the 400 listing, sorted, every field flagged as absent.
    pub fn missing(fields: &[(&'static str, bool)]) -> ApiError {
        let mut missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        missing.sort_unstable();
        ApiError::MissingFields(missing)
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingField(_) | ApiError::MissingFields(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::MissingField(field) => {
                json!({ "detail": self.to_string(), "missing": [field] })
            }
            ApiError::MissingFields(fields) => {
                json!({ "detail": self.to_string(), "missing": fields })
            }
            ApiError::Store(error) => {
                tracing::error!(%error, "store operation failed");
                json!({ "detail": "Internal Server Error" })
            }
            _ => json!({ "detail": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidPayload(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Json<Ack> {
        Json(Ack { ok: true })
    }
}

/// Body returned by the create/update endpoints.
#[derive(Debug, Serialize)]
pub struct WriteSummary {
    pub ok: bool,
    pub created: u64,
    pub properties_set: u64,
}

impl WriteSummary {
    pub fn nodes(counters: WriteCounters) -> Json<WriteSummary> {
        Json(WriteSummary {
            ok: true,
            created: counters.nodes_created,
            properties_set: counters.properties_set,
        })
    }

    pub fn relationships(counters: WriteCounters) -> Json<WriteSummary> {
        Json(WriteSummary {
            ok: true,
            created: counters.relationships_created,
            properties_set: counters.properties_set,
        })
    }
}
