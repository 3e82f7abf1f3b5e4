use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::rate_limit::RateLimitDecision;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("too many requests")]
    QuotaExceeded(RateLimitDecision),

    #[error("slug `{slug}` is already taken")]
    NamingConflict { slug: String },

    #[error("field `{field}` is not valid encoded JSON: {source}")]
    MalformedEncodedField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("title produces an empty slug")]
    EmptySlug,

    #[error("invalid request body")]
    Validation(Vec<FieldError>),

    #[error("recipe `{0}` not found")]
    NotFound(String),
}

impl CatalogError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            CatalogError::NamingConflict { .. } => StatusCode::CONFLICT,
            CatalogError::MalformedEncodedField { .. }
            | CatalogError::EmptySlug
            | CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

// Unparseable JSON or a wrong content type lands in the same 400 shape as
// field validation
impl From<JsonRejection> for CatalogError {
    fn from(rejection: JsonRejection) -> Self {
        CatalogError::validation("body", rejection.body_text())
    }
}

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// Quota headers; reset is the window end in Unix epoch milliseconds
pub fn quota_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_at_millis()));
    headers
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            CatalogError::QuotaExceeded(decision) => {
                let mut headers = quota_headers(&decision);
                headers.insert(
                    axum::http::header::RETRY_AFTER,
                    HeaderValue::from(decision.retry_after(Utc::now())),
                );
                let body = json!({
                    "error": "Too many requests. Please try again later.",
                });
                (status, headers, Json(body)).into_response()
            }
            CatalogError::Validation(details) => {
                let body = json!({ "error": "Invalid request body", "details": details });
                (status, Json(body)).into_response()
            }
            CatalogError::MalformedEncodedField { field, ref source } => {
                let details = [FieldError::new(field, source.to_string())];
                let body = json!({ "error": "Invalid request body", "details": details });
                (status, Json(body)).into_response()
            }
            CatalogError::NamingConflict { .. } => {
                let body = json!({ "error": "A recipe with this title already exists" });
                (status, Json(body)).into_response()
            }
            other => {
                let body = json!({ "error": other.to_string() });
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn quota_exceeded_carries_retry_headers() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_at: Utc::now() + TimeDelta::seconds(30),
        };
        let response = CatalogError::QuotaExceeded(decision.clone()).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let headers = response.headers();
        assert_eq!(headers[RATE_LIMIT_LIMIT], "10");
        assert_eq!(headers[RATE_LIMIT_REMAINING], "0");
        assert_eq!(
            headers[RATE_LIMIT_RESET],
            decision.reset_at_millis().to_string().as_str()
        );
        let retry: u64 = headers[axum::http::header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((29..=30).contains(&retry));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(CatalogError::EmptySlug.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            CatalogError::NamingConflict { slug: "sarma".into() }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(CatalogError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            CatalogError::validation("title", "required").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn every_variant_is_a_client_error() {
        let malformed = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        let decision = RateLimitDecision {
            allowed: false,
            limit: 1,
            remaining: 0,
            reset_at: Utc::now(),
        };
        let errors = [
            CatalogError::QuotaExceeded(decision),
            CatalogError::NamingConflict { slug: "sarma".into() },
            CatalogError::MalformedEncodedField {
                field: "steps",
                source: malformed,
            },
            CatalogError::EmptySlug,
            CatalogError::validation("title", "required"),
            CatalogError::NotFound("x".into()),
        ];
        for err in errors {
            assert!(err.status().is_client_error(), "{err}");
        }
    }
}
