//! Error handler for anteroom.
//!
//! Handlers return [`ServerError`]; the [`envelope`] middleware finishes
//! every error response as `{path, timestamp, message, validationErrors?}`
//! with messages resolved from symbolic codes for the request locale.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::AppState;
use crate::catalog::Locale;
use crate::user::validate::{LocalizedErrors, ValidationErrors};

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(ValidationErrors),

    #[error("activation notification could not be dispatched")]
    NotificationDispatch,

    #[error("unknown or already consumed activation token")]
    InvalidActivationToken,

    #[error("user not found")]
    UserNotFound,

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),
}

impl From<ValidationErrors> for ServerError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidActivationToken
            | Self::Json(_) => StatusCode::BAD_REQUEST,
            Self::NotificationDispatch => StatusCode::BAD_GATEWAY,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Sql(_) | Self::Crypto(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Symbolic code resolved by the message catalog.
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failure",
            Self::NotificationDispatch => "email_failure",
            Self::InvalidActivationToken => "account_activation_failure",
            Self::UserNotFound => "user_not_found",
            Self::Json(_) => "invalid_body",
            Self::Sql(_) | Self::Crypto(_) => "internal_error",
        }
    }
}

/// Error payload handed to [`envelope`] through response extensions.
#[derive(Debug, Clone)]
struct ErrorDetails {
    code: &'static str,
    fields: Option<ValidationErrors>,
}

/// Generic error envelope, shared by every error response.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    path: String,
    timestamp: i64,
    message: String,
    #[serde(rename = "validationErrors")]
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_errors: Option<LocalizedErrors>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let details = ErrorDetails {
            code,
            fields: match self {
                Self::Validation(errors) => Some(errors),
                _ => None,
            },
        };

        let mut response = status.into_response();
        response.extensions_mut().insert(details);
        response
    }
}

/// Middleware finishing error responses with the generic envelope.
///
/// Lives outside [`IntoResponse`] because the envelope needs the request
/// path and locale, which the error type never carries.
pub async fn envelope(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    let locale = Locale::from_headers(req.headers());

    let mut response = next.run(req).await;
    let Some(details) = response.extensions_mut().remove::<ErrorDetails>()
    else {
        return response;
    };

    let status = response.status();
    let body = ResponseError {
        path,
        timestamp: chrono::Utc::now().timestamp_millis(),
        message: state.catalog.resolve(details.code, &locale.0),
        validation_errors: details
            .fields
            .map(|fields| fields.localize(&state.catalog, &locale.0)),
    };

    (status, Json(body)).into_response()
}
