//! Typed errors and HTTP mapping.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Content type carried by every response, success or error.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Compile-phase errors: building the registry or loading store config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("resource '{0}' has no model")]
    MissingModel(String),
    #[error("invalid primary key: model {model} column {column}")]
    InvalidPrimaryKey { model: String, column: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures reported by a model store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{model} with id '{id}' not found")]
    NotFound { model: String, id: String },
    #[error("unknown relation '{relation}' on {model}")]
    UnknownRelation { model: String, relation: String },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store: {0}")]
    Backend(String),
}

/// The fixed set of request-level error kinds, each with a status and default message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    InternalServerError,
    NotImplemented,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request Error",
            ErrorKind::Unauthorized => "Unauthorized Error",
            ErrorKind::Forbidden => "Forbidden Error",
            ErrorKind::NotFound => "Not Found Error",
            ErrorKind::MethodNotAllowed => "Method Not Allowed Error",
            ErrorKind::NotAcceptable => "Not Acceptable Error",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::NotImplemented => "Not Implemented Error",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Raised by routing, dispatch, rendering or a custom handler.
    #[error("{message}")]
    Http { kind: ErrorKind, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(StoreError),
    /// An internal fault whose detail is logged but never returned.
    #[error("{0}")]
    Unexpected(String),
}

impl AppError {
    /// Error of `kind` carrying its default message.
    pub fn new(kind: ErrorKind) -> Self {
        AppError::Http {
            kind,
            message: kind.default_message().to_string(),
        }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppError::Http {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::InternalServerError, message)
    }

    /// Internal failure answered with the generic 500 message.
    pub fn unexpected(detail: impl Into<String>) -> Self {
        AppError::Unexpected(detail.into())
    }

    /// Taxonomy kind; config and store failures are internal.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Http { kind, .. } => *kind,
            AppError::Config(_) | AppError::Store(_) | AppError::Unexpected(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// Message safe to return to the caller. Non-taxonomy failures never leak detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Http { message, .. } => message.clone(),
            AppError::Config(_) | AppError::Store(_) | AppError::Unexpected(_) => {
                ErrorKind::InternalServerError.default_message().to_string()
            }
        }
    }

    pub fn is_unexpected(&self) -> bool {
        !matches!(self, AppError::Http { .. })
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { model, id } => {
                AppError::not_found(format!("{} {} not found", model, id))
            }
            StoreError::Db(sqlx::Error::RowNotFound) => AppError::new(ErrorKind::NotFound),
            other => AppError::Store(other),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unexpected() {
            tracing::error!(error = ?self, "unexpected failure");
        } else {
            tracing::warn!(status = %self.status(), message = %self, "request failed");
        }
        let body = ErrorBody {
            message: self.public_message(),
        };
        let mut response = (self.status(), Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        response
    }
}
