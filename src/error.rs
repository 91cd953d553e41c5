//!
//! # Error Handling
//!
//! Two tiers of errors live here.
//!
//! `InitError` covers composition time: a failing extension aborts `compose`
//! and the process never reaches a serving state.
//!
//! `AppError` covers request time. It implements `actix_web::error::ResponseError`
//! so handlers can return it with `?`. The 401, 404 and 500 responses it produces
//! are later replaced by the HTML error pages installed in `templates::render_error`;
//! every other status keeps its JSON body.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Errors that abort application composition.
#[derive(Debug)]
pub enum InitError {
    /// A setting is present but unusable.
    Config(String),
    /// An extension refused to initialise against the application.
    Extension { name: &'static str, reason: String },
    /// The template environment could not be set up.
    Templates(String),
}

impl InitError {
    pub fn extension(name: &'static str, reason: impl fmt::Display) -> Self {
        InitError::Extension {
            name,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InitError::Config(msg) => write!(f, "Configuration error: {}", msg),
            InitError::Extension { name, reason } => {
                write!(f, "Extension '{}' failed to initialise: {}", name, reason)
            }
            InitError::Templates(msg) => write!(f, "Template environment error: {}", msg),
        }
    }
}

impl std::error::Error for InitError {}

/// Represents all errors a request handler can produce.
#[derive(Debug)]
pub enum AppError {
    /// HTTP 401. Rendered as `errors/401.html`.
    Unauthorized(String),
    /// HTTP 400.
    BadRequest(String),
    /// HTTP 404. Rendered as `errors/404.html`.
    NotFound(String),
    /// HTTP 500. Rendered as `errors/500.html`.
    InternalServerError(String),
    /// Errors from `sqlx` (HTTP 500).
    DatabaseError(String),
    /// Failed input validation (HTTP 422).
    ValidationError(String),
    /// A template failed to load or render (HTTP 500).
    TemplateError(String),
    /// A message could not be built or delivered (HTTP 500).
    MailError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::TemplateError(msg) => write!(f, "Template Error: {}", msg),
            AppError::MailError(msg) => write!(f, "Mail Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
            // Internal details are logged, never sent to the client.
            AppError::InternalServerError(msg)
            | AppError::DatabaseError(msg)
            | AppError::TemplateError(msg)
            | AppError::MailError(msg) => {
                log::error!("{}: {}", self.kind(), msg);
                HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }))
            }
        }
    }
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::InternalServerError(_) => "internal",
            AppError::DatabaseError(_) => "database",
            AppError::ValidationError(_) => "validation",
            AppError::TemplateError(_) => "template",
            AppError::MailError(_) => "mail",
        }
    }
}

/// `RowNotFound` becomes a 404; anything else is a database failure.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(error: minijinja::Error) -> AppError {
        AppError::TemplateError(error.to_string())
    }
}
