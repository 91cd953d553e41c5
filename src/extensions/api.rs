//! JSON API layer mounted under `API_PREFIX`.

use actix_cors::Cors;
use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::config::Settings;
use crate::error::{AppError, InitError};
use crate::models::User;

#[derive(Debug, Clone)]
pub struct Api {
    prefix: String,
    cors_origins: Vec<String>,
}

impl Api {
    /// Reads `API_PREFIX` and `API_CORS_ORIGINS`.
    ///
    /// # Returns
    ///
    /// * `Result<Self, InitError>` - Fails when the prefix is not a non-root path
    ///   or the origins are not strings.
    pub fn init_app(settings: &Settings) -> Result<Self, InitError> {
        let configured = settings.get_str("API_PREFIX").unwrap_or("/api");
        let prefix = configured.trim_end_matches('/');
        // An empty scope would match every path and hide the rest of the app.
        if !prefix.starts_with('/') {
            return Err(InitError::extension(
                "api",
                format!("API_PREFIX must be a non-root path starting with '/', got '{}'", configured),
            ));
        }

        let cors_origins = match settings.get("API_CORS_ORIGINS") {
            None => Vec::new(),
            Some(Value::String(origin)) => vec![origin.clone()],
            Some(Value::Array(origins)) => origins
                .iter()
                .map(|o| {
                    o.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| InitError::extension("api", "API_CORS_ORIGINS entries must be strings"))
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(InitError::extension("api", "API_CORS_ORIGINS must be a string or a list"));
            }
        };

        Ok(Api {
            prefix: prefix.to_string(),
            cors_origins,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn cors(&self) -> Cors {
        let cors = if self.cors_origins.iter().any(|o| o == "*") {
            Cors::default().allow_any_origin()
        } else {
            self.cors_origins
                .iter()
                .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        };
        cors.allow_any_method().allow_any_header().max_age(3600)
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope(&self.prefix)
                .wrap(self.cors())
                .route("/health", web::get().to(health))
                .route("/users/{id}", web::get().to(get_user)),
        );
    }
}

/// Health check endpoint
///
/// Returns the current status of the API and timestamp.
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now()
    }))
}

async fn get_user(
    state: web::Data<AppState>,
    id: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user = User::find(state.extensions.db.pool(), id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}
