use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use std::time::Instant;

use crate::error::AppError;

/// State recorded before every request and dropped with it.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    started_at: Instant,
    pjax: bool,
}

impl RequestContext {
    pub fn new(started_at: Instant, pjax: bool) -> Self {
        Self { started_at, pjax }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Whether the request came from a PJAX navigation.
    pub fn pjax(&self) -> bool {
        self.pjax
    }

    /// Elapsed time since the hook ran, e.g. `"0.00042s"`. Only computed when asked.
    pub fn request_time(&self) -> String {
        format!("{:.5}s", self.started_at.elapsed().as_secs_f64())
    }

    /// The context stored on `req`, if the hook ran.
    pub fn of(req: &HttpRequest) -> Option<RequestContext> {
        req.extensions().get::<RequestContext>().copied()
    }
}

/// Extracts the context inserted by `RequestHook`.
///
/// Missing context means the hook is not installed on this app, which is a
/// wiring mistake, so it surfaces as a 500.
impl FromRequest for RequestContext {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match RequestContext::of(req) {
            Some(ctx) => ready(Ok(ctx)),
            None => {
                let err = AppError::InternalServerError(
                    "Request context missing. Ensure RequestHook is installed.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
