//! Template environment, template globals and the error page renderer.
//!
//! Every render gets two implicit variables besides the handler's context:
//!
//! - `g`: `pjax` and `request_time`, taken from the request's `RequestContext`
//! - `request`: `path` and `query_string` of the current request
//!
//! Globals read `request` through the render state, which is how
//! `url_for_other_page(3)` knows what URL it is rewriting.

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use minijinja::{path_loader, Environment, Error, ErrorKind, State, Value};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::app::AppState;
use crate::config::Settings;
use crate::error::{AppError, InitError};
use crate::request::RequestContext;
use crate::utils;

/// Names registered into the template global namespace.
pub const GLOBALS: [&str; 3] = ["url_for_other_page", "timeago", "asset_url"];

#[derive(Clone)]
pub struct Templates {
    env: Arc<Environment<'static>>,
}

#[derive(Serialize)]
struct GlobalsView {
    pjax: bool,
    request_time: String,
}

#[derive(Serialize)]
struct RequestView<'a> {
    path: &'a str,
    query_string: &'a str,
}

#[derive(Serialize)]
struct Frame<'a, C: Serialize> {
    g: GlobalsView,
    request: RequestView<'a>,
    #[serde(flatten)]
    ctx: &'a C,
}

impl Templates {
    /// Loads templates from `TEMPLATE_FOLDER` and registers the globals.
    ///
    /// # Arguments
    ///
    /// * `settings` - Reads `TEMPLATE_FOLDER` and `DEBUG`.
    /// * `asset_urls` - Bundle name to public URL, backing `asset_url(name)`.
    ///
    /// # Returns
    ///
    /// * `Result<Self, InitError>` - `InitError::Templates` when the folder is missing.
    pub fn new(settings: &Settings, asset_urls: BTreeMap<String, String>) -> Result<Self, InitError> {
        let folder = settings.get_str("TEMPLATE_FOLDER").unwrap_or("templates");
        if !Path::new(folder).is_dir() {
            return Err(InitError::Templates(format!("template folder '{}' not found", folder)));
        }

        let mut env = Environment::new();
        env.set_loader(path_loader(folder));
        env.set_debug(settings.debug());

        env.add_function("url_for_other_page", url_for_other_page);
        env.add_function("timeago", timeago);
        env.add_function("asset_url", move |name: String| -> Result<String, Error> {
            asset_urls.get(&name).cloned().ok_or_else(|| {
                Error::new(ErrorKind::InvalidOperation, format!("unknown asset bundle '{}'", name))
            })
        });

        Ok(Templates { env: Arc::new(env) })
    }

    /// Renders a template for the current request.
    ///
    /// # Arguments
    ///
    /// * `name` - Template path relative to `TEMPLATE_FOLDER`, e.g. `"user/list.html"`.
    /// * `req` - The request being answered; supplies `g` and `request`.
    /// * `ctx` - The handler's variables, a serializable map merged at top level.
    ///
    /// # Returns
    ///
    /// * `Result<String, AppError>` - The rendered page, or `TemplateError` if the
    ///   template is missing or fails to render.
    pub fn render<C: Serialize>(&self, name: &str, req: &HttpRequest, ctx: &C) -> Result<String, AppError> {
        let g = match RequestContext::of(req) {
            Some(rc) => GlobalsView {
                pjax: rc.pjax(),
                request_time: rc.request_time(),
            },
            None => GlobalsView {
                pjax: false,
                request_time: String::new(),
            },
        };
        let frame = Frame {
            g,
            request: RequestView {
                path: req.path(),
                query_string: req.query_string(),
            },
            ctx,
        };
        let template = self.env.get_template(name)?;
        Ok(template.render(&frame)?)
    }

    /// `render` wrapped in a 200 HTML response.
    pub fn render_response<C: Serialize>(
        &self,
        name: &str,
        req: &HttpRequest,
        ctx: &C,
    ) -> Result<HttpResponse, AppError> {
        let body = self.render(name, req, ctx)?;
        Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body))
    }

    /// Renders an inline template source, for one-off strings.
    pub fn render_str<C: Serialize>(&self, source: &str, req: &HttpRequest, ctx: &C) -> Result<String, AppError> {
        let frame = Frame {
            g: GlobalsView {
                pjax: RequestContext::of(req).is_some_and(|rc| rc.pjax()),
                request_time: String::new(),
            },
            request: RequestView {
                path: req.path(),
                query_string: req.query_string(),
            },
            ctx,
        };
        Ok(self.env.render_str(source, &frame)?)
    }
}

fn url_for_other_page(state: &State, page: i64) -> Result<String, Error> {
    let request = state.lookup("request").ok_or_else(|| {
        Error::new(ErrorKind::UndefinedError, "url_for_other_page needs the current request")
    })?;
    let path = request.get_attr("path")?;
    let query = request.get_attr("query_string")?;
    Ok(utils::url_for_other_page(
        path.as_str().unwrap_or("/"),
        query.as_str().unwrap_or(""),
        page,
    ))
}

/// Accepts an RFC 3339 string (how `DateTime<Utc>` serializes) or unix seconds.
fn timeago(value: Value) -> Result<String, Error> {
    let then = if let Some(text) = value.as_str() {
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("timeago: {}", e)))?
    } else if let Ok(seconds) = i64::try_from(value.clone()) {
        DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or_else(|| Error::new(ErrorKind::InvalidOperation, "timeago: timestamp out of range"))?
    } else {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            "timeago expects a datetime string or unix seconds",
        ));
    };
    Ok(utils::timeago_now(then))
}

/// Template rendered for an error status, e.g. `errors/404.html`.
pub fn error_template(status: StatusCode) -> String {
    format!("errors/{}.html", status.as_u16())
}

/// Error handler: replaces the body with the status's error page, keeping the status.
///
/// Leaves the response untouched when the page cannot be rendered.
pub fn render_error<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let rendered = res
        .request()
        .app_data::<web::Data<AppState>>()
        .map(|state| state.templates.render(&error_template(status), res.request(), &json!({})));

    match rendered {
        Some(Ok(body)) => {
            let (req, res) = res.into_parts();
            let mut res = res.set_body(body);
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            let res = ServiceResponse::new(req, res)
                .map_into_boxed_body()
                .map_into_right_body();
            Ok(ErrorHandlerResponse::Response(res))
        }
        Some(Err(e)) => {
            log::error!("error page for {} failed to render: {}", status, e);
            Ok(ErrorHandlerResponse::Response(res.map_into_left_body()))
        }
        None => Ok(ErrorHandlerResponse::Response(res.map_into_left_body())),
    }
}
