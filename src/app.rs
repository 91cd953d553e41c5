//! Application composition.
//!
//! `compose` turns a `Settings` object into a fully wired `Application`. The
//! result holds explicit registration tables (handler groups, routes, error
//! handlers) plus the shared `AppState`; `Application::service` replays them
//! into an `actix_web::App` once per server worker.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers, Logger};
use actix_web::{web, App, HttpRequest, HttpResponse};
use serde_json::json;

use crate::blueprints::{auth::AuthGroup, user::UserGroup, Mount};
use crate::config::Settings;
use crate::error::{AppError, InitError};
use crate::extensions::Extensions;
use crate::request::RequestHook;
use crate::templates::{self, Templates};

/// Status codes answered with a rendered error page.
pub const ERROR_PAGES: [StatusCode; 3] = [
    StatusCode::UNAUTHORIZED,
    StatusCode::NOT_FOUND,
    StatusCode::INTERNAL_SERVER_ERROR,
];

/// Registers routes on the application root.
pub type RouteRegistration = fn(&mut web::ServiceConfig);

/// Rewrites an error response before it is sent.
pub type ErrorRenderer = fn(ServiceResponse<BoxBody>) -> actix_web::Result<ErrorHandlerResponse<BoxBody>>;

/// Everything handlers share, written once during composition.
pub struct AppState {
    pub settings: Settings,
    pub extensions: Extensions,
    pub templates: Templates,
}

#[derive(Clone)]
pub struct Application {
    state: web::Data<AppState>,
    blueprints: Vec<Mount>,
    error_handlers: Vec<(StatusCode, ErrorRenderer)>,
    routes: Vec<(&'static str, RouteRegistration)>,
}

/// Builds the application from `config`.
///
/// Must be called inside the actix/Tokio runtime. Any extension failure aborts
/// composition; there is no partially built application.
pub fn compose(config: Settings) -> Result<Application, InitError> {
    let mut settings = Settings::empty();
    for (key, value) in config.iter() {
        settings.set(key, value.clone());
    }
    // DEBUG is always forced on, whatever the configuration said. This carries
    // over deliberately and is reported instead of silently corrected.
    if !settings.debug() {
        log::warn!(
            "DEBUG forced on; configured value {} ignored",
            settings.get("DEBUG").map(|v| v.to_string()).unwrap_or_else(|| "<unset>".into())
        );
    }
    settings.set("DEBUG", json!(true));

    let extensions = Extensions::init_app(&mut settings)?;
    let blueprints = register_blueprints();
    let error_handlers = register_errorhandlers();
    let templates = Templates::new(&settings, extensions.assets.urls())?;
    log::debug!("template globals: {:?}", templates::GLOBALS);
    let routes: Vec<(&'static str, RouteRegistration)> = vec![("/", register_index)];

    log::info!(
        "application composed: groups {:?}, error pages {:?}",
        blueprints.iter().map(|m| (m.group.name(), m.prefix)).collect::<Vec<_>>(),
        error_handlers.iter().map(|(code, _)| code.as_u16()).collect::<Vec<_>>()
    );

    Ok(Application {
        state: web::Data::new(AppState {
            settings,
            extensions,
            templates,
        }),
        blueprints,
        error_handlers,
        routes,
    })
}

/// `compose` with the base profile.
pub fn compose_default() -> Result<Application, InitError> {
    compose(Settings::base())
}

fn register_blueprints() -> Vec<Mount> {
    vec![Mount::new("/user", UserGroup), Mount::new("", AuthGroup)]
}

fn register_errorhandlers() -> Vec<(StatusCode, ErrorRenderer)> {
    ERROR_PAGES
        .iter()
        .map(|&code| (code, templates::render_error::<BoxBody> as ErrorRenderer))
        .collect()
}

fn register_index(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
}

async fn index(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    state.templates.render_response("index.html", &req, &json!({}))
}

impl Application {
    pub fn state(&self) -> &web::Data<AppState> {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn extensions(&self) -> &Extensions {
        &self.state.extensions
    }

    pub fn templates(&self) -> &Templates {
        &self.state.templates
    }

    /// `(group name, prefix)` for every mounted handler group, in mount order.
    pub fn mounted_groups(&self) -> Vec<(&'static str, &'static str)> {
        self.blueprints
            .iter()
            .map(|m| (m.group.name(), m.prefix))
            .collect()
    }

    pub fn error_codes(&self) -> Vec<StatusCode> {
        self.error_handlers.iter().map(|(code, _)| *code).collect()
    }

    pub fn route_paths(&self) -> Vec<&'static str> {
        self.routes.iter().map(|(path, _)| *path).collect()
    }

    /// The `actix_web::App` for one server worker (or one test).
    pub fn service(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let errors = self
            .error_handlers
            .iter()
            .fold(ErrorHandlers::new(), |errors, &(code, handler)| errors.handler(code, handler));

        let state = self.state.clone();
        let blueprints = self.blueprints.clone();
        let routes = self.routes.clone();

        App::new()
            .app_data(self.state.clone())
            .configure(move |cfg| {
                state.extensions.api.configure(cfg);
                state.extensions.assets.configure(cfg);
                for mount in &blueprints {
                    mount.configure(cfg);
                }
                for (_, register) in &routes {
                    register(cfg);
                }
            })
            .wrap(errors)
            .wrap(RequestHook)
            .wrap(Logger::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_registration_tables() {
        let app = compose(Settings::testing()).unwrap();

        assert_eq!(app.mounted_groups(), vec![("user", "/user"), ("auth", "")]);
        assert_eq!(app.error_codes(), ERROR_PAGES.to_vec());
        assert_eq!(app.route_paths(), vec!["/"]);
    }

    #[actix_rt::test]
    async fn test_debug_forced_on() {
        let app = compose(Settings::testing().with("DEBUG", json!(false))).unwrap();
        assert!(app.settings().debug());

        let app = compose(Settings::testing().with("DEBUG", serde_json::Value::Null)).unwrap();
        assert!(app.settings().debug());
    }

    #[actix_rt::test]
    async fn test_extension_failure_aborts() {
        let result = compose(Settings::testing().with("BCRYPT_LOG_ROUNDS", json!(99)));
        assert!(matches!(result, Err(InitError::Extension { name: "bcrypt", .. })));
    }
}
