#![doc = "The `appfactory` library crate."]
#![doc = ""]
#![doc = "Composes an actix-web application from a settings object: extensions,"]
#![doc = "handler groups, error pages, template globals and the pre-request hook."]
#![doc = "The binary (`main.rs`) composes once and serves the result."]

pub mod app;
pub mod blueprints;
pub mod config;
pub mod error;
pub mod extensions;
pub mod models;
pub mod request;
pub mod templates;
pub mod utils;

pub use app::{compose, compose_default, AppState, Application};
pub use config::Settings;
pub use error::{AppError, InitError};
