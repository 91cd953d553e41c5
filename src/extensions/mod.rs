//! Extensions attached to an application instance.
//!
//! Each extension is an explicit object built once per `app::compose` call and
//! owned by that application's state, so separate instances (one per test, for
//! example) never share anything.

pub mod api;
pub mod assets;
pub mod database;
pub mod heroku;
pub mod login;
pub mod mail;
pub mod password;
pub mod tasks;
pub mod travis;

pub use api::Api;
pub use assets::Assets;
pub use database::Database;
pub use heroku::Heroku;
pub use login::{CurrentUser, LoginManager};
pub use mail::Mail;
pub use password::Bcrypt;
pub use tasks::TaskQueue;
pub use travis::Travis;

use crate::config::Settings;
use crate::error::InitError;

pub struct Extensions {
    pub heroku: Heroku,
    pub travis: Travis,
    pub db: Database,
    pub api: Api,
    pub login: LoginManager,
    pub mail: Mail,
    pub bcrypt: Bcrypt,
    pub tasks: TaskQueue,
    pub assets: Assets,
}

impl Extensions {
    /// Initialises every extension against `settings`, in a fixed order.
    ///
    /// The platform and CI integrations come first because they may rewrite
    /// settings read by the others. The first failure aborts.
    pub fn init_app(settings: &mut Settings) -> Result<Self, InitError> {
        let heroku = step("heroku", Heroku::init_app(settings))?;
        let travis = step("travis", Travis::init_app(settings))?;
        let settings = &*settings;
        Ok(Extensions {
            heroku,
            travis,
            db: step("database", Database::init_app(settings))?,
            api: step("api", Api::init_app(settings))?,
            login: step("login_manager", LoginManager::init_app(settings))?,
            mail: step("mail", Mail::init_app(settings))?,
            bcrypt: step("bcrypt", Bcrypt::init_app(settings))?,
            tasks: step("task_queue", TaskQueue::config_from_settings(settings))?,
            assets: step("assets", Assets::init_app(settings))?,
        })
    }
}

fn step<T>(name: &str, result: Result<T, InitError>) -> Result<T, InitError> {
    match &result {
        Ok(_) => log::debug!("extension {} initialised", name),
        Err(e) => log::error!("extension {} failed: {}", name, e),
    }
    result
}
