//! Platform-as-a-service integration.
//!
//! On a Heroku dyno the platform owns the database URL, the listening port and
//! any add-on credentials, so those values overwrite whatever the configuration
//! said. Off the platform this extension does nothing.

use serde_json::{json, Value};
use std::env;

use crate::config::Settings;
use crate::error::InitError;

const SENDGRID_SMTP_SERVER: &str = "smtp.sendgrid.net";
const SENDGRID_SMTP_PORT: u64 = 587;

#[derive(Debug, Clone, Default)]
pub struct Heroku {
    on_platform: bool,
    supplied: Vec<&'static str>,
}

impl Heroku {
    pub fn init_app(settings: &mut Settings) -> Result<Self, InitError> {
        Self::init_app_with(settings, |key| env::var(key).ok())
    }

    /// Same as `init_app`, reading platform variables through `lookup`.
    pub fn init_app_with<F>(settings: &mut Settings, lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut heroku = Heroku {
            on_platform: lookup("DYNO").is_some(),
            supplied: Vec::new(),
        };
        if !heroku.on_platform {
            return Ok(heroku);
        }

        if let Some(url) = lookup("DATABASE_URL") {
            heroku.supply(settings, "DATABASE_URL", json!(url));
        }
        if let Some(port) = lookup("PORT") {
            let port: u64 = port
                .parse()
                .map_err(|_| InitError::extension("heroku", format!("PORT '{}' is not a number", port)))?;
            heroku.supply(settings, "SERVER_PORT", json!(port));
            heroku.supply(settings, "SERVER_HOST", json!("0.0.0.0"));
        }
        if let (Some(user), Some(password)) = (lookup("SENDGRID_USERNAME"), lookup("SENDGRID_PASSWORD")) {
            heroku.supply(settings, "MAIL_SERVER", json!(SENDGRID_SMTP_SERVER));
            heroku.supply(settings, "MAIL_PORT", json!(SENDGRID_SMTP_PORT));
            heroku.supply(settings, "MAIL_USERNAME", json!(user));
            heroku.supply(settings, "MAIL_PASSWORD", json!(password));
        }

        log::info!("heroku: platform supplied {:?}", heroku.supplied);
        Ok(heroku)
    }

    fn supply(&mut self, settings: &mut Settings, key: &'static str, value: Value) {
        settings.set(key, value);
        self.supplied.push(key);
    }

    pub fn on_platform(&self) -> bool {
        self.on_platform
    }

    /// Setting keys overwritten by the platform.
    pub fn supplied(&self) -> &[&'static str] {
        &self.supplied
    }
}
