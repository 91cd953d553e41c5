//! Application settings.
//!
//! `Settings` is an opaque, ordered mapping from setting name to a JSON value.
//! The composer never interprets it beyond the debug flag; each extension reads
//! the keys it cares about through the typed accessors below.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::env;

use crate::error::InitError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, Value>,
}

impl Settings {
    /// Empty settings, no defaults at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default profile used when no configuration is supplied.
    pub fn base() -> Self {
        let mut settings = Self::empty();
        let defaults = [
            ("DEBUG", json!(false)),
            ("TESTING", json!(false)),
            ("SECRET_KEY", json!("change-me")),
            ("SERVER_HOST", json!("127.0.0.1")),
            ("SERVER_PORT", json!(8080)),
            ("TEMPLATE_FOLDER", json!("templates")),
            ("DATABASE_URL", json!("postgres://localhost/appfactory")),
            ("DATABASE_POOL_SIZE", json!(5)),
            ("API_PREFIX", json!("/api")),
            ("API_CORS_ORIGINS", json!([])),
            ("LOGIN_VIEW", json!("/login")),
            ("SESSION_COOKIE_NAME", json!("session")),
            ("TOKEN_TTL_HOURS", json!(24)),
            ("MAIL_SERVER", json!("localhost")),
            ("MAIL_PORT", json!(25)),
            ("MAIL_USERNAME", Value::Null),
            ("MAIL_PASSWORD", Value::Null),
            ("MAIL_DEFAULT_SENDER", json!("noreply@example.com")),
            ("MAIL_SUPPRESS_SEND", json!(false)),
            ("BCRYPT_LOG_ROUNDS", json!(12)),
            ("TASK_QUEUE_WORKERS", json!(4)),
            ("TASK_ALWAYS_EAGER", json!(false)),
            ("ASSETS_BUNDLES", json!({})),
            ("ASSETS_URL", json!("/static/gen")),
        ];
        for (key, value) in defaults {
            settings.set(key, value);
        }
        settings
    }

    /// Base profile tuned for the test suite.
    pub fn testing() -> Self {
        Self::base()
            .with("TESTING", json!(true))
            .with("SECRET_KEY", json!("testing-secret"))
            .with("DATABASE_URL", json!("postgres://localhost/appfactory_test"))
            .with("BCRYPT_LOG_ROUNDS", json!(4))
            .with("MAIL_SUPPRESS_SEND", json!(true))
            .with("TASK_ALWAYS_EAGER", json!(true))
    }

    /// Base profile overlaid with environment variables named like its keys.
    ///
    /// A variable is read according to its key's default: string (and unset)
    /// settings take the raw text as is, so `MAIL_PASSWORD=123456` stays a
    /// string. Other settings are parsed as JSON when possible (`8080`, `true`,
    /// `["a"]`) and kept as plain strings otherwise.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::base();
        let defaults = settings.values.clone();
        for (key, default) in defaults {
            if let Some(raw) = lookup(&key) {
                settings.set(&key, parse_env_value(&default, raw));
            }
        }
        settings
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Booleans, plus the usual string spellings coming from the environment.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            _ => false,
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, InitError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| InitError::Config(format!("{} must be a non-negative integer", key))),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| InitError::Config(format!("{} must be a number", key))),
            Some(_) => Err(InitError::Config(format!("{} must be a number", key))),
        }
    }

    pub fn debug(&self) -> bool {
        self.get_bool("DEBUG")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn bind_address(&self) -> Result<(String, u16), InitError> {
        let host = self.get_str("SERVER_HOST").unwrap_or("127.0.0.1").to_string();
        let port = self.get_u64("SERVER_PORT")?.unwrap_or(8080);
        let port = u16::try_from(port)
            .map_err(|_| InitError::Config("SERVER_PORT must fit in 16 bits".into()))?;
        Ok((host, port))
    }

    pub fn server_url(&self) -> Result<String, InitError> {
        let (host, port) = self.bind_address()?;
        Ok(format!("http://{}:{}", host, port))
    }
}

fn parse_env_value(default: &Value, raw: String) -> Value {
    match default {
        Value::String(_) | Value::Null => Value::String(raw),
        _ => match serde_json::from_str(&raw) {
            Ok(Value::Null) | Err(_) => Value::String(raw),
            Ok(value) => value,
        },
    }
}
