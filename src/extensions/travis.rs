//! Continuous-integration integration.

use serde_json::json;
use std::env;

use crate::config::Settings;
use crate::error::InitError;

/// Build metadata captured when running on Travis CI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildInfo {
    pub number: Option<String>,
    pub commit: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Travis {
    build: Option<BuildInfo>,
}

impl Travis {
    pub fn init_app(settings: &mut Settings) -> Result<Self, InitError> {
        Self::init_app_with(settings, |key| env::var(key).ok())
    }

    pub fn init_app_with<F>(settings: &mut Settings, lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("TRAVIS").as_deref() != Some("true") {
            return Ok(Travis::default());
        }

        settings.set("TESTING", json!(true));
        let build = BuildInfo {
            number: lookup("TRAVIS_BUILD_NUMBER"),
            commit: lookup("TRAVIS_COMMIT"),
            branch: lookup("TRAVIS_BRANCH"),
        };
        log::info!(
            "travis: build {} on {}",
            build.number.as_deref().unwrap_or("?"),
            build.branch.as_deref().unwrap_or("?")
        );
        Ok(Travis { build: Some(build) })
    }

    pub fn is_ci(&self) -> bool {
        self.build.is_some()
    }

    pub fn build(&self) -> Option<&BuildInfo> {
        self.build.as_ref()
    }
}
