//! Asset bundler.
//!
//! `ASSETS_BUNDLES` maps an output name to the source files it concatenates:
//!
//! ```json
//! { "app.js": ["static/js/vendor.js", "static/js/app.js"] }
//! ```
//!
//! Bundles are built once at startup and served from `ASSETS_URL`.

use actix_web::{web, HttpResponse};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use crate::app::AppState;
use crate::config::Settings;
use crate::error::{AppError, InitError};

#[derive(Debug, Clone)]
pub struct Bundle {
    pub content: String,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct Assets {
    url: String,
    bundles: Arc<BTreeMap<String, Bundle>>,
}

impl Assets {
    /// Builds every bundle in `ASSETS_BUNDLES`, served under `ASSETS_URL`.
    ///
    /// # Returns
    ///
    /// * `Result<Self, InitError>` - Fails on an unreadable source file or when
    ///   `ASSETS_URL` does not name a path below the root.
    pub fn init_app(settings: &Settings) -> Result<Self, InitError> {
        let configured = settings.get_str("ASSETS_URL").unwrap_or("/static/gen");
        let url = configured.trim_end_matches('/').to_string();
        if !url.starts_with('/') {
            return Err(InitError::extension(
                "assets",
                format!("ASSETS_URL must be a non-root path starting with '/', got '{}'", configured),
            ));
        }

        let mut bundles = BTreeMap::new();
        match settings.get("ASSETS_BUNDLES") {
            None => {}
            Some(Value::Object(declared)) => {
                for (name, sources) in declared {
                    bundles.insert(name.clone(), build_bundle(name, sources)?);
                }
            }
            Some(_) => {
                return Err(InitError::extension("assets", "ASSETS_BUNDLES must be an object"));
            }
        }
        log::debug!("assets: built {} bundle(s)", bundles.len());

        Ok(Assets {
            url,
            bundles: Arc::new(bundles),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    pub fn url_for(&self, name: &str) -> Option<String> {
        self.bundles
            .contains_key(name)
            .then(|| format!("{}/{}", self.url, name))
    }

    /// Public URL of every bundle, keyed by bundle name.
    pub fn urls(&self) -> BTreeMap<String, String> {
        self.bundles
            .keys()
            .map(|name| (name.clone(), format!("{}/{}", self.url, name)))
            .collect()
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.route(&format!("{}/{{name}}", self.url), web::get().to(serve_bundle));
    }
}

fn build_bundle(name: &str, sources: &Value) -> Result<Bundle, InitError> {
    let sources = sources
        .as_array()
        .ok_or_else(|| InitError::extension("assets", format!("bundle '{}' must list its source files", name)))?;

    let mut parts = Vec::with_capacity(sources.len());
    for source in sources {
        let path = source
            .as_str()
            .ok_or_else(|| InitError::extension("assets", format!("bundle '{}' has a non-string source", name)))?;
        let content = fs::read_to_string(path)
            .map_err(|e| InitError::extension("assets", format!("{}: {}", path, e)))?;
        parts.push(content);
    }

    Ok(Bundle {
        content: parts.join("\n"),
        content_type: content_type_for(name),
    })
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        _ => "text/plain; charset=utf-8",
    }
}

async fn serve_bundle(
    state: web::Data<AppState>,
    name: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let bundle = state
        .extensions
        .assets
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("No asset bundle named '{}'", name)))?;
    Ok(HttpResponse::Ok()
        .content_type(bundle.content_type)
        .body(bundle.content.clone()))
}
