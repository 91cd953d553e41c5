//! Handler groups: named route collections mounted under a URL prefix.

pub mod auth;
pub mod user;

use actix_web::web;
use std::sync::Arc;

pub trait HandlerGroup: Send + Sync {
    fn name(&self) -> &'static str;

    /// Registers the group's routes relative to its mount point.
    fn configure(&self, cfg: &mut web::ServiceConfig);
}

/// An entry of the application's registration table.
#[derive(Clone)]
pub struct Mount {
    pub prefix: &'static str,
    pub group: Arc<dyn HandlerGroup>,
}

impl Mount {
    pub fn new(prefix: &'static str, group: impl HandlerGroup + 'static) -> Self {
        Mount {
            prefix,
            group: Arc::new(group),
        }
    }

    /// Root mounts register their routes directly: an empty scope would match
    /// every path and hide routes registered after it.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        if self.prefix.is_empty() || self.prefix == "/" {
            self.group.configure(cfg);
        } else {
            let group = self.group.clone();
            cfg.service(web::scope(self.prefix).configure(move |scope| group.configure(scope)));
        }
    }
}
