//! Per-request state stamped by the pre-request hook.

pub mod context;
pub mod hook;

pub use context::RequestContext;
pub use hook::{RequestHook, PJAX_HEADER};
