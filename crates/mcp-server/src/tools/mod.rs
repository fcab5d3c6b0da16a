//! Dirscope MCP tool surface.
//!
//! `schemas` holds the typed tool arguments and results; `dispatch` owns the service and the
//! per-tool handlers.

mod dispatch;
mod schemas;

pub use dispatch::DirscopeService;
