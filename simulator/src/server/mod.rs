//! Device control API over HTTP

pub mod handlers;
pub mod serve;

pub use serve::{router, serve, ServerOptions};
