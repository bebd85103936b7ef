//! Alamira display control API
//!
//! Request and response bodies shared by the Connect controller and the
//! device simulator. Field names are the wire format; both sides must agree.

pub mod models;
pub mod paths;

pub use models::*;
