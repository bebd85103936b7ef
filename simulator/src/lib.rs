//! Alamira Display Simulator
//!
//! Device side of the onboarding protocol: the control API a display serves
//! while in access point mode, backed by in-memory state and a bounded
//! request console.

pub mod console;
pub mod errors;
pub mod network;
pub mod server;
pub mod state;
pub mod utils;
