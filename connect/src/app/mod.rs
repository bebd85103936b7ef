//! Application wiring: options, state and command execution

pub mod options;
pub mod run;
pub mod state;
