//! Onboarding flow

pub mod firmware;
pub mod machine;
pub mod session;
pub mod step;

pub use firmware::{FirmwareProgressOptions, FirmwareUpdateInfo};
pub use machine::{OnboardingMachine, OnboardingOptions};
pub use session::OnboardingSession;
pub use step::OnboardingStep;
