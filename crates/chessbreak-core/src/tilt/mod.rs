//! Session accounting and lockouts.

mod counters;
mod lockout;
mod machine;
mod trigger;

pub use counters::SessionCounters;
pub use lockout::{lockout_duration, LockoutActuator, LockoutToken, TiltLockoutState};
pub use machine::TiltMachine;
pub use trigger::{evaluate, TriggerReason};
