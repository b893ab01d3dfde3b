use serde::{Deserialize, Serialize};

/// Signals sent to the notification dispatcher.
///
/// Wire shape: `{"type": "TILT_STARTED", "data": {"timeout": 300000}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// A lockout began. `timeout` is its full duration in milliseconds.
    TiltStarted { timeout: u64 },
    /// A lockout finished (timer elapsed or cancelled by a stats clear).
    TiltEnded { timeout: u64 },
}

/// Control messages pushed to the state machine from outside.
///
/// Wire shape: `{"type": "OPTIONS_UPDATED"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    OptionsUpdated,
    ClearStats,
}
