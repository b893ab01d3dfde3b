//! Lockout bookkeeping and the disabled-marker actuator.

use tracing::debug;

use crate::page::{ControlHandle, Page};

/// Identifies one lockout so a timer armed for an earlier one can be told
/// apart from the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LockoutToken(u64);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TiltLockoutState {
    pub active: bool,
    /// Epoch milliseconds the current or last lockout began.
    pub started_at: Option<i64>,
    pub duration_ms: u64,
    /// Lockouts ever triggered; survives session resets.
    pub cumulative_tilt_count: u32,
    token: LockoutToken,
}

impl TiltLockoutState {
    pub fn new(cumulative_tilt_count: u32) -> Self {
        Self {
            cumulative_tilt_count,
            ..Self::default()
        }
    }

    pub fn token(&self) -> LockoutToken {
        self.token
    }

    /// Epoch milliseconds the lockout window closes.
    pub fn ends_at(&self) -> Option<i64> {
        let duration = i64::try_from(self.duration_ms).unwrap_or(i64::MAX);
        self.started_at.map(|s| s.saturating_add(duration))
    }

    /// Open a window without counting it as a new tilt.
    pub(crate) fn activate(&mut self, started_at: i64, duration_ms: u64) -> LockoutToken {
        self.active = true;
        self.started_at = Some(started_at);
        self.duration_ms = duration_ms;
        self.token = LockoutToken(self.token.0 + 1);
        self.token
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// Forget the window entirely.
    pub(crate) fn clear_window(&mut self) {
        self.active = false;
        self.started_at = None;
        self.duration_ms = 0;
    }
}

/// Lockout length for the next trigger.
///
/// With progressive timeouts the base grows geometrically with the number of
/// lockouts already taken: `base * multiplier^prior`.
pub fn lockout_duration(base_ms: u64, progressive_multiplier: Option<f64>, prior: u32) -> u64 {
    let Some(multiplier) = progressive_multiplier else {
        return base_ms;
    };
    let exponent = i32::try_from(prior).unwrap_or(i32::MAX);
    let scaled = base_ms as f64 * multiplier.powi(exponent);
    if !scaled.is_finite() || scaled < 0.0 {
        return base_ms;
    }
    scaled.round().min(u64::MAX as f64) as u64
}

/// Marks every "start new game" control as disabled and back.
///
/// The control set is looked up the first time it is needed and reused for
/// the lifetime of the actuator; an empty lookup is retried next time.
#[derive(Debug, Clone, Default)]
pub struct LockoutActuator {
    controls: Vec<ControlHandle>,
    applied: bool,
}

impl LockoutActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Disable the controls. Returns how many were reached.
    pub fn apply(&mut self, page: &mut dyn Page) -> usize {
        self.resolve(page);
        let reached = page.set_disabled(&self.controls, true);
        self.applied = reached > 0;
        debug!(reached, "Disabled new-game controls");
        reached
    }

    /// Retry applying while the control set is still unknown.
    pub fn ensure_applied(&mut self, page: &mut dyn Page) {
        if !self.applied {
            self.apply(page);
        }
    }

    /// Re-enable the controls.
    pub fn release(&mut self, page: &mut dyn Page) -> usize {
        let reached = page.set_disabled(&self.controls, false);
        self.applied = false;
        debug!(reached, "Re-enabled new-game controls");
        reached
    }

    fn resolve(&mut self, page: &dyn Page) {
        if self.controls.is_empty() {
            self.controls = page.new_game_controls();
        }
    }
}
