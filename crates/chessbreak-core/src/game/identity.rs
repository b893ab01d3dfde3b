use std::fmt;

use crate::error::{CoreError, Result};

/// The viewing user's handle, resolved once from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity(String);

impl PlayerIdentity {
    /// Resolve the identity attribute. A missing or blank handle is fatal.
    pub fn resolve(raw: Option<String>) -> Result<Self> {
        match raw {
            Some(handle) if !handle.trim().is_empty() => Ok(Self(handle)),
            _ => Err(CoreError::IdentityUnresolved),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the viewer is one of the two displayed players.
    ///
    /// Comparison is exact after trimming both sides; case matters.
    pub fn is_participant(&self, top: &str, bottom: &str) -> bool {
        let me = self.0.trim();
        top.trim() == me || bottom.trim() == me
    }
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
