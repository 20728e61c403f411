//! Shared-secret access checks.
//!
//! Comparisons are exact and case-sensitive. There are no attempt
//! counters and no lockout.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("Hmm, passphrase not correct. Try again.")]
    WrongPassphrase,
    #[error("Not the right secret.")]
    WrongSecret,
    #[error("Session is locked")]
    Locked,
}

pub fn check_passphrase(secret: &str, attempt: &str) -> bool {
    secret == attempt
}

/// The main entry gate
#[derive(Debug, Clone)]
pub struct AccessGate {
    secret: String,
}

impl AccessGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn check(&self, attempt: &str) -> bool {
        check_passphrase(&self.secret, attempt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

/// One interactive session.
///
/// Starts `Locked` and lives until the value is dropped. Once unlocked it
/// stays unlocked; there is no logout.
#[derive(Debug, Clone)]
pub struct Session {
    state: GateState,
    opened_at: DateTime<Utc>,
    unlocked_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: GateState::Locked,
            opened_at: Utc::now(),
            unlocked_at: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn unlocked_at(&self) -> Option<DateTime<Utc>> {
        self.unlocked_at
    }

    /// Try `attempt` against the gate. A failed attempt on an already
    /// unlocked session reports the mismatch but keeps the session open.
    pub fn unlock(&mut self, gate: &AccessGate, attempt: &str) -> Result<(), GateError> {
        if !gate.check(attempt) {
            debug!(state = ?self.state, "passphrase rejected");
            return Err(GateError::WrongPassphrase);
        }
        if self.state == GateState::Locked {
            self.state = GateState::Unlocked;
            self.unlocked_at = Some(Utc::now());
            info!("session unlocked");
        }
        Ok(())
    }

    pub fn require_unlocked(&self) -> Result<(), GateError> {
        if self.is_unlocked() {
            Ok(())
        } else {
            Err(GateError::Locked)
        }
    }
}

/// A second, independent secret guarding one hidden message
#[derive(Debug, Clone)]
pub struct RevealGate {
    secret: String,
    message: String,
}

impl RevealGate {
    pub fn new(secret: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            message: message.into(),
        }
    }

    pub fn reveal(&self, attempt: &str) -> Result<&str, GateError> {
        if check_passphrase(&self.secret, attempt) {
            Ok(&self.message)
        } else {
            Err(GateError::WrongSecret)
        }
    }
}
