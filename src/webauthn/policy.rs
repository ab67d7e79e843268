//! # User-Verification Policy
//!
//! Process-wide switch controlling how strictly user verification
//! (PIN/biometric) is demanded during ceremonies. Three modes:
//!
//! - `touch_only`: no verification demanded ("discouraged" in options)
//! - `pin_required`: verification mandatory; responses without the UV flag
//!   fail verification
//! - `preferred`: verification requested opportunistically; a response
//!   without the flag is still accepted
//!
//! The mode can be changed administratively unless it was locked at
//! startup. The lock is a one-way gate: once engaged, mode changes fail
//! with `Forbidden` for the remainder of the process lifetime.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// User-verification mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UvMode {
    TouchOnly,
    PinRequired,
    Preferred,
}

impl UvMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UvMode::TouchOnly => "touch_only",
            UvMode::PinRequired => "pin_required",
            UvMode::Preferred => "preferred",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "touch_only" => Some(UvMode::TouchOnly),
            "pin_required" => Some(UvMode::PinRequired),
            "preferred" => Some(UvMode::Preferred),
            _ => None,
        }
    }

    /// The userVerification requirement string sent in ceremony options
    pub fn requirement(&self) -> &'static str {
        match self {
            UvMode::TouchOnly => "discouraged",
            UvMode::PinRequired => "required",
            UvMode::Preferred => "preferred",
        }
    }

    /// Whether verification responses must carry the UV flag
    pub fn requires_verification(&self) -> bool {
        matches!(self, UvMode::PinRequired)
    }

    fn as_u8(self) -> u8 {
        match self {
            UvMode::TouchOnly => 0,
            UvMode::PinRequired => 1,
            UvMode::Preferred => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => UvMode::TouchOnly,
            1 => UvMode::PinRequired,
            _ => UvMode::Preferred,
        }
    }
}

/// Process-wide policy state
///
/// Reads are always consistent with the most recent successful write;
/// single-process atomic state, no staleness.
pub struct PolicyHandle {
    mode: AtomicU8,
    locked: AtomicBool,
}

impl PolicyHandle {
    pub fn new(mode: UvMode, locked: bool) -> Self {
        Self {
            mode: AtomicU8::new(mode.as_u8()),
            locked: AtomicBool::new(locked),
        }
    }

    /// Current mode
    pub fn mode(&self) -> UvMode {
        UvMode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    /// Change the mode; fails with `Forbidden` once the lock is engaged
    pub fn set_mode(&self, mode: UvMode) -> AppResult<()> {
        if self.locked.load(Ordering::SeqCst) {
            return Err(AppError::Forbidden(
                "user-verification mode is locked".to_string(),
            ));
        }
        self.mode.store(mode.as_u8(), Ordering::SeqCst);
        Ok(())
    }

    /// Engage the one-way lock
    pub fn lock(&self) {
        self.locked.store(true, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}
