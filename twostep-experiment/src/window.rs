//! Input windows and fixed-duration holds for one trial.
//!
//! A trial owns one [`InputWindows`]. At most one window (armed keys plus
//! its timeout) and at most one hold exist at any time. Arming cancels the
//! previous window first; cancelling twice is a no-op. Nothing fires once
//! [`InputWindows::cancel_all`] has run, so a finished trial cannot be
//! reached by a stale timer.

use serde::{Deserialize, Serialize};
use tracing::debug;
use twostep_core::{Side, Stage};
use twostep_timing::NANOS_PER_MILLI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputWindow {
    pub id: WindowId,
    pub stage: Stage,
    pub keys: [String; 2],
    pub opened_at_ns: u64,
    pub timeout_ms: Option<u64>,
}

impl InputWindow {
    pub fn deadline_ns(&self) -> Option<u64> {
        self.timeout_ms
            .map(|ms| self.opened_at_ns.saturating_add(ms.saturating_mul(NANOS_PER_MILLI)))
    }

    /// Side bound to `key`; key names compare case-insensitively.
    pub fn side_for(&self, key: &str) -> Option<Side> {
        self.keys
            .iter()
            .position(|armed| armed.eq_ignore_ascii_case(key))
            .and_then(Side::from_index)
    }
}

/// Non-interruptible pauses inside a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldKind {
    /// Rocket launch between the stages.
    Launch,
    Feedback,
    MissedWarning,
    /// Stimuli hidden before a practice choice.
    InterTrial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hold {
    pub kind: HoldKind,
    pub until_ns: u64,
}

/// A key press that landed inside the armed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub window: WindowId,
    pub side: Side,
    pub rt_ns: u64,
}

/// Timer expiry reported by [`InputWindows::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Window(WindowId),
    Hold(HoldKind),
}

#[derive(Debug, Default)]
pub struct InputWindows {
    next_id: u64,
    active: Option<InputWindow>,
    hold: Option<Hold>,
    armed: usize,
    cancelled: usize,
}

impl InputWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a window for `stage`, cancelling any window still armed.
    pub fn arm(
        &mut self,
        stage: Stage,
        keys: &[String; 2],
        timeout_ms: Option<u64>,
        now_ns: u64,
    ) -> WindowId {
        if let Some(previous) = self.active.as_ref().map(|w| w.id) {
            self.cancel(previous);
        }
        let id = WindowId(self.next_id);
        self.next_id += 1;
        self.armed += 1;
        debug!(?id, ?stage, ?timeout_ms, "input window armed");
        self.active = Some(InputWindow {
            id,
            stage,
            keys: keys.clone(),
            opened_at_ns: now_ns,
            timeout_ms,
        });
        id
    }

    /// Returns `true` only the first time a live window is cancelled.
    pub fn cancel(&mut self, id: WindowId) -> bool {
        match &self.active {
            Some(window) if window.id == id => {
                self.active = None;
                self.cancelled += 1;
                debug!(?id, "input window cancelled");
                true
            }
            _ => false,
        }
    }

    pub fn start_hold(&mut self, kind: HoldKind, duration_ms: u64, now_ns: u64) {
        self.hold = Some(Hold {
            kind,
            until_ns: now_ns.saturating_add(duration_ms.saturating_mul(NANOS_PER_MILLI)),
        });
    }

    pub fn cancel_hold(&mut self) {
        self.hold = None;
    }

    /// Tears down the armed window and any hold. Safe to call repeatedly.
    pub fn cancel_all(&mut self) {
        if let Some(id) = self.active.as_ref().map(|w| w.id) {
            self.cancel(id);
        }
        self.cancel_hold();
    }

    /// Matches a key against the armed window. Keys outside the window's
    /// key set, keys at or past the deadline, or with no window armed,
    /// return `None`.
    pub fn press(&self, key: &str, now_ns: u64) -> Option<KeyPress> {
        let window = self.active.as_ref()?;
        if window.deadline_ns().is_some_and(|deadline| now_ns >= deadline) {
            return None;
        }
        let side = window.side_for(key)?;
        Some(KeyPress {
            window: window.id,
            side,
            rt_ns: now_ns.saturating_sub(window.opened_at_ns),
        })
    }

    /// Reports the timer that has run out by `now_ns`, if any. Does not
    /// consume it; the owner cancels what it handles.
    pub fn poll(&self, now_ns: u64) -> Option<Expiry> {
        if let Some(hold) = &self.hold {
            if now_ns >= hold.until_ns {
                return Some(Expiry::Hold(hold.kind));
            }
        }
        let window = self.active.as_ref()?;
        match window.deadline_ns() {
            Some(deadline) if now_ns >= deadline => Some(Expiry::Window(window.id)),
            _ => None,
        }
    }

    pub fn active(&self) -> Option<&InputWindow> {
        self.active.as_ref()
    }

    /// True once the armed window's deadline has passed, even if nobody
    /// has polled yet.
    pub fn window_expired(&self, now_ns: u64) -> bool {
        self.active
            .as_ref()
            .and_then(InputWindow::deadline_ns)
            .is_some_and(|deadline| now_ns >= deadline)
    }

    pub fn is_live(&self, id: WindowId) -> bool {
        self.active.as_ref().is_some_and(|w| w.id == id)
    }

    pub fn hold(&self) -> Option<Hold> {
        self.hold
    }

    /// Earliest time something will expire.
    pub fn next_deadline_ns(&self) -> Option<u64> {
        let window = self.active.as_ref().and_then(InputWindow::deadline_ns);
        let hold = self.hold.map(|h| h.until_ns);
        match (window, hold) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn armed_count(&self) -> usize {
        self.armed
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.hold.is_none()
    }
}
