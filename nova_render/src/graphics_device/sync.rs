/// CPU/GPU synchronization primitives
///
/// A device owns one `Timeline`: a monotonically increasing counter the
/// executor advances as submissions complete. Each submission is tagged with
/// the `CompletionMarker` the timeline must reach for it to be done.

use std::sync::{Condvar, Mutex, MutexGuard};
use crate::error::Result;

/// Timeline value a submission signals on completion
///
/// `CompletionMarker::NONE` (0) is signaled from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CompletionMarker(pub u64);

impl CompletionMarker {
    /// Marker that is always signaled
    pub const NONE: CompletionMarker = CompletionMarker(0);

    pub fn value(&self) -> u64 {
        self.0
    }
}

struct TimelineState {
    issued: u64,
    completed: u64,
    lost: Option<String>,
}

/// Device timeline (counter + condition variable)
///
/// Waits have no timeout. A timeline marked lost wakes every waiter with
/// `DeviceLost` instead.
pub struct Timeline {
    state: Mutex<TimelineState>,
    signaled: Condvar,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TimelineState { issued: 0, completed: 0, lost: None }),
            signaled: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, TimelineState>> {
        self.state
            .lock()
            .map_err(|_| crate::engine_err!(DeviceLost, "nova::Timeline", "timeline lock poisoned"))
    }

    /// Reserve the marker of the next submission
    pub fn next_marker(&self) -> Result<CompletionMarker> {
        let mut state = self.lock()?;
        if let Some(reason) = &state.lost {
            crate::engine_bail!(DeviceLost, "nova::Timeline", "cannot submit: {}", reason);
        }
        state.issued += 1;
        Ok(CompletionMarker(state.issued))
    }

    /// Advance the completed value to `marker` (never moves backwards)
    pub fn signal(&self, marker: CompletionMarker) {
        if let Ok(mut state) = self.state.lock() {
            if marker.0 > state.completed {
                state.completed = marker.0;
            }
            self.signaled.notify_all();
        }
    }

    /// Mark the device lost and wake every waiter
    pub fn mark_lost(&self, reason: &str) {
        if let Ok(mut state) = self.state.lock() {
            if state.lost.is_none() {
                state.lost = Some(reason.to_string());
            }
            self.signaled.notify_all();
        }
    }

    /// Whether the device was lost
    pub fn is_lost(&self) -> bool {
        self.state.lock().map(|state| state.lost.is_some()).unwrap_or(true)
    }

    /// Highest completed value
    pub fn completed(&self) -> CompletionMarker {
        self.state
            .lock()
            .map(|state| CompletionMarker(state.completed))
            .unwrap_or(CompletionMarker::NONE)
    }

    /// Marker of the most recent submission
    pub fn last_issued(&self) -> CompletionMarker {
        self.state
            .lock()
            .map(|state| CompletionMarker(state.issued))
            .unwrap_or(CompletionMarker::NONE)
    }

    /// Non-blocking completion check
    pub fn is_complete(&self, marker: CompletionMarker) -> Result<bool> {
        let state = self.lock()?;
        if state.completed >= marker.0 {
            return Ok(true);
        }
        if let Some(reason) = &state.lost {
            crate::engine_bail!(DeviceLost, "nova::Timeline", "marker {} never signaled: {}", marker.0, reason);
        }
        Ok(false)
    }

    /// Block until `marker` has signaled or the device is lost
    pub fn wait_for(&self, marker: CompletionMarker) -> Result<()> {
        let mut state = self.lock()?;
        while state.completed < marker.0 {
            if let Some(reason) = &state.lost {
                crate::engine_bail!(DeviceLost, "nova::Timeline", "marker {} never signaled: {}", marker.0, reason);
            }
            if marker.0 > state.issued {
                crate::engine_bail!(
                    LogicError,
                    "nova::Timeline",
                    "waiting on marker {} that was never submitted (last issued {})",
                    marker.0,
                    state.issued
                );
            }
            state = self
                .signaled
                .wait(state)
                .map_err(|_| crate::engine_err!(DeviceLost, "nova::Timeline", "timeline lock poisoned"))?;
        }
        Ok(())
    }

    /// Block until every issued marker has signaled
    pub fn wait_idle(&self) -> Result<()> {
        let last = self.last_issued();
        self.wait_for(last)
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
