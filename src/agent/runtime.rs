//! Process-scoped mutable state for one agent run (§9 "Global mutable state")
//!
//! The abort flag, active-tab id, and snapshot-loop counter are fields of one
//! value with an explicit lifecycle rather than free statics, so a run can be
//! constructed, driven, and torn down independently in tests. The
//! cancellation flag is split out into its own cloneable wrapper so it can
//! be shared (via `Arc`) with whatever dispatches `AGENT_STOP` while the
//! rest of the state stays loop-local.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::browser::TabId;

/// A cloneable handle onto one process-scoped cancellation flag. Research
/// sub-tasks each get their own `AgentRuntime` (own `active_tab`, own
/// `snapshot_streak`, per §5) but share one `CancellationFlag` so `AGENT_STOP`
/// reaches every in-flight sub-task loop.
#[derive(Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct AgentRuntime {
    abort: CancellationFlag,
    active_tab: Mutex<Option<TabId>>,
    snapshot_streak: AtomicUsize,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self {
            abort: CancellationFlag::new(),
            active_tab: Mutex::new(None),
            snapshot_streak: AtomicUsize::new(0),
        }
    }
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a runtime sharing `abort`'s underlying flag with other
    /// runtimes, but with its own `active_tab`/`snapshot_streak`.
    pub fn with_shared_abort(abort: CancellationFlag) -> Self {
        Self { abort, active_tab: Mutex::new(None), snapshot_streak: AtomicUsize::new(0) }
    }

    pub fn abort_flag(&self) -> CancellationFlag {
        self.abort.clone()
    }

    /// Sets the cooperative-cancellation flag. Idempotent.
    pub fn abort(&self) {
        self.abort.set();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_set()
    }

    pub async fn set_active_tab(&self, tab_id: TabId) {
        *self.active_tab.lock().await = Some(tab_id);
    }

    pub async fn active_tab(&self) -> Option<TabId> {
        *self.active_tab.lock().await
    }

    /// Increments the consecutive-`take_snapshot` counter, returning the new value
    pub fn bump_snapshot_streak(&self) -> usize {
        self.snapshot_streak.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Any non-snapshot tool call resets the streak
    pub fn reset_snapshot_streak(&self) {
        self.snapshot_streak.store(0, Ordering::SeqCst);
    }

    pub fn snapshot_streak(&self) -> usize {
        self.snapshot_streak.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_is_idempotent() {
        let runtime = AgentRuntime::new();
        assert!(!runtime.is_aborted());
        runtime.abort();
        runtime.abort();
        assert!(runtime.is_aborted());
    }

    #[tokio::test]
    async fn active_tab_starts_unset() {
        let runtime = AgentRuntime::new();
        assert_eq!(runtime.active_tab().await, None);
        runtime.set_active_tab(7).await;
        assert_eq!(runtime.active_tab().await, Some(7));
    }

    #[test]
    fn snapshot_streak_resets() {
        let runtime = AgentRuntime::new();
        assert_eq!(runtime.bump_snapshot_streak(), 1);
        assert_eq!(runtime.bump_snapshot_streak(), 2);
        runtime.reset_snapshot_streak();
        assert_eq!(runtime.snapshot_streak(), 0);
    }
}
