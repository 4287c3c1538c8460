//! Bounded session history.

use crate::session::SessionState;
use tracing::debug;
use webpilot_core::ExecutionResult;

/// Append a result, evicting the oldest entries while the history exceeds
/// `cap`. Never fails. A cap of zero keeps no history.
pub async fn append(state: &SessionState, result: ExecutionResult, cap: usize) {
    let mut inner = state.lock().await;
    inner.history.push_back(result);
    while inner.history.len() > cap {
        inner.history.pop_front();
        debug!(cap, "Evicted oldest history entry");
    }
}

/// Last `min(n, len)` results in chronological order (oldest of the slice
/// first). `n == 0` returns an empty list.
pub async fn recent(state: &SessionState, n: usize) -> Vec<ExecutionResult> {
    let inner = state.lock().await;
    let len = inner.history.len();
    let take = n.min(len);
    inner.history.iter().skip(len - take).cloned().collect()
}
