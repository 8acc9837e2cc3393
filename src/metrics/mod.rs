mod types;

pub use types::{CycleMetrics, CycleResult, MetricsSnapshot};

use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RECENT_CYCLES: usize = 20;

/// Rolling record of scan cycles: counters plus a bounded ring of the most
/// recent timings, shared between the loop worker and whoever asks for a
/// snapshot.
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

#[derive(Default)]
struct MetricsState {
    recent_cycles: Vec<CycleMetrics>,
    cycle_count: u64,
    announced_count: u64,
    no_detection_count: u64,
    failure_count: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::default())),
        }
    }

    pub async fn record_cycle(&self, metrics: CycleMetrics) {
        let mut state = self.inner.lock().await;

        state.cycle_count += 1;
        match metrics.result {
            CycleResult::Announced => state.announced_count += 1,
            CycleResult::NoDetection => state.no_detection_count += 1,
            CycleResult::Failed => state.failure_count += 1,
            CycleResult::Deduplicated => {}
        }

        state.recent_cycles.push(metrics);
        if state.recent_cycles.len() > MAX_RECENT_CYCLES {
            state.recent_cycles.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;
        MetricsSnapshot {
            recent_cycles: state.recent_cycles.clone(),
            cycle_count: state.cycle_count,
            announced_count: state.announced_count,
            no_detection_count: state.no_detection_count,
            failure_count: state.failure_count,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = MetricsState::default();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
