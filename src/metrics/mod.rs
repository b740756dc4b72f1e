mod types;

pub use types::{CorrectionRecord, MetricsSnapshot, TriggerCounts};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::header::{ReconcileOutcome, Trigger, VisualState};

const MAX_RECENT_CORRECTIONS: usize = 20;

/// Counters for one header loop. Cloning shares the same counters.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

#[derive(Default)]
struct MetricsState {
    checks: TriggerCounts,
    corrections: u64,
    unchanged: u64,
    last_state: Option<VisualState>,
    recent_corrections: Vec<CorrectionRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::default())),
        }
    }

    pub async fn record(&self, trigger: Trigger, outcome: ReconcileOutcome) {
        let mut state = self.inner.lock().await;
        state.checks.bump(trigger);

        match outcome {
            ReconcileOutcome::Unchanged { state: current } => {
                state.unchanged += 1;
                state.last_state = Some(current);
            }
            ReconcileOutcome::Corrected { from, to } => {
                state.corrections += 1;
                state.last_state = Some(to);
                state.recent_corrections.push(CorrectionRecord {
                    timestamp: Utc::now(),
                    trigger: trigger.as_str().to_string(),
                    from,
                    to,
                });
                if state.recent_corrections.len() > MAX_RECENT_CORRECTIONS {
                    state.recent_corrections.remove(0);
                }
            }
        }
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;
        MetricsSnapshot {
            checks: state.checks.clone(),
            corrections: state.corrections,
            unchanged: state.unchanged,
            last_state: state.last_state,
            recent_corrections: state.recent_corrections.clone(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_by_channel_and_outcome() {
        let metrics = MetricsCollector::new();
        metrics
            .record(
                Trigger::Initial,
                ReconcileOutcome::Corrected {
                    from: None,
                    to: VisualState::Transparent,
                },
            )
            .await;
        metrics
            .record(
                Trigger::Poll,
                ReconcileOutcome::Unchanged {
                    state: VisualState::Transparent,
                },
            )
            .await;

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.checks.initial, 1);
        assert_eq!(snapshot.checks.poll, 1);
        assert_eq!(snapshot.checks.total(), 2);
        assert_eq!(snapshot.corrections, 1);
        assert_eq!(snapshot.unchanged, 1);
        assert_eq!(snapshot.last_state, Some(VisualState::Transparent));
        assert_eq!(snapshot.recent_corrections[0].trigger, "initial");
    }

    #[tokio::test]
    async fn keeps_a_bounded_history() {
        let metrics = MetricsCollector::new();
        for _ in 0..(MAX_RECENT_CORRECTIONS + 5) {
            metrics
                .record(
                    Trigger::MutationRecheck,
                    ReconcileOutcome::Corrected {
                        from: Some(VisualState::Transparent),
                        to: VisualState::Solid,
                    },
                )
                .await;
        }
        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.recent_corrections.len(), MAX_RECENT_CORRECTIONS);
        assert_eq!(snapshot.corrections, (MAX_RECENT_CORRECTIONS + 5) as u64);
    }
}
