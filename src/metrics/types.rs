use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::header::{Trigger, VisualState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    pub timestamp: DateTime<Utc>,
    pub trigger: String,
    pub from: Option<VisualState>,
    pub to: VisualState,
}

/// Checks run per trigger channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCounts {
    pub initial: u64,
    pub direct_event: u64,
    pub trailing_recheck: u64,
    pub poll: u64,
    pub mutation_recheck: u64,
}

impl TriggerCounts {
    pub fn bump(&mut self, trigger: Trigger) {
        let slot = match trigger {
            Trigger::Initial => &mut self.initial,
            Trigger::DirectEvent => &mut self.direct_event,
            Trigger::TrailingRecheck => &mut self.trailing_recheck,
            Trigger::Poll => &mut self.poll,
            Trigger::MutationRecheck => &mut self.mutation_recheck,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u64 {
        self.initial + self.direct_event + self.trailing_recheck + self.poll + self.mutation_recheck
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub checks: TriggerCounts,
    pub corrections: u64,
    pub unchanged: u64,
    pub last_state: Option<VisualState>,
    pub recent_corrections: Vec<CorrectionRecord>,
}
