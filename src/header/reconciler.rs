use std::sync::Arc;

use serde::Serialize;

use crate::config::HeaderConfig;
use crate::page::{ElementId, Page};

use super::actuator::{apply, observe};
use super::decision::Inputs;
use super::state::{LoopState, ObservedRecord, VisualState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Why a check is running. Channels only ever produce one of these; the
/// correction itself always happens in [`Reconciler::reconcile`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// First check right after the header was found.
    Initial,
    /// Scroll, wheel or touch-move, handled on receipt.
    DirectEvent,
    /// Re-check after input has gone quiet, for momentum scrolling.
    TrailingRecheck,
    Poll,
    /// Re-check after the header's `style` or `class` changed.
    MutationRecheck,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::DirectEvent => "direct-event",
            Trigger::TrailingRecheck => "trailing-recheck",
            Trigger::Poll => "poll",
            Trigger::MutationRecheck => "mutation-recheck",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum ReconcileOutcome {
    /// The page already showed the desired state; nothing was written.
    Unchanged { state: VisualState },
    /// The page drifted (or was never styled) and the actuator ran.
    Corrected {
        from: Option<VisualState>,
        to: VisualState,
    },
}

impl ReconcileOutcome {
    pub fn is_correction(&self) -> bool {
        matches!(self, ReconcileOutcome::Corrected { .. })
    }
}

/// Owns the header handle for the rest of the page load and converges it
/// towards [`decide`](super::decide) on every trigger.
pub struct Reconciler {
    page: Arc<dyn Page>,
    header: ElementId,
    config: Arc<HeaderConfig>,
    state: LoopState,
    record: ObservedRecord,
}

impl Reconciler {
    pub fn new(page: Arc<dyn Page>, header: ElementId, config: Arc<HeaderConfig>) -> Self {
        Self {
            page,
            header,
            config,
            state: LoopState::Uninitialized,
            record: ObservedRecord::new(),
        }
    }

    pub fn header(&self) -> ElementId {
        self.header
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn record(&self) -> &ObservedRecord {
        &self.record
    }

    /// Recompute desired, read observed, correct only on mismatch.
    ///
    /// Writing only on mismatch is what lets the mutation channel observe
    /// the actuator's own writes: the follow-up check finds the page already
    /// converged and stops there.
    pub fn reconcile(&mut self, trigger: Trigger) -> ReconcileOutcome {
        let page = self.page.as_ref();
        let inputs = Inputs::read(page, &self.config);
        let desired = inputs.desired(&self.config);
        let bucket = inputs.bucket(&self.config);

        if self.record.inputs_changed(bucket, inputs.eligible) {
            log_debug!(
                "inputs changed via {}: scroll={} eligible={} -> {}",
                trigger.as_str(),
                inputs.scroll_offset,
                inputs.eligible,
                desired.as_str()
            );
        }
        self.record.note_inputs(bucket, inputs.eligible);

        let observed = observe(page, self.header, &self.config);
        if observed.satisfies(desired) {
            self.state = LoopState::Converged(desired);
            self.record.note_applied(desired);
            return ReconcileOutcome::Unchanged { state: desired };
        }

        let from = observed.state();
        self.state = LoopState::Correcting;
        apply(page, self.header, desired, &self.config);
        self.record.note_applied(desired);
        self.state = LoopState::Converged(desired);

        match from {
            Some(previous) if previous != desired => log_info!(
                "header {} -> {} ({})",
                previous.as_str(),
                desired.as_str(),
                trigger.as_str()
            ),
            _ => log_info!(
                "header drifted, re-asserted {} ({})",
                desired.as_str(),
                trigger.as_str()
            ),
        }

        ReconcileOutcome::Corrected { from, to: desired }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{MemoryPage, Priority};

    fn fixture(path: &str) -> (Arc<MemoryPage>, Reconciler) {
        let page = Arc::new(MemoryPage::storefront("www.mahsunkids.com.br", path));
        let header = page.query_selector("#header-react-app").unwrap();
        let reconciler = Reconciler::new(page.clone(), header, Arc::new(HeaderConfig::default()));
        (page, reconciler)
    }

    #[test]
    fn first_check_styles_the_header() {
        let (_page, mut reconciler) = fixture("/mah-sun-kids");
        assert_eq!(reconciler.state(), LoopState::Uninitialized);

        let outcome = reconciler.reconcile(Trigger::Initial);
        assert_eq!(
            outcome,
            ReconcileOutcome::Corrected {
                from: Some(VisualState::Transparent),
                to: VisualState::Transparent
            },
            "unstyled header reads transparent but is not pinned yet"
        );
        assert_eq!(reconciler.state(), LoopState::Converged(VisualState::Transparent));
        assert_eq!(reconciler.record().applied, Some(VisualState::Transparent));
    }

    #[test]
    fn converged_checks_write_nothing() {
        let (page, mut reconciler) = fixture("/mah-sun-kids");
        reconciler.reconcile(Trigger::Initial);
        page.reset_counters();

        for trigger in [Trigger::Poll, Trigger::MutationRecheck, Trigger::DirectEvent] {
            assert!(!reconciler.reconcile(trigger).is_correction());
        }
        assert_eq!(page.mutation_count(), 0);
        assert_eq!(page.layout_flush_count(), 0);
    }

    #[test]
    fn scrolling_past_threshold_turns_solid() {
        let (page, mut reconciler) = fixture("/mah-sun-kids");
        reconciler.reconcile(Trigger::Initial);

        page.set_scroll_silently(51);
        assert_eq!(
            reconciler.reconcile(Trigger::DirectEvent),
            ReconcileOutcome::Corrected {
                from: Some(VisualState::Transparent),
                to: VisualState::Solid
            }
        );
        assert!(page.has_class(reconciler.header(), "header-scrolled"));
    }

    #[test]
    fn external_overwrite_is_reverted() {
        let (page, mut reconciler) = fixture("/produtos");
        reconciler.reconcile(Trigger::Initial);
        let header = reconciler.header();

        page.set_style_property(header, "background-color", "transparent", Priority::Important);
        let outcome = reconciler.reconcile(Trigger::Poll);
        assert_eq!(
            outcome,
            ReconcileOutcome::Corrected {
                from: None,
                to: VisualState::Solid
            }
        );
        assert_eq!(
            page.computed_style(header, "background-color").as_deref(),
            Some("rgb(255, 255, 255)")
        );
    }

    #[test]
    fn cached_record_is_not_trusted() {
        let (page, mut reconciler) = fixture("/mah-sun-kids");
        reconciler.reconcile(Trigger::Initial);
        assert_eq!(reconciler.record().applied, Some(VisualState::Transparent));

        // The record still says transparent; the page says otherwise.
        page.add_class(reconciler.header(), "header-scrolled");
        assert!(reconciler.reconcile(Trigger::Poll).is_correction());
        assert!(!page.has_class(reconciler.header(), "header-scrolled"));
    }
}
