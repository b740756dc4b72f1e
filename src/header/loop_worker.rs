use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::TimingConfig;
use crate::metrics::MetricsCollector;
use crate::page::PageEvent;

use super::reconciler::{Reconciler, Trigger};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Drives `reconciler` from the three trigger channels until the page
/// unloads.
///
/// `events` carries both input events (scroll, wheel, touch-move) and
/// attribute mutations on the header. Every channel reduces to a [`Trigger`]
/// handed to the same convergence routine; nothing here writes to the page.
pub async fn reconcile_loop(
    mut reconciler: Reconciler,
    mut events: UnboundedReceiver<PageEvent>,
    timing: TimingConfig,
    metrics: MetricsCollector,
    unload: CancellationToken,
) {
    let poll_every = timing.poll_interval();
    let mut poll = time::interval_at(Instant::now() + poll_every, poll_every);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let trailing = time::sleep(Duration::ZERO);
    tokio::pin!(trailing);
    let mut trailing_armed = false;

    let mutation = time::sleep(Duration::ZERO);
    tokio::pin!(mutation);
    let mut mutation_armed = false;

    let mut events_open = true;

    loop {
        let trigger = tokio::select! {
            biased;

            _ = unload.cancelled() => {
                log_info!("page unloading, header loop stopped");
                break;
            }
            event = events.recv(), if events_open => match event {
                Some(event) if event.is_input() => {
                    // Every new input pushes the trailing check back.
                    trailing
                        .as_mut()
                        .reset(Instant::now() + timing.trailing_recheck());
                    trailing_armed = true;
                    Trigger::DirectEvent
                }
                Some(PageEvent::AttributeChanged { attribute, .. }) => {
                    if !mutation_armed {
                        log_debug!("header {attribute} changed, re-check scheduled");
                        mutation
                            .as_mut()
                            .reset(Instant::now() + timing.mutation_recheck());
                        mutation_armed = true;
                    }
                    continue;
                }
                Some(_) => continue,
                None => {
                    log_warn!("page stopped delivering header events; polling only");
                    events_open = false;
                    continue;
                }
            },
            _ = &mut trailing, if trailing_armed => {
                trailing_armed = false;
                Trigger::TrailingRecheck
            }
            _ = &mut mutation, if mutation_armed => {
                mutation_armed = false;
                Trigger::MutationRecheck
            }
            _ = poll.tick() => Trigger::Poll,
        };

        let outcome = reconciler.reconcile(trigger);
        metrics.record(trigger, outcome).await;
    }
}
