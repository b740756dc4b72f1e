use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::HeaderConfig;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::page::{ElementId, Page, Subscription};

use super::bootstrap::InitToken;
use super::loop_worker::reconcile_loop;
use super::menu::{menu_loop, watch_menu_items};
use super::reconciler::{ReconcileOutcome, Reconciler, Trigger};

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Attributes whose changes can undo the actuator's work.
const WATCHED_ATTRIBUTES: [&str; 2] = ["style", "class"];

/// Handle to the running header loop of one page load.
///
/// There is no stop: the loop lives until the page load's unload token is
/// cancelled.
pub struct HeaderController {
    header: ElementId,
    handle: JoinHandle<()>,
    menu_handle: Option<JoinHandle<()>>,
    metrics: MetricsCollector,
    initial: ReconcileOutcome,
}

impl HeaderController {
    /// Subscribes to the trigger channels, runs the first check synchronously
    /// and spawns the loop. Consumes the page load's init token.
    pub async fn start(
        token: InitToken,
        page: Arc<dyn Page>,
        header: ElementId,
        config: Arc<HeaderConfig>,
        unload: CancellationToken,
    ) -> Result<Self> {
        config.validate().context("refusing to start header loop")?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        page.observe(Subscription::Input, events_tx.clone());
        page.observe(
            Subscription::Attributes {
                target: header,
                filter: WATCHED_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            },
            events_tx,
        );

        let metrics = MetricsCollector::new();
        let mut reconciler = Reconciler::new(page.clone(), header, config.clone());
        let initial = reconciler.reconcile(Trigger::Initial);
        metrics.record(Trigger::Initial, initial).await;

        log_info!(
            "header loop starting for page load {} in state {:?}",
            token.page_load(),
            reconciler.state()
        );

        let handle = tokio::spawn(reconcile_loop(
            reconciler,
            events_rx,
            config.timing.clone(),
            metrics.clone(),
            unload.clone(),
        ));

        let menu_handle = config.menu.enabled.then(|| {
            let hovers = watch_menu_items(page.as_ref(), &config.menu);
            tokio::spawn(menu_loop(page.clone(), config.menu.clone(), hovers, unload))
        });

        Ok(Self {
            header,
            handle,
            menu_handle,
            metrics,
            initial,
        })
    }

    pub fn header(&self) -> ElementId {
        self.header
    }

    /// Outcome of the synchronous check made before the loop was spawned.
    pub fn initial_outcome(&self) -> ReconcileOutcome {
        self.initial
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot().await
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Waits for the loops to wind down after the page load was unloaded.
    pub async fn join(self) -> Result<()> {
        self.handle.await.context("header loop task failed to join")?;
        if let Some(menu) = self.menu_handle {
            menu.await.context("menu loop task failed to join")?;
        }
        Ok(())
    }
}
