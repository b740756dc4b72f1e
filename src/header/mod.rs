//! Transparent-over-hero header and the loop that keeps it that way.

pub mod actuator;
pub mod bootstrap;
pub mod controller;
pub mod decision;
pub mod loop_worker;
pub mod menu;
pub mod reconciler;
pub mod state;

pub use bootstrap::{wait_for, InitToken, PageLoad};
pub use controller::HeaderController;
pub use decision::decide;
pub use reconciler::{ReconcileOutcome, Reconciler, Trigger};
pub use state::{LoopState, ObservedRecord, ScrollBucket, VisualState};

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::HeaderConfig;
use crate::page::Page;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Marks the body while the header may turn transparent, so theme CSS can
/// drop the spacer that normally sits under a fixed header.
pub const TRANSPARENT_BODY_CLASS: &str = "has-transparent-header";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountContext {
    pub tenant: String,
    pub host: String,
}

/// Mounts the header behavior on `page`.
///
/// Waits for the header to render, then starts the reconciliation loop. A
/// second mount on the same page load and a header that never shows up both
/// resolve to `Ok(None)`. An invalid config fails before anything is
/// touched.
pub async fn mount(
    page: Arc<dyn Page>,
    load: &PageLoad,
    ctx: &MountContext,
    config: Arc<HeaderConfig>,
) -> Result<Option<HeaderController>> {
    config.validate().context("invalid header config")?;

    let Some(token) = load.claim_header_init() else {
        log_warn!("header already mounted for {} on this page load", ctx.tenant);
        return Ok(None);
    };

    let timing = &config.timing;
    let Some(header) = wait_for(
        page.as_ref(),
        &config.target_selector,
        timing.bootstrap_attempts,
        timing.bootstrap_interval(),
    )
    .await
    else {
        return Ok(None);
    };

    if load.is_unloaded() {
        return Ok(None);
    }

    let transparency_allowed = config.transparency_allowed(&page.pathname());
    let controller =
        HeaderController::start(token, page.clone(), header, config, load.unload_token()).await?;
    if transparency_allowed {
        page.add_class(page.body(), TRANSPARENT_BODY_CLASS);
    }
    log_info!("header mounted for {} on {}", ctx.tenant, ctx.host);
    Ok(Some(controller))
}
