//! Darkening overlay for hero banner slides, so white header text stays
//! legible while the header is transparent.
//!
//! Not a state machine: slides only ever gain an overlay. The carousel
//! clones and re-inserts slides, so decoration re-runs on every child-list
//! change under the banner.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use crate::config::OverlayConfig;
use crate::page::{Page, Priority, Subscription};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Adds an overlay to every slide that lacks one. Returns how many were added.
pub fn apply_overlay(page: &dyn Page, config: &OverlayConfig) -> usize {
    let overlay_selector = format!(".{}", config.overlay_class);
    let color = config.overlay_color();
    let mut added = 0;

    for slide in page.query_selector_all(&config.slide_selector) {
        if page.query_within(slide, &overlay_selector).is_some() {
            continue;
        }
        let overlay = page.append_element(slide, "div", &config.overlay_class);
        page.set_style_property(overlay, "background-color", &color, Priority::Normal);
        added += 1;
    }

    if added > 0 {
        log_debug!("overlay applied to {added} slides");
    }
    added
}

/// Decorates banner slides on eligible pages: once after the initial delay
/// and again whenever the banner's subtree changes, until unload.
pub async fn init_banner_overlay(
    page: Arc<dyn Page>,
    config: OverlayConfig,
    unload: CancellationToken,
) -> Result<()> {
    let path = page.pathname();
    if !config.applies_to(&path) {
        log_info!("banner overlay not applied on {path}");
        return Ok(());
    }

    let (tx, mut changes) = mpsc::unbounded_channel();
    let watching = match page.query_selector(&config.banner_selector) {
        Some(banner) => {
            page.observe(Subscription::ChildList { target: banner }, tx);
            true
        }
        None => false,
    };

    tokio::spawn(async move {
        tokio::select! {
            _ = unload.cancelled() => return,
            _ = time::sleep(Duration::from_millis(config.initial_delay_ms)) => {
                apply_overlay(page.as_ref(), &config);
            }
        }
        if !watching {
            return;
        }
        loop {
            tokio::select! {
                _ = unload.cancelled() => break,
                change = changes.recv() => match change {
                    // Our own appends land here too; the second pass finds
                    // every slide decorated and adds nothing.
                    Some(_) => {
                        apply_overlay(page.as_ref(), &config);
                    }
                    None => break,
                },
            }
        }
    });

    Ok(())
}
