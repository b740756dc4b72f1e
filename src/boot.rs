//! Tenant boot sequence: decides whether the theme runs on this page at all
//! and fans out to the header, the banner overlay and content blocks.
//!
//! Everything past the host check is fire-and-forget. A failing piece is
//! logged here and never reaches the storefront.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::task::JoinHandle;

use crate::classifier::host_allowed;
use crate::config::ThemeManifest;
use crate::header::{self, HeaderController, MountContext, PageLoad};
use crate::overlay::init_banner_overlay;
use crate::page::{ElementId, Page};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Attribute that anchors a content block in the storefront markup.
pub const BLOCK_ATTRIBUTE: &str = "data-bt-block";
/// Attribute set on the document element to scope the theme's stylesheet.
pub const TENANT_ATTRIBUTE: &str = "data-bt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Faq,
    Carousel,
}

impl FromStr for BlockKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "faq" => Ok(BlockKind::Faq),
            "carousel" => Ok(BlockKind::Carousel),
            other => bail!("unknown block kind {other:?}"),
        }
    }
}

/// Mounts content blocks. Loading and rendering them is the host's concern.
pub trait BlockMounter: Send + Sync {
    fn mount(
        &self,
        kind: BlockKind,
        page: &dyn Page,
        element: ElementId,
        ctx: &MountContext,
    ) -> Result<()>;
}

/// What the boot sequence did.
#[derive(Default)]
pub struct BootReport {
    pub accepted: bool,
    pub blocks_mounted: usize,
    pub blocks_skipped: usize,
    /// Resolves to the running header loop, or `None` if it never started.
    pub header: Option<JoinHandle<Option<HeaderController>>>,
}

pub fn boot(
    page: Arc<dyn Page>,
    load: &Arc<PageLoad>,
    manifest: &ThemeManifest,
    blocks: &dyn BlockMounter,
) -> BootReport {
    let host = page.host();
    if !host_allowed(&host, &manifest.allowed_hosts) {
        log_warn!("host not allowed for {}: {host}", manifest.tenant);
        return BootReport::default();
    }
    if !load.claim_boot() {
        log_warn!("theme already booted on this page load");
        return BootReport::default();
    }

    let ctx = MountContext {
        tenant: manifest.tenant.clone(),
        host,
    };
    page.set_attribute(page.document_element(), TENANT_ATTRIBUTE, &ctx.tenant);

    let mut report = BootReport {
        accepted: true,
        ..BootReport::default()
    };

    for element in page.query_selector_all(&format!("[{BLOCK_ATTRIBUTE}]")) {
        let raw_kind = page.attribute(element, BLOCK_ATTRIBUTE).unwrap_or_default();
        let kind = match raw_kind.parse::<BlockKind>() {
            Ok(kind) => kind,
            Err(err) => {
                log_warn!("{err}");
                report.blocks_skipped += 1;
                continue;
            }
        };
        match blocks.mount(kind, page.as_ref(), element, &ctx) {
            Ok(()) => report.blocks_mounted += 1,
            Err(err) => {
                log_error!("{kind:?} block failed to mount: {err:?}");
                report.blocks_skipped += 1;
            }
        }
    }

    let header_config = Arc::new(manifest.header.clone());
    let header_page = page.clone();
    let header_load = Arc::clone(load);
    let header_ctx = ctx.clone();
    report.header = Some(tokio::spawn(async move {
        match header::mount(header_page, &header_load, &header_ctx, header_config).await {
            Ok(controller) => controller,
            Err(err) => {
                log_error!("header mount failed: {err:?}");
                None
            }
        }
    }));

    let overlay_config = manifest.overlay.clone();
    let overlay_unload = load.unload_token();
    tokio::spawn(async move {
        if let Err(err) = init_banner_overlay(page, overlay_config, overlay_unload).await {
            log_error!("banner overlay failed: {err:?}");
        }
    });

    log_info!("booted {} on {}", ctx.tenant, ctx.host);
    report
}
