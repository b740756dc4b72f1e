//! Runs the theme against an in-memory storefront: scrolls it, lets a hostile
//! third-party script fight the header, and prints the loop's metrics.

use std::sync::Arc;

use anyhow::{Context, Result};
use bt_header::page::ElementId;
use bt_header::{boot, BlockKind, BlockMounter, MemoryPage, MountContext, Page, PageLoad, Priority, ThemeManifest};
use log::info;
use tokio::time::{sleep, Duration};

/// Stands in for the host's lazily loaded FAQ and carousel modules.
struct LoggingBlocks;

impl BlockMounter for LoggingBlocks {
    fn mount(&self, kind: BlockKind, _page: &dyn Page, element: ElementId, ctx: &MountContext) -> Result<()> {
        info!("{kind:?} block mounted at {element:?} for {}", ctx.tenant);
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let manifest = ThemeManifest::builtin()?;
    let page = Arc::new(MemoryPage::storefront_without_header(
        "www.mahsunkids.com.br",
        "/mah-sun-kids",
    ));
    let load = Arc::new(PageLoad::new());
    info!("page load {} starting", load.id());

    let report = boot(page.clone(), &load, manifest, &LoggingBlocks);
    info!(
        "boot accepted={} blocks mounted={} skipped={}",
        report.accepted, report.blocks_mounted, report.blocks_skipped
    );

    // The platform's header app renders a little after the theme boots.
    sleep(Duration::from_millis(320)).await;
    let header = page.insert_header();

    let controller = report
        .header
        .context("boot did not start the header")?
        .await
        .context("header mount task panicked")?
        .context("header never started")?;

    for offset in [0, 20, 80, 240, 600] {
        page.scroll_to(offset);
        sleep(Duration::from_millis(16)).await;
    }
    sleep(Duration::from_millis(200)).await;

    info!("third-party script repaints the header");
    page.set_style_property(header, "background-color", "transparent", Priority::Important);
    page.remove_class(header, "header-scrolled");
    sleep(Duration::from_millis(150)).await;

    info!("competing stylesheet targets the sub-bar");
    if let Some(sub_bar) = page.query_within(header, ".sub-bar") {
        page.set_style_property(sub_bar, "background-color", "#ff00aa", Priority::Important);
    }
    sleep(Duration::from_millis(150)).await;

    page.scroll_to(-30);
    sleep(Duration::from_millis(300)).await;

    let snapshot = controller.metrics_snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    load.unload();
    controller.join().await
}
