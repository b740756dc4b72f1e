//! Storefront theme behavior for the Mahsunkids shop: a header that sits
//! transparent over the hero banner and turns solid on scroll, kept correct
//! by a reconciliation loop while other scripts and stylesheets fight over
//! the same element.

pub mod boot;
pub mod classifier;
pub mod config;
pub mod header;
pub mod metrics;
pub mod overlay;
pub mod page;
mod utils;

pub use boot::{boot, BlockKind, BlockMounter, BootReport};
pub use config::{HeaderConfig, OverlayConfig, ThemeManifest};
pub use header::{decide, mount, HeaderController, MountContext, PageLoad, VisualState};
pub use overlay::init_banner_overlay;
pub use page::{ElementId, MemoryPage, Page, PageEvent, Priority};
