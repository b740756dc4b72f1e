//! Keeps the navigation dropdowns readable over the transparent header.
//!
//! The storefront's header app recolors menu text through theme utility
//! classes and re-renders dropdowns on hover, so the colors are re-forced
//! periodically and shortly after every mouse-enter on a top-level item.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::MenuConfig;
use crate::page::{ElementId, Page, PageEvent, Priority, Rgba, Subscription};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Forces link colors and dropdown backgrounds. Returns the number of writes;
/// elements that already look right are left alone.
pub fn force_submenu_colors(page: &dyn Page, config: &MenuConfig) -> usize {
    let mut writes = 0;

    for link in page.query_selector_all(&config.link_selector) {
        for class in &config.stripped_classes {
            if page.has_class(link, class) {
                page.remove_class(link, class);
                writes += 1;
            }
        }
        if !computed_matches(page, link, "color", &config.text_color) {
            page.set_style_property(link, "color", &config.text_color, Priority::Normal);
            writes += 1;
        }
    }

    for container in page.query_selector_all(&config.container_selector) {
        if !computed_matches(page, container, "background-color", &config.container_background) {
            page.set_style_property(
                container,
                "background-color",
                &config.container_background,
                Priority::Normal,
            );
            writes += 1;
        }
    }

    writes
}

fn computed_matches(page: &dyn Page, element: ElementId, name: &str, wanted: &str) -> bool {
    let current = page.computed_style(element, name).and_then(|v| Rgba::parse(&v));
    current.is_some() && current == Rgba::parse(wanted)
}

/// Subscribes to mouse-enter on every top-level menu item and returns the
/// receiving end for [`menu_loop`].
pub fn watch_menu_items(page: &dyn Page, config: &MenuConfig) -> UnboundedReceiver<PageEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    for item in page.query_selector_all(&config.item_selector) {
        page.observe(Subscription::MouseEnter { target: item }, tx.clone());
    }
    rx
}

pub async fn menu_loop(
    page: Arc<dyn Page>,
    config: MenuConfig,
    mut hovers: UnboundedReceiver<PageEvent>,
    unload: CancellationToken,
) {
    let initial = time::sleep(Duration::from_millis(config.initial_delay_ms));
    tokio::pin!(initial);
    let mut initial_pending = true;

    let refresh_every = Duration::from_millis(config.refresh_interval_ms.max(1));
    let mut refresh = time::interval_at(Instant::now() + refresh_every, refresh_every);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let hover_delay = Duration::from_millis(config.hover_delay_ms);
    let hover = time::sleep(Duration::ZERO);
    tokio::pin!(hover);
    let mut hover_armed = false;
    let mut hovers_open = true;

    loop {
        tokio::select! {
            biased;

            _ = unload.cancelled() => break,
            event = hovers.recv(), if hovers_open => {
                match event {
                    Some(_) => {
                        hover.as_mut().reset(Instant::now() + hover_delay);
                        hover_armed = true;
                    }
                    None => { hovers_open = false; }
                }
                continue;
            }
            _ = &mut initial, if initial_pending => { initial_pending = false; }
            _ = &mut hover, if hover_armed => { hover_armed = false; }
            _ = refresh.tick() => {}
        }

        let writes = force_submenu_colors(page.as_ref(), &config);
        if writes > 0 {
            log_debug!("re-forced {writes} menu styles");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;

    #[test]
    fn forces_colors_once() {
        let page = MemoryPage::storefront("h", "/");
        let config = MenuConfig::default();

        // Per item: the link sheds two classes and the label one, both get a
        // color, and the dropdown gets a background.
        assert_eq!(force_submenu_colors(&page, &config), 3 * (3 + 2 + 1));
        assert_eq!(force_submenu_colors(&page, &config), 0);

        let link = page.query_selector(".container-menu a").unwrap();
        assert_eq!(page.computed_style(link, "color").as_deref(), Some("rgb(51, 51, 51)"));
        assert!(!page.has_class(link, "text-cor-texto"));
        assert!(!page.has_class(link, "dark:text-secondary-50"));
    }

    #[tokio::test(start_paused = true)]
    async fn hover_re_forces_after_delay() {
        let page = Arc::new(MemoryPage::storefront("h", "/"));
        let config = MenuConfig::default();
        let unload = CancellationToken::new();
        let hovers = watch_menu_items(page.as_ref(), &config);
        let task = tokio::spawn(menu_loop(page.clone(), config, hovers, unload.clone()));

        time::sleep(Duration::from_millis(600)).await;
        let link = page.query_selector(".container-menu a").unwrap();
        assert_eq!(page.computed_style(link, "color").as_deref(), Some("rgb(51, 51, 51)"));

        // The header app re-renders a dropdown on hover.
        page.add_class(link, "text-cor-texto");
        let item = page.query_selector("#nav-root > li").unwrap();
        page.mouse_enter(item);
        time::sleep(Duration::from_millis(20)).await;
        assert!(!page.has_class(link, "text-cor-texto"));

        unload.cancel();
        task.await.unwrap();
    }
}
