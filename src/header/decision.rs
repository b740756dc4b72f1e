use crate::config::HeaderConfig;
use crate::page::Page;

use super::state::{ScrollBucket, VisualState};

/// The header state the page should show. Every trigger goes through here.
///
/// Ineligible pages are always solid. On eligible pages the header is solid
/// once the viewport has scrolled past `threshold`; negative offsets from
/// overscroll count as the top of the page.
pub fn decide(scroll_offset_px: i64, eligible: bool, threshold: i64) -> VisualState {
    if !eligible {
        return VisualState::Solid;
    }
    match scroll_bucket(scroll_offset_px, threshold) {
        ScrollBucket::Scrolled => VisualState::Solid,
        ScrollBucket::AtTop => VisualState::Transparent,
    }
}

pub fn scroll_bucket(scroll_offset_px: i64, threshold: i64) -> ScrollBucket {
    if scroll_offset_px.max(0) > threshold {
        ScrollBucket::Scrolled
    } else {
        ScrollBucket::AtTop
    }
}

/// Live inputs to [`decide`], read fresh from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inputs {
    pub scroll_offset: i64,
    pub eligible: bool,
}

impl Inputs {
    pub fn read(page: &dyn Page, config: &HeaderConfig) -> Self {
        Self {
            scroll_offset: page.scroll_offset(),
            eligible: config.transparency_allowed(&page.pathname()),
        }
    }

    pub fn desired(&self, config: &HeaderConfig) -> VisualState {
        decide(self.scroll_offset, self.eligible, config.scroll_threshold)
    }

    pub fn bucket(&self, config: &HeaderConfig) -> ScrollBucket {
        scroll_bucket(self.scroll_offset, config.scroll_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;

    #[test]
    fn ineligible_is_always_solid() {
        for offset in [-100, 0, 50, 51, 10_000] {
            assert_eq!(decide(offset, false, 50), VisualState::Solid);
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(decide(0, true, 50), VisualState::Transparent);
        assert_eq!(decide(50, true, 50), VisualState::Transparent);
        assert_eq!(decide(51, true, 50), VisualState::Solid);
    }

    #[test]
    fn negative_offsets_behave_like_zero() {
        for threshold in [-10, -1, 0, 50] {
            for offset in [-1, -50, i64::MIN] {
                assert_eq!(
                    decide(offset, true, threshold),
                    decide(0, true, threshold),
                    "offset {offset} threshold {threshold}"
                );
            }
        }
    }

    #[test]
    fn end_to_end_scenarios() {
        let config = HeaderConfig {
            eligible_paths: vec!["/home".into()],
            scroll_threshold: 50,
            ..HeaderConfig::default()
        };

        let page = MemoryPage::storefront("www.mahsunkids.com.br", "/home");
        let at_top = Inputs::read(&page, &config);
        assert_eq!(at_top.desired(&config), VisualState::Transparent);

        page.set_scroll_silently(51);
        assert_eq!(Inputs::read(&page, &config).desired(&config), VisualState::Solid);

        page.set_scroll_silently(0);
        page.navigate("/other");
        let elsewhere = Inputs::read(&page, &config);
        assert!(!elsewhere.eligible);
        assert_eq!(elsewhere.desired(&config), VisualState::Solid);
    }
}
