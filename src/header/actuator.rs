//! Writes a [`VisualState`] onto the header and reads back what the page
//! actually shows.
//!
//! Backgrounds are written inline with `!important` so that no stylesheet
//! rule can win the cascade; only another inline write can undo them, and
//! the reconciliation loop watches for exactly that.

use crate::config::HeaderConfig;
use crate::page::{ElementId, Page, Priority, Rgba};

use super::state::VisualState;

const TRANSPARENT: &str = "transparent";

/// Declarations that keep the header a fixed, full-width bar on top of the
/// hero banner.
fn layout_pin(config: &HeaderConfig) -> [(&'static str, String); 6] {
    [
        ("position", "fixed".to_string()),
        ("top", "0".to_string()),
        ("left", "0".to_string()),
        ("right", "0".to_string()),
        ("width", "100%".to_string()),
        ("z-index", config.stacking_order.to_string()),
    ]
}

/// Applies `state` to `header` and its sub-bar.
///
/// Re-applying the state the page already shows changes nothing observable.
/// The layout pin is re-asserted on every call, whatever the state.
pub fn apply(page: &dyn Page, header: ElementId, state: VisualState, config: &HeaderConfig) {
    pin_layout(page, header, config);

    let background = match state {
        VisualState::Solid => config.solid_color.as_str(),
        VisualState::Transparent => TRANSPARENT,
    };
    paint_background(page, header, background);
    if let Some(sub_bar) = page.query_within(header, &config.sub_bar_selector) {
        paint_background(page, sub_bar, background);
    }

    match state {
        VisualState::Solid => page.add_class(header, &config.scrolled_marker),
        VisualState::Transparent => page.remove_class(header, &config.scrolled_marker),
    }

    // Observation reads computed style right after this returns.
    page.flush_layout(header);
}

fn pin_layout(page: &dyn Page, header: ElementId, config: &HeaderConfig) {
    for (name, value) in layout_pin(config) {
        page.set_style_property(header, name, &value, Priority::Important);
    }
}

fn paint_background(page: &dyn Page, element: ElementId, value: &str) {
    page.remove_style_property(element, "background");
    page.remove_style_property(element, "background-color");
    page.set_style_property(element, "background-color", value, Priority::Important);
}

/// What the page shows right now, derived from computed style and classes.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub header_background: Option<Rgba>,
    /// `None` when the header has no sub-bar.
    pub sub_bar_background: Option<Option<Rgba>>,
    pub marker_present: bool,
    pub layout_pinned: bool,
    solid: Option<Rgba>,
}

impl Observation {
    /// The state the page unambiguously shows, or `None` when background,
    /// sub-bar and marker disagree or a foreign color is in place.
    pub fn state(&self) -> Option<VisualState> {
        let header = self.classify(self.header_background)?;
        if let Some(sub_bar) = self.sub_bar_background {
            if self.classify(sub_bar)? != header {
                return None;
            }
        }
        let marker_agrees = match header {
            VisualState::Solid => self.marker_present,
            VisualState::Transparent => !self.marker_present,
        };
        marker_agrees.then_some(header)
    }

    /// Whether no corrective write is needed to show `desired`.
    pub fn satisfies(&self, desired: VisualState) -> bool {
        self.layout_pinned && self.state() == Some(desired)
    }

    fn classify(&self, color: Option<Rgba>) -> Option<VisualState> {
        let color = color?;
        if color.is_transparent() {
            Some(VisualState::Transparent)
        } else if Some(color) == self.solid {
            Some(VisualState::Solid)
        } else {
            None
        }
    }
}

/// Browsers echo a declared `0` back as `0px`.
fn same_declared_value(actual: &str, expected: &str) -> bool {
    let normalize = |value: &str| {
        let value = value.trim().to_ascii_lowercase();
        if value == "0px" {
            "0".to_string()
        } else {
            value
        }
    };
    normalize(actual) == normalize(expected)
}

/// Reads the header's observed state from the page, never from a cache.
pub fn observe(page: &dyn Page, header: ElementId, config: &HeaderConfig) -> Observation {
    let background =
        |element: ElementId| page.computed_style(element, "background-color").and_then(|v| Rgba::parse(&v));

    // Read back from the inline declarations: a live page reports used
    // values (`1280px`) in computed style, never the declared `100%`.
    let layout_pinned = layout_pin(config).iter().all(|(name, expected)| {
        page.style_priority(header, name) == Some(Priority::Important)
            && page
                .style_property(header, name)
                .is_some_and(|actual| same_declared_value(&actual, expected))
    });

    Observation {
        header_background: background(header),
        sub_bar_background: page
            .query_within(header, &config.sub_bar_selector)
            .map(background),
        marker_present: page.has_class(header, &config.scrolled_marker),
        layout_pinned,
        solid: config.solid_rgba().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{EventSink, MemoryPage, Subscription};

    fn fixture() -> (MemoryPage, ElementId, HeaderConfig) {
        let page = MemoryPage::storefront("www.mahsunkids.com.br", "/mah-sun-kids");
        let header = page.query_selector("#header-react-app").unwrap();
        (page, header, HeaderConfig::default())
    }

    #[test]
    fn solid_marks_and_mirrors() {
        let (page, header, config) = fixture();
        apply(&page, header, VisualState::Solid, &config);

        let sub_bar = page.query_within(header, ".sub-bar").unwrap();
        assert_eq!(
            page.computed_style(sub_bar, "background-color").as_deref(),
            Some("rgb(255, 255, 255)")
        );
        assert!(page.has_class(header, "header-scrolled"));
        assert_eq!(page.computed_style(header, "position").as_deref(), Some("fixed"));
        assert_eq!(page.computed_style(header, "z-index").as_deref(), Some("999"));
        assert_eq!(observe(&page, header, &config).state(), Some(VisualState::Solid));
        assert_eq!(page.layout_flush_count(), 1);
    }

    #[test]
    fn transparent_is_the_inverse() {
        let (page, header, config) = fixture();
        apply(&page, header, VisualState::Solid, &config);
        apply(&page, header, VisualState::Transparent, &config);

        assert!(!page.has_class(header, "header-scrolled"));
        let observed = observe(&page, header, &config);
        assert_eq!(observed.state(), Some(VisualState::Transparent));
        assert!(observed.satisfies(VisualState::Transparent));
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        for state in [VisualState::Solid, VisualState::Transparent] {
            let (page, header, config) = fixture();
            apply(&page, header, state, &config);
            let once = (
                page.attribute(header, "style"),
                page.attribute(header, "class"),
                observe(&page, header, &config),
            );
            apply(&page, header, state, &config);
            let twice = (
                page.attribute(header, "style"),
                page.attribute(header, "class"),
                observe(&page, header, &config),
            );
            assert_eq!(once, twice, "{state:?}");
        }
    }

    #[test]
    fn stylesheet_rules_cannot_override() {
        let (page, header, config) = fixture();
        page.add_stylesheet_rule(
            "#header-react-app",
            "background-color",
            "rgb(12, 34, 56)",
            Priority::Important,
        )
        .unwrap();
        apply(&page, header, VisualState::Transparent, &config);
        assert!(observe(&page, header, &config).satisfies(VisualState::Transparent));
    }

    #[test]
    fn foreign_or_mixed_state_is_unknown() {
        let (page, header, config) = fixture();
        apply(&page, header, VisualState::Solid, &config);
        page.set_style_property(header, "background-color", "#123456", Priority::Important);
        assert_eq!(observe(&page, header, &config).state(), None);

        apply(&page, header, VisualState::Solid, &config);
        page.remove_class(header, "header-scrolled");
        assert_eq!(observe(&page, header, &config).state(), None);

        apply(&page, header, VisualState::Solid, &config);
        let sub_bar = page.query_within(header, ".sub-bar").unwrap();
        page.set_style_property(sub_bar, "background-color", "transparent", Priority::Important);
        assert_eq!(observe(&page, header, &config).state(), None);
    }

    #[test]
    fn unpinned_layout_is_not_satisfied() {
        let (page, header, config) = fixture();
        apply(&page, header, VisualState::Solid, &config);
        page.set_style_property(header, "position", "relative", Priority::Important);
        let observed = observe(&page, header, &config);
        assert_eq!(observed.state(), Some(VisualState::Solid));
        assert!(!observed.satisfies(VisualState::Solid));
    }

    /// Reports used values for lengths, like `getComputedStyle` on a 1280px viewport.
    struct UsedValues(MemoryPage);

    impl Page for UsedValues {
        fn host(&self) -> String {
            self.0.host()
        }
        fn pathname(&self) -> String {
            self.0.pathname()
        }
        fn scroll_offset(&self) -> i64 {
            self.0.scroll_offset()
        }
        fn document_element(&self) -> ElementId {
            self.0.document_element()
        }
        fn body(&self) -> ElementId {
            self.0.body()
        }
        fn query_selector(&self, selector: &str) -> Option<ElementId> {
            self.0.query_selector(selector)
        }
        fn query_selector_all(&self, selector: &str) -> Vec<ElementId> {
            self.0.query_selector_all(selector)
        }
        fn query_within(&self, root: ElementId, selector: &str) -> Option<ElementId> {
            self.0.query_within(root, selector)
        }
        fn style_property(&self, element: ElementId, name: &str) -> Option<String> {
            self.0.style_property(element, name)
        }
        fn set_style_property(&self, element: ElementId, name: &str, value: &str, priority: Priority) {
            self.0.set_style_property(element, name, value, priority)
        }
        fn style_priority(&self, element: ElementId, name: &str) -> Option<Priority> {
            self.0.style_priority(element, name)
        }
        fn remove_style_property(&self, element: ElementId, name: &str) {
            self.0.remove_style_property(element, name)
        }
        fn computed_style(&self, element: ElementId, name: &str) -> Option<String> {
            let value = self.0.computed_style(element, name)?;
            Some(match (name, value.as_str()) {
                (_, "0") => "0px".to_string(),
                ("width", "100%") => "1280px".to_string(),
                _ => value,
            })
        }
        fn has_class(&self, element: ElementId, class: &str) -> bool {
            self.0.has_class(element, class)
        }
        fn add_class(&self, element: ElementId, class: &str) {
            self.0.add_class(element, class)
        }
        fn remove_class(&self, element: ElementId, class: &str) {
            self.0.remove_class(element, class)
        }
        fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
            self.0.attribute(element, name)
        }
        fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
            self.0.set_attribute(element, name, value)
        }
        fn append_element(&self, parent: ElementId, tag: &str, class: &str) -> ElementId {
            self.0.append_element(parent, tag, class)
        }
        fn flush_layout(&self, element: ElementId) {
            self.0.flush_layout(element)
        }
        fn observe(&self, subscription: Subscription, sink: EventSink) {
            self.0.observe(subscription, sink)
        }
    }

    #[test]
    fn pin_survives_used_value_reporting() {
        let (page, header, config) = fixture();
        let page = UsedValues(page);
        apply(&page, header, VisualState::Solid, &config);
        assert_eq!(page.computed_style(header, "width").as_deref(), Some("1280px"));
        assert!(observe(&page, header, &config).satisfies(VisualState::Solid));
    }

    #[test]
    fn pin_reads_inline_declarations() {
        let (page, header, config) = fixture();
        apply(&page, header, VisualState::Solid, &config);

        page.set_style_property(header, "top", "0px", Priority::Important);
        assert!(observe(&page, header, &config).satisfies(VisualState::Solid));

        page.set_style_property(header, "position", "fixed", Priority::Normal);
        assert!(!observe(&page, header, &config).satisfies(VisualState::Solid));

        apply(&page, header, VisualState::Solid, &config);
        assert_eq!(page.style_priority(header, "position"), Some(Priority::Important));
        assert!(observe(&page, header, &config).satisfies(VisualState::Solid));
    }

    #[test]
    fn missing_sub_bar_is_not_an_error() {
        let page = MemoryPage::new("h", "/");
        let header = page.create_element(page.body(), "header", Some("header-react-app"), &[]);
        let config = HeaderConfig::default();
        apply(&page, header, VisualState::Solid, &config);
        let observed = observe(&page, header, &config);
        assert_eq!(observed.sub_bar_background, None);
        assert!(observed.satisfies(VisualState::Solid));
    }
}
