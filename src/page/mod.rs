//! Host abstraction over the storefront document.
//!
//! The engine never touches a concrete DOM. A browser or webview host
//! implements [`Page`] over the live document; [`MemoryPage`] models the same
//! surface in memory for the simulation binary and the tests.

pub mod color;
pub mod memory;
pub mod selector;

pub use color::Rgba;
pub use memory::MemoryPage;

use serde::Serialize;
use tokio::sync::mpsc;

/// Opaque handle to an element of a [`Page`]. Handles stay valid for the
/// lifetime of the page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    Important,
}

/// Notifications delivered to observers registered with [`Page::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Scroll,
    Wheel,
    TouchMove,
    AttributeChanged { target: ElementId, attribute: String },
    ChildListChanged { target: ElementId },
    MouseEnter { target: ElementId },
}

impl PageEvent {
    /// Scroll, wheel and touch-move: the events that move the viewport.
    pub fn is_input(&self) -> bool {
        matches!(self, PageEvent::Scroll | PageEvent::Wheel | PageEvent::TouchMove)
    }
}

/// What an observer wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Scroll, wheel and touch-move on the window.
    Input,
    /// Attribute changes on `target` itself (not its subtree). An empty
    /// filter means every attribute.
    Attributes {
        target: ElementId,
        filter: Vec<String>,
    },
    /// Children added anywhere below `target`.
    ChildList { target: ElementId },
    MouseEnter { target: ElementId },
}

impl Subscription {
    pub fn wants(&self, event: &PageEvent) -> bool {
        match (self, event) {
            (Subscription::Input, event) => event.is_input(),
            (
                Subscription::Attributes { target, filter },
                PageEvent::AttributeChanged {
                    target: changed,
                    attribute,
                },
            ) => target == changed && (filter.is_empty() || filter.iter().any(|f| f == attribute)),
            (Subscription::MouseEnter { target }, PageEvent::MouseEnter { target: entered }) => {
                target == entered
            }
            // Subtree membership is resolved by the page before delivery.
            (Subscription::ChildList { .. }, PageEvent::ChildListChanged { .. }) => true,
            _ => false,
        }
    }
}

pub type EventSink = mpsc::UnboundedSender<PageEvent>;

/// The slice of a browser document the theme reads and writes.
///
/// Writes are best-effort: a stale handle or an absent property is ignored,
/// exactly like a DOM call on a detached node.
pub trait Page: Send + Sync {
    fn host(&self) -> String;
    fn pathname(&self) -> String;
    /// Vertical scroll offset of the viewport in CSS pixels. May be negative
    /// during overscroll.
    fn scroll_offset(&self) -> i64;

    fn document_element(&self) -> ElementId;
    fn body(&self) -> ElementId;
    fn query_selector(&self, selector: &str) -> Option<ElementId>;
    fn query_selector_all(&self, selector: &str) -> Vec<ElementId>;
    /// First descendant of `root` matching `selector`.
    fn query_within(&self, root: ElementId, selector: &str) -> Option<ElementId>;

    /// Inline declaration value, if any.
    fn style_property(&self, element: ElementId, name: &str) -> Option<String>;
    fn set_style_property(&self, element: ElementId, name: &str, value: &str, priority: Priority);
    /// Priority of the inline declaration, if any (`getPropertyPriority`).
    fn style_priority(&self, element: ElementId, name: &str) -> Option<Priority>;
    fn remove_style_property(&self, element: ElementId, name: &str);
    /// Cascaded value after inline styles and stylesheet rules are resolved.
    fn computed_style(&self, element: ElementId, name: &str) -> Option<String>;

    fn has_class(&self, element: ElementId, class: &str) -> bool;
    fn add_class(&self, element: ElementId, class: &str);
    fn remove_class(&self, element: ElementId, class: &str);
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;
    fn set_attribute(&self, element: ElementId, name: &str, value: &str);

    /// Appends a new `<tag class="class">` as the last child of `parent`.
    fn append_element(&self, parent: ElementId, tag: &str, class: &str) -> ElementId;

    /// Forces style and layout to be recomputed for `element`.
    fn flush_layout(&self, element: ElementId);

    fn observe(&self, subscription: Subscription, sink: EventSink);
}
