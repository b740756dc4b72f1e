//! In-memory document used by the simulation binary and the tests.
//!
//! It keeps only what the theme observes: an element tree with classes,
//! attributes and inline declarations, stylesheet rules resolved through a
//! reduced cascade, the viewport scroll offset and mutation observers.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::context::MatchingContext;
use selectors::matching::ElementSelectorFlags;
use selectors::{Element, OpaqueElement};

use super::selector::{CssString, PseudoClass, PseudoElement, SelectorList, ThemeSelectorImpl};
use super::{ElementId, EventSink, Page, PageEvent, Priority, Rgba, Subscription};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const DOCUMENT_ELEMENT: usize = 0;
const BODY: usize = 2;

#[derive(Debug, Clone)]
struct Declaration {
    name: String,
    value: String,
    priority: Priority,
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    styles: Vec<Declaration>,
}

impl Node {
    fn new(tag: &str, parent: Option<usize>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
            classes: Vec::new(),
            styles: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct StyleRule {
    selector: SelectorList,
    declaration: Declaration,
}

struct Document {
    host: String,
    path: String,
    scroll: i64,
    nodes: Vec<Node>,
    rules: Vec<StyleRule>,
    observers: Vec<(Subscription, EventSink)>,
    mutations: u64,
    layout_flushes: u64,
}

#[derive(Clone, Copy)]
struct NodeRef<'a> {
    doc: &'a Document,
    index: usize,
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>#{}", self.node().tag, self.index)
    }
}

impl<'a> NodeRef<'a> {
    fn node(&self) -> &'a Node {
        &self.doc.nodes[self.index]
    }

    fn at(&self, index: usize) -> Self {
        NodeRef {
            doc: self.doc,
            index,
        }
    }

    fn sibling(&self, offset: isize) -> Option<Self> {
        let parent = self.node().parent?;
        let siblings = &self.doc.nodes[parent].children;
        let position = siblings.iter().position(|&child| child == self.index)?;
        let target = position.checked_add_signed(offset)?;
        siblings.get(target).map(|&index| self.at(index))
    }
}

impl Element for NodeRef<'_> {
    type Impl = ThemeSelectorImpl;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self.node())
    }

    fn parent_element(&self) -> Option<Self> {
        self.node().parent.map(|index| self.at(index))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling(-1)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling(1)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.node().children.first().map(|&index| self.at(index))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.node().tag.eq_ignore_ascii_case(local_name)
    }

    fn has_namespace(&self, ns: &str) -> bool {
        ns.is_empty()
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.node().tag == other.node().tag
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&CssString>,
        local_name: &CssString,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if let NamespaceConstraint::Specific(url) = ns {
            if !url.is_empty() {
                return false;
            }
        }
        let Some(actual) = self.doc.attribute(self.index, local_name) else {
            return false;
        };
        match operation {
            AttrSelectorOperation::Exists => true,
            AttrSelectorOperation::WithValue {
                operator,
                case_sensitivity,
                value,
            } => operator.eval_str(&actual, value, *case_sensitivity),
        }
    }

    fn match_non_ts_pseudo_class(
        &self,
        pseudo: &PseudoClass,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match *pseudo {}
    }

    fn match_pseudo_element(
        &self,
        pseudo: &PseudoElement,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match *pseudo {}
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        self.node().tag == "a" && self.doc.attribute(self.index, "href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn assigned_slot(&self) -> Option<Self> {
        None
    }

    fn has_id(&self, id: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.doc
            .attribute(self.index, "id")
            .is_some_and(|actual| case_sensitivity.eq(actual.as_bytes(), id.as_bytes()))
    }

    fn has_class(&self, class: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.node()
            .classes
            .iter()
            .any(|actual| case_sensitivity.eq(actual.as_bytes(), class.as_bytes()))
    }

    fn imported_part(&self, _name: &CssString) -> Option<CssString> {
        None
    }

    fn is_part(&self, _name: &CssString) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.node().children.is_empty()
    }

    fn is_root(&self) -> bool {
        self.index == DOCUMENT_ELEMENT
    }

    fn has_custom_state(&self, _name: &CssString) -> bool {
        false
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}

impl Document {
    fn node_ref(&self, index: usize) -> NodeRef<'_> {
        NodeRef { doc: self, index }
    }

    fn attribute(&self, index: usize, name: &str) -> Option<String> {
        let node = self.nodes.get(index)?;
        if name == "class" {
            return (!node.classes.is_empty()).then(|| node.classes.join(" "));
        }
        if name == "style" {
            return (!node.styles.is_empty()).then(|| serialize_styles(&node.styles));
        }
        node.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    /// Pre-order walk below `root`, excluding `root` itself.
    fn descendants(&self, root: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[root].children.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            out.push(index);
            stack.extend(self.nodes[index].children.iter().rev().copied());
        }
        out
    }

    fn is_inclusive_ancestor(&self, ancestor: usize, mut node: usize) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn select(&self, root: usize, selector: &str, first_only: bool) -> Vec<usize> {
        let list = match SelectorList::parse(selector) {
            Ok(list) => list,
            Err(err) => {
                log_warn!("ignoring selector {selector:?}: {err}");
                return Vec::new();
            }
        };
        let mut found = Vec::new();
        for index in self.descendants(root) {
            if list.matches(&self.node_ref(index)) {
                found.push(index);
                if first_only {
                    break;
                }
            }
        }
        found
    }

    fn computed(&self, index: usize, name: &str) -> Option<String> {
        let node = self.nodes.get(index)?;
        let element = self.node_ref(index);

        // Ranked by (important, inline, specificity, source order).
        let from_rules = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| declares(&rule.declaration.name, name))
            .filter_map(|(order, rule)| {
                let specificity = rule.selector.matching_specificity(&element)?;
                let important = rule.declaration.priority == Priority::Important;
                Some((
                    (important, false, specificity, order),
                    rule.declaration.value.as_str(),
                ))
            });
        let from_inline = node
            .styles
            .iter()
            .enumerate()
            .filter(|(_, declaration)| declares(&declaration.name, name))
            .map(|(order, declaration)| {
                let important = declaration.priority == Priority::Important;
                (
                    (important, true, 0, order),
                    declaration.value.as_str(),
                )
            });
        let winner = from_rules.chain(from_inline).max_by(|a, b| a.0.cmp(&b.0));

        match winner {
            Some((_, value)) if name.ends_with("color") => Some(
                Rgba::parse(value)
                    .map(|color| color.to_string())
                    .unwrap_or_else(|| value.trim().to_string()),
            ),
            Some((_, value)) => Some(value.trim().to_string()),
            None => initial_value(name).map(str::to_string),
        }
    }

    /// Takes the sinks interested in `event`, dropping observers whose
    /// receiving side has gone away.
    fn interested_sinks(&mut self, event: &PageEvent) -> Vec<EventSink> {
        self.observers.retain(|(_, sink)| !sink.is_closed());
        self.observers
            .iter()
            .filter(|(subscription, _)| match (subscription, event) {
                (
                    Subscription::ChildList { target },
                    PageEvent::ChildListChanged { target: parent },
                ) => self.is_inclusive_ancestor(target.0, parent.0),
                _ => subscription.wants(event),
            })
            .map(|(_, sink)| sink.clone())
            .collect()
    }
}

/// Whether a declaration of `declared` sets the longhand `wanted`.
fn declares(declared: &str, wanted: &str) -> bool {
    declared == wanted || (declared == "background" && wanted == "background-color")
}

fn initial_value(name: &str) -> Option<&'static str> {
    match name {
        "background-color" => Some("rgba(0, 0, 0, 0)"),
        "position" => Some("static"),
        "top" | "left" | "right" | "width" | "z-index" => Some("auto"),
        _ => None,
    }
}

fn serialize_styles(styles: &[Declaration]) -> String {
    styles
        .iter()
        .map(|d| match d.priority {
            Priority::Important => format!("{}: {} !important;", d.name, d.value),
            Priority::Normal => format!("{}: {};", d.name, d.value),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// In-memory [`Page`].
pub struct MemoryPage {
    doc: Mutex<Document>,
}

impl MemoryPage {
    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new(host: &str, path: &str) -> Self {
        let mut nodes = vec![
            Node::new("html", None),
            Node::new("head", Some(DOCUMENT_ELEMENT)),
            Node::new("body", Some(DOCUMENT_ELEMENT)),
        ];
        nodes[DOCUMENT_ELEMENT].children = vec![1, BODY];

        Self {
            doc: Mutex::new(Document {
                host: host.to_string(),
                path: path.to_string(),
                scroll: 0,
                nodes,
                rules: Vec::new(),
                observers: Vec::new(),
                mutations: 0,
                layout_flushes: 0,
            }),
        }
    }

    /// A storefront as the theme expects to find it once the platform's
    /// header app has rendered.
    pub fn storefront(host: &str, path: &str) -> Self {
        let page = Self::storefront_without_header(host, path);
        page.insert_header();
        page
    }

    /// Same storefront before the header app has mounted.
    pub fn storefront_without_header(host: &str, path: &str) -> Self {
        let page = Self::new(host, path);
        let main = page.create_element(page.body(), "main", None, &[]);
        let banner = page.create_element(main, "section", None, &["bt-section-banner"]);
        let wrapper = page.create_element(banner, "div", None, &["swiper-wrapper"]);
        for _ in 0..2 {
            page.create_element(wrapper, "div", None, &["swiper-slide"]);
        }
        for kind in ["faq", "carousel"] {
            let block = page.create_element(main, "div", None, &[]);
            page.set_attribute(block, "data-bt-block", kind);
        }
        page.reset_counters();
        page
    }

    /// Renders `header#header-react-app` with its sub-bar and navigation menu
    /// as the first child of `body`.
    pub fn insert_header(&self) -> ElementId {
        let header = self.create_element(self.body(), "header", Some("header-react-app"), &[]);
        self.create_element(header, "div", None, &["sub-bar"]);
        let nav = self.create_element(header, "nav", None, &[]);
        let list = self.create_element(nav, "ul", Some("nav-root"), &[]);
        for _ in 0..3 {
            let item = self.create_element(list, "li", None, &[]);
            let menu = self.create_element(item, "div", None, &["container-menu"]);
            self.create_element(
                menu,
                "a",
                None,
                &["text-cor-texto", "dark:text-secondary-50"],
            );
            self.create_element(
                menu,
                "span",
                None,
                &["menu-text", "dark:text-secondary-300"],
            );
        }
        self.move_to_front(header);
        header
    }

    pub fn create_element(
        &self,
        parent: ElementId,
        tag: &str,
        id: Option<&str>,
        classes: &[&str],
    ) -> ElementId {
        let mut doc = self.lock();
        let index = doc.nodes.len();
        let mut node = Node::new(tag, Some(parent.0));
        if let Some(id) = id {
            node.attributes.push(("id".to_string(), id.to_string()));
        }
        node.classes = classes.iter().map(|c| c.to_string()).collect();
        doc.nodes.push(node);
        if let Some(parent_node) = doc.nodes.get_mut(parent.0) {
            parent_node.children.push(index);
        }
        doc.mutations += 1;
        let event = PageEvent::ChildListChanged { target: parent };
        let sinks = doc.interested_sinks(&event);
        drop(doc);
        deliver(sinks, event);
        ElementId(index)
    }

    /// Scrolls the viewport and dispatches a `scroll` event.
    pub fn scroll_to(&self, offset: i64) {
        self.lock().scroll = offset;
        self.dispatch(PageEvent::Scroll);
    }

    /// Moves the viewport without any event, as momentum scrolling on some
    /// mobile browsers does once the finger is lifted.
    pub fn set_scroll_silently(&self, offset: i64) {
        self.lock().scroll = offset;
    }

    /// Client-side navigation (`history.pushState`); fires nothing.
    pub fn navigate(&self, path: &str) {
        self.lock().path = path.to_string();
    }

    pub fn mouse_enter(&self, element: ElementId) {
        self.dispatch(PageEvent::MouseEnter { target: element });
    }

    pub fn dispatch(&self, event: PageEvent) {
        let sinks = self.lock().interested_sinks(&event);
        deliver(sinks, event);
    }

    /// Appends a rule to the page's stylesheet, as a competing theme would.
    /// Stylesheet changes are not attribute mutations and notify nobody.
    pub fn add_stylesheet_rule(
        &self,
        selector: &str,
        name: &str,
        value: &str,
        priority: Priority,
    ) -> Result<()> {
        let selector = SelectorList::parse(selector)
            .with_context(|| format!("invalid stylesheet selector {selector:?}"))?;
        self.lock().rules.push(StyleRule {
            selector,
            declaration: Declaration {
                name: name.to_string(),
                value: value.to_string(),
                priority,
            },
        });
        Ok(())
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.lock()
            .nodes
            .get(element.0)
            .map(|node| node.children.iter().copied().map(ElementId).collect())
            .unwrap_or_default()
    }

    /// Number of writes to attributes, styles, classes or the tree.
    pub fn mutation_count(&self) -> u64 {
        self.lock().mutations
    }

    pub fn layout_flush_count(&self) -> u64 {
        self.lock().layout_flushes
    }

    pub fn reset_counters(&self) {
        let mut doc = self.lock();
        doc.mutations = 0;
        doc.layout_flushes = 0;
    }

    fn move_to_front(&self, element: ElementId) {
        let mut doc = self.lock();
        let Some(parent) = doc.nodes.get(element.0).and_then(|node| node.parent) else {
            return;
        };
        let children = &mut doc.nodes[parent].children;
        children.retain(|&child| child != element.0);
        children.insert(0, element.0);
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to a node and notifies attribute observers. Every
    /// write counts as a mutation, changed or not, just like a DOM setter.
    fn mutate<F>(&self, element: ElementId, attribute: &str, change: F)
    where
        F: FnOnce(&mut Node),
    {
        let mut doc = self.lock();
        let Some(node) = doc.nodes.get_mut(element.0) else {
            return;
        };
        change(node);
        doc.mutations += 1;
        let event = PageEvent::AttributeChanged {
            target: element,
            attribute: attribute.to_string(),
        };
        let sinks = doc.interested_sinks(&event);
        drop(doc);
        deliver(sinks, event);
    }
}

fn deliver(sinks: Vec<EventSink>, event: PageEvent) {
    for sink in sinks {
        // A closed receiver just means that observer's loop has ended.
        let _ = sink.send(event.clone());
    }
}

impl Page for MemoryPage {
    fn host(&self) -> String {
        self.lock().host.clone()
    }

    fn pathname(&self) -> String {
        self.lock().path.clone()
    }

    fn scroll_offset(&self) -> i64 {
        self.lock().scroll
    }

    fn document_element(&self) -> ElementId {
        ElementId(DOCUMENT_ELEMENT)
    }

    fn body(&self) -> ElementId {
        ElementId(BODY)
    }

    fn query_selector(&self, selector: &str) -> Option<ElementId> {
        self.lock()
            .select(DOCUMENT_ELEMENT, selector, true)
            .first()
            .copied()
            .map(ElementId)
    }

    fn query_selector_all(&self, selector: &str) -> Vec<ElementId> {
        self.lock()
            .select(DOCUMENT_ELEMENT, selector, false)
            .into_iter()
            .map(ElementId)
            .collect()
    }

    fn query_within(&self, root: ElementId, selector: &str) -> Option<ElementId> {
        let doc = self.lock();
        if root.0 >= doc.nodes.len() {
            return None;
        }
        doc.select(root.0, selector, true).first().copied().map(ElementId)
    }

    fn style_property(&self, element: ElementId, name: &str) -> Option<String> {
        self.lock().nodes.get(element.0).and_then(|node| {
            node.styles
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.value.clone())
        })
    }

    fn set_style_property(&self, element: ElementId, name: &str, value: &str, priority: Priority) {
        self.mutate(element, "style", |node| {
            let declaration = Declaration {
                name: name.to_string(),
                value: value.to_string(),
                priority,
            };
            match node.styles.iter_mut().find(|d| d.name == name) {
                Some(existing) => *existing = declaration,
                None => node.styles.push(declaration),
            }
        });
    }

    fn style_priority(&self, element: ElementId, name: &str) -> Option<Priority> {
        self.lock().nodes.get(element.0).and_then(|node| {
            node.styles
                .iter()
                .find(|d| d.name == name)
                .map(|d| d.priority)
        })
    }

    fn remove_style_property(&self, element: ElementId, name: &str) {
        self.mutate(element, "style", |node| node.styles.retain(|d| d.name != name));
    }

    fn computed_style(&self, element: ElementId, name: &str) -> Option<String> {
        self.lock().computed(element.0, name)
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        let doc = self.lock();
        doc.nodes
            .get(element.0)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn add_class(&self, element: ElementId, class: &str) {
        self.mutate(element, "class", |node| {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        });
    }

    fn remove_class(&self, element: ElementId, class: &str) {
        self.mutate(element, "class", |node| node.classes.retain(|c| c != class));
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.lock().attribute(element.0, name)
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        self.mutate(element, name, |node| {
            if name == "class" {
                node.classes = value.split_whitespace().map(str::to_string).collect();
                return;
            }
            match node.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => node.attributes.push((name.to_string(), value.to_string())),
            }
        });
    }

    fn append_element(&self, parent: ElementId, tag: &str, class: &str) -> ElementId {
        let classes: Vec<&str> = class.split_whitespace().collect();
        self.create_element(parent, tag, None, &classes)
    }

    fn flush_layout(&self, element: ElementId) {
        let mut doc = self.lock();
        if element.0 < doc.nodes.len() {
            doc.layout_flushes += 1;
        }
    }

    fn observe(&self, subscription: Subscription, sink: EventSink) {
        self.lock().observers.push((subscription, sink));
    }
}
