//! Selector support for the in-memory page, on top of the `selectors` crate.
//!
//! Only what the theme's targets need is wired up: type, id, class and
//! attribute selectors with combinators and lists. Dynamic pseudo-classes and
//! pseudo-elements are rejected at parse time.

use std::borrow::Borrow;
use std::fmt;

use anyhow::{anyhow, Result};
use cssparser::{Parser as CssParser, ParserInput, ToCss};
use selectors::context::{
    MatchingContext, MatchingForInvalidation, MatchingMode, NeedsSelectorFlags, QuirksMode,
    SelectorCaches,
};
use selectors::matching::matches_selector;
use selectors::parser::{ParseRelative, SelectorImpl, SelectorParseErrorKind};
use selectors::Element;

/// Packed `(ids, classes + attributes, types)` as computed by `selectors`.
pub type Specificity = u32;

/// Owned string usable as every atom type of [`ThemeSelectorImpl`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CssString(pub String);

impl From<&str> for CssString {
    fn from(s: &str) -> Self {
        CssString(s.to_string())
    }
}

impl std::ops::Deref for CssString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CssString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl ToCss for CssString {
    fn to_css<W>(&self, dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        dest.write_str(&self.0)
    }
}

impl precomputed_hash::PrecomputedHash for CssString {
    fn precomputed_hash(&self) -> u32 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeSelectorImpl;

impl SelectorImpl for ThemeSelectorImpl {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssString;
    type Identifier = CssString;
    type LocalName = CssString;
    type NamespacePrefix = CssString;
    type NamespaceUrl = CssString;
    type BorrowedLocalName = str;
    type BorrowedNamespaceUrl = str;

    type NonTSPseudoClass = PseudoClass;
    type PseudoElement = PseudoElement;
}

/// No dynamic pseudo-classes are supported; `a:hover` fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {}

impl selectors::parser::NonTSPseudoClass for PseudoClass {
    type Impl = ThemeSelectorImpl;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl ToCss for PseudoClass {
    fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = ThemeSelectorImpl;
}

impl ToCss for PseudoElement {
    fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
    where
        W: fmt::Write,
    {
        match *self {}
    }
}

struct ThemeSelectorParser;

impl<'i> selectors::parser::Parser<'i> for ThemeSelectorParser {
    type Impl = ThemeSelectorImpl;
    type Error = SelectorParseErrorKind<'i>;
}

#[derive(Debug, Clone)]
pub struct SelectorList {
    inner: selectors::parser::SelectorList<ThemeSelectorImpl>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = ParserInput::new(source);
        let mut parser = CssParser::new(&mut input);
        let inner = parser
            .parse_entirely(|p| {
                selectors::parser::SelectorList::parse(&ThemeSelectorParser, p, ParseRelative::No)
            })
            .map_err(|err| anyhow!("invalid selector {source:?}: {:?}", err.kind))?;
        Ok(Self { inner })
    }

    pub fn matches<E>(&self, element: &E) -> bool
    where
        E: Element<Impl = ThemeSelectorImpl>,
    {
        self.matching_specificity(element).is_some()
    }

    /// Highest specificity among the selectors in the list that match.
    pub fn matching_specificity<E>(&self, element: &E) -> Option<Specificity>
    where
        E: Element<Impl = ThemeSelectorImpl>,
    {
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        self.inner
            .slice()
            .iter()
            .filter(|selector| matches_selector(selector, 0, None, element, &mut context))
            .map(|selector| selector.specificity())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ElementId, MemoryPage, Page};

    /// body > nav#nav-root > li.item > a.link[data-x="1"]
    fn tree() -> (MemoryPage, ElementId, ElementId, ElementId) {
        let page = MemoryPage::new("h", "/");
        let nav = page.create_element(page.body(), "nav", Some("nav-root"), &[]);
        let item = page.create_element(nav, "li", None, &["item"]);
        let link = page.create_element(item, "a", None, &["link", "dark:text-secondary-50"]);
        page.set_attribute(link, "data-x", "1");
        (page, nav, item, link)
    }

    #[test]
    fn compound_components() {
        let (page, nav, item, link) = tree();
        assert_eq!(page.query_selector("#nav-root"), Some(nav));
        assert_eq!(page.query_selector("nav#nav-root"), Some(nav));
        assert_eq!(page.query_selector("li.item"), Some(item));
        assert_eq!(page.query_selector("a[data-x]"), Some(link));
        assert_eq!(page.query_selector("a[data-x=\"1\"]"), Some(link));
        assert_eq!(page.query_selector("a[data-x=\"2\"]"), None);
        assert_eq!(page.query_selector("li.other"), None);
    }

    #[test]
    fn combinators() {
        let (page, _, item, link) = tree();
        assert_eq!(page.query_selector("#nav-root > li"), Some(item));
        assert_eq!(page.query_selector("#nav-root > a"), None);
        assert_eq!(page.query_selector("#nav-root a"), Some(link));
        assert_eq!(page.query_selector("body .item > .link"), Some(link));
    }

    #[test]
    fn lists_match_any_member() {
        let (page, _, item, _) = tree();
        assert_eq!(page.query_selector(".missing, li"), Some(item));
        assert_eq!(page.query_selector(".missing, span"), None);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("a >").is_err());
        assert!(SelectorList::parse("> a").is_err());
        assert!(SelectorList::parse("a..b").is_err());
        assert!(SelectorList::parse("a:hover").is_err());
        assert!(SelectorList::parse("a::before").is_err());
    }
}
