//! Arena-backed in-memory page.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::fixture::PageFixture;
use crate::domain::entities::{Anchor, LinkId};
use crate::domain::ports::Page;
use crate::utils::selector::Selector;

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    href: Option<String>,
    attributes: HashMap<String, String>,
    attached: bool,
}

impl Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        if name == "href" {
            return self.href.as_deref();
        }
        self.attributes.get(name).map(String::as_str)
    }
}

/// A page held in memory.
///
/// Elements live in an append-only arena; an element's index is its
/// [`LinkId`], so ids stay stable across detach/attach. Detached elements keep
/// their state and can still be read and written, they are only skipped by
/// [`Page::query_links`].
#[derive(Debug)]
pub struct InMemoryPage {
    url: String,
    elements: RwLock<Vec<Element>>,
}

impl InMemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            elements: RwLock::new(Vec::new()),
        }
    }

    /// Builds a page with the fixture's links, in order.
    pub fn from_fixture(fixture: &PageFixture) -> Self {
        let page = Self::new(fixture.url.clone());
        for link in &fixture.links {
            page.push(Element {
                tag: link.tag.to_ascii_lowercase(),
                href: link.href.clone(),
                attributes: link
                    .attributes
                    .iter()
                    .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
                    .collect(),
                attached: true,
            });
        }
        page
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Appends an `<a href=..>` element.
    pub fn add_link(&self, href: &str) -> LinkId {
        self.add_element("a", Some(href), &[])
    }

    /// Appends an element with the given tag, destination and attributes.
    pub fn add_element(&self, tag: &str, href: Option<&str>, attributes: &[(&str, &str)]) -> LinkId {
        self.push(Element {
            tag: tag.to_ascii_lowercase(),
            href: href.map(str::to_string),
            attributes: attributes
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
                .collect(),
            attached: true,
        })
    }

    /// Removes the element from the document. Returns false for unknown ids.
    pub fn detach(&self, link: LinkId) -> bool {
        self.set_attached(link, false)
    }

    /// Puts a detached element back. Returns false for unknown ids.
    pub fn attach(&self, link: LinkId) -> bool {
        self.set_attached(link, true)
    }

    pub fn is_attached(&self, link: LinkId) -> bool {
        self.with_element(link, |element| element.attached)
            .unwrap_or(false)
    }

    pub fn set_attribute(&self, link: LinkId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        self.with_element_mut(link, |element| {
            if name == "href" {
                element.href = Some(value.to_string());
            } else {
                element.attributes.insert(name, value.to_string());
            }
        });
    }

    pub fn remove_attribute(&self, link: LinkId, name: &str) {
        let name = name.to_ascii_lowercase();
        self.with_element_mut(link, |element| {
            if name == "href" {
                element.href = None;
            } else {
                element.attributes.remove(&name);
            }
        });
    }

    /// Number of elements ever added, attached or not.
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, element: Element) -> LinkId {
        let mut elements = self.elements.write();
        let id = LinkId::new(elements.len() as u64);
        elements.push(element);
        id
    }

    fn set_attached(&self, link: LinkId, attached: bool) -> bool {
        let changed = self
            .with_element_mut(link, |element| element.attached = attached)
            .is_some();
        if changed {
            debug!(%link, attached, "Element attachment changed");
        }
        changed
    }

    fn with_element<T>(&self, link: LinkId, f: impl FnOnce(&Element) -> T) -> Option<T> {
        let elements = self.elements.read();
        usize::try_from(link.get())
            .ok()
            .and_then(|index| elements.get(index))
            .map(f)
    }

    fn with_element_mut<T>(&self, link: LinkId, f: impl FnOnce(&mut Element) -> T) -> Option<T> {
        let mut elements = self.elements.write();
        usize::try_from(link.get())
            .ok()
            .and_then(|index| elements.get_mut(index))
            .map(f)
    }
}

impl Page for InMemoryPage {
    fn query_links(&self, selector: &str) -> Vec<Anchor> {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(e) => {
                warn!(selector, error = %e, "Invalid link selector, no links matched");
                return Vec::new();
            }
        };

        self.elements
            .read()
            .iter()
            .enumerate()
            .filter(|(_, element)| element.attached)
            .filter(|(_, element)| selector.matches(&element.tag, |name| element.attribute(name)))
            .filter_map(|(index, element)| {
                element
                    .href
                    .as_ref()
                    .map(|href| Anchor::new(LinkId::new(index as u64), href.clone()))
            })
            .collect()
    }

    fn href(&self, link: LinkId) -> Option<String> {
        self.with_element(link, |element| element.href.clone())
            .flatten()
    }

    fn set_href(&self, link: LinkId, href: &str) {
        self.with_element_mut(link, |element| element.href = Some(href.to_string()));
    }

    fn attribute(&self, link: LinkId, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.with_element(link, |element| element.attribute(&name).map(str::to_string))
            .flatten()
    }
}
