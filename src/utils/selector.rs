//! Minimal link selector matching for [`InMemoryPage`](crate::infrastructure::page::InMemoryPage).
//!
//! Supports the subset of CSS selectors vendors use to scope their links:
//! a tag name or `*`, any number of `[attr]` / `[attr=value]` /
//! `[attr="value"]` conditions, and comma-separated alternatives.
//! Combinators and pseudo-classes are rejected.

use regex::Regex;
use std::sync::LazyLock;

static COMPOUND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<tag>\*|[A-Za-z][A-Za-z0-9-]*)?(?P<attrs>(?:\[[^\]]*\])*)$").unwrap()
});

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[\s*(?P<name>[A-Za-z_:][-A-Za-z0-9_:.]*)\s*(?:=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\]\s"']*))\s*)?\]"#,
    )
    .unwrap()
});

/// Errors returned by [`Selector::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unsupported selector: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn parse(input: &str) -> Result<Self, SelectorError> {
        let captures = COMPOUND_REGEX
            .captures(input)
            .ok_or_else(|| SelectorError::Unsupported(input.to_string()))?;

        let tag = captures
            .name("tag")
            .map(|m| m.as_str())
            .filter(|tag| *tag != "*")
            .map(str::to_ascii_lowercase);

        let attrs = captures.name("attrs").map_or("", |m| m.as_str());
        let mut attributes = Vec::new();
        let mut consumed = 0;

        for attr in ATTRIBUTE_REGEX.captures_iter(attrs) {
            let whole = attr.get(0).map_or(0, |m| m.len());
            consumed += whole;

            let value = attr
                .name("dq")
                .or_else(|| attr.name("sq"))
                .or_else(|| attr.name("bare"))
                .map(|m| m.as_str().to_string());

            attributes.push(AttributeMatch {
                name: attr["name"].to_ascii_lowercase(),
                value,
            });
        }

        if consumed != attrs.len() {
            return Err(SelectorError::Unsupported(input.to_string()));
        }

        if captures.name("tag").is_none() && attributes.is_empty() {
            return Err(SelectorError::Empty);
        }

        Ok(Self { tag, attributes })
    }

    fn matches<'a>(&self, tag: &str, attribute: &impl Fn(&str) -> Option<&'a str>) -> bool {
        if let Some(expected) = &self.tag
            && !expected.eq_ignore_ascii_case(tag)
        {
            return false;
        }

        self.attributes.iter().all(|condition| {
            match (attribute(&condition.name), &condition.value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
            }
        })
    }
}

/// A parsed selector: one or more alternatives, any of which may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Parses a selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::Empty`] for blank input or blank alternatives, and
    /// [`SelectorError::Unsupported`] for combinators, pseudo-classes or other
    /// syntax outside the supported subset.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }

        let alternatives = input
            .split(',')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    Err(SelectorError::Empty)
                } else {
                    Compound::parse(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { alternatives })
    }

    /// Tests an element given its tag name and an attribute accessor.
    pub fn matches<'a>(&self, tag: &str, attribute: impl Fn(&str) -> Option<&'a str>) -> bool {
        self.alternatives
            .iter()
            .any(|compound| compound.matches(tag, &attribute))
    }
}
