//! JSON page fixtures.

use std::collections::HashMap;

use serde::Deserialize;

fn default_tag() -> String {
    "a".to_string()
}

/// A page together with the vendors installed on it.
///
/// ```json
/// {
///   "url": "https://blog.example/post",
///   "priority": "vendor2 vendor1",
///   "vendors": [{ "name": "vendor1", "merchants": ["shop.example"] }],
///   "links": [{ "href": "https://shop.example/item" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageFixture {
    pub url: String,
    /// Page-level priority declaration.
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub vendors: Vec<VendorFixture>,
    /// Links in document order; a link's position is its id.
    #[serde(default)]
    pub links: Vec<LinkFixture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VendorFixture {
    pub name: String,
    #[serde(default)]
    pub selector: Option<String>,
    /// Domains the vendor's backend reports as merchants.
    #[serde(default)]
    pub merchants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkFixture {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PageFixture {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_fixture() {
        let fixture = PageFixture::from_json(r#"{ "url": "https://blog.example/" }"#).unwrap();

        assert_eq!(fixture.url, "https://blog.example/");
        assert!(fixture.priority.is_none());
        assert!(fixture.vendors.is_empty());
        assert!(fixture.links.is_empty());
    }

    #[test]
    fn test_full_fixture() {
        let fixture = PageFixture::from_json(
            r#"{
                "url": "https://blog.example/",
                "priority": "v2 v1",
                "vendors": [
                    { "name": "v1", "merchants": ["a.com"] },
                    { "name": "v2", "selector": "a[rel=sponsored]" }
                ],
                "links": [
                    { "href": "https://a.com/" },
                    { "tag": "area", "href": "https://b.com/", "attributes": { "data-link-rewriters": "v2" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(fixture.vendors[0].merchants, vec!["a.com"]);
        assert_eq!(fixture.vendors[1].selector.as_deref(), Some("a[rel=sponsored]"));
        assert_eq!(fixture.links[0].tag, "a");
        assert_eq!(fixture.links[1].tag, "area");
        assert_eq!(
            fixture.links[1].attributes.get("data-link-rewriters").map(String::as_str),
            Some("v2")
        );
    }

    #[test]
    fn test_missing_url_is_rejected() {
        assert!(PageFixture::from_json(r#"{ "links": [] }"#).is_err());
    }
}
