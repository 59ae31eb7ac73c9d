//! Parsing of vendor priority declarations.

/// Parses a whitespace-separated, ordered list of vendor identifiers.
///
/// Used for both the page-level priority declaration and the per-link
/// override attribute. Repeated identifiers keep their first position.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_vendor_list(" vendor1  vendor3 vendor2 "), ["vendor1", "vendor3", "vendor2"]);
/// ```
pub fn parse_vendor_list(declaration: &str) -> Vec<String> {
    let mut vendors: Vec<String> = Vec::new();

    for vendor in declaration.split_whitespace() {
        if !vendors.iter().any(|known| known == vendor) {
            vendors.push(vendor.to_string());
        }
    }

    vendors
}
