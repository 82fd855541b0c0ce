//! Paginated list envelope.
//!
//! List endpoints return `{count, next, previous, results}` where `next` and
//! `previous` are full URLs carrying the page number in a `page` query
//! parameter. The client extracts the number rather than treating the URL as
//! an opaque cursor.

use serde::{Deserialize, Serialize};
use url::Url;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Total result count across all pages.
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Page number of the next page, extracted from the `next` URL.
    ///
    /// Returns `None` on the last page or when the URL cannot be parsed.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        page_param(self.next.as_deref()?)
    }

    /// Page number of the previous page, if any.
    ///
    /// A `previous` URL without a `page` parameter means page 1 (the
    /// first-page URL omits it).
    #[must_use]
    pub fn previous_page(&self) -> Option<u32> {
        let previous = self.previous.as_deref()?;
        Some(page_param(previous).unwrap_or(1))
    }

    /// Whether more pages follow this one.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

fn page_param(raw: &str) -> Option<u32> {
    let url = Url::parse(raw).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(next: Option<&str>, previous: Option<&str>) -> Paginated<u32> {
        Paginated {
            count: 30,
            next: next.map(String::from),
            previous: previous.map(String::from),
            results: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_next_page_extracted() {
        let listing = page(Some("https://shop.example.com/api/v1/products/?page=3"), None);
        assert_eq!(listing.next_page(), Some(3));
        assert!(listing.has_more());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let listing = page(None, Some("https://shop.example.com/api/v1/products/?page=2"));
        assert_eq!(listing.next_page(), None);
        assert_eq!(listing.previous_page(), Some(2));
        assert!(!listing.has_more());
    }

    #[test]
    fn test_previous_without_page_param_is_first_page() {
        let listing = page(None, Some("https://shop.example.com/api/v1/products/"));
        assert_eq!(listing.previous_page(), Some(1));
    }

    #[test]
    fn test_malformed_next_url_ignored() {
        let listing = page(Some("not a url"), None);
        assert_eq!(listing.next_page(), None);
    }

    #[test]
    fn test_envelope_deserializes() {
        let listing: Paginated<u32> = serde_json::from_value(serde_json::json!({
            "count": 2,
            "results": [7, 8]
        }))
        .unwrap();
        assert_eq!(listing.count, 2);
        assert_eq!(listing.results, vec![7, 8]);
        assert!(listing.next.is_none());
    }
}
