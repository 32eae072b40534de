//! URL identity resolution for auction listings.
//!
//! A listing can be linked under many URL shapes; all of them must resolve
//! to the same source-assigned identifier before anything touches the
//! network or the database. Unrecognized or untrusted URLs are rejected here
//! so the fetcher never scrapes an arbitrary third-party site.

use std::sync::LazyLock;

use regex::RegexBuilder;
use url::Url;

/// Path segments that mark the next numeric segment as the listing id.
const ID_MARKERS: &[&str] = &["catalog", "auction", "auctions", "lot"];

/// Query parameter keys accepted as an explicit listing id.
const ID_QUERY_KEYS: &[&str] = &["id", "auctionId"];

/// Trusted source URL shapes. Any subdomain of the source host is accepted,
/// but the path must carry a marker segment with a numeric id.
static ALLOWED_URL_PATTERNS: LazyLock<Vec<regex::Regex>> = LazyLock::new(|| {
    [
        r"^https?://(?:[a-z0-9-]+\.)*hibid\.com/(?:[a-z0-9_-]+/)*lot/\d+",
        r"^https?://(?:[a-z0-9-]+\.)*hibid\.com/(?:[a-z0-9_-]+/)*catalog/\d+",
        r"^https?://(?:[a-z0-9-]+\.)*hibid\.com/(?:[a-z0-9_-]+/)*auctions?/\d+",
    ]
    .iter()
    .map(|p| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| unreachable!("invalid allow-list pattern: {e}"))
    })
    .collect()
});

/// Whether the URL matches the allow-list of trusted source shapes.
///
/// This runs before any network fetch is attempted.
#[must_use]
pub fn is_allowed_url(url: &str) -> bool {
    ALLOWED_URL_PATTERNS.iter().any(|re| re.is_match(url.trim()))
}

/// Extract the source-assigned listing identifier from a URL.
///
/// Looks for a path segment in [`ID_MARKERS`] immediately followed by a
/// numeric segment and returns those digits. Falls back to an explicit
/// id-like query parameter. Returns `None` when neither yields a value;
/// callers report this to the user rather than treating it as fatal.
#[must_use]
pub fn extract_external_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;

    if let Some(segments) = parsed.path_segments() {
        let segments: Vec<&str> = segments.collect();
        for pair in segments.windows(2) {
            let [marker, candidate] = pair else {
                continue;
            };
            if ID_MARKERS.contains(&marker.to_lowercase().as_str())
                && !candidate.is_empty()
                && candidate.bytes().all(|b| b.is_ascii_digit())
            {
                return Some((*candidate).to_string());
            }
        }
    }

    parsed
        .query_pairs()
        .find(|(key, value)| {
            ID_QUERY_KEYS.contains(&key.as_ref())
                && !value.is_empty()
                && value.bytes().all(|b| b.is_ascii_digit())
        })
        .map(|(_, value)| value.into_owned())
}

/// Canonical form of a listing URL, used as the auction upsert key.
///
/// Strips everything from the first `?` onward, then trailing slashes.
/// Idempotent: canonicalizing a canonical URL is a no-op.
#[must_use]
pub fn canonicalize(url: &str) -> String {
    let without_query = url.trim().split('?').next().unwrap_or("");
    without_query.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_catalog_path() {
        assert_eq!(
            extract_external_id("https://hibid.com/catalog/123456/some-title"),
            Some("123456".to_string())
        );
    }

    #[test]
    fn test_extract_from_lot_path() {
        assert_eq!(
            extract_external_id("https://x.hibid.com/lot/555?ref=1"),
            Some("555".to_string())
        );
    }

    #[test]
    fn test_extract_marker_is_case_insensitive() {
        assert_eq!(
            extract_external_id("https://hibid.com/Catalog/4242"),
            Some("4242".to_string())
        );
    }

    #[test]
    fn test_extract_ignores_non_numeric_segment() {
        assert_eq!(
            extract_external_id("https://hibid.com/catalog/not-a-number"),
            None
        );
    }

    #[test]
    fn test_extract_without_marker_returns_none() {
        assert_eq!(extract_external_id("https://site.com/nolotmarker"), None);
    }

    #[test]
    fn test_extract_falls_back_to_query_id() {
        assert_eq!(
            extract_external_id("https://hibid.com/listing?id=98765"),
            Some("98765".to_string())
        );
        assert_eq!(
            extract_external_id("https://hibid.com/listing?auctionId=321"),
            Some("321".to_string())
        );
    }

    #[test]
    fn test_extract_rejects_non_numeric_query_id() {
        assert_eq!(extract_external_id("https://hibid.com/listing?id=abc"), None);
    }

    #[test]
    fn test_extract_unparseable_url() {
        assert_eq!(extract_external_id("not a url"), None);
    }

    #[test]
    fn test_allowed_urls() {
        assert!(is_allowed_url("https://hibid.com/lot/42000"));
        assert!(is_allowed_url("https://x.hibid.com/lot/555?ref=1"));
        assert!(is_allowed_url("http://midwest.hibid.com/catalog/123456/farm-equipment"));
        assert!(is_allowed_url("https://hibid.com/auction/99/estate-sale"));
    }

    #[test]
    fn test_disallowed_urls() {
        assert!(!is_allowed_url("https://example.com/lot/42000"));
        assert!(!is_allowed_url("https://hibid.com.evil.com/lot/42000"));
        assert!(!is_allowed_url("https://hibid.com/nolotmarker"));
        assert!(!is_allowed_url("https://hibid.com/lot/not-numeric"));
        assert!(!is_allowed_url(""));
    }

    #[test]
    fn test_canonicalize_strips_query_and_trailing_slash() {
        assert_eq!(
            canonicalize("https://x.hibid.com/lot/555?ref=1"),
            "https://x.hibid.com/lot/555"
        );
        assert_eq!(
            canonicalize("https://x.hibid.com/lot/555/"),
            "https://x.hibid.com/lot/555"
        );
        assert_eq!(
            canonicalize("https://x.hibid.com/lot/555?ref=1"),
            canonicalize("https://x.hibid.com/lot/555/")
        );
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let urls = [
            "https://x.hibid.com/lot/555?ref=1",
            "https://hibid.com/catalog/123456/some-title/",
            "https://hibid.com/lot/1",
        ];
        for url in urls {
            let once = canonicalize(url);
            assert_eq!(canonicalize(&once), once);
        }
    }
}
