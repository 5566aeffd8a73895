//! Relative → absolute URL resolution and link checks

use url::Url;

/// Upper bound on repair rounds
const MAX_REPAIR_ROUNDS: usize = 8;

/// Literal segment replacements plus duplicate-slash collapsing.
///
/// Repair runs until the URL stops changing, so repairing a repaired URL is a
/// no-op. The same repair is applied at ingestion (before the identifier is
/// derived) and by the post-ingestion corrector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlRepair {
    segment_fixes: Vec<(String, String)>,
}

impl UrlRepair {
    pub fn new(segment_fixes: &[(String, String)]) -> Self {
        Self {
            segment_fixes: segment_fixes.iter().filter(|(pattern, _)| !pattern.is_empty()).cloned().collect(),
        }
    }

    pub fn segment_fixes(&self) -> &[(String, String)] {
        &self.segment_fixes
    }

    /// Well-formed URLs come back unchanged.
    pub fn repair(&self, url: &str) -> String {
        let mut current = url.to_string();
        for _ in 0..MAX_REPAIR_ROUNDS {
            let mut next = current.clone();
            for (pattern, replacement) in &self.segment_fixes {
                next = next.replace(pattern.as_str(), replacement);
            }
            let next = collapse_duplicate_slashes(&next);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

/// Replace runs of `/` with one `/`, except the `//` right after a `:`.
fn collapse_duplicate_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        if c == '/' && out.ends_with('/') {
            let before_slash = out[..out.len() - 1].chars().next_back();
            if before_slash != Some(':') {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Resolve `raw` against `base` with standard URL-joining semantics.
///
/// Empty input is unknown. When the base or the join is invalid the trimmed
/// input is returned as-is.
pub fn resolve_url(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let resolved = Url::parse(base.trim())
        .and_then(|base| base.join(raw))
        .or_else(|_| Url::parse(raw));

    match resolved {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Keeping unresolved URL '{}': {}", raw, e);
            Some(raw.to_string())
        }
    }
}

/// Whether `value` parses as an absolute http(s) URL with a host.
pub fn is_absolute_http_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/catalogue/x.html", "https://example.com/", Some("https://example.com/catalogue/x.html"))]
    #[case("../../media/cache/a.jpg", "https://books.toscrape.com/catalogue/x_1/index.html", Some("https://books.toscrape.com/media/cache/a.jpg"))]
    #[case("  https://other.org/p  ", "https://example.com/", Some("https://other.org/p"))]
    #[case("", "https://example.com/", None)]
    #[case("   ", "https://example.com/", None)]
    fn resolves_against_base(#[case] raw: &str, #[case] base: &str, #[case] expected: Option<&str>) {
        assert_eq!(resolve_url(raw, base), expected.map(str::to_string));
    }

    #[test]
    fn invalid_base_keeps_raw_input() {
        assert_eq!(resolve_url("/catalogue/x.html", "not a url"), Some("/catalogue/x.html".to_string()));
        assert_eq!(
            resolve_url("https://example.com/a", "not a url"),
            Some("https://example.com/a".to_string())
        );
    }

    fn repair() -> UrlRepair {
        UrlRepair::new(&[
            ("/cataloge/".to_string(), "/catalogue/".to_string()),
            ("%252F".to_string(), "/".to_string()),
        ])
    }

    #[rstest]
    #[case("https://books.toscrape.com/catalogue/a/index.html", "https://books.toscrape.com/catalogue/a/index.html")]
    #[case("https://books.toscrape.com/cataloge/a/index.html", "https://books.toscrape.com/catalogue/a/index.html")]
    #[case("https://books.toscrape.com//catalogue///a/index.html", "https://books.toscrape.com/catalogue/a/index.html")]
    #[case("https://books.toscrape.com/catalogue%252Fa/index.html", "https://books.toscrape.com/catalogue/a/index.html")]
    #[case("https://books.toscrape.com/cataloge//cataloge/a", "https://books.toscrape.com/catalogue/catalogue/a")]
    fn repairs_segments_and_slashes(#[case] url: &str, #[case] expected: &str) {
        let fixed = repair().repair(url);
        assert_eq!(fixed, expected);
        assert_eq!(repair().repair(&fixed), fixed);
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let repair = UrlRepair::new(&[(String::new(), "x".to_string())]);
        assert!(repair.segment_fixes().is_empty());
        assert_eq!(repair.repair("https://a.org/b"), "https://a.org/b");
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = resolve_url("catalogue/a b.html", "https://example.com/").unwrap();
        assert_eq!(resolve_url(&once, "https://example.com/"), Some(once.clone()));
        assert!(is_absolute_http_url(&once));
        assert!(!is_absolute_http_url("/catalogue/x.html"));
    }
}
