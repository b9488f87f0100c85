//! Navigation link discovery
//!
//! Links are collected from `<nav>` elements. Pages without any navigation
//! anchors fall back to the first `<header>` and the first `<footer>`.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use url::Url;

/// A same-site link found in the page navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    /// Absolute URL
    pub url: String,
    /// Anchor text, whitespace-normalized (may be empty)
    pub label: String,
}

fn nav_anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("nav a[href]").expect("static selector"))
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a[href]").expect("static selector"))
}

fn header_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("header").expect("static selector"))
}

fn footer_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("footer").expect("static selector"))
}

/// Discover same-host navigation links
///
/// Resolves every navigation `href` against `base`, keeps links whose host
/// and port match the base URL, drops duplicate URLs and stops after
/// `max_links` entries. Order follows the document.
pub fn discover_links(html: &str, base: &Url, max_links: usize) -> Vec<NavLink> {
    let mut links: Vec<NavLink> = Vec::new();
    if max_links == 0 {
        return links;
    }

    let document = Html::parse_document(html);
    for (href, label) in navigation_anchors(&document) {
        let Ok(resolved) = base.join(&href) else {
            continue;
        };
        if !same_host(base, &resolved) {
            continue;
        }

        let resolved = resolved.to_string();
        if links.iter().any(|link| link.url == resolved) {
            continue;
        }

        links.push(NavLink {
            url: resolved,
            label,
        });
        if links.len() >= max_links {
            break;
        }
    }

    tracing::debug!(base = %base, found = links.len(), "Discovered navigation links");
    links
}

/// Unique, non-empty texts of same-host navigation anchors in document order
///
/// Anchors pointing back at `base` itself are skipped.
pub fn menu_labels(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    unique_labels(
        same_host_anchors(&document, base)
            .into_iter()
            .filter(|(url, _)| !same_page(url.as_str(), base.as_str()))
            .map(|(_, label)| label),
    )
}

/// Normalize whitespace, drop empty texts and duplicates, keep first-seen order
pub(crate) fn unique_labels<I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut labels: Vec<String> = Vec::new();
    for text in texts {
        let label = normalize_label(&text);
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Resolve the first same-host navigation anchor whose text equals `text`
pub fn find_link_by_text(html: &str, base: &Url, text: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let wanted = normalize_label(text);

    same_host_anchors(&document, base)
        .into_iter()
        .find(|(_, label)| *label == wanted)
        .map(|(url, _)| url.to_string())
}

/// Derive a page label from its URL path
///
/// `/docs/intro/` becomes `docs - intro`; an empty path yields the URL itself.
pub fn label_from_url(url: &str) -> String {
    let path = Url::parse(url)
        .map(|parsed| parsed.path().trim_matches('/').replace('/', " - "))
        .unwrap_or_default();
    if path.is_empty() {
        url.to_string()
    } else {
        path
    }
}

/// `(href, label)` pairs of the navigation region
fn navigation_anchors(document: &Html) -> Vec<(String, String)> {
    let mut anchors: Vec<(String, String)> = document
        .select(nav_anchor_selector())
        .map(anchor_pair)
        .collect();

    if anchors.is_empty() {
        for region in [header_selector(), footer_selector()] {
            if let Some(element) = document.select(region).next() {
                anchors.extend(element.select(anchor_selector()).map(anchor_pair));
            }
        }
    }

    anchors
}

/// Navigation anchors resolved against `base`, restricted to its host and port
fn same_host_anchors(document: &Html, base: &Url) -> Vec<(Url, String)> {
    navigation_anchors(document)
        .into_iter()
        .filter_map(|(href, label)| base.join(&href).ok().map(|url| (url, label)))
        .filter(|(url, _)| same_host(base, url))
        .collect()
}

fn anchor_pair(anchor: ElementRef<'_>) -> (String, String) {
    let href = anchor.value().attr("href").unwrap_or_default().to_string();
    let label = normalize_label(&anchor.text().collect::<String>());
    (href, label)
}

fn normalize_label(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when both URLs name the same page, ignoring fragment and trailing slash
pub(crate) fn same_page(a: &str, b: &str) -> bool {
    fn key(url: &str) -> String {
        match Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                parsed.to_string().trim_end_matches('/').to_string()
            }
            Err(_) => url.trim_end_matches('/').to_string(),
        }
    }
    key(a) == key(b)
}

pub(crate) fn same_host(base: &Url, candidate: &Url) -> bool {
    candidate.host_str().is_some()
        && candidate.host_str() == base.host_str()
        && candidate.port_or_known_default() == base.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn test_discover_nav_links() {
        let html = r#"<html><body>
            <nav>
                <a href="/about">About</a>
                <a href="https://example.com/blog">  Blog
                    Posts </a>
            </nav>
            <main><a href="/ignored">Not in nav</a></main>
        </body></html>"#;

        let links = discover_links(html, &base(), 10);
        assert_eq!(
            links,
            vec![
                NavLink {
                    url: "https://example.com/about".to_string(),
                    label: "About".to_string()
                },
                NavLink {
                    url: "https://example.com/blog".to_string(),
                    label: "Blog Posts".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_discover_filters_foreign_hosts() {
        let html = r#"<nav>
            <a href="https://other.com/page">Other</a>
            <a href="https://sub.example.com/page">Sub</a>
            <a href="https://example.com:8443/page">Port</a>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="javascript:void(0)">Js</a>
            <a href="/kept">Kept</a>
        </nav>"#;

        let links = discover_links(html, &base(), 10);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/kept");
    }

    #[test]
    fn test_discover_deduplicates_and_caps() {
        let html = r#"<nav>
            <a href="/a">A</a>
            <a href="/a">A again</a>
            <a href="https://example.com/a">A absolute</a>
            <a href="/b">B</a>
            <a href="/c">C</a>
            <a href="/d">D</a>
        </nav>"#;

        let links = discover_links(html, &base(), 3);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c"
            ]
        );
        assert_eq!(links[0].label, "A");
    }

    #[test]
    fn test_discover_zero_cap() {
        let html = r#"<nav><a href="/a">A</a></nav>"#;
        assert!(discover_links(html, &base(), 0).is_empty());
    }

    #[test]
    fn test_discover_falls_back_to_header_and_footer() {
        let html = r#"<body>
            <header><a href="/head">Head</a></header>
            <main><a href="/main">Main</a></main>
            <footer><a href="/foot">Foot</a></footer>
        </body>"#;

        let links = discover_links(html, &base(), 10);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/head", "https://example.com/foot"]
        );
    }

    #[test]
    fn test_nav_present_skips_header_fallback() {
        let html = r#"<body>
            <header><a href="/head">Head</a></header>
            <nav><a href="/nav">Nav</a></nav>
        </body>"#;

        let links = discover_links(html, &base(), 10);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/nav");
    }

    #[test]
    fn test_relative_links_resolve_against_base_path() {
        let base = Url::parse("https://example.com/docs/index.html").unwrap();
        let html = r#"<nav><a href="guide.html">Guide</a><a href="../top">Top</a></nav>"#;

        let links = discover_links(html, &base, 10);
        assert_eq!(links[0].url, "https://example.com/docs/guide.html");
        assert_eq!(links[1].url, "https://example.com/top");
    }

    #[test]
    fn test_menu_labels_unique_non_empty() {
        let html = r#"<nav>
            <a href="/about">About</a>
            <a href="/about-us">About</a>
            <a href="/logo"><img src="logo.png"></a>
            <a href="/pricing">Pricing</a>
        </nav>"#;

        assert_eq!(menu_labels(html, &base()), vec!["About", "Pricing"]);
    }

    #[test]
    fn test_menu_labels_skip_foreign_and_self_links() {
        let html = r#"<nav>
            <a href="/">Home</a>
            <a href="https://example.com/#top">Top</a>
            <a href="https://other.com/partner">Partner</a>
            <a href="https://example.com:8443/admin">Admin</a>
            <a href="/blog">Blog</a>
        </nav>"#;

        assert_eq!(menu_labels(html, &base()), vec!["Blog"]);
    }

    #[test]
    fn test_unique_labels() {
        let texts = vec![
            " Home ".to_string(),
            "".to_string(),
            "About\n Us".to_string(),
            "Home".to_string(),
            "About Us".to_string(),
        ];
        assert_eq!(unique_labels(texts), vec!["Home", "About Us"]);
    }

    #[test]
    fn test_find_link_by_text() {
        let html = r#"<body>
            <nav>
                <a href="/pricing">Pricing</a>
                <a href="/contact">Contact  us</a>
            </nav>
            <main><a href="/elsewhere">Body link</a></main>
        </body>"#;

        assert_eq!(
            find_link_by_text(html, &base(), "Pricing"),
            Some("https://example.com/pricing".to_string())
        );
        assert_eq!(
            find_link_by_text(html, &base(), "Contact us"),
            Some("https://example.com/contact".to_string())
        );
        // Only navigation anchors are followed
        assert_eq!(find_link_by_text(html, &base(), "Body link"), None);
        assert_eq!(find_link_by_text(html, &base(), "Missing"), None);
    }

    #[test]
    fn test_find_link_by_text_stays_on_host() {
        let html = r#"<nav>
            <a href="https://other.com/partner">Partner</a>
            <a href="mailto:hi@example.com">Partner</a>
        </nav>"#;
        assert_eq!(find_link_by_text(html, &base(), "Partner"), None);

        let html = r#"<nav>
            <a href="https://other.com/docs">Docs</a>
            <a href="/docs">Docs</a>
        </nav>"#;
        assert_eq!(
            find_link_by_text(html, &base(), "Docs"),
            Some("https://example.com/docs".to_string())
        );
    }

    #[test]
    fn test_same_page() {
        assert!(same_page("https://example.com/", "https://example.com"));
        assert!(same_page("https://example.com/a#top", "https://example.com/a/"));
        assert!(!same_page("https://example.com/a", "https://example.com/b"));
    }

    #[test]
    fn test_label_from_url() {
        assert_eq!(label_from_url("https://example.com/docs/intro/"), "docs - intro");
        assert_eq!(label_from_url("https://example.com/"), "https://example.com/");
        assert_eq!(label_from_url("not a url"), "not a url");
    }
}
