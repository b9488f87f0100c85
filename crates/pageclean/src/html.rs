//! Main-content extraction from HTML documents

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose whole subtree is dropped before text extraction
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "iframe"];

/// Content containers, tried in priority order
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    "#content",
    ".post-content",
    ".entry-content",
    "body",
];

/// Extract the readable text of the main content container
///
/// Takes the first element matching [`CONTENT_SELECTORS`] that does not sit
/// inside a skipped element, and returns its text nodes trimmed and joined
/// with newlines. Script, style, nav, footer and iframe subtrees are ignored.
pub fn extract_main_content(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).find(|el| !is_inside_skipped(el)) {
            tracing::debug!(selector = selector_str, "Matched content container");
            return visible_text(element);
        }
    }

    String::new()
}

/// Text of an element with skipped subtrees removed, one text node per line
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    parts.join("\n")
}

fn collect_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(el) if !is_skipped(el.name()) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, parts);
                }
            }
            _ => {}
        }
    }
}

fn is_skipped(name: &str) -> bool {
    SKIPPED_ELEMENTS.contains(&name)
}

fn is_inside_skipped(element: &ElementRef<'_>) -> bool {
    if is_skipped(element.value().name()) {
        return true;
    }
    element
        .ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|el| is_skipped(el.name()))
}
