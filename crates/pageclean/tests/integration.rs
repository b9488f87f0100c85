//! Integration tests for pageclean using wiremock
//!
//! One mock server plays both the target website and the generative-AI API.

use pageclean::{
    ExplorationMode, ExtractError, ExtractRequest, Extractor, GeminiCleaner, HttpSource,
    PageSource, PageTarget, NO_LINKED_PAGES_NOTICE,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEMINI_PATH: &str = "/v1beta/models/gemini-test:generateContent";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn extractor(server: &MockServer) -> Extractor {
    init_tracing();
    let cleaner = GeminiCleaner::new()
        .with_api_key("test-key")
        .with_base_url(server.uri())
        .with_model("gemini-test");
    Extractor::builder().cleaner(Arc::new(cleaner)).build()
}

/// An HTML page with navigation, scripts and a main section
fn site_page(nav: &str, main: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Test</title><script>var trackingCode = 1;</script></head>
<body>
    <nav>{nav}</nav>
    <main><h1>Heading</h1><p>{main}</p></main>
    <footer>Copyright footer text</footer>
</body>
</html>"#
    )
}

fn gemini_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}

async fn mount_page(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

async fn mount_cleanup(server: &MockServer, marker: &str, reply: &str) {
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(body_string_contains(marker))
        .respond_with(gemini_reply(reply))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_page_end_to_end() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        site_page(
            r#"<a href="/about">About</a>"#,
            "HomeMarker welcome to the home page with plenty of readable content.",
        ),
    )
    .await;

    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_string_contains("HomeMarker"))
        .respond_with(gemini_reply("Welcome to the home page."))
        .expect(1)
        .mount(&server)
        .await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()))
        .await
        .unwrap();

    assert_eq!(report.url, format!("{}/", server.uri()));
    assert_eq!(report.mode, ExplorationMode::Single);
    assert_eq!(report.labels(), vec!["Home"]);
    assert_eq!(report.pages[0].text(), "Welcome to the home page.");
    assert!(!report.rate_limited);

    let requests = server.received_requests().await.unwrap();
    let cleanup = requests
        .iter()
        .find(|r| r.url.path() == GEMINI_PATH)
        .unwrap();
    let body = String::from_utf8_lossy(&cleanup.body);
    assert!(body.contains("CLEANING TASK"));
    assert!(!body.contains("trackingCode"));
    assert!(!body.contains("Copyright"));
}

#[tokio::test]
async fn test_linked_mode() {
    let server = MockServer::start().await;
    let nav = r#"
        <a href="/">Home</a>
        <a href="/about">About</a>
        <a href="https://elsewhere.example.org/x">Partner</a>
        <a href="/contact">Contact</a>"#;

    mount_page(
        &server,
        "/",
        site_page(nav, "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    mount_page(
        &server,
        "/about",
        site_page(nav, "AboutMarker the about page has plenty of readable content too."),
    )
    .await;
    mount_page(
        &server,
        "/contact",
        site_page(nav, "ContactMarker the contact page also has enough readable text."),
    )
    .await;
    mount_cleanup(&server, "HomeMarker", "Clean home").await;
    mount_cleanup(&server, "AboutMarker", "Clean about").await;
    mount_cleanup(&server, "ContactMarker", "Clean contact").await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()).mode(ExplorationMode::Linked))
        .await
        .unwrap();

    assert_eq!(report.labels(), vec!["Home", "About", "Contact"]);
    assert_eq!(report.page("Home").unwrap().text(), "Clean home");
    assert_eq!(report.page("About").unwrap().text(), "Clean about");
    assert_eq!(report.page("Contact").unwrap().text(), "Clean contact");
    assert_eq!(
        report.page("About").unwrap().url,
        format!("{}/about", server.uri())
    );
    assert!(report.notices.is_empty());
}

#[tokio::test]
async fn test_linked_mode_respects_max_pages() {
    let server = MockServer::start().await;
    let nav = r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#;
    mount_page(
        &server,
        "/",
        site_page(nav, "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    mount_page(
        &server,
        "/a",
        site_page(nav, "PageMarker this linked page has plenty of readable content."),
    )
    .await;
    mount_cleanup(&server, "HomeMarker", "Clean home").await;
    mount_cleanup(&server, "PageMarker", "Clean page").await;

    let report = extractor(&server)
        .run(
            ExtractRequest::new(server.uri())
                .mode(ExplorationMode::Linked)
                .max_pages(1),
        )
        .await
        .unwrap();

    assert_eq!(report.labels(), vec!["Home", "A"]);
}

#[tokio::test]
async fn test_linked_mode_fetch_failure_is_isolated() {
    let server = MockServer::start().await;
    let nav = r#"<a href="/broken">Broken</a><a href="/about">About</a>"#;
    mount_page(
        &server,
        "/",
        site_page(nav, "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    mount_page(
        &server,
        "/about",
        site_page(nav, "AboutMarker the about page has plenty of readable content too."),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_cleanup(&server, "HomeMarker", "Clean home").await;
    mount_cleanup(&server, "AboutMarker", "Clean about").await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()).mode(ExplorationMode::Linked))
        .await
        .unwrap();

    assert_eq!(report.labels(), vec!["Home", "Broken", "About"]);
    let broken = report.page("Broken").unwrap();
    assert!(matches!(broken.error(), Some(ExtractError::Fetch(_))));
    let text = broken.text();
    assert!(text.starts_with(&format!(
        "Error extracting content from {}/broken: Error fetching the webpage:",
        server.uri()
    )));
    assert!(text.contains("500"));

    assert_eq!(report.page("Home").unwrap().text(), "Clean home");
    assert_eq!(report.page("About").unwrap().text(), "Clean about");
}

#[tokio::test]
async fn test_linked_mode_without_links_records_notice() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        site_page("", "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    mount_cleanup(&server, "HomeMarker", "Clean home").await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()).mode(ExplorationMode::Linked))
        .await
        .unwrap();

    assert_eq!(report.labels(), vec!["Home"]);
    assert_eq!(report.notices, vec![NO_LINKED_PAGES_NOTICE.to_string()]);
}

#[tokio::test]
async fn test_menu_mode_with_direct_source() {
    let server = MockServer::start().await;
    let partner = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("partner"))
        .expect(0)
        .mount(&partner)
        .await;

    let nav = format!(
        r#"<a href="/">Home</a><a href="/pricing">Pricing</a><a href="{}/deals">Partner</a>"#,
        partner.uri()
    );
    mount_page(
        &server,
        "/",
        site_page(&nav, "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    mount_page(
        &server,
        "/pricing",
        site_page(&nav, "PricingMarker plans and prices are listed on this page in detail."),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(body_string_contains("HomeMarker"))
        .respond_with(gemini_reply("Clean home"))
        .expect(1)
        .mount(&server)
        .await;
    mount_cleanup(&server, "PricingMarker", "Clean pricing").await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()).mode(ExplorationMode::Menu))
        .await
        .unwrap();

    // The self link and the off-site link are not menu pages
    assert_eq!(report.labels(), vec!["Home", "Pricing"]);
    assert_eq!(report.page("Home").unwrap().text(), "Clean home");
    assert_eq!(report.page("Pricing").unwrap().text(), "Clean pricing");
    assert_eq!(
        report.page("Pricing").unwrap().menu_item.as_deref(),
        Some("Pricing")
    );
}

#[tokio::test]
async fn test_menu_item_on_other_host_is_not_followed() {
    let server = MockServer::start().await;
    let partner = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("partner"))
        .expect(0)
        .mount(&partner)
        .await;

    let nav = format!(r#"<a href="{}/deals">Partner</a>"#, partner.uri());
    mount_page(&server, "/", site_page(&nav, "Body")).await;

    let source = HttpSource::new();
    let items = source.menu_items(&format!("{}/", server.uri())).await.unwrap();
    assert!(items.is_empty());

    let err = source
        .extract(&PageTarget::menu(format!("{}/", server.uri()), "Partner"))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("navigation menu item 'Partner' not found"));
}

#[tokio::test]
async fn test_rate_limit() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        site_page("", "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()))
        .await
        .unwrap();

    assert!(report.rate_limited);
    assert_eq!(
        report.pages[0].text(),
        "CLEANING ERROR: API rate limit - please try again later."
    );
}

#[tokio::test]
async fn test_model_reports_no_content() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        site_page("", "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    mount_cleanup(
        &server,
        "HomeMarker",
        "I cannot clean this. Please provide the actual scraped content of the page.",
    )
    .await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()))
        .await
        .unwrap();

    assert!(matches!(
        report.pages[0].error(),
        Some(ExtractError::NoMeaningfulContent)
    ));
    assert_eq!(
        report.pages[0].text(),
        "CONTENT EXTRACTION ERROR: Failed to retrieve meaningful page content"
    );
}

#[tokio::test]
async fn test_cleanup_server_error() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        site_page("", "HomeMarker the home page has plenty of readable content here."),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" }
        })))
        .mount(&server)
        .await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()))
        .await
        .unwrap();

    assert!(!report.rate_limited);
    assert_eq!(
        report.pages[0].text(),
        "CLEANING ERROR: 500 INTERNAL: Internal error"
    );
}

#[tokio::test]
async fn test_insufficient_content_never_calls_cleanup() {
    let server = MockServer::start().await;
    mount_page(&server, "/", site_page("", "Too short")).await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_reply("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let report = extractor(&server)
        .run(ExtractRequest::new(server.uri()))
        .await
        .unwrap();

    assert!(matches!(
        report.pages[0].error(),
        Some(ExtractError::InsufficientContent { .. })
    ));
    assert!(report.pages[0]
        .text()
        .ends_with("Error: Insufficient content extracted"));
}

#[tokio::test]
async fn test_connection_dropped_mid_body() {
    use std::io::{Read, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let site = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 4096];
        let _ = stream.read(&mut request);
        // Promise far more bytes than are sent, then hang up
        let _ = stream.write_all(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: text/html\r\n\
              Content-Length: 100000\r\n\
              \r\n\
              <html><body><main>Only the first part of the page arrives</main>",
        );
        let _ = stream.flush();
    });

    let err = HttpSource::new()
        .fetch_page(&format!("http://{}/", addr))
        .await
        .unwrap_err();
    site.join().unwrap();

    assert!(matches!(err, ExtractError::Fetch(_)));
    assert!(err.to_string().starts_with("Error fetching the webpage:"));
}

#[tokio::test]
async fn test_unreachable_site() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let server = MockServer::start().await;
    let url = format!("http://{}/", addr);
    let report = extractor(&server)
        .run(ExtractRequest::new(url.clone()))
        .await
        .unwrap();

    let page = &report.pages[0];
    assert!(matches!(page.error(), Some(ExtractError::Fetch(_))));
    assert!(page.text().starts_with(&format!(
        "Error extracting content from {}: Error fetching the webpage:",
        url
    )));
}

#[tokio::test]
async fn test_custom_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestAgent/1.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(site_page("", "Body"), "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpSource::new().with_user_agent("TestAgent/1.0");
    let text = source
        .extract(&PageTarget::new("Home", format!("{}/", server.uri())))
        .await
        .unwrap();
    assert_eq!(text, "Heading\nBody");
}

#[tokio::test]
async fn test_binary_content_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50], "image/png"))
        .mount(&server)
        .await;

    let err = HttpSource::new()
        .extract(&PageTarget::new(
            "Logo",
            format!("{}/logo.png", server.uri()),
        ))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Binary content (image/png)"));
}

#[tokio::test]
async fn test_menu_item_missing_on_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/", site_page(r#"<a href="/a">A</a>"#, "Body")).await;

    let err = HttpSource::new()
        .extract(&PageTarget::menu(format!("{}/", server.uri()), "Missing"))
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("navigation menu item 'Missing' not found"));
}

#[tokio::test]
async fn test_redirected_discovery_uses_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/docs/index.html"),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/docs/index.html",
        site_page(r#"<a href="guide.html">Guide</a>"#, "Body"),
    )
    .await;

    let links = HttpSource::new()
        .discover_links(&format!("{}/start", server.uri()), 5)
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].url, format!("{}/docs/guide.html", server.uri()));
    assert_eq!(links[0].label, "Guide");
}
