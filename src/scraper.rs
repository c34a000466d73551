//! Fetches a web page and reduces it to plain text for phone extraction.

use crate::error::Result;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};

const MAX_PAGE_TEXT_CHARS: usize = 5000;

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("body selector is valid"));

/// Collapsed body text of an HTML document, capped at 5000 characters.
pub(crate) fn html_to_text(html_content: &str) -> String {
    let document = Html::parse_document(html_content);

    let fragments: Vec<&str> = match document.select(&BODY_SELECTOR).next() {
        Some(body) => body.text().collect(),
        None => document.root_element().text().collect(),
    };

    fragments
        .iter()
        .flat_map(|fragment| fragment.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_PAGE_TEXT_CHARS)
        .collect()
}

/// Downloads `url` and returns its visible text.
///
/// # Returns
/// * `Ok(None)` for non-success statuses and non-HTML content.
/// * `Err(AppError::Request)` when the page could not be fetched at all.
pub(crate) async fn fetch_page_text(http_client: &Client, url: &str) -> Result<Option<String>> {
    if url.trim().is_empty() {
        return Ok(None);
    }

    tracing::debug!(target: "scrape_task", "Attempting to GET: {}", url);
    let response = http_client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(target: "scrape_task", "Skipping {} (status {})", url, status);
        return Ok(None);
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if !content_type.contains("html") {
        tracing::debug!(target: "scrape_task",
            "Skipping non-HTML content at {} ({})", url, content_type
        );
        return Ok(None);
    }

    let html_content = response.text().await?;
    let text = html_to_text(&html_content);
    tracing::debug!(target: "scrape_task", "Fetched {} chars of text from {}", text.len(), url);
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Filter;

    #[test]
    fn test_html_to_text_collapses_whitespace() {
        let html = "<html><head><title>x</title></head><body>\n  <h1>Priya   Rao</h1>\n<p>Mobile: +91 98765 43210</p></body></html>";
        assert_eq!(html_to_text(html), "Priya Rao Mobile: +91 98765 43210");
    }

    #[test]
    fn test_html_to_text_is_capped() {
        let html = format!("<body><p>{}</p></body>", "a".repeat(8000));
        assert_eq!(html_to_text(&html).chars().count(), MAX_PAGE_TEXT_CHARS);
    }

    #[tokio::test]
    async fn test_fetch_page_text_skips_non_html() {
        let routes = warp::path("page")
            .map(|| warp::reply::html("<body>Call: +1 650 253 0000</body>"))
            .or(warp::path("data").map(|| warp::reply::json(&serde_json::json!({"a": 1}))));
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = Client::new();
        let page = fetch_page_text(&client, &format!("http://{}/page", addr))
            .await
            .unwrap();
        assert_eq!(page.as_deref(), Some("Call: +1 650 253 0000"));

        let data = fetch_page_text(&client, &format!("http://{}/data", addr))
            .await
            .unwrap();
        assert_eq!(data, None);

        let missing = fetch_page_text(&client, &format!("http://{}/missing", addr))
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
