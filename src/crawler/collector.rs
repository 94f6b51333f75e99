//! Post URL collection from index pages

use crate::crawler::discovery::BoardUrls;
use crate::crawler::fetcher::PageFetcher;
use scraper::{Html, Selector};
use url::Url;

/// Fetches index page `page` and returns the post URLs it lists
///
/// Returns `None` if the page could not be fetched; the failure is logged and
/// the page contributes nothing to the crawl.
pub async fn collect_page_urls(
    fetcher: &PageFetcher,
    board: &BoardUrls,
    page: u32,
) -> Option<Vec<String>> {
    let index_url = board.index_page(page);

    let body = match fetcher.fetch(&index_url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Skipping index page {}: {}", page, e);
            return None;
        }
    };

    let urls = extract_post_urls(&body, board.base());
    tracing::trace!("Index page {} lists {} posts", page, urls.len());
    Some(urls)
}

/// Extracts the absolute post URLs from the title blocks of an index page
///
/// Title blocks without a usable link (deleted posts, for instance) are
/// skipped one by one.
///
/// # Example
///
/// ```
/// use ptt_harvest::crawler::extract_post_urls;
/// use url::Url;
///
/// let html = r#"<div class="title"><a href="/bbs/KMT/M.1.A.html">[討論] 測試</a></div>"#;
/// let base = Url::parse("https://www.ptt.cc/").unwrap();
/// assert_eq!(
///     extract_post_urls(html, &base),
///     vec!["https://www.ptt.cc/bbs/KMT/M.1.A.html".to_string()]
/// );
/// ```
pub fn extract_post_urls(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let (Ok(title_selector), Ok(anchor_selector)) =
        (Selector::parse("div.title"), Selector::parse("a"))
    else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for block in document.select(&title_selector) {
        let href = block
            .select(&anchor_selector)
            .next()
            .and_then(|a| a.value().attr("href"));

        let Some(href) = href else {
            tracing::warn!(
                "href not found in title block '{}'",
                block.text().collect::<String>().trim()
            );
            continue;
        };

        match resolve_link(href, base_url) {
            Some(url) => urls.push(url),
            None => tracing::warn!("Cannot resolve post link '{}'", href),
        }
    }

    urls
}

/// Resolves an href against the forum root
///
/// Returns None for empty, fragment-only and non-HTTP(S) links.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}
