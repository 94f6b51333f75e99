//! Post page extraction
//!
//! Turns one fetched post page into a [`PostRecord`]. Parsing is a pure function
//! of the document text, so the same page always yields the same record.
//!
//! # Expected layout
//!
//! ```text
//! div#main-content
//! ├── div.article-metaline   span.article-meta-tag + span.article-meta-value
//! ├── (body text)
//! ├── span.f2 / span.f6      signature and footer decorations
//! └── div.push               span.push-tag, push-userid, push-content, push-ipdatetime
//! ```

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::validator::ContentValidator;
use crate::record::{CommentRecord, PostRecord};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Metadata labels recognised on a post page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaTag {
    Title,
    Time,
    Author,
}

impl MetaTag {
    /// Maps the label text shown on the page to a field; unknown labels map to `None`
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "標題" => Some(Self::Title),
            "時間" => Some(Self::Time),
            "作者" => Some(Self::Author),
            _ => None,
        }
    }
}

/// A parsed post that has not been validated yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCandidate {
    pub author: Option<String>,
    pub title: Option<String>,
    pub time: Option<String>,
    pub content: String,
    pub url: String,
    pub subforum: String,
    pub comments: Vec<CommentRecord>,
}

impl PostCandidate {
    /// Converts into a record; `None` if title or time is missing
    pub fn into_record(self) -> Option<PostRecord> {
        let (Some(title), Some(time)) = (self.title, self.time) else {
            return None;
        };

        Some(PostRecord {
            author: self.author,
            title,
            time,
            content: self.content,
            url: self.url,
            subforum: self.subforum,
            comments: self.comments,
        })
    }
}

/// Fetches a post page and extracts a validated record from it
///
/// Any failure (fetch error, atypical layout, rejected content) yields `None`
/// for this URL only.
pub async fn extract(
    fetcher: &PageFetcher,
    url: &str,
    subforum: &str,
    validator: &ContentValidator,
) -> Option<PostRecord> {
    tracing::debug!("Processing page: {}", url);

    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Skipping post {}: {}", url, e);
            return None;
        }
    };

    extract_post(&body, url, subforum, validator)
}

/// Parses and validates a fetched post page
pub fn extract_post(
    html: &str,
    url: &str,
    subforum: &str,
    validator: &ContentValidator,
) -> Option<PostRecord> {
    let candidate = parse_post(html, url, subforum)?;
    if !validator.validate(&candidate) {
        return None;
    }
    candidate.into_record()
}

/// Parses a post page without applying the acceptance rules
///
/// Returns `None` when the page has no main content container, e.g. media
/// embed pages.
pub fn parse_post(html: &str, url: &str, subforum: &str) -> Option<PostCandidate> {
    let document = Html::parse_document(html);
    let main_selector = Selector::parse("div#main-content").ok()?;

    let Some(main_content) = document.select(&main_selector).next() else {
        tracing::warn!("No main content found in {}", url);
        return None;
    };

    let mut title = None;
    let mut time = None;
    let mut author = None;

    let metalines = select_all(main_content, "div.article-metaline");
    for metaline in &metalines {
        let Some((label, value)) = metaline_pair(*metaline) else {
            continue;
        };
        match MetaTag::from_label(&label) {
            Some(MetaTag::Title) => title = Some(value),
            Some(MetaTag::Time) => time = Some(value),
            Some(MetaTag::Author) => author = Some(value),
            None => {}
        }
    }

    // Comments are read before their elements are excluded from the body text
    let (comments, push_elements) = extract_comments(main_content);
    if comments.is_empty() {
        tracing::debug!("No comments found for {}", url);
    }

    let excluded: HashSet<_> = push_elements
        .iter()
        .chain(metalines.iter())
        .chain(select_all(main_content, "span.f2").iter())
        .chain(select_all(main_content, "span.f6").iter())
        .map(|element| element.id())
        .collect();

    let content = main_content
        .descendants()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            if node.ancestors().any(|a| excluded.contains(&a.id())) {
                None
            } else {
                Some(text)
            }
        })
        .collect::<String>()
        .trim()
        .to_string();

    tracing::debug!(
        "{} parsed successfully. Content length: {}",
        url,
        content.chars().count()
    );

    Some(PostCandidate {
        author,
        title,
        time,
        content,
        url: url.to_string(),
        subforum: subforum.to_string(),
        comments,
    })
}

/// Reads every push element under `container` in document order
///
/// Returns the retained comments together with all scanned push elements, so
/// the caller can strip them from the body whether or not they were retained.
pub fn extract_comments<'a>(container: ElementRef<'a>) -> (Vec<CommentRecord>, Vec<ElementRef<'a>>) {
    let push_elements = select_all(container, "div.push");
    let mut comments = Vec::new();

    for push in &push_elements {
        let push_tag = first_text(*push, "span.push-tag");
        let userid = first_text(*push, "span.push-userid");
        let content = first_text(*push, "span.push-content");
        let ipdatetime = first_text(*push, "span.push-ipdatetime");

        match (userid, ipdatetime) {
            (Some(userid), Some(ipdatetime)) => comments.push(CommentRecord {
                push_tag,
                userid,
                content,
                ipdatetime,
            }),
            _ => tracing::warn!("Missing userid or ipdatetime in comment; skipping one comment"),
        }
    }

    (comments, push_elements)
}

/// Returns the trimmed (label, value) pair of one metadata line
fn metaline_pair(metaline: ElementRef<'_>) -> Option<(String, String)> {
    let label = first_text(metaline, "span.article-meta-tag")?;
    let value = first_text(metaline, "span.article-meta-value")?;
    Some((label, value))
}

/// Trimmed text of the first descendant matching `css`
fn first_text(element: ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    element
        .select(&selector)
        .next()
        .map(|found| found.text().collect::<String>().trim().to_string())
}

fn select_all<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.ptt.cc/bbs/KMT/M.1700000000.A.123.html";

    fn post_page(title: &str, body: &str, pushes: &str) -> String {
        format!(
            r#"<html><head><title>{title}</title></head><body>
<div id="main-content" class="bbs-screen bbs-content"><div class="article-metaline"><span class="article-meta-tag">作者</span><span class="article-meta-value">tester (測試者)</span></div><div class="article-metaline-right"><span class="article-meta-tag">看板</span><span class="article-meta-value">KMT</span></div><div class="article-metaline"><span class="article-meta-tag">標題</span><span class="article-meta-value">{title}</span></div><div class="article-metaline"><span class="article-meta-tag">時間</span><span class="article-meta-value">Mon Jan  1 12:00:00 2024</span></div>
{body}
--
<span class="f2">※ 發信站: 批踢踢實業坊(ptt.cc), 來自: 1.2.3.4 (臺灣)
</span><span class="f2">※ 文章網址: <a href="{URL}">{URL}</a>
</span>{pushes}<span class="f6">簽名檔</span></div>
</body></html>"#
        )
    }

    fn push(tag: &str, user: &str, content: &str, ip: &str) -> String {
        format!(
            r#"<div class="push"><span class="hl push-tag">{tag} </span><span class="f3 hl push-userid">{user}</span><span class="f3 push-content">{content}</span><span class="push-ipdatetime"> {ip}
</span></div>"#
        )
    }

    #[test]
    fn test_meta_tag_mapping() {
        assert_eq!(MetaTag::from_label("標題"), Some(MetaTag::Title));
        assert_eq!(MetaTag::from_label("時間"), Some(MetaTag::Time));
        assert_eq!(MetaTag::from_label("作者"), Some(MetaTag::Author));
        assert_eq!(MetaTag::from_label("看板"), None);
        assert_eq!(MetaTag::from_label(""), None);
    }

    #[test]
    fn test_parse_full_post() {
        let pushes = format!(
            "{}{}",
            push("推", "alice", ": 說得好", "1.1.1.1 01/01 12:30"),
            push("噓", "bob", ": 不同意", "01/01 12:31")
        );
        let html = post_page("[討論] 測試標題", "這是文章的內文，長度足夠通過檢查。", &pushes);

        let candidate = parse_post(&html, URL, "KMT").unwrap();

        assert_eq!(candidate.title.as_deref(), Some("[討論] 測試標題"));
        assert_eq!(candidate.time.as_deref(), Some("Mon Jan  1 12:00:00 2024"));
        assert_eq!(candidate.author.as_deref(), Some("tester (測試者)"));
        assert_eq!(candidate.url, URL);
        assert_eq!(candidate.subforum, "KMT");
        assert_eq!(candidate.comments.len(), 2);
        assert_eq!(candidate.comments[0].userid, "alice");
        assert_eq!(candidate.comments[0].push_tag.as_deref(), Some("推"));
        assert_eq!(candidate.comments[0].content.as_deref(), Some(": 說得好"));
        assert_eq!(candidate.comments[0].ipdatetime, "1.1.1.1 01/01 12:30");
        assert_eq!(candidate.comments[1].userid, "bob");
    }

    #[test]
    fn test_body_excludes_metadata_pushes_and_decorations() {
        let html = post_page(
            "[討論] 測試標題",
            "這是文章的內文，長度足夠通過檢查。",
            &push("推", "alice", ": 說得好", "01/01 12:30"),
        );

        let candidate = parse_post(&html, URL, "KMT").unwrap();

        assert!(candidate.content.contains("這是文章的內文"));
        assert!(!candidate.content.contains("測試標題"));
        assert!(!candidate.content.contains("作者"));
        assert!(!candidate.content.contains("alice"));
        assert!(!candidate.content.contains("發信站"));
        assert!(!candidate.content.contains("簽名檔"));
        // the right-hand board line is not a metaline and stays in the body
        assert!(candidate.content.starts_with("看板KMT"));
        assert!(candidate.content.ends_with("--"));
    }

    #[test]
    fn test_missing_main_content() {
        let html = r#"<html><body><div class="bbs-screen">影片頁面</div></body></html>"#;
        assert!(parse_post(html, URL, "KMT").is_none());
    }

    #[test]
    fn test_missing_title_yields_no_record() {
        let html = r#"<html><body><div id="main-content"><div class="article-metaline"><span class="article-meta-tag">時間</span><span class="article-meta-value">Mon Jan  1 12:00:00 2024</span></div>這是文章的內文，長度足夠通過檢查。</div></body></html>"#;

        let candidate = parse_post(html, URL, "KMT").unwrap();
        assert!(candidate.title.is_none());
        assert!(extract_post(html, URL, "KMT", &ContentValidator::default()).is_none());
    }

    #[test]
    fn test_missing_author_is_tolerated() {
        let html = r#"<html><body><div id="main-content"><div class="article-metaline"><span class="article-meta-tag">標題</span><span class="article-meta-value">[問題] 沒有作者</span></div><div class="article-metaline"><span class="article-meta-tag">時間</span><span class="article-meta-value">Mon Jan  1 12:00:00 2024</span></div>這是文章的內文，長度足夠通過檢查。</div></body></html>"#;

        let record = extract_post(html, URL, "KMT", &ContentValidator::default()).unwrap();
        assert!(record.author.is_none());
        assert_eq!(record.title, "[問題] 沒有作者");
    }

    #[test]
    fn test_incomplete_comment_dropped_but_post_kept() {
        let broken = r#"<div class="push"><span class="hl push-tag">→ </span><span class="f3 push-content">: 無名</span></div>"#;
        let pushes = format!("{}{}", broken, push("推", "carol", ": 好", "01/02 08:00"));
        let html = post_page("[討論] 測試標題", "這是文章的內文，長度足夠通過檢查。", &pushes);

        let record = extract_post(&html, URL, "KMT", &ContentValidator::default()).unwrap();

        assert_eq!(record.comments.len(), 1);
        assert_eq!(record.comments[0].userid, "carol");
        // the dropped push is still stripped from the body
        assert!(!record.content.contains("無名"));
    }

    #[test]
    fn test_extract_comments_empty_container() {
        let document = Html::parse_fragment("<div></div>");
        let selector = Selector::parse("div").unwrap();
        let container = document.select(&selector).next().unwrap();

        let (comments, elements) = extract_comments(container);
        assert!(comments.is_empty());
        assert!(elements.is_empty());
    }

    #[test]
    fn test_comment_without_optional_fields() {
        let document = Html::parse_fragment(
            r#"<div><div class="push"><span class="push-userid">dave</span><span class="push-ipdatetime">01/03 09:00</span></div></div>"#,
        );
        let selector = Selector::parse("div").unwrap();
        let container = document.select(&selector).next().unwrap();

        let (comments, elements) = extract_comments(container);
        assert_eq!(elements.len(), 1);
        assert_eq!(
            comments,
            vec![CommentRecord {
                push_tag: None,
                userid: "dave".to_string(),
                content: None,
                ipdatetime: "01/03 09:00".to_string(),
            }]
        );
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = post_page(
            "[討論] 測試標題",
            "這是文章的內文，長度足夠通過檢查。",
            &push("推", "alice", ": 說得好", "01/01 12:30"),
        );
        let validator = ContentValidator::default();

        let first = extract_post(&html, URL, "KMT", &validator);
        let second = extract_post(&html, URL, "KMT", &validator);

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_announcement_rejected() {
        let html = post_page("[公告] 板規修訂", "這是文章的內文，長度足夠通過檢查。", "");
        assert!(extract_post(&html, URL, "KMT", &ContentValidator::default()).is_none());
    }
}
