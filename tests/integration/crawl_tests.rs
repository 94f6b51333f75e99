//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small sub-forum and run the full
//! discover, collect and extract cycle against it.

use ptt_harvest::config::{Config, CrawlerConfig, ForumConfig, HttpConfig};
use ptt_harvest::crawler::{run_crawl, BoardUrls, Coordinator, PageFetcher};
use ptt_harvest::anonymise::{AnonymiseMethod, UserAnonymiser};
use ptt_harvest::output::{CsvOutput, OutputHandler, SplitCsvOutput};
use ptt_harvest::record::CrawlResult;
use ptt_harvest::HarvestError;
use ptt_harvest::{CrawlError, DiscoveryError, FetchError};
use std::collections::BTreeSet;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, without backoff sleeps
fn create_test_config(base_url: &str) -> Config {
    Config {
        forum: ForumConfig {
            base_url: base_url.to_string(),
            subforums: vec!["KMT".to_string()],
        },
        http: HttpConfig {
            timeout_secs: 5,
            max_retries: 3,
            backoff_min_ms: 0,
            backoff_max_ms: 0,
            ..Default::default()
        },
        crawler: CrawlerConfig {
            url_workers: 4,
            post_workers: 4,
            min_content_length: 10,
        },
        ..Default::default()
    }
}

fn entry_page(last_index: u32) -> String {
    format!(
        r#"<html><body><div class="btn-group btn-group-paging">
<a class="btn wide" href="/bbs/KMT/index1.html">最舊</a>
<a class="btn wide" href="/bbs/KMT/index{last_index}.html">‹ 上頁</a>
<a class="btn wide disabled">下頁 ›</a>
</div></body></html>"#
    )
}

fn index_page(post_ids: &[u32]) -> String {
    let entries: String = post_ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="r-ent"><div class="title"><a href="/bbs/KMT/M.{id}.A.html">[討論] 文章 {id}</a></div></div>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>{entries}<div class="r-ent"><div class="title">(本文已被刪除)</div></div></body></html>"#
    )
}

fn post_page(title: &str, author: &str) -> String {
    format!(
        r#"<html><body><div id="main-content"><div class="article-metaline"><span class="article-meta-tag">作者</span><span class="article-meta-value">{author}</span></div><div class="article-metaline"><span class="article-meta-tag">標題</span><span class="article-meta-value">{title}</span></div><div class="article-metaline"><span class="article-meta-tag">時間</span><span class="article-meta-value">Mon Jan  1 12:00:00 2024</span></div>
這是一篇內容充足的測試文章，用來通過長度檢查。
--
<span class="f2">※ 發信站: 批踢踢實業坊(ptt.cc)</span>
<div class="push"><span class="push-tag">推 </span><span class="push-userid">reader</span><span class="push-content">: 好文</span><span class="push-ipdatetime"> 01/01 13:00</span></div>
</div></body></html>"#
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves an entry page, three index pages with two posts each and the six posts
async fn mount_board(server: &MockServer) {
    mount_html(server, "/bbs/KMT/", entry_page(3)).await;
    mount_html(server, "/bbs/KMT/index1.html", index_page(&[1, 2])).await;
    mount_html(server, "/bbs/KMT/index2.html", index_page(&[3, 4])).await;
    mount_html(server, "/bbs/KMT/index3.html", index_page(&[5, 6])).await;

    for id in 1..=6u32 {
        let title = if id == 4 {
            "[公告] 板規".to_string()
        } else {
            format!("[討論] 文章 {}", id)
        };
        mount_html(
            server,
            &format!("/bbs/KMT/M.{}.A.html", id),
            post_page(&title, &format!("user{} (User {})", id, id)),
        )
        .await;
    }
}

fn coordinator(config: &Config) -> Coordinator {
    Coordinator::new(config).expect("Failed to build coordinator")
}

#[tokio::test]
async fn test_full_crawl_single_subforum() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config)
        .crawl("KMT")
        .await
        .expect("Crawl should succeed");

    // six posts listed, the announcement is filtered out
    assert_eq!(result.len(), 5);
    assert!(result.iter().all(|p| !p.title.contains("公告")));
    assert!(result.iter().all(|p| p.subforum == "KMT"));
    assert!(result.iter().all(|p| p.content.chars().count() >= 10));
    assert_eq!(result.comment_count(), 5);

    let urls: BTreeSet<_> = result.iter().map(|p| p.url.clone()).collect();
    assert_eq!(urls.len(), 5);
    assert!(urls.contains(&format!("{}/bbs/KMT/M.1.A.html", mock_server.uri())));
    assert!(!urls.contains(&format!("{}/bbs/KMT/M.4.A.html", mock_server.uri())));

    let post = result
        .iter()
        .find(|p| p.url.ends_with("M.2.A.html"))
        .expect("post 2 should be kept");
    assert_eq!(post.author.as_deref(), Some("user2 (User 2)"));
    assert_eq!(post.time, "Mon Jan  1 12:00:00 2024");
    assert_eq!(post.comments[0].userid, "reader");
    assert!(!post.content.contains("發信站"));
    assert!(!post.content.contains("reader"));
}

#[tokio::test]
async fn test_crawl_result_written_to_csv() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("KMT_data.csv");
    CsvOutput::new(&csv_path).write(&result).unwrap();

    let text = std::fs::read_to_string(&csv_path).unwrap();
    assert!(text.starts_with("author,title,time,content,url,subforum,comments\n"));
    assert!(text.contains("reader"));
}

#[tokio::test]
async fn test_missing_navigation_aborts_after_one_request() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/bbs/KMT/",
        "<html><body><p>no paging here</p></body></html>".to_string(),
    )
    .await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await;

    assert!(matches!(
        result,
        Err(CrawlError::Discovery(DiscoveryError::NavigationNotFound))
    ));

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bbs/KMT/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await;

    assert!(matches!(
        result,
        Err(CrawlError::Discovery(DiscoveryError::Fetch(
            FetchError::Transient { attempts: 3, .. }
        )))
    ));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bbs/KMT/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await;

    assert!(matches!(
        result,
        Err(CrawlError::Discovery(DiscoveryError::Fetch(
            FetchError::NotFound { .. }
        )))
    ));
}

#[tokio::test]
async fn test_unparseable_page_count() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/bbs/KMT/",
        r#"<a class="btn wide" href="/bbs/KMT/latest.html">‹ 上頁</a>"#.to_string(),
    )
    .await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await;

    assert!(matches!(
        result,
        Err(CrawlError::Discovery(
            DiscoveryError::PageCountUnparseable { .. }
        ))
    ));
}

#[tokio::test]
async fn test_url_set_independent_of_pool_size() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let coordinator = coordinator(&config);
    let board = BoardUrls::new(&config.forum.base_url, "KMT").unwrap();

    let serial: BTreeSet<_> = coordinator
        .collect_urls(&board, 3, 1)
        .await
        .into_iter()
        .collect();
    let parallel: BTreeSet<_> = coordinator
        .collect_urls(&board, 3, 20)
        .await
        .into_iter()
        .collect();

    assert_eq!(serial.len(), 6);
    assert_eq!(serial, parallel);
}

#[tokio::test]
async fn test_failed_index_page_is_skipped() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bbs/KMT/index2.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await.unwrap();

    // posts 3 and 4 were only listed on the missing page
    let urls: BTreeSet<_> = result.iter().map(|p| p.url.clone()).collect();
    assert_eq!(result.len(), 4);
    assert!(!urls.iter().any(|u| u.ends_with("M.3.A.html")));
}

#[tokio::test]
async fn test_failing_post_is_dropped() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bbs/KMT/M.1.A.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await.unwrap();

    assert_eq!(result.len(), 4);
    assert!(result.iter().all(|p| !p.url.ends_with("M.1.A.html")));
}

#[tokio::test]
async fn test_no_valid_posts_is_an_error() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/bbs/KMT/", entry_page(1)).await;
    mount_html(&mock_server, "/bbs/KMT/index1.html", index_page(&[1, 2])).await;
    mount_html(
        &mock_server,
        "/bbs/KMT/M.1.A.html",
        post_page("[公告] 板規", "admin"),
    )
    .await;
    mount_html(
        &mock_server,
        "/bbs/KMT/M.2.A.html",
        post_page("[轉錄] 別板文章", "someone"),
    )
    .await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await;

    assert!(matches!(result, Err(CrawlError::NoDataExtracted)));
}

#[tokio::test]
async fn test_empty_index_pages_is_an_error() {
    let mock_server = MockServer::start().await;
    mount_html(&mock_server, "/bbs/KMT/", entry_page(2)).await;
    mount_html(&mock_server, "/bbs/KMT/index1.html", index_page(&[])).await;
    mount_html(&mock_server, "/bbs/KMT/index2.html", index_page(&[])).await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await;

    assert!(matches!(result, Err(CrawlError::NoUrlsCollected)));
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bbs/KMT/M.9.A.html"))
        .and(wiremock::matchers::header("cookie", "over18=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(post_page("[討論] 標頭", "hdr")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config
        .http
        .headers
        .insert("Cookie".to_string(), "over18=1".to_string());

    let fetcher = PageFetcher::from_config(&config.http).unwrap();
    let body = fetcher
        .fetch(&format!("{}/bbs/KMT/M.9.A.html", mock_server.uri()))
        .await
        .unwrap();
    assert!(body.contains("[討論] 標頭"));
}

#[tokio::test]
async fn test_run_crawl_from_config() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let result = run_crawl(&config, "KMT").await.unwrap();
    assert_eq!(result.len(), 5);
    assert_eq!(result.subforum(), Some("KMT"));

    let missing = run_crawl(&config, "DPP").await;
    assert!(matches!(
        missing,
        Err(HarvestError::Crawl(CrawlError::Discovery(
            DiscoveryError::Fetch(FetchError::NotFound { .. })
        )))
    ));
}

#[tokio::test]
async fn test_undecodable_body_is_malformed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bbs/KMT/M.7.A.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(b"this is not a gzip stream".to_vec()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let fetcher = PageFetcher::from_config(&config.http).unwrap();
    let url = format!("{}/bbs/KMT/M.7.A.html", mock_server.uri());

    let result = fetcher.fetch(&url).await;
    match result {
        Err(FetchError::Malformed { url: failed, .. }) => assert_eq!(failed, url),
        other => panic!("expected a malformed body error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_anonymised_split_tables_hide_user_names() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let result = coordinator(&config).crawl("KMT").await.unwrap();

    let mut anonymiser = UserAnonymiser::new(AnonymiseMethod::Sequential, 42, 8);
    let anonymised = anonymiser.anonymise_result(&result);
    let combined = CrawlResult::concat([anonymised]);

    let dir = tempfile::tempdir().unwrap();
    let posts = dir.path().join("main_data.csv");
    let comments = dir.path().join("comments_data.csv");
    SplitCsvOutput::new(&posts, &comments)
        .write(&combined)
        .unwrap();

    let post_text = std::fs::read_to_string(&posts).unwrap();
    let comment_text = std::fs::read_to_string(&comments).unwrap();
    assert!(!post_text.contains("user2 (User 2)"));
    assert!(!comment_text.contains("reader"));
    assert_eq!(comment_text.lines().count(), 1 + combined.comment_count());

    // five authors plus the one commenter
    assert_eq!(anonymiser.mapping().len(), 6);
    let reader_id = &anonymiser.mapping()["reader"];
    assert!(combined
        .iter()
        .all(|p| p.comments.iter().all(|c| &c.userid == reader_id)));
}
