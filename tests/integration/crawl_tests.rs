//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the news site and exercise the
//! transport, search pagination, crawl mode and the full download cycle end-to-end.
//! Slow media transfers are served from a raw socket.

use bbc_harvest::config::{Config, HttpConfig};
use bbc_harvest::crawler::{
    Coordinator, HttpTransport, MediaDownloader, Pacer, RetryPolicy, RunMode, SearchPaginator,
    SearchQuery, SearchTermination, Transport,
};
use bbc_harvest::output::load_search_results;
use bbc_harvest::storage::{DedupStore, DownloadedSet, MemoryDedupStore};
use bbc_harvest::url::url_hash;
use bbc_harvest::{DownloadReport, MediaFailure, MediaKind, SearchHit, TransportError};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Transport with no backoff so retry tests run instantly
fn fast_transport(max_attempts: u32) -> HttpTransport {
    let config = HttpConfig {
        max_attempts,
        backoff_factor: 0.0,
        ..HttpConfig::default()
    };
    HttpTransport::from_config(&config).expect("Failed to build transport")
}

/// Creates a test configuration pointed at the mock server, writing under `dir`
fn create_test_config(server_uri: &str, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.base_url = server_uri.to_string();
    config.site.search_url = format!("{}/search", server_uri);

    config.politeness.request_delay_min = 0.0;
    config.politeness.request_delay_max = 0.0;
    config.politeness.batch_pause = 0.0;
    config.http.backoff_factor = 0.0;

    let root = dir.path();
    let under = |name: &str| root.join(name).to_string_lossy().to_string();
    config.output.articles_dir = under("articles");
    config.output.images_dir = under("images");
    config.output.videos_dir = under("videos");
    config.output.report_path = under("download_report.json");
    config.output.search_results_path = under("advanced_search_results.json");
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn results_page(items: &[(&str, &str)]) -> String {
    let containers: String = items
        .iter()
        .map(|(href, title)| {
            format!(
                r#"<div class="ssrcss-1v7bxtk-StyledContainer"><a href="{}"><h3>{}</h3></a></div>"#,
                href, title
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", containers)
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_retry_until_success() {
    let mock_server = MockServer::start().await;

    // Three transient failures...
    Mock::given(method("GET"))
        .and(path("/news/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&mock_server)
        .await;

    // ...then the page
    Mock::given(method("GET"))
        .and(path("/news/flaky"))
        .respond_with(html("<article><p>Finally</p></article>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = fast_transport(5);
    let response = transport
        .get(&format!("{}/news/flaky", mock_server.uri()), &[])
        .await
        .expect("Fourth attempt should succeed");

    assert_eq!(response.status, 200);
    assert!(response.text().await.unwrap().contains("Finally"));
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let transport = fast_transport(3);
    let result = transport
        .get(&format!("{}/news/down", mock_server.uri()), &[])
        .await;

    match result {
        Err(TransportError::RetriesExhausted { attempts, last, .. }) => {
            assert_eq!(attempts, 3);
            assert!(last.contains("503"));
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/news/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport = fast_transport(5);
    let result = transport
        .get(&format!("{}/news/gone", mock_server.uri()), &[])
        .await;

    assert!(matches!(
        result,
        Err(TransportError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_retry_policy_from_config() {
    let transport = fast_transport(4);
    assert_eq!(
        transport.policy(),
        RetryPolicy {
            max_attempts: 4,
            backoff_factor: 0.0
        }
    );
}

#[tokio::test]
async fn test_pagination_stops_at_empty_page() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    for page in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "China space"))
            .and(query_param("page", page))
            .and(query_param("category", "news"))
            .respond_with(html(&results_page(&[(
                &format!("/news/page-{}", page),
                "Result",
            )])))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "3"))
        .respond_with(html("<html><body><p>No results found</p></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Must never be requested
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "4"))
        .respond_with(html(&results_page(&[("/news/never", "Never")])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let transport: Arc<dyn Transport> = Arc::new(fast_transport(1));
    let paginator = SearchPaginator::new(
        transport,
        format!("{}/search", base),
        Url::parse(&base).unwrap(),
        Pacer::immediate(),
    );

    let mut session = paginator.search(&SearchQuery::new("China space", 10));
    let hits = session.collect_hits().await;

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, format!("{}/news/page-1", base));
    assert_eq!(
        session.termination(),
        Some(SearchTermination::PagesExhausted { page: 3 })
    );
}

#[tokio::test]
async fn test_three_containers_two_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let page = r#"
        <html><body>
        <div class="ssrcss-1v7bxtk-StyledContainer"><a href="/news/world-asia-china-1"><h3>Long March launch</h3></a></div>
        <div class="ssrcss-1v7bxtk-StyledContainer"><a><h3>Sponsored</h3></a></div>
        <div class="ssrcss-1v7bxtk-StyledContainer"><a href="/news/science-environment-2"></a></div>
        </body></html>
    "#;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "China space"))
        .and(query_param("page", "1"))
        .respond_with(html(page))
        .expect(1)
        .mount(&mock_server)
        .await;

    let transport: Arc<dyn Transport> = Arc::new(fast_transport(1));
    let paginator = SearchPaginator::new(
        transport,
        format!("{}/search", base),
        Url::parse(&base).unwrap(),
        Pacer::immediate(),
    );

    let mut session = paginator.search(&SearchQuery::new("China space", 1));
    let hits = session.collect_hits().await;

    assert_eq!(
        hits,
        vec![
            SearchHit::new(format!("{}/news/world-asia-china-1", base), "Long March launch"),
            SearchHit::new(format!("{}/news/science-environment-2", base), "No Title"),
        ]
    );
    assert_eq!(session.termination(), Some(SearchTermination::MaxPagesReached));
}

#[tokio::test]
async fn test_title_without_body_writes_nothing() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/news/launch"))
        .respond_with(html(
            r#"<html><head><meta property="og:title" content="Mission Launch — BBC"></head>
               <body><span>Video only</span></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base, &dir);
    let mut coordinator = Coordinator::new(config).unwrap();

    let report = coordinator
        .run_download(vec![SearchHit::new(
            format!("{}/news/launch", base),
            "Mission Launch",
        )])
        .await
        .unwrap();

    assert_eq!(report.total_articles, 0);
    assert!(files_in(&dir.path().join("articles")).is_empty());
    assert!(!coordinator
        .downloaded()
        .articles
        .seen(&format!("{}/news/launch", base))
        .unwrap());
}

#[tokio::test]
async fn test_small_image_skipped_and_default_extension() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    let article = r#"
        <html><body>
        <h1 class="ssrcss-15xko80-StyledHeading">Tianwen-1 reaches Mars</h1>
        <article>
            <div class="story"><p>The probe entered orbit.</p><p>Landing follows in May.</p></div>
            <img src="/media/icon.png" width="50">
            <figure><img src="/media/orbit"><figcaption>The orbiter</figcaption></figure>
        </article>
        </body></html>
    "#;

    Mock::given(method("GET"))
        .and(path("/news/tianwen"))
        .respond_with(html(article))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/icon.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 16]))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/orbit"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base, &dir);
    let mut coordinator = Coordinator::new(config).unwrap();

    let report = coordinator
        .run_download(vec![SearchHit::new(format!("{}/news/tianwen", base), "No Title")])
        .await
        .unwrap();

    assert_eq!(report.total_articles, 1);
    assert_eq!(report.articles[0].title, "Tianwen-1 reaches Mars");
    assert_eq!(report.articles[0].images, 1);

    let image_name = format!("{}.jpg", url_hash(&format!("{}/media/orbit", base)));
    assert_eq!(files_in(&dir.path().join("images")), vec![image_name.clone()]);

    let text = std::fs::read_to_string(
        dir.path()
            .join("articles")
            .join("Tianwen-1 reaches Mars.txt"),
    )
    .unwrap();
    assert_eq!(
        text,
        format!(
            "标题: Tianwen-1 reaches Mars\n网址: {}/news/tianwen\n\n正文内容:\nThe probe entered orbit.\n\nLanding follows in May.\n\n图片列表:\n1. {} - The orbiter\n",
            base, image_name
        )
    );
}

#[tokio::test]
async fn test_rerun_with_persistent_dedup_is_idempotent() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // Fetched by the first run only
    Mock::given(method("GET"))
        .and(path("/news/station"))
        .respond_with(html(
            "<h1>Tiangong completed</h1><article><p>Final module docked.</p></article>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base, &dir);
    config.dedup.database_path = Some(dir.path().join("seen.db").to_string_lossy().to_string());

    let hits = vec![SearchHit::new(format!("{}/news/station", base), "Tiangong")];

    let first = Coordinator::new(config.clone())
        .unwrap()
        .run_download(hits.clone())
        .await
        .unwrap();
    assert_eq!(first.total_articles, 1);

    let second = Coordinator::new(config)
        .unwrap()
        .run_download(hits)
        .await
        .unwrap();
    assert_eq!(second.total_articles, 0);

    assert_eq!(
        files_in(&dir.path().join("articles")),
        vec!["Tiangong completed.txt".to_string()]
    );
}

#[tokio::test]
async fn test_shared_media_downloaded_once() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    for slug in ["a", "b"] {
        Mock::given(method("GET"))
            .and(path(format!("/news/{}", slug)))
            .respond_with(html(&format!(
                r#"<h1>Story {}</h1><article><div class="story"><p>Text {}</p></div><img src="/media/shared.png"></article>"#,
                slug, slug
            )))
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/media/shared.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8; 512], "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base, &dir);
    let transport: Arc<dyn Transport> = Arc::new(fast_transport(1));
    let downloaded = DownloadedSet {
        articles: Arc::new(MemoryDedupStore::new()),
        media: Arc::new(MemoryDedupStore::new()),
    };
    let mut coordinator = Coordinator::with_transport(config, transport, downloaded).unwrap();

    let report = coordinator
        .run_download(vec![
            SearchHit::new(format!("{}/news/a", base), "A"),
            SearchHit::new(format!("{}/news/b", base), "B"),
        ])
        .await
        .unwrap();

    assert_eq!(report.total_articles, 2);
    assert_eq!(report.articles[0].images, 1);
    assert_eq!(report.articles[1].images, 0);
    assert_eq!(files_in(&dir.path().join("images")).len(), 1);
}

#[tokio::test]
async fn test_search_mode_writes_deduplicated_results() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .and(query_param("start_date", "2018-01-01"))
        .and(query_param("end_date", "2023-12-31"))
        .respond_with(html(&results_page(&[
            ("/news/mars-1", "Zhurong rover"),
            ("/news/mars-2", "Tianwen orbit"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .and(query_param("start_date", "2013-01-01"))
        .respond_with(html(&results_page(&[
            ("/news/mars-1", "Zhurong rover"),
            ("/news/moon-1", "Chang'e 5"),
        ])))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base, &dir);
    config.search.queries.retain(|q| {
        q.keyword == "China mars mission" || q.keyword == "China moon mission"
    });
    for query in &mut config.search.queries {
        query.max_pages = Some(1);
    }

    let mut coordinator = Coordinator::new(config.clone()).unwrap();
    let unique = coordinator.run_search().await.unwrap();

    assert_eq!(unique.len(), 3);
    let saved = load_search_results(Path::new(&config.output.search_results_path)).unwrap();
    assert_eq!(saved, unique);
}

/// Serves one `video/mp4` response that announces `total` bytes but writes only
/// `sent`, one byte every `gap`, then holds the connection open
async fn trickle_server(total: usize, sent: usize, gap: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            total
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for _ in 0..sent {
            tokio::time::sleep(gap).await;
            if socket.write_all(b"v").await.is_err() || socket.flush().await.is_err() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    addr
}

fn video_downloader(
    addr: SocketAddr,
    dir: &TempDir,
    seen: Arc<MemoryDedupStore>,
) -> MediaDownloader {
    let config = HttpConfig {
        max_attempts: 1,
        backoff_factor: 0.0,
        timeout_secs: 1,
        ..HttpConfig::default()
    };
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config).unwrap());
    MediaDownloader::new(
        transport,
        seen,
        Url::parse(&format!("http://{}", addr)).unwrap(),
        dir.path().join("images"),
        dir.path().join("videos"),
    )
}

#[tokio::test]
async fn test_slow_video_outlasting_read_timeout_completes() {
    let addr = trickle_server(8, 8, Duration::from_millis(300)).await;
    let dir = TempDir::new().unwrap();
    let downloader = video_downloader(addr, &dir, Arc::new(MemoryDedupStore::new()));
    let page = Url::parse(&format!("http://{}/news/launch", addr)).unwrap();

    let started = Instant::now();
    let media = downloader
        .try_fetch_asset("/clip", &page, MediaKind::Video)
        .await
        .expect("A live transfer must not time out")
        .expect("Asset was not claimed before");

    // Longer than the one-second read timeout in total
    assert!(started.elapsed() > Duration::from_secs(2));
    assert!(media.local_filename.ends_with(".mp4"));
    let saved = std::fs::read(dir.path().join("videos").join(&media.local_filename)).unwrap();
    assert_eq!(saved, b"vvvvvvvv");
}

#[tokio::test]
async fn test_stalled_video_fails_and_releases_claim() {
    let addr = trickle_server(8, 2, Duration::from_millis(50)).await;
    let dir = TempDir::new().unwrap();
    let seen = Arc::new(MemoryDedupStore::new());
    let downloader = video_downloader(addr, &dir, seen.clone());
    let page = Url::parse(&format!("http://{}/news/launch", addr)).unwrap();

    let result = downloader
        .try_fetch_asset("/clip", &page, MediaKind::Video)
        .await;

    assert!(matches!(
        result,
        Err(MediaFailure::Transport(TransportError::Body { .. }))
    ));
    assert!(!seen.seen(&format!("http://{}/clip", addr)).unwrap());
    assert!(files_in(&dir.path().join("videos")).is_empty());
}

fn story(title: &str) -> ResponseTemplate {
    html(&format!(
        "<h1>{}</h1><article><div class=\"story\"><p>{} in detail.</p></div></article>",
        title, title
    ))
}

async fn mount_results(server: &MockServer, keyword: &str, page: &str, items: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", keyword))
        .and(query_param("page", page))
        .respond_with(html(&results_page(items)))
        .expect(1)
        .mount(server)
        .await;
}

fn read_report(config: &Config) -> DownloadReport {
    let raw = std::fs::read_to_string(&config.output.report_path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_crawl_mode_handles_overlapping_keywords() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    mount_results(
        &mock_server,
        "China moon",
        "1",
        &[("/news/moon-1", "Moon one"), ("/news/shared", "Shared")],
    )
    .await;
    mount_results(&mock_server, "China moon", "2", &[]).await;
    mount_results(
        &mock_server,
        "China mars",
        "1",
        &[("/news/shared", "Shared"), ("/news/mars-1", "Mars one")],
    )
    .await;
    mount_results(&mock_server, "China mars", "2", &[("/news/mars-2", "Mars two")]).await;

    // Neither keyword may go past its stopping page
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "3"))
        .respond_with(html(&results_page(&[("/news/never", "Never")])))
        .expect(0)
        .mount(&mock_server)
        .await;

    for (slug, title) in [
        ("moon-1", "Chang'e 6 lands"),
        ("shared", "Space station crew returns"),
        ("mars-1", "Zhurong wakes"),
        ("mars-2", "Tianwen-2 planned"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/news/{}", slug)))
            .respond_with(story(title))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&base, &dir);
    config.search.keywords = vec!["China moon".to_string(), "China mars".to_string()];
    config.search.max_pages = 2;

    let mut coordinator = Coordinator::new(config.clone()).unwrap();
    coordinator.run(RunMode::Crawl).await.unwrap();

    let report = read_report(&config);
    let titles: Vec<&str> = report.articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(report.total_articles, 4);
    assert_eq!(
        titles,
        vec![
            "Chang'e 6 lands",
            "Space station crew returns",
            "Zhurong wakes",
            "Tianwen-2 planned"
        ]
    );
    assert_eq!(
        files_in(&dir.path().join("articles"))
            .iter()
            .filter(|name| name.starts_with("Space station crew returns"))
            .count(),
        1
    );
    assert_eq!(coordinator.stats().keywords_searched, 2);
    assert_eq!(coordinator.stats().written(), 4);
}

#[tokio::test]
async fn test_parallel_workers_fetch_each_url_once() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();

    let slugs = ["r1", "r2", "r3", "r4", "r5", "r6"];
    let mut items: Vec<(String, &str)> = slugs
        .iter()
        .map(|slug| (format!("/news/{}", slug), "Long March"))
        .collect();
    items.push(("/news/r3".to_string(), "Long March again"));
    let borrowed: Vec<(&str, &str)> = items.iter().map(|(h, t)| (h.as_str(), *t)).collect();
    mount_results(&mock_server, "Chinese rockets", "1", &borrowed).await;

    // Every article shares one headline, so the names must be made unique
    for slug in slugs {
        Mock::given(method("GET"))
            .and(path(format!("/news/{}", slug)))
            .respond_with(story("Long March 5 launch").set_delay(Duration::from_millis(50)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&base, &dir);
    config.search.keywords = vec!["Chinese rockets".to_string()];
    config.search.max_pages = 1;
    config.crawler.workers = 4;
    config.politeness.batch_size = 3;

    let mut coordinator = Coordinator::new(config.clone()).unwrap();
    coordinator.run(RunMode::Crawl).await.unwrap();

    let report = read_report(&config);
    assert_eq!(report.total_articles, 6);

    let names: HashSet<String> = report.articles.iter().map(|a| a.filename.clone()).collect();
    assert_eq!(names.len(), 6);
    assert!(names.contains("Long March 5 launch.txt"));

    let on_disk = files_in(&dir.path().join("articles"));
    assert_eq!(on_disk.len(), 6);
    assert!(on_disk.iter().all(|name| names.contains(name)));
}
