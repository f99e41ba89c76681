//! Keyword search pagination
//!
//! A [`SearchSession`] walks the result pages of one query lazily, one request per
//! `next_page()` call, and records why it stopped.

use crate::config::{parse_date, QueryEntry};
use crate::crawler::fetcher::Transport;
use crate::crawler::scheduler::Pacer;
use crate::models::{SearchHit, NO_TITLE};
use crate::state::KeywordState;
use crate::storage::DedupStore;
use crate::url::resolve_link;
use crate::ConfigError;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Result container selectors, one per generation of the search page markup
const RESULT_CONTAINER_SELECTORS: &[&str] = &[
    "div.ssrcss-1v7bxtk-StyledContainer",
    "div.ssrcss-1qt4x4l-PromoContent",
    "div.PromoContent",
    "div.search-results",
];

const RESULT_TITLE_SELECTORS: &[&str] = &["h3", "h2", "span.promo-heading__title"];

/// One keyword query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_pages: u32,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>, max_pages: u32) -> Self {
        Self {
            keyword: keyword.into(),
            start_date: None,
            end_date: None,
            max_pages,
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Builds a query from a configured entry, falling back to `default_max_pages`
    pub fn from_entry(entry: &QueryEntry, default_max_pages: u32) -> Result<Self, ConfigError> {
        let start = entry.start_date.as_deref().map(parse_date).transpose()?;
        let end = entry.end_date.as_deref().map(parse_date).transpose()?;

        Ok(Self::new(
            entry.keyword.clone(),
            entry.max_pages.unwrap_or(default_max_pages),
        )
        .with_dates(start, end))
    }

    /// Query string parameters for the given page
    pub fn params(&self, page: u32, category: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("q".to_string(), self.keyword.clone()),
            ("page".to_string(), page.to_string()),
        ];
        if let Some(start) = self.start_date {
            params.push(("start_date".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        params.push(("category".to_string(), category.to_string()));
        params
    }
}

/// Why a search session stopped requesting pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTermination {
    /// The given page had no recognizable result container
    PagesExhausted { page: u32 },

    /// Every page up to `max_pages` was requested
    MaxPagesReached,
}

impl From<SearchTermination> for KeywordState {
    fn from(termination: SearchTermination) -> Self {
        match termination {
            SearchTermination::PagesExhausted { page } => KeywordState::PagesExhausted { page },
            SearchTermination::MaxPagesReached => KeywordState::MaxPagesReached,
        }
    }
}

/// Parses one search results page
///
/// Returns `None` when no selector of the container cascade matches, which callers
/// treat as the end of the results. Containers without a usable link are skipped.
///
/// # Example
///
/// ```
/// use bbc_harvest::crawler::parse_search_page;
/// use url::Url;
///
/// let html = r#"<div class="PromoContent"><a href="/news/a"><h3>Launch</h3></a></div>"#;
/// let base = Url::parse("https://www.bbc.com").unwrap();
/// let hits = parse_search_page(html, &base).unwrap();
/// assert_eq!(hits[0].url, "https://www.bbc.com/news/a");
/// assert_eq!(hits[0].title, "Launch");
/// ```
pub fn parse_search_page(html: &str, site_base: &Url) -> Option<Vec<SearchHit>> {
    let document = Html::parse_document(html);

    let containers = RESULT_CONTAINER_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .map(|selector| document.select(&selector).collect::<Vec<_>>())
        .find(|matches| !matches.is_empty())?;

    let anchor = Selector::parse("a").ok()?;
    let title_selectors: Vec<Selector> = RESULT_TITLE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

    let hits = containers
        .into_iter()
        .filter_map(|container| {
            let href = container.select(&anchor).next()?.value().attr("href")?;
            let url = resolve_link(href, site_base)?;
            Some(SearchHit::new(url, result_title(container, &title_selectors)))
        })
        .collect();

    Some(hits)
}

fn result_title(container: ElementRef<'_>, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .find_map(|selector| container.select(selector).next())
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Issues paged search queries against the site search endpoint
pub struct SearchPaginator {
    transport: Arc<dyn Transport>,
    search_url: String,
    site_base: Url,
    category: String,
    pacer: Pacer,
    seen: Option<Arc<dyn DedupStore>>,
}

impl SearchPaginator {
    pub fn new(
        transport: Arc<dyn Transport>,
        search_url: impl Into<String>,
        site_base: Url,
        pacer: Pacer,
    ) -> Self {
        Self {
            transport,
            search_url: search_url.into(),
            site_base,
            category: "news".to_string(),
            pacer,
            seen: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Drops hits whose URL is already in `store`
    pub fn with_seen_filter(mut self, store: Arc<dyn DedupStore>) -> Self {
        self.seen = Some(store);
        self
    }

    /// Starts a fresh session at page 1
    pub fn search(&self, query: &SearchQuery) -> SearchSession<'_> {
        SearchSession {
            paginator: self,
            query: query.clone(),
            next_page: 1,
            delay_before_next: false,
            termination: None,
        }
    }

    fn is_seen(&self, url: &str) -> bool {
        match &self.seen {
            Some(store) => store.seen(url).unwrap_or_else(|e| {
                warn!("Dedup lookup failed for {}: {}", url, e);
                false
            }),
            None => false,
        }
    }
}

/// A lazy, non-restartable walk over the result pages of one query
pub struct SearchSession<'a> {
    paginator: &'a SearchPaginator,
    query: SearchQuery,
    next_page: u32,
    delay_before_next: bool,
    termination: Option<SearchTermination>,
}

impl SearchSession<'_> {
    /// Requests the next page
    ///
    /// # Returns
    ///
    /// * `Some(hits)` - The page was processed; a failed request yields an empty page
    /// * `None` - The session has terminated (see [`SearchSession::termination`])
    pub async fn next_page(&mut self) -> Option<Vec<SearchHit>> {
        if self.termination.is_some() {
            return None;
        }

        if self.next_page > self.query.max_pages {
            debug!(
                "'{}': reached max pages ({})",
                self.query.keyword, self.query.max_pages
            );
            self.termination = Some(SearchTermination::MaxPagesReached);
            return None;
        }

        let page = self.next_page;
        self.next_page += 1;

        let paginator = self.paginator;
        if self.delay_before_next {
            paginator.pacer.pause().await;
        }

        let params = self.query.params(page, &paginator.category);
        let body = match paginator.transport.get(&paginator.search_url, &params).await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };

        let html = match body {
            Ok(html) => html,
            Err(e) => {
                warn!(
                    "Search page {} for '{}' failed: {}",
                    page, self.query.keyword, e
                );
                self.delay_before_next = false;
                paginator.pacer.pause_batch().await;
                return Some(Vec::new());
            }
        };

        match parse_search_page(&html, &paginator.site_base) {
            None => {
                info!(
                    "'{}': no results on page {}, stopping",
                    self.query.keyword, page
                );
                self.termination = Some(SearchTermination::PagesExhausted { page });
                None
            }
            Some(hits) => {
                let total = hits.len();
                let fresh: Vec<SearchHit> = hits
                    .into_iter()
                    .filter(|hit| !paginator.is_seen(&hit.url))
                    .collect();
                debug!(
                    "'{}' page {}: {} results, {} new",
                    self.query.keyword,
                    page,
                    total,
                    fresh.len()
                );
                self.delay_before_next = true;
                Some(fresh)
            }
        }
    }

    /// Drains the remaining pages
    pub async fn collect_hits(&mut self) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        while let Some(page) = self.next_page().await {
            hits.extend(page);
        }
        hits
    }

    /// Why the session stopped, once it has
    pub fn termination(&self) -> Option<SearchTermination> {
        self.termination
    }

    /// Lifecycle state of the keyword driving this session
    pub fn keyword_state(&self) -> KeywordState {
        self.termination
            .map(KeywordState::from)
            .unwrap_or(KeywordState::Searching)
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchedResponse;
    use crate::storage::MemoryDedupStore;
    use crate::TransportError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn base() -> Url {
        Url::parse("https://www.bbc.com").unwrap()
    }

    /// Serves canned pages by the `page` query parameter and records requests
    struct PagedTransport {
        pages: Vec<Result<String, u16>>,
        requests: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl PagedTransport {
        fn new(pages: Vec<Result<String, u16>>) -> Self {
            Self {
                pages,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for PagedTransport {
        async fn get(
            &self,
            url: &str,
            query: &[(String, String)],
        ) -> Result<FetchedResponse, TransportError> {
            self.requests.lock().unwrap().push(query.to_vec());
            let page: usize = query
                .iter()
                .find(|(k, _)| k == "page")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap();
            match self.pages.get(page - 1) {
                Some(Ok(body)) => Ok(FetchedResponse::from_bytes(
                    url,
                    200,
                    Some("text/html".to_string()),
                    body.clone(),
                )),
                Some(Err(status)) => Err(TransportError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Ok(FetchedResponse::from_bytes(url, 200, None, "<html></html>")),
            }
        }
    }

    fn results_page(paths: &[&str]) -> String {
        let items: String = paths
            .iter()
            .map(|p| {
                format!(
                    r#"<div class="ssrcss-1v7bxtk-StyledContainer"><a href="{}"><h3>{}</h3></a></div>"#,
                    p, p
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", items)
    }

    #[test]
    fn test_container_without_href_skipped() {
        let html = r#"
            <div class="ssrcss-1v7bxtk-StyledContainer"><a href="/news/one"><h3>One</h3></a></div>
            <div class="ssrcss-1v7bxtk-StyledContainer"><a>Missing</a></div>
            <div class="ssrcss-1v7bxtk-StyledContainer"><a href="https://www.bbc.co.uk/news/two"><h2>Two</h2></a></div>
        "#;
        let hits = parse_search_page(html, &base()).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], SearchHit::new("https://www.bbc.com/news/one", "One"));
        assert_eq!(
            hits[1],
            SearchHit::new("https://www.bbc.co.uk/news/two", "Two")
        );
    }

    #[test]
    fn test_container_cascade_first_match_wins() {
        let html = r#"
            <div class="PromoContent"><a href="/news/legacy">Legacy</a></div>
            <div class="ssrcss-1qt4x4l-PromoContent"><a href="/news/modern">Modern</a></div>
        "#;
        let hits = parse_search_page(html, &base()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.bbc.com/news/modern");
    }

    #[test]
    fn test_title_cascade_and_default() {
        let html = r#"
            <div class="search-results"><a href="/a"></a><span class="promo-heading__title"> Span </span></div>
            <div class="search-results"><a href="/b">no heading</a></div>
        "#;
        let hits = parse_search_page(html, &base()).unwrap();
        assert_eq!(hits[0].title, "Span");
        assert_eq!(hits[1].title, NO_TITLE);
    }

    #[test]
    fn test_no_container_is_none() {
        assert!(parse_search_page("<html><p>nothing</p></html>", &base()).is_none());
    }

    #[test]
    fn test_query_params() {
        let query = SearchQuery::new("China space", 3).with_dates(
            Some(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()),
            Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
        );
        let params = query.params(2, "news");
        assert!(params.contains(&("q".to_string(), "China space".to_string())));
        assert!(params.contains(&("page".to_string(), "2".to_string())));
        assert!(params.contains(&("start_date".to_string(), "2010-01-01".to_string())));
        assert!(params.contains(&("end_date".to_string(), "2023-12-31".to_string())));
        assert!(params.contains(&("category".to_string(), "news".to_string())));
    }

    #[test]
    fn test_query_from_entry() {
        let entry = QueryEntry {
            keyword: "China mars mission".to_string(),
            start_date: Some("2018-01-01".to_string()),
            end_date: None,
            max_pages: None,
        };
        let query = SearchQuery::from_entry(&entry, 7).unwrap();
        assert_eq!(query.max_pages, 7);
        assert_eq!(query.start_date, NaiveDate::from_ymd_opt(2018, 1, 1));
        assert_eq!(query.end_date, None);
    }

    #[tokio::test]
    async fn test_stops_at_first_empty_page() {
        let transport = Arc::new(PagedTransport::new(vec![
            Ok(results_page(&["/news/1", "/news/2"])),
            Ok(results_page(&["/news/3"])),
            Ok("<html><body>No results</body></html>".to_string()),
            Ok(results_page(&["/news/never"])),
        ]));
        let paginator =
            SearchPaginator::new(transport.clone(), "https://search", base(), Pacer::immediate());

        let mut session = paginator.search(&SearchQuery::new("China space", 10));
        let hits = session.collect_hits().await;

        assert_eq!(hits.len(), 3);
        assert_eq!(
            session.termination(),
            Some(SearchTermination::PagesExhausted { page: 3 })
        );
        assert_eq!(transport.request_count(), 3);
        assert!(session.next_page().await.is_none());
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_max_pages_reached() {
        let transport = Arc::new(PagedTransport::new(vec![
            Ok(results_page(&["/news/1"])),
            Ok(results_page(&["/news/2"])),
            Ok(results_page(&["/news/3"])),
        ]));
        let paginator =
            SearchPaginator::new(transport.clone(), "https://search", base(), Pacer::immediate());

        let mut session = paginator.search(&SearchQuery::new("China space", 2));
        let hits = session.collect_hits().await;

        assert_eq!(hits.len(), 2);
        assert_eq!(session.termination(), Some(SearchTermination::MaxPagesReached));
        assert_eq!(session.keyword_state(), KeywordState::MaxPagesReached);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_search() {
        let transport = Arc::new(PagedTransport::new(vec![
            Err(404),
            Ok(results_page(&["/news/2"])),
        ]));
        let paginator =
            SearchPaginator::new(transport.clone(), "https://search", base(), Pacer::immediate());

        let mut session = paginator.search(&SearchQuery::new("China space", 2));
        assert_eq!(session.next_page().await, Some(Vec::new()));
        let second = session.next_page().await.unwrap();
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_seen_hits_filtered() {
        let transport = Arc::new(PagedTransport::new(vec![Ok(results_page(&[
            "/news/old",
            "/news/new",
        ]))]));
        let seen = Arc::new(MemoryDedupStore::with_urls(["https://www.bbc.com/news/old"]));
        let paginator =
            SearchPaginator::new(transport, "https://search", base(), Pacer::immediate())
                .with_seen_filter(seen);

        let mut session = paginator.search(&SearchQuery::new("China space", 1));
        let hits = session.collect_hits().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.bbc.com/news/new");
    }
}
