//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loops that tie the components together:
//! - Searching every configured query and saving the hits
//! - Crawling keyword by keyword, downloading hits as they are found
//! - Downloading the articles listed in a search-results file
//! - Batching, politeness pauses and cooperative cancellation
//! - Writing the final download report

use crate::config::Config;
use crate::crawler::extractor::ArticleExtractor;
use crate::crawler::fetcher::{HttpTransport, Transport};
use crate::crawler::media::MediaDownloader;
use crate::crawler::scheduler::Pacer;
use crate::crawler::search::{SearchPaginator, SearchQuery};
use crate::models::{ArticleSummary, DownloadReport, SearchHit};
use crate::output::{
    existing_article_urls, load_search_results, resolve_results_path, write_report,
    write_search_results, ArticleWriter, RunStatistics,
};
use crate::state::{CandidateState, KeywordState, SkipReason};
use crate::storage::DownloadedSet;
use crate::HarvestError;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// What a run does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Search every configured query and write the search-results file
    Search,

    /// Search each keyword and download its hits right away
    Crawl,

    /// Download the articles listed in a search-results file
    ///
    /// Without a path the default file names are probed.
    Download(Option<PathBuf>),
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    downloaded: DownloadedSet,
    paginator: SearchPaginator,
    extractor: ArticleExtractor,
    writer: ArticleWriter,
    pacer: Pacer,
    cancel: Arc<AtomicBool>,
    untitled_counter: AtomicUsize,
    dispatched: HashSet<String>,
    stats: RunStatistics,
}

impl Coordinator {
    /// Creates a coordinator talking to the real site
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The HTTP client or dedup store could not be set up
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.http)?);
        let downloaded = DownloadedSet::open(&config.dedup)?;
        Self::with_transport(config, transport, downloaded)
    }

    /// Creates a coordinator around an injected transport and dedup stores
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        downloaded: DownloadedSet,
    ) -> Result<Self, HarvestError> {
        let site_base = Url::parse(&config.site.base_url)?;

        if config.dedup.seed_from_output {
            let articles_dir = Path::new(&config.output.articles_dir);
            let mut seeded = 0;
            for url in existing_article_urls(articles_dir)? {
                if downloaded.articles.mark_seen(&url)? {
                    seeded += 1;
                }
            }
            info!("Seeded {} article URLs from {}", seeded, articles_dir.display());
        }

        let pacer = Pacer::from_config(&config.politeness);

        let paginator = SearchPaginator::new(
            Arc::clone(&transport),
            config.site.search_url.clone(),
            site_base.clone(),
            pacer,
        )
        .with_category(config.search.category.clone())
        .with_seen_filter(Arc::clone(&downloaded.articles));

        let media = Arc::new(MediaDownloader::new(
            Arc::clone(&transport),
            Arc::clone(&downloaded.media),
            site_base.clone(),
            &config.output.images_dir,
            &config.output.videos_dir,
        ));

        let extractor =
            ArticleExtractor::new(transport, media, site_base, config.site.home_title.clone());

        let writer = ArticleWriter::new(
            &config.output.articles_dir,
            Arc::clone(&downloaded.articles),
        );

        Ok(Self {
            config: Arc::new(config),
            downloaded,
            paginator,
            extractor,
            writer,
            pacer,
            cancel: Arc::new(AtomicBool::new(false)),
            untitled_counter: AtomicUsize::new(0),
            dispatched: HashSet::new(),
            stats: RunStatistics::new(),
        })
    }

    /// Flag that stops the run at the next keyword or article boundary
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn downloaded(&self) -> &DownloadedSet {
        &self.downloaded
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Creates the article and media directories ahead of the first write
    fn prepare_output_dirs(&self) -> Result<(), HarvestError> {
        let output = &self.config.output;
        for dir in [&output.articles_dir, &output.images_dir, &output.videos_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Runs the given mode to completion (or cancellation)
    pub async fn run(&mut self, mode: RunMode) -> Result<(), HarvestError> {
        match mode {
            RunMode::Search => {
                self.run_search().await?;
            }
            RunMode::Crawl => {
                self.run_crawl().await?;
            }
            RunMode::Download(path) => {
                let path = resolve_results_path(path.as_deref())?;
                info!("Loading search results from {}", path.display());
                let hits = load_search_results(&path)?;
                self.run_download(hits).await?;
            }
        }
        Ok(())
    }

    /// Queries run by search mode: the dated queries, or the plain keywords if none
    pub fn search_queries(&self) -> Result<Vec<SearchQuery>, HarvestError> {
        let search = &self.config.search;
        if search.queries.is_empty() {
            return Ok(self.keyword_queries());
        }

        search
            .queries
            .iter()
            .map(|entry| SearchQuery::from_entry(entry, search.max_pages).map_err(Into::into))
            .collect()
    }

    /// Queries run by crawl mode: one undated query per keyword
    pub fn keyword_queries(&self) -> Vec<SearchQuery> {
        let search = &self.config.search;
        search
            .keywords
            .iter()
            .map(|keyword| SearchQuery::new(keyword.clone(), search.max_pages))
            .collect()
    }

    /// Searches every query and writes the deduplicated hits
    pub async fn run_search(&mut self) -> Result<Vec<SearchHit>, HarvestError> {
        let mut all_hits = Vec::new();

        for query in self.search_queries()? {
            if self.is_cancelled() {
                warn!("Cancelled, skipping remaining searches");
                break;
            }
            let (hits, _) = self.search_keyword(&query).await;
            all_hits.extend(hits);
        }

        let unique = dedup_by_url(all_hits);
        let path = Path::new(&self.config.output.search_results_path);
        write_search_results(path, &unique).await?;
        info!("Saved {} search results to {}", unique.len(), path.display());

        Ok(unique)
    }

    /// Searches each keyword and downloads its hits before moving on
    pub async fn run_crawl(&mut self) -> Result<DownloadReport, HarvestError> {
        self.prepare_output_dirs()?;
        let mut summaries = Vec::new();

        for query in self.keyword_queries() {
            if self.is_cancelled() {
                warn!("Cancelled, skipping remaining keywords");
                break;
            }
            let (hits, state) = self.search_keyword(&query).await;
            summaries.extend(self.process_candidates(hits).await);
            debug!("'{}': {}", query.keyword, state.finish());
        }

        self.finish(summaries).await
    }

    /// Downloads the given hits, capped at the target article count
    pub async fn run_download(
        &mut self,
        mut hits: Vec<SearchHit>,
    ) -> Result<DownloadReport, HarvestError> {
        self.prepare_output_dirs()?;
        info!("Loaded {} search results", hits.len());

        let target = self.config.politeness.target_article_count;
        if hits.len() > target {
            info!("Limiting download to {} articles", target);
            hits.truncate(target);
        }

        let summaries = self.process_candidates(hits).await;
        self.finish(summaries).await
    }

    async fn search_keyword(&mut self, query: &SearchQuery) -> (Vec<SearchHit>, KeywordState) {
        info!("Searching '{}'", query.keyword);

        let (hits, state) = {
            let mut session = self.paginator.search(query);
            let hits = session.collect_hits().await;
            (hits, session.keyword_state())
        };

        self.stats.keywords_searched += 1;
        self.stats.hits_found += hits.len() as u64;
        info!("Found {} articles for '{}' ({})", hits.len(), query.keyword, state);

        (hits, state)
    }

    /// Processes candidates in batches and returns the summaries of written articles
    ///
    /// Candidates are deduplicated by URL across the whole run. Each batch runs with
    /// at most `crawler.workers` extractions in flight and is followed by the batch pause.
    pub async fn process_candidates(&mut self, hits: Vec<SearchHit>) -> Vec<ArticleSummary> {
        let candidates: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| self.dispatched.insert(hit.url.clone()))
            .collect();
        self.stats.candidates += candidates.len() as u64;

        let batch_size = self.pacer.batch_size();
        let workers = self.config.crawler.workers.max(1);
        let batch_count = candidates.len().div_ceil(batch_size);

        let mut summaries = Vec::new();
        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            let outcomes: Vec<(CandidateState, Option<ArticleSummary>)> = {
                let this = &*self;
                stream::iter(batch)
                    .map(|hit| this.process_one(hit))
                    .buffered(workers)
                    .collect()
                    .await
            };

            for (state, summary) in outcomes {
                self.stats.record(state);
                if let Some(summary) = summary {
                    self.stats.images_saved += summary.images as u64;
                    self.stats.videos_saved += summary.videos as u64;
                    summaries.push(summary);
                }
            }

            if index + 1 < batch_count && !self.is_cancelled() {
                debug!("Batch {}/{} done, pausing", index + 1, batch_count);
                self.pacer.pause_batch().await;
            }
        }

        summaries
    }

    async fn process_one(&self, hit: &SearchHit) -> (CandidateState, Option<ArticleSummary>) {
        let state = CandidateState::Pending;

        if self.is_cancelled() {
            return (advance(state, CandidateState::Skipped(SkipReason::Cancelled)), None);
        }

        match self.downloaded.articles.seen(&hit.url) {
            Ok(true) => {
                debug!("Already downloaded {}", hit.url);
                return (advance(state, CandidateState::Skipped(SkipReason::AlreadySeen)), None);
            }
            Ok(false) => {}
            Err(e) => warn!("Dedup lookup failed for {}: {}", hit.url, e),
        }

        info!("Processing article: {}", hit.title);
        let outcome = match self.extractor.extract(&hit.url, Some(&hit.title)).await {
            None => (
                advance(state, CandidateState::Skipped(SkipReason::ExtractionFailed)),
                None,
            ),
            Some(mut article) => {
                let state = advance(state, CandidateState::Fetched);

                if article.title.is_none() {
                    let n = self.untitled_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    article.title = Some(format!("Untitled Article {}", n));
                }

                match self.writer.write(&mut article).await {
                    Ok(filename) => {
                        info!(
                            "Saved {} ({} images, {} videos)",
                            filename,
                            article.images.len(),
                            article.videos.len()
                        );
                        (advance(state, CandidateState::Written), Some(article.summary()))
                    }
                    Err(e) => {
                        warn!("Failed to write article {}: {}", hit.url, e);
                        (
                            advance(state, CandidateState::Skipped(SkipReason::WriteFailed)),
                            None,
                        )
                    }
                }
            }
        };

        self.pacer.pause().await;
        outcome
    }

    /// Writes the download report for the written articles
    async fn finish(&self, summaries: Vec<ArticleSummary>) -> Result<DownloadReport, HarvestError> {
        let report = DownloadReport::new(summaries);
        let path = Path::new(&self.config.output.report_path);
        write_report(path, &report).await?;
        info!(
            "Downloaded {} articles, report saved to {}",
            report.total_articles,
            path.display()
        );
        Ok(report)
    }
}

fn advance(current: CandidateState, next: CandidateState) -> CandidateState {
    debug_assert!(
        current.can_transition_to(next),
        "invalid candidate transition {} -> {}",
        current,
        next
    );
    next
}

/// Keeps the first hit for each URL, preserving order
pub fn dedup_by_url(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.url.clone()))
        .collect()
}

/// Runs one mode with the real HTTP transport
///
/// # Example
///
/// ```no_run
/// use bbc_harvest::config::Config;
/// use bbc_harvest::crawler::{run_harvest, RunMode};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// run_harvest(Config::default(), RunMode::Crawl).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config, mode: RunMode) -> Result<RunStatistics, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run(mode).await?;
    Ok(coordinator.stats().clone())
}
