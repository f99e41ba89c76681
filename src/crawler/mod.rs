//! Crawler module for searching, fetching and extracting articles
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Paginated keyword search
//! - Article and media extraction through selector cascades
//! - Request pacing
//! - Overall run coordination

mod coordinator;
mod extractor;
mod fetcher;
mod media;
mod parser;
mod scheduler;
mod search;

pub use coordinator::{dedup_by_url, run_harvest, Coordinator, RunMode};
pub use extractor::ArticleExtractor;
pub use fetcher::{
    build_http_client, BodyStream, FetchedResponse, HttpTransport, RetryPolicy, Transport,
};
pub use media::MediaDownloader;
pub use parser::{extract_title, parse_article, BodySource, ImageCandidate, ParsedArticle};
pub use scheduler::Pacer;
pub use search::{parse_search_page, SearchPaginator, SearchQuery, SearchSession, SearchTermination};
