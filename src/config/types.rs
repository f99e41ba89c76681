use serde::Deserialize;

/// Main configuration structure for BBC-Harvest
///
/// Every section has defaults, so an empty file (or no file at all) yields the
/// stock BBC space-program crawl.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub search: SearchConfig,
    pub politeness: PolitenessConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub dedup: DedupConfig,
    pub crawler: CrawlerConfig,
}

/// Target site description
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Base URL used to resolve relative links and media
    pub base_url: String,

    /// Search endpoint
    pub search_url: String,

    /// The site's generic page title, never accepted as an article title
    pub home_title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bbc.com".to_string(),
            search_url: "https://www.bbc.co.uk/search".to_string(),
            home_title: "BBC News".to_string(),
        }
    }
}

/// Keyword search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Keywords searched (without date limits) by the full crawl
    pub keywords: Vec<String>,

    /// Maximum result pages requested per keyword
    pub max_pages: u32,

    /// Value of the `category` query parameter
    pub category: String,

    /// Date-limited queries used by the search-only mode
    pub queries: Vec<QueryEntry>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let keywords = [
            "China space",
            "Chinese space program",
            "China aerospace",
            "Chinese rockets",
            "China satellite",
            "China space station",
            "China moon mission",
            "China mars mission",
            "Chinese space agency",
            "China tiangong",
            "Chinese lunar exploration",
            "China Chang'e mission",
            "China Tianwen mission",
            "Chinese Long March rocket",
        ];

        let queries = [
            ("China space program", "2010-01-01"),
            ("Chinese space station", "2015-01-01"),
            ("China mars mission", "2018-01-01"),
            ("China moon mission", "2013-01-01"),
            ("China Chang'e mission", "2013-01-01"),
        ];

        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            max_pages: 15,
            category: "news".to_string(),
            queries: queries
                .iter()
                .map(|(keyword, start)| QueryEntry {
                    keyword: keyword.to_string(),
                    start_date: Some(start.to_string()),
                    end_date: Some("2023-12-31".to_string()),
                    max_pages: Some(10),
                })
                .collect(),
        }
    }
}

/// A date-limited search query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueryEntry {
    pub keyword: String,

    /// Inclusive lower bound, `YYYY-MM-DD`
    #[serde(default)]
    pub start_date: Option<String>,

    /// Inclusive upper bound, `YYYY-MM-DD`
    #[serde(default)]
    pub end_date: Option<String>,

    /// Overrides `search.max-pages` for this query
    #[serde(default)]
    pub max_pages: Option<u32>,
}

/// Delays and batching that keep the crawl polite
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolitenessConfig {
    /// Lower bound of the random delay between requests (seconds)
    pub request_delay_min: f64,

    /// Upper bound of the random delay between requests (seconds)
    pub request_delay_max: f64,

    /// Number of articles processed between batch pauses
    pub batch_size: usize,

    /// Pause after each batch and after failed search pages (seconds)
    pub batch_pause: f64,

    /// Maximum number of articles taken from a search-results file
    pub target_article_count: usize,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            request_delay_min: 1.0,
            request_delay_max: 3.0,
            batch_size: 10,
            batch_pause: 5.0,
            target_article_count: 200,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Backoff between attempts is `backoff-factor * 2^(attempt - 1)` seconds
    pub backoff_factor: f64,

    /// Longest wait for response headers, and between body chunks (seconds)
    pub timeout_secs: u64,

    /// Connection setup timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Skip TLS certificate validation
    pub accept_invalid_certs: bool,

    pub user_agent: String,

    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: 1.0,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            accept_invalid_certs: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    pub articles_dir: String,
    pub images_dir: String,
    pub videos_dir: String,

    /// Download report JSON
    pub report_path: String,

    /// Search-results JSON written by the search-only mode
    pub search_results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            articles_dir: "articles".to_string(),
            images_dir: "images".to_string(),
            videos_dir: "videos".to_string(),
            report_path: "download_report.json".to_string(),
            search_results_path: "advanced_search_results.json".to_string(),
        }
    }
}

/// Deduplication store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DedupConfig {
    /// When set, seen URLs are persisted in this SQLite file across runs
    pub database_path: Option<String>,

    /// Pre-seed the article store from files already in the articles directory
    pub seed_from_output: bool,
}

/// Worker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of articles extracted concurrently within a batch
    pub workers: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}
