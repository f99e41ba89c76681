use crate::config::types::{
    Config, CrawlerConfig, HttpConfig, OutputConfig, PolitenessConfig, SearchConfig, SiteConfig,
};
use crate::ConfigError;
use chrono::NaiveDate;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_search_config(&config.search)?;
    validate_politeness_config(&config.politeness)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_crawler_config(&config.crawler)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    for (name, value) in [("base-url", &config.base_url), ("search-url", &config.search_url)] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} '{}' must use http or https",
                name, value
            )));
        }
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "search.max-pages must be >= 1".to_string(),
        ));
    }

    if config.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "search.keywords cannot contain empty keywords".to_string(),
        ));
    }

    for query in &config.queries {
        if query.keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search.queries keyword cannot be empty".to_string(),
            ));
        }

        if query.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "max-pages for query '{}' must be >= 1",
                query.keyword
            )));
        }

        let start = query.start_date.as_deref().map(parse_date).transpose()?;
        let end = query.end_date.as_deref().map(parse_date).transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ConfigError::Validation(format!(
                    "Query '{}' has start-date {} after end-date {}",
                    query.keyword, start, end
                )));
            }
        }
    }

    Ok(())
}

/// Parses a `YYYY-MM-DD` date as used by the search endpoint
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ConfigError::InvalidDate(format!("'{}': {}", value, e)))
}

fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.request_delay_min < 0.0 || config.request_delay_max < 0.0 {
        return Err(ConfigError::Validation(
            "request delays cannot be negative".to_string(),
        ));
    }

    if config.request_delay_min > config.request_delay_max {
        return Err(ConfigError::Validation(format!(
            "request-delay-min ({}) must not exceed request-delay-max ({})",
            config.request_delay_min, config.request_delay_max
        )));
    }

    if config.batch_pause < 0.0 {
        return Err(ConfigError::Validation(format!(
            "batch-pause cannot be negative, got {}",
            config.batch_pause
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if config.target_article_count < 1 {
        return Err(ConfigError::Validation(
            "target-article-count must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-factor cannot be negative, got {}",
            config.backoff_factor
        )));
    }

    if config.timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeouts must be >= 1 second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("articles-dir", &config.articles_dir),
        ("images-dir", &config.images_dir),
        ("videos-dir", &config.videos_dir),
        ("report-path", &config.report_path),
        ("search-results-path", &config.search_results_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    Ok(())
}
