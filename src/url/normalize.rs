use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use bbc_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://www.bbc.com").unwrap();
/// assert_eq!(
///     resolve_link("/news/science-123", &base),
///     Some("https://www.bbc.com/news/science-123".to_string())
/// );
/// assert_eq!(resolve_link("mailto:x@bbc.com", &base), None);
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Resolves a media `src` attribute to an absolute URL
///
/// Resolution rules:
/// - `//host/path` (protocol-relative) gets an `https:` prefix
/// - `/path` (root-relative) is joined onto the site base URL
/// - other relative paths are joined onto the page URL they appeared on
/// - absolute http(s) URLs pass through unchanged
pub fn resolve_media_url(src: &str, site_base: &Url, page_url: &Url) -> Option<String> {
    let src = src.trim();

    if src.is_empty() || src.starts_with("data:") {
        return None;
    }

    if src.starts_with("//") {
        return Url::parse(&format!("https:{}", src))
            .ok()
            .map(|u| u.to_string());
    }

    if src.starts_with('/') {
        return resolve_link(src, site_base);
    }

    resolve_link(src, page_url)
}
