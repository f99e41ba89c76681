//! HTML parser for article pages
//!
//! Article markup has changed many times over the years, so every field is recovered
//! through an ordered list of strategy functions; the first one that produces a value
//! wins. This module is pure: it never touches the network and returns owned data so
//! the parsed document can be dropped before any await point.

use crate::models::NO_CAPTION;
use crate::ExtractionFailure;
use scraper::{ElementRef, Html, Selector};

/// Heading selectors, newest markup first
const HEADING_SELECTORS: &[&str] = &[
    "ssrcss-15xko80-StyledHeading",
    "ssrcss-1f3bvyz-Headline",
    "article__title",
    "story-body__h1",
    "article-headline",
    "headline",
    "title",
];

/// Article body containers, newest markup first
const BODY_SELECTORS: &[&str] = &[
    "article",
    "div.ssrcss-1ocoo3l-Wrap",
    "div.story-body__inner",
    "div.article__body",
    "div.article-body",
    "div.article-content",
    "div.article-text",
    "div.article-body-content",
    "div.article__body-content",
    "div.article__content",
];

/// Paragraphs under loosely named containers, used when no body container matches
const PARAGRAPH_HEURISTIC: &str =
    r#"div[class*="content"] p, div[class*="body"] p, div[class*="text"] p"#;

/// Parent markup containing any of these marks a paragraph as boilerplate
const BOILERPLATE_MARKERS: &[&str] = &["footer", "caption"];

/// Images narrower than this (in the `width` attribute) are icons or ads
const MIN_IMAGE_WIDTH: u32 = 100;

type TitleStrategy = fn(&Html, &str) -> Option<String>;
type BodyStrategy = for<'a> fn(&'a Html) -> Option<BodySource<'a>>;

const TITLE_STRATEGIES: &[(&str, TitleStrategy)] = &[
    ("heading", title_from_headings),
    ("og:title", title_from_og_title),
    ("og:url", title_from_og_url),
];

const BODY_STRATEGIES: &[(&str, BodyStrategy)] = &[
    ("container", body_from_containers),
    ("paragraph-heuristic", body_from_paragraph_heuristic),
];

/// An image found in the article body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// Raw `src` attribute
    pub src: String,

    /// Text of the enclosing figure's caption
    pub caption: String,
}

/// Everything recovered from an article page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: Option<String>,
    pub paragraphs: Vec<String>,
    pub images: Vec<ImageCandidate>,

    /// Raw `src` attributes of video elements and players
    pub videos: Vec<String>,
}

/// Where the article body came from
#[derive(Debug, Clone)]
pub enum BodySource<'a> {
    /// A single container element
    Element(ElementRef<'a>),

    /// Paragraphs gathered from across the page
    Synthesized(Vec<ElementRef<'a>>),
}

impl<'a> BodySource<'a> {
    /// Roots that media and paragraph lookups search under
    fn roots(&self) -> Vec<ElementRef<'a>> {
        match self {
            Self::Element(element) => vec![*element],
            Self::Synthesized(paragraphs) => paragraphs.clone(),
        }
    }

    fn paragraph_elements(&self) -> Vec<ElementRef<'a>> {
        match self {
            Self::Element(element) => select_all(*element, "p"),
            Self::Synthesized(paragraphs) => paragraphs.clone(),
        }
    }

    fn flattened_text(&self) -> String {
        self.roots()
            .iter()
            .map(|root| root.text().collect::<String>())
            .collect::<String>()
            .trim()
            .to_string()
    }
}

/// Parses an article page
///
/// # Arguments
///
/// * `html` - The page markup
/// * `home_title` - The site's generic title, never accepted as an article title
///
/// # Returns
///
/// * `Ok(ParsedArticle)` - A body with at least one paragraph was found
/// * `Err(ExtractionFailure::NoBody)` - No body strategy matched
/// * `Err(ExtractionFailure::NoParagraphs)` - The body had no text
///
/// # Example
///
/// ```
/// use bbc_harvest::crawler::parse_article;
///
/// let html = "<html><body><h1>Tiangong</h1><article><p>Docked.</p></article></body></html>";
/// let parsed = parse_article(html, "BBC News").unwrap();
/// assert_eq!(parsed.title.as_deref(), Some("Tiangong"));
/// assert_eq!(parsed.paragraphs, vec!["Docked."]);
/// ```
pub fn parse_article(html: &str, home_title: &str) -> Result<ParsedArticle, ExtractionFailure> {
    let document = Html::parse_document(html);

    let title = extract_title(&document, home_title);

    let body = BODY_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| {
            let body = strategy(&document)?;
            tracing::trace!("Article body found via {} strategy", name);
            Some(body)
        })
        .ok_or(ExtractionFailure::NoBody)?;

    let paragraphs = extract_paragraphs(&body);
    if paragraphs.is_empty() {
        return Err(ExtractionFailure::NoParagraphs);
    }

    Ok(ParsedArticle {
        title,
        paragraphs,
        images: extract_images(&body),
        videos: extract_videos(&body),
    })
}

/// Runs the title strategies in order
pub fn extract_title(document: &Html, home_title: &str) -> Option<String> {
    TITLE_STRATEGIES.iter().find_map(|(name, strategy)| {
        let title = strategy(document, home_title)?;
        tracing::trace!("Title found via {} strategy", name);
        Some(title)
    })
}

fn title_from_headings(document: &Html, home_title: &str) -> Option<String> {
    ["h1", "h2"]
        .iter()
        .flat_map(|tag| {
            HEADING_SELECTORS
                .iter()
                .map(move |class| format!("{}.{}", tag, class))
                .chain(std::iter::once(tag.to_string()))
        })
        .filter_map(|selector| Selector::parse(&selector).ok())
        .find_map(|selector| {
            let heading = document.select(&selector).next()?;
            accept_title(heading.text().collect::<String>(), home_title)
        })
}

fn title_from_og_title(document: &Html, home_title: &str) -> Option<String> {
    let content = meta_property(document, "og:title")?;
    accept_title(content, home_title)
}

fn title_from_og_url(document: &Html, _home_title: &str) -> Option<String> {
    let content = meta_property(document, "og:url")?;
    let slug = content.trim_end_matches('/').rsplit('/').next()?;
    let title = slug.replace('-', " ").trim().to_string();
    (!title.is_empty()).then_some(title)
}

fn accept_title(raw: String, home_title: &str) -> Option<String> {
    let title = raw.trim();
    if title.is_empty() || title == home_title {
        None
    } else {
        Some(title.to_string())
    }
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{}"]"#, property)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.to_string())
}

fn body_from_containers(document: &Html) -> Option<BodySource<'_>> {
    BODY_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| document.select(&selector).next())
        .map(BodySource::Element)
}

fn body_from_paragraph_heuristic(document: &Html) -> Option<BodySource<'_>> {
    let selector = Selector::parse(PARAGRAPH_HEURISTIC).ok()?;
    let paragraphs: Vec<ElementRef<'_>> = document.select(&selector).collect();
    (!paragraphs.is_empty()).then_some(BodySource::Synthesized(paragraphs))
}

fn extract_paragraphs(body: &BodySource<'_>) -> Vec<String> {
    let paragraphs: Vec<String> = body
        .paragraph_elements()
        .into_iter()
        .filter(|p| !is_boilerplate(*p))
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        return paragraphs;
    }

    let text = body.flattened_text();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text]
    }
}

fn is_boilerplate(paragraph: ElementRef<'_>) -> bool {
    let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
        return false;
    };
    let markup = parent.html().to_lowercase();
    BOILERPLATE_MARKERS.iter().any(|marker| markup.contains(marker))
}

fn extract_images(body: &BodySource<'_>) -> Vec<ImageCandidate> {
    let Ok(figcaption) = Selector::parse("figcaption") else {
        return Vec::new();
    };

    body.roots()
        .into_iter()
        .flat_map(|root| select_all(root, "img"))
        .filter(|img| !is_too_narrow(*img))
        .filter_map(|img| {
            let src = img.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            Some(ImageCandidate {
                src: src.to_string(),
                caption: figure_caption(img, &figcaption),
            })
        })
        .collect()
}

/// A `width` attribute that is not an integer does not disqualify the image
fn is_too_narrow(img: ElementRef<'_>) -> bool {
    img.value()
        .attr("width")
        .and_then(|w| w.trim().parse::<u32>().ok())
        .is_some_and(|width| width < MIN_IMAGE_WIDTH)
}

fn figure_caption(img: ElementRef<'_>, figcaption: &Selector) -> String {
    img.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "figure")
        .and_then(|figure| figure.select(figcaption).next())
        .map(|caption| caption.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| NO_CAPTION.to_string())
}

fn extract_videos(body: &BodySource<'_>) -> Vec<String> {
    let roots = body.roots();

    let direct = roots.iter().flat_map(|root| {
        select_all(*root, "video")
            .into_iter()
            .chain(select_all(*root, r#"iframe[src*="player"]"#))
    });

    let players = roots
        .iter()
        .flat_map(|root| select_all(*root, r#"div[data-e2e="media-player"]"#))
        .filter_map(|player| {
            select_all(player, "video")
                .into_iter()
                .next()
                .or_else(|| select_all(player, "iframe").into_iter().next())
        });

    direct
        .chain(players)
        .filter_map(|element| element.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(|src| src.to_string())
        .collect()
}

fn select_all<'a>(root: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(selector) => root.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}
