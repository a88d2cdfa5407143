//! Scrapes parental-guide advisories from the movie database.
//!
//! Fetching is async (`reqwest`); parsing is done by the free functions in
//! this module so it can be exercised against saved pages.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE},
    Client, Url,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    models::{
        collapse_whitespace, parse_year, sanitize_component, AdvisoryEntry, Movie,
        UNKNOWN_SEVERITY,
    },
};

const SPOILERS_SECTION: &str = "spoilers";

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<h3[^>]*itemprop="name"[^>]*>\s*<a[^>]*>(?P<title>.*?)</a>(?:\s*<span[^>]*class="[^"]*nobr[^"]*"[^>]*>(?P<year>.*?)</span>)?"#,
    )
    .expect("invalid title regex")
});

static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<section[^>]*id="advisory-(?P<id>[^"]*)"[^>]*>(?P<body>.*?)</section>"#)
        .expect("invalid section regex")
});

static CATEGORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<h4[^>]*class="[^"]*ipl-list-title[^"]*"[^>]*>(.*?)</h4>"#)
        .expect("invalid category regex")
});

static SEVERITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)class="[^"]*advisory-severity-vote__container[^"]*".*?class="[^"]*ipl-status-pill[^"]*"[^>]*>(.*?)</"#,
    )
    .expect("invalid severity regex")
});

static LIST_ITEM_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)li(?:\s[^>]*)?>").expect("invalid item regex"));

static CREDIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<li[^>]*data-testid="title-pc-principal-credit"[^>]*>(.*?)</li>"#)
        .expect("invalid credit regex")
});

static CREDIT_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="[^"]*ipc-metadata-list-item__label[^"]*"[^>]*>(.*?)</"#)
        .expect("invalid credit label regex")
});

static CREDIT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<a[^>]*class="[^"]*ipc-metadata-list-item__list-content-item[^"]*"[^>]*>(.*?)</a>"#,
    )
    .expect("invalid credit name regex")
});

static NEXT_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#)
        .expect("invalid next data regex")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("invalid tag regex"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("invalid entity regex")
});

static IMDB_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tt\d{7,8}$").expect("invalid id regex"));

/// Title, year and advisories read from a parental-guide page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentalGuide {
    /// Title as shown in the page header.
    pub title: String,
    /// Release year, when the header carries one.
    pub year: Option<u16>,
    /// Advisories in page order, spoilers excluded.
    pub entries: Vec<AdvisoryEntry>,
}

/// HTTP front-end for the movie database.
pub struct AdvisoryExtractor {
    client: Client,
    base_url: String,
    delay: Duration,
}

/// Outcome of [`AdvisoryExtractor::scrape_titles`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Records written, in input order.
    pub saved: Vec<PathBuf>,
    /// Titles that could not be resolved, scraped or saved.
    pub failed: Vec<String>,
}

impl AdvisoryExtractor {
    /// Build a client with the configured user agent and timeout.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.imdb_base_url.trim_end_matches('/').to_string(),
            delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// Title page URL.
    pub fn title_url(&self, imdb_id: &str) -> String {
        format!("{}/title/{}", self.base_url, imdb_id)
    }

    /// Parental-guide page URL.
    pub fn parental_guide_url(&self, imdb_id: &str) -> String {
        format!("{}/title/{}/parentalguide", self.base_url, imdb_id)
    }

    /// Exact-title search URL.
    pub fn search_url(&self, title: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/find/", self.base_url),
            &[
                ("q", title),
                ("s", "tt"),
                ("ttype", "ft"),
                ("exact", "true"),
            ],
        )
        .with_context(|| format!("failed to build search URL for '{title}'"))
    }

    /// Scrape the title page and the parental guide of one movie.
    pub async fn extract(&self, imdb_id: &str) -> Result<Movie> {
        let title_html = self.fetch_html(&self.title_url(imdb_id)).await?;
        let director = parse_director(&title_html);

        let guide_html = self.fetch_html(&self.parental_guide_url(imdb_id)).await?;
        let guide = parse_parental_guide(&guide_html)
            .with_context(|| format!("failed to parse parental guide for {imdb_id}"))?;
        let year = guide
            .year
            .ok_or_else(|| anyhow!("no release year found for {imdb_id}"))?;

        let movie = Movie {
            imdb_id: imdb_id.to_string(),
            title: guide.title,
            year,
            director,
            parental_guide_entries: guide.entries,
        }
        .normalized();
        movie.validate().map_err(|reason| anyhow!(reason))?;
        info!(
            imdb_id,
            title = %movie.display_key(),
            entries = movie.parental_guide_entries.len(),
            "movie extracted"
        );
        Ok(movie)
    }

    /// Resolve a title to an identifier via the database's exact-title search.
    pub async fn find_imdb_id(&self, title: &str) -> Result<Option<String>> {
        let url = self.search_url(title)?;
        let html = self.fetch_html(url.as_str()).await?;
        let id = parse_search_results(&html)?;
        match &id {
            Some(id) => info!(title, imdb_id = %id, "title resolved"),
            None => warn!(title, "no search results"),
        }
        Ok(id)
    }

    /// Resolve `target` (an identifier or a title), scrape it and save the record.
    pub async fn scrape_one(&self, target: &str, out_dir: &Path) -> Result<PathBuf> {
        let imdb_id = if is_imdb_id(target) {
            target.trim().to_string()
        } else {
            self.find_imdb_id(target)
                .await?
                .ok_or_else(|| anyhow!("could not find an identifier for \"{target}\""))?
        };
        let movie = self
            .extract(&imdb_id)
            .await
            .with_context(|| format!("failed to scrape {imdb_id}"))?;
        save_scraped(out_dir, &movie)
    }

    /// Scrape every title in order, pausing between requests.
    ///
    /// A failing title is logged and recorded; the batch carries on.
    pub async fn scrape_titles(&self, titles: &[String], out_dir: &Path) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (index, title) in titles.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.scrape_one(title, out_dir).await {
                Ok(path) => summary.saved.push(path),
                Err(err) => {
                    warn!(title = %title, err = %format!("{err:#}"), "failed to process title");
                    summary.failed.push(title.clone());
                }
            }
        }
        info!(
            saved = summary.saved.len(),
            failed = summary.failed.len(),
            "finished processing all movies"
        );
        summary
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected status from {url}"))?;
        response
            .text()
            .await
            .with_context(|| format!("failed to read body of {url}"))
    }
}

/// Whether `value` looks like a title identifier (`tt` plus 7-8 digits).
pub fn is_imdb_id(value: &str) -> bool {
    IMDB_ID_RE.is_match(value.trim())
}

/// Parse the title block and advisory sections of a parental-guide page.
pub fn parse_parental_guide(html: &str) -> Result<ParentalGuide> {
    if html.trim().is_empty() {
        return Err(anyhow!("received empty HTML content"));
    }

    let (title, year) = match TITLE_RE.captures(html) {
        Some(caps) => {
            let title = text_content(caps.name("title").map_or("", |m| m.as_str()));
            let year = caps
                .name("year")
                .map(|m| text_content(m.as_str()))
                .and_then(|raw| parse_year(&raw));
            (title, year)
        }
        None => (String::new(), None),
    };

    let sections: Vec<(String, &str)> = SECTION_RE
        .captures_iter(html)
        .filter(|caps| &caps["id"] != SPOILERS_SECTION)
        .filter_map(|caps| {
            let body = caps.name("body")?.as_str();
            let category = CATEGORY_RE
                .captures(body)
                .map(|c| text_content(&c[1]))
                .unwrap_or_default();
            Some((category, body))
        })
        .collect();

    let mut severities: HashMap<&str, String> = HashMap::new();
    for (category, body) in &sections {
        if category.is_empty() {
            continue;
        }
        let severity = SEVERITY_RE
            .captures(body)
            .map(|c| text_content(&c[1]))
            .unwrap_or_default();
        let slot = severities.entry(category.as_str()).or_default();
        if slot.is_empty() {
            *slot = severity;
        }
    }

    let mut entries = Vec::new();
    for (category, body) in &sections {
        let severity = severities
            .get(category.as_str())
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SEVERITY.to_string());
        for item in list_items(body) {
            let text = own_text(item);
            if !text.is_empty() {
                entries.push(AdvisoryEntry::new(category.clone(), severity.clone(), text));
            }
        }
    }

    debug!(title = %title, entries = entries.len(), "parental guide parsed");
    Ok(ParentalGuide {
        title,
        year,
        entries,
    })
}

/// First credited director on a title page.
pub fn parse_director(html: &str) -> Option<String> {
    CREDIT_RE.captures_iter(html).find_map(|credit| {
        let block = credit.get(1)?.as_str();
        let label = CREDIT_LABEL_RE
            .captures(block)
            .map(|c| text_content(&c[1]))?;
        if label != "Director" && label != "Directors" {
            return None;
        }
        CREDIT_NAME_RE
            .captures(block)
            .map(|c| text_content(&c[1]))
            .filter(|name| !name.is_empty())
    })
}

/// Identifier of the first hit embedded in a search page's `__NEXT_DATA__`.
pub fn parse_search_results(html: &str) -> Result<Option<String>> {
    let Some(caps) = NEXT_DATA_RE.captures(html) else {
        return Ok(None);
    };
    let data: Value =
        serde_json::from_str(caps[1].trim()).context("failed to parse search page data")?;
    Ok(data
        .pointer("/props/pageProps/titleResults/results/0/id")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Collect movie titles from every `*.txt` file directly inside `dir`.
///
/// One title per line; blank lines are skipped and repeats keep their first
/// position. Files are read in name order.
pub fn read_title_lists(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .collect();
    files.sort();

    let mut seen = HashSet::new();
    let mut titles = Vec::new();
    for path in files {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if seen.insert(line.to_string()) {
                titles.push(line.to_string());
            }
        }
    }
    debug!(count = titles.len(), dir = %dir.display(), "title lists read");
    Ok(titles)
}

/// Write a scraped record as `{title}_{year}.json` under `dir`.
pub fn save_scraped(dir: impl AsRef<Path>, movie: &Movie) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!(
        "{}_{}.json",
        sanitize_component(&movie.title),
        movie.year
    ));
    let serialized = serde_json::to_vec_pretty(movie).context("failed to serialize movie")?;
    fs::write(&path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "scraped movie saved");
    Ok(path)
}

/// Inner HTML of every `li` element, in document order.
///
/// Nested items are returned as well as their parents, so each list item's
/// own text can be read separately. Items left unclosed are dropped.
fn list_items(html: &str) -> Vec<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut items: Vec<(usize, &str)> = Vec::new();
    for tag in LIST_ITEM_TAG_RE.captures_iter(html) {
        let Some(whole) = tag.get(0) else {
            continue;
        };
        if tag[1].is_empty() {
            open.push(whole.end());
        } else if let Some(start) = open.pop() {
            items.push((start, &html[start..whole.start()]));
        }
    }
    items.sort_by_key(|(start, _)| *start);
    items.into_iter().map(|(_, inner)| inner).collect()
}

/// Tag-stripped, entity-decoded, whitespace-collapsed text.
fn text_content(html: &str) -> String {
    collapse_whitespace(&decode_entities(&TAG_RE.replace_all(html, " ")))
}

/// Text directly inside an element, skipping anything nested in child elements.
fn own_text(inner_html: &str) -> String {
    let mut text = String::with_capacity(inner_html.len());
    let mut depth = 0usize;
    let mut rest = inner_html;

    while let Some(start) = rest.find('<') {
        if depth == 0 {
            text.push_str(&rest[..start]);
        }
        let Some(end) = rest[start..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[start + 1..start + end];
        if let Some(closing) = tag.strip_prefix('/') {
            if !is_void(closing) {
                depth = depth.saturating_sub(1);
            }
        } else if !tag.ends_with('/') && !tag.starts_with('!') && !is_void(tag) {
            depth += 1;
        }
        rest = &rest[start + end + 1..];
    }
    if depth == 0 {
        text.push_str(rest);
    }

    collapse_whitespace(&decode_entities(&text))
}

fn is_void(tag: &str) -> bool {
    let name = tag
        .split(|ch: char| ch.is_whitespace() || ch == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(
        name.as_str(),
        "br" | "hr" | "img" | "input" | "meta" | "link" | "wbr" | "source"
    )
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
