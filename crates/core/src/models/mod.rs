//! Shared domain models.

use std::{collections::BTreeMap, fmt, mem};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Minimum number of advisory entries a movie needs to be playable.
pub const MIN_PLAYABLE_ENTRIES: usize = 2;

/// Severity assigned to an advisory category when the source has none.
pub const UNKNOWN_SEVERITY: &str = "Unknown";

/// Stands in for a word that would give the movie away.
pub const REDACTION_MASK: &str = "████";

/// Title words too common to be worth masking.
const TITLE_STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "part", "of", "a", "an", "in", "on", "to", "at",
    "by", "or",
];

/// Shortest title word or name part that gets masked.
const MIN_REDACTED_LEN: usize = 3;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("invalid year regex"));

/// Display key (`"{title} ({year})"`) to movie document key.
///
/// Ordered by display key, which is the order suggestions are offered in.
pub type TitleMapping = BTreeMap<String, String>;

/// Build the display key used for autocomplete and the win condition.
pub fn display_key(title: &str, year: u16) -> String {
    format!("{title} ({year})")
}

/// One content-warning line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryEntry {
    /// Advisory category label, e.g. `Sex & Nudity`.
    pub category: String,
    /// Severity as reported by the source (`None`, `Mild`, ...).
    #[serde(default = "unknown_severity")]
    pub severity: String,
    /// The hint sentence shown to the player.
    pub description: String,
}

fn unknown_severity() -> String {
    UNKNOWN_SEVERITY.to_string()
}

impl AdvisoryEntry {
    /// Create an entry from its three text fields.
    pub fn new(
        category: impl Into<String>,
        severity: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            severity: severity.into(),
            description: description.into(),
        }
    }

    /// Classified severity for colouring and sorting.
    pub fn severity_level(&self) -> Severity {
        Severity::parse(&self.severity)
    }
}

/// Severity vocabulary. Unrecognised source text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
    Unknown,
    Other(String),
}

impl Severity {
    /// Case-insensitive parse of a source severity label.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "none" => Severity::None,
            "mild" => Severity::Mild,
            "moderate" => Severity::Moderate,
            "severe" => Severity::Severe,
            "" | "unknown" => Severity::Unknown,
            _ => Severity::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => f.write_str("None"),
            Severity::Mild => f.write_str("Mild"),
            Severity::Moderate => f.write_str("Moderate"),
            Severity::Severe => f.write_str("Severe"),
            Severity::Unknown => f.write_str(UNKNOWN_SEVERITY),
            Severity::Other(label) => f.write_str(label),
        }
    }
}

/// A film together with its parental-guide advisories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// External identifier on the movie database (e.g. `tt0078748`).
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    /// Release title.
    pub title: String,
    /// Release year.
    #[serde(deserialize_with = "deserialize_year")]
    pub year: u16,
    /// Credited director, when the title page lists one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    /// Advisory entries in display order.
    #[serde(rename = "parentalGuideEntries", default)]
    pub parental_guide_entries: Vec<AdvisoryEntry>,
}

impl Movie {
    /// `"{title} ({year})"`, the string a player has to guess.
    pub fn display_key(&self) -> String {
        display_key(&self.title, self.year)
    }

    /// Whether the movie has enough advisories to be played.
    pub fn is_eligible(&self) -> bool {
        self.parental_guide_entries.len() >= MIN_PLAYABLE_ENTRIES
    }

    /// Link to the movie's page on the source database.
    pub fn imdb_url(&self) -> String {
        format!("https://www.imdb.com/title/{}/", self.imdb_id)
    }

    /// Return the movie with its advisories cleaned up.
    pub fn normalized(mut self) -> Self {
        self.title = collapse_whitespace(&self.title);
        self.director = self
            .director
            .map(|value| collapse_whitespace(&value))
            .filter(|value| !value.is_empty());
        let redactor = Redactor::for_movie(&self.title, self.director.as_deref());
        let entries = mem::take(&mut self.parental_guide_entries)
            .into_iter()
            .map(|entry| AdvisoryEntry {
                description: redactor.apply(&entry.description),
                ..entry
            })
            .collect();
        self.parental_guide_entries = normalize_entries(entries);
        self
    }

    /// Check the invariants a published movie document must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("movie {} has an empty title", self.imdb_id));
        }
        if self.imdb_id.trim().is_empty() {
            return Err(format!("movie '{}' has no identifier", self.title));
        }
        Ok(())
    }
}

/// Trim and collapse whitespace, drop empty descriptions and exact duplicates.
///
/// Order of the surviving entries is preserved.
pub fn normalize_entries(entries: Vec<AdvisoryEntry>) -> Vec<AdvisoryEntry> {
    let mut result: Vec<AdvisoryEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        let description = collapse_whitespace(&entry.description);
        if description.is_empty() {
            continue;
        }
        let severity = collapse_whitespace(&entry.severity);
        let normalized = AdvisoryEntry {
            category: collapse_whitespace(&entry.category),
            severity: if severity.is_empty() {
                unknown_severity()
            } else {
                severity
            },
            description,
        };
        if !result.contains(&normalized) {
            result.push(normalized);
        }
    }
    result
}

/// Masks the title's significant words and the director's name in hint text.
///
/// Matching is case-insensitive on whole words; singular and plural forms both match.
#[derive(Debug, Clone)]
pub struct Redactor {
    pattern: Option<Regex>,
}

impl Redactor {
    /// Build a redactor for one movie.
    pub fn for_movie(title: &str, director: Option<&str>) -> Self {
        let title_words = words(title)
            .filter(|word| !TITLE_STOPWORDS.contains(&word.to_lowercase().as_str()));
        let name_parts = director.into_iter().flat_map(words);

        let mut revealing: Vec<String> = Vec::new();
        for word in title_words.chain(name_parts) {
            let lower = word.to_lowercase();
            let stem = lower
                .strip_suffix('s')
                .filter(|stem| stem.chars().count() >= MIN_REDACTED_LEN)
                .map(str::to_string)
                .unwrap_or_else(|| lower.clone());
            if !revealing.contains(&stem) {
                revealing.push(stem);
            }
        }
        if revealing.is_empty() {
            return Self { pattern: None };
        }

        // Longest first so overlapping words mask as a whole.
        revealing.sort_by_key(|word| std::cmp::Reverse(word.chars().count()));
        let alternation = revealing
            .iter()
            .map(|word| regex::escape(word))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = match Regex::new(&format!(r"(?i)\b(?:{alternation})s?\b")) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!(title, %err, "could not build redaction pattern");
                None
            }
        };
        Self { pattern }
    }

    /// `text` with every revealing word replaced by [`REDACTION_MASK`].
    pub fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(text, REDACTION_MASK).into_owned(),
            None => text.to_string(),
        }
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_REDACTED_LEN)
}

/// First standalone four-digit number in `text`, e.g. `1979` in `"(1979–1985)"`.
pub fn parse_year(text: &str) -> Option<u16> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u16>().ok())
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace every non-alphanumeric ASCII character with `_`.
pub fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

fn deserialize_year<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Number(u64),
        Text(String),
    }

    match RawYear::deserialize(deserializer)? {
        RawYear::Number(value) => u16::try_from(value)
            .map_err(|_| de::Error::custom(format!("year {value} out of range"))),
        RawYear::Text(text) => {
            parse_year(&text).ok_or_else(|| de::Error::custom(format!("invalid year '{text}'")))
        }
    }
}
