//! Heuristic rate extraction from comparison-site HTML
//!
//! Pages are searched in two normalized views (visible text and raw markup) so a
//! rate is found whether it is rendered as text or tucked into an attribute.
//! Around every alias occurrence a bounded window is scanned for `<number>%`
//! tokens, each is scored, and the per-occurrence winners vote for the page rate.

use super::number::parse_number_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;
use tracing::debug;

pub const DEFAULT_WINDOW_BEFORE: usize = 600;
pub const DEFAULT_WINDOW_AFTER: usize = 1000;
pub const DEFAULT_MIN_TNA: f64 = 5.0;
pub const DEFAULT_MAX_TNA: f64 = 300.0;

/// How far past an alias the site strategies look for `% tna`.
const SUFFIXED_WINDOW_AFTER: usize = 300;
const KEYWORD_RADIUS: usize = 50;
const RATE_KEYWORDS: [&str; 4] = ["tna", "tea", "tasa", "rendimiento"];

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PERCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.,])(\d{1,3}(?:[.,]\d{1,3})?)\s?%").expect("valid regex")
});
static PERCENT_TNA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.,])(\d{1,3}(?:[.,]\d{1,3})?)\s?%\s*tna").expect("valid regex")
});

const ENTITIES: [(&str, &str); 12] = [
    ("&nbsp;", " "),
    ("&#160;", " "),
    ("&#37;", "%"),
    ("&percnt;", "%"),
    ("&aacute;", "á"),
    ("&eacute;", "é"),
    ("&iacute;", "í"),
    ("&oacute;", "ó"),
    ("&uacute;", "ú"),
    ("&ntilde;", "ñ"),
    ("&quot;", "\""),
    ("&amp;", "&"),
];

/// Page-shape specific extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    Generic,
    RendimientoHoy,
    ComparaTasas,
}

impl ExtractionStrategy {
    /// Picks the strategy matching the site a URL points at.
    pub fn for_url(url: &str) -> Self {
        let url = url.to_lowercase();
        if url.contains("rendimientohoy") {
            ExtractionStrategy::RendimientoHoy
        } else if url.contains("comparatasas") {
            ExtractionStrategy::ComparaTasas
        } else {
            ExtractionStrategy::Generic
        }
    }
}

impl Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ExtractionStrategy::Generic => "generic",
                ExtractionStrategy::RendimientoHoy => "rendimientohoy",
                ExtractionStrategy::ComparaTasas => "comparatasas",
            }
        )
    }
}

fn decode_entities(text: &str) -> String {
    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| {
            acc.replace(entity, replacement)
        })
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Lowercased visible text and lowercased markup, both whitespace-collapsed.
fn page_views(html: &str) -> [String; 2] {
    let without_code = SCRIPT_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&without_code, " ");
    [
        collapse_whitespace(&decode_entities(&text)).to_lowercase(),
        collapse_whitespace(&decode_entities(html)).to_lowercase(),
    ]
}

/// Byte offset `chars` characters before `idx`, clamped to the start.
fn back_chars(text: &str, idx: usize, chars: usize) -> usize {
    if chars == 0 {
        return idx;
    }
    text[..idx]
        .char_indices()
        .rev()
        .nth(chars - 1)
        .map_or(0, |(i, _)| i)
}

/// Byte offset `chars` characters after `idx`, clamped to the end.
fn forward_chars(text: &str, idx: usize, chars: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| idx + i)
}

#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    after_alias: bool,
    near_keyword: bool,
    distance: usize,
    value: f64,
}

impl ScoredCandidate {
    fn beats(&self, other: &ScoredCandidate) -> bool {
        let key = |c: &ScoredCandidate| (!c.after_alias, !c.near_keyword, c.distance);
        match key(self).cmp(&key(other)) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.value < other.value,
        }
    }
}

/// Returns the most frequent value, preferring the smaller one on ties.
fn most_common(values: &[f64]) -> Option<f64> {
    let mut counts: HashMap<i64, (usize, f64)> = HashMap::new();
    for value in values {
        let entry = counts
            .entry((value * 100.0).round() as i64)
            .or_insert((0, *value));
        entry.0 += 1;
    }
    counts
        .into_values()
        .max_by(|(count_a, value_a), (count_b, value_b)| {
            count_a.cmp(count_b).then(value_b.total_cmp(value_a))
        })
        .map(|(_, value)| value)
}

/// Extracts one rate per page for a wallet.
#[derive(Debug, Clone)]
pub struct RateExtractor {
    min_tna: f64,
    max_tna: f64,
    window_before: usize,
    window_after: usize,
}

impl Default for RateExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TNA, DEFAULT_MAX_TNA)
    }
}

impl RateExtractor {
    pub fn new(min_tna: f64, max_tna: f64) -> Self {
        Self {
            min_tna,
            max_tna,
            window_before: DEFAULT_WINDOW_BEFORE,
            window_after: DEFAULT_WINDOW_AFTER,
        }
    }

    pub fn with_windows(mut self, before: usize, after: usize) -> Self {
        self.window_before = before;
        self.window_after = after;
        self
    }

    /// Runs the rule for `strategy`. Site rules fall back to the generic scan.
    pub fn extract_with(
        &self,
        strategy: ExtractionStrategy,
        html: &str,
        aliases: &[String],
    ) -> Option<f64> {
        match strategy {
            ExtractionStrategy::Generic => self.extract(html, aliases),
            ExtractionStrategy::RendimientoHoy | ExtractionStrategy::ComparaTasas => self
                .extract_tna_suffixed(html, aliases)
                .or_else(|| self.extract(html, aliases)),
        }
    }

    /// Generic windowed scan with scoring and cross-occurrence voting.
    pub fn extract(&self, html: &str, aliases: &[String]) -> Option<f64> {
        let views = page_views(html);
        let mut winners = Vec::new();

        for alias in aliases.iter().map(|a| a.to_lowercase()) {
            if alias.is_empty() {
                continue;
            }
            for view in &views {
                for (idx, _) in view.match_indices(alias.as_str()) {
                    if let Some(best) = self.best_in_window(view, idx, idx + alias.len()) {
                        winners.push(best.value);
                    }
                }
            }
        }

        let rate = most_common(&winners);
        debug!(?winners, ?rate, "Generic extraction finished");
        rate
    }

    fn in_band(&self, value: f64) -> bool {
        value >= self.min_tna && value <= self.max_tna
    }

    fn best_in_window(
        &self,
        view: &str,
        alias_start: usize,
        alias_end: usize,
    ) -> Option<ScoredCandidate> {
        let start = back_chars(view, alias_start, self.window_before);
        let end = forward_chars(view, alias_end, self.window_after);
        let window = &view[start..end];
        let (alias_start, alias_end) = (alias_start - start, alias_end - start);

        let mut best: Option<ScoredCandidate> = None;
        for caps in PERCENT.captures_iter(window) {
            let Some(number) = caps.get(1) else {
                continue;
            };
            let Some(value) = parse_number_str(number.as_str()) else {
                continue;
            };
            if !self.in_band(value) {
                continue;
            }

            let after_alias = number.start() >= alias_end;
            let distance = if after_alias {
                number.start() - alias_end
            } else {
                alias_start.saturating_sub(number.end())
            };
            let around = &window[back_chars(window, number.start(), KEYWORD_RADIUS)
                ..forward_chars(window, number.end(), KEYWORD_RADIUS)];
            let near_keyword = RATE_KEYWORDS.iter().any(|kw| around.contains(kw));

            let candidate = ScoredCandidate {
                after_alias,
                near_keyword,
                distance,
                value,
            };
            if best.is_none_or(|b| candidate.beats(&b)) {
                best = Some(candidate);
            }
        }
        best
    }

    /// First `<number>% tna` right after an alias. 0 and 100 are placeholders.
    pub fn extract_tna_suffixed(&self, html: &str, aliases: &[String]) -> Option<f64> {
        let views = page_views(html);
        for view in &views {
            for alias in aliases.iter().map(|a| a.to_lowercase()) {
                if alias.is_empty() {
                    continue;
                }
                for (idx, _) in view.match_indices(alias.as_str()) {
                    let alias_end = idx + alias.len();
                    let end = forward_chars(view, alias_end, SUFFIXED_WINDOW_AFTER);
                    let found = PERCENT_TNA
                        .captures_iter(&view[alias_end..end])
                        .filter_map(|caps| caps.get(1))
                        .filter_map(|m| parse_number_str(m.as_str()))
                        .find(|v| *v != 0.0 && (v - 100.0).abs() > f64::EPSILON);
                    if let Some(rate) = found {
                        debug!(alias = %alias, rate, "Found rate followed by TNA");
                        return Some(rate);
                    }
                }
            }
        }
        None
    }
}
