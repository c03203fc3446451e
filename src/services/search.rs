//! Site search over the static content index.
//!
//! Scoring per entry (case-insensitive): whole query in the title +10, in
//! the content +5, then for each query word +3 if in the title and +1 if in
//! the content. Entries scoring zero are dropped.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::views::escape_html;

pub const MIN_QUERY_CHARS: usize = 3;
pub const MAX_RESULTS: usize = 10;
pub const SNIPPET_CHARS: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("failed to read search index: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse search index: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One searchable block of site content (`search_index.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexEntry {
    pub title: String,
    pub content: String,
    /// `heading`, `paragraph` or `card`.
    pub kind: String,
    /// Page title shown under the hit.
    pub page: String,
    pub path: String,
}

/// A scored, highlighted hit. `title` and `snippet` are safe HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub kind: String,
    pub page: String,
    pub path: String,
    pub score: u32,
}

pub async fn load_index(path: &Path) -> Result<Vec<IndexEntry>, SearchError> {
    let raw = tokio::fs::read_to_string(path).await.inspect_err(|e| {
        error!(error = %e, path = %path.display(), "search index unreadable");
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Trimmed, lowercased query, or `None` if it is too short to search.
#[must_use]
pub fn normalize_query(raw: &str) -> Option<String> {
    let query = raw.trim().to_lowercase();
    (query.chars().count() >= MIN_QUERY_CHARS).then_some(query)
}

fn query_words(query: &str) -> Vec<&str> {
    query.split(' ').filter(|w| !w.is_empty()).collect()
}

/// Score of one entry against a normalized query.
#[must_use]
pub fn score(entry: &IndexEntry, query: &str) -> u32 {
    let title = entry.title.to_lowercase();
    let content = entry.content.to_lowercase();

    let mut total = 0;
    if title.contains(query) {
        total += 10;
    }
    if content.contains(query) {
        total += 5;
    }
    for word in query_words(query) {
        if title.contains(word) {
            total += 3;
        }
        if content.contains(word) {
            total += 1;
        }
    }
    total
}

/// Best hits first, ties in index order, at most [`MAX_RESULTS`].
#[must_use]
pub fn search(index: &[IndexEntry], raw_query: &str) -> Vec<SearchHit> {
    let Some(query) = normalize_query(raw_query) else {
        return Vec::new();
    };

    let mut scored: Vec<(u32, &IndexEntry)> = index
        .iter()
        .map(|entry| (score(entry, &query), entry))
        .filter(|(s, _)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(MAX_RESULTS);

    scored
        .into_iter()
        .map(|(score, entry)| SearchHit {
            title: highlight(&entry.title, &query),
            snippet: highlight(&truncate_snippet(&entry.content), &query),
            kind: entry.kind.clone(),
            page: entry.page.clone(),
            path: entry.path.clone(),
            score,
        })
        .collect()
}

/// First [`SNIPPET_CHARS`] characters, with `...` if anything was cut.
#[must_use]
pub fn truncate_snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

/// Length in bytes of the prefix of `text` matching `word` case-insensitively.
fn match_len(text: &str, word: &str) -> Option<usize> {
    let mut len = 0;
    let mut chars = text.chars();
    for w in word.chars() {
        let c = chars.next()?;
        if !c.to_lowercase().eq(w.to_lowercase()) {
            return None;
        }
        len += c.len_utf8();
    }
    Some(len)
}

/// HTML-escape `text` and wrap every case-insensitive occurrence of a query
/// word in `<mark>`. Longer words win where matches overlap.
#[must_use]
pub fn highlight(text: &str, query: &str) -> String {
    let mut words = query_words(query);
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        if let Some(len) = words.iter().find_map(|w| match_len(rest, w)) {
            out.push_str("<mark>");
            out.push_str(&escape_html(&rest[..len]));
            out.push_str("</mark>");
            pos += len;
        } else {
            let c = rest.chars().next().map_or(1, char::len_utf8);
            out.push_str(&escape_html(&rest[..c]));
            pos += c;
        }
    }
    out
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
