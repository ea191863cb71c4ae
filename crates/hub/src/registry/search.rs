// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog search: filters plus weighted relevance scoring.
//!
//! Ranking combines a text-match score (0–100) over name, description,
//! categories and tags with a popularity score, weighted 60/40. Matches
//! below the text threshold are dropped. An empty query orders by
//! popularity alone.

use super::entry::{RegistryEntry, SourceType};

/// Minimum text score for a match to count.
const MATCH_THRESHOLD: f64 = 60.0;

/// Weight of the text score in the combined ranking.
const TEXT_WEIGHT: f64 = 0.6;

/// Search parameters. Filters use OR logic within each list.
#[derive(Clone, Debug)]
pub struct SearchQuery {
    /// Search text, matched against name/description/categories/tags.
    pub query: String,
    /// Filter by categories.
    pub categories: Vec<String>,
    /// Filter by tags.
    pub tags: Vec<String>,
    /// Filter by sources.
    pub sources: Vec<SourceType>,
    /// Only official servers.
    pub official_only: bool,
    /// Only featured servers.
    pub featured_only: bool,
    /// Filter by API-key requirement (`None` = no filter).
    pub requires_api_key: Option<bool>,
    /// Maximum results, clamped to 1..=100.
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            sources: Vec::new(),
            official_only: false,
            featured_only: false,
            requires_api_key: None,
            limit: 20,
        }
    }
}

impl SearchQuery {
    /// A plain text query with default filters.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    fn matches_filters(&self, entry: &RegistryEntry) -> bool {
        if !self.sources.is_empty() && !self.sources.contains(&entry.source) {
            return false;
        }
        if !self.categories.is_empty()
            && !self.categories.iter().any(|c| entry.categories.contains(c))
        {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| entry.tags.contains(t)) {
            return false;
        }
        if self.official_only && !entry.official {
            return false;
        }
        if self.featured_only && !entry.featured {
            return false;
        }
        if let Some(required) = self.requires_api_key {
            if entry.requires_api_key != required {
                return false;
            }
        }
        true
    }
}

/// Run a search over the given entries.
pub fn search<'a>(
    entries: impl Iterator<Item = &'a RegistryEntry>,
    query: &SearchQuery,
) -> Vec<RegistryEntry> {
    let limit = query.limit.clamp(1, 100);
    let text = query.query.trim().to_lowercase();

    let mut scored: Vec<(f64, &RegistryEntry)> = entries
        .filter(|entry| query.matches_filters(entry))
        .filter_map(|entry| {
            if text.is_empty() {
                return Some((popularity_score(entry), entry));
            }
            let score = text_score(&text, entry);
            if score < MATCH_THRESHOLD {
                return None;
            }
            let combined =
                score * TEXT_WEIGHT + popularity_score(entry) * (1.0 - TEXT_WEIGHT);
            Some((combined, entry))
        })
        .collect();

    // Deterministic ordering: score desc, id asc on ties.
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, entry)| entry.clone())
        .collect()
}

/// Popularity score used for ranking.
///
/// Official servers get the largest boost, featured a moderate one; a few
/// categories and a container image suggest a maintained, runnable server.
pub fn popularity_score(entry: &RegistryEntry) -> f64 {
    let mut score = 0.0;
    if entry.official {
        score += 20.0;
    }
    if entry.featured {
        score += 10.0;
    }
    score += entry.categories.len().min(3) as f64 * 2.0;
    score += match entry.source {
        SourceType::McpOfficial => 15.0,
        SourceType::Docker => 5.0,
        _ => 0.0,
    };
    if entry.container_image.is_some() {
        score += 3.0;
    }
    score
}

/// Text score (0–100): the best field score over name, description,
/// categories and tags.
pub fn text_score(query: &str, entry: &RegistryEntry) -> f64 {
    let mut best = field_score(query, &entry.name);
    best = best.max(field_score(query, &entry.description));
    for category in &entry.categories {
        best = best.max(field_score(query, category));
    }
    for tag in &entry.tags {
        best = best.max(field_score(query, tag));
    }
    best
}

/// Score one field against the (already lowercased) query.
///
/// Exact match 100; substring match 80 plus up to 20 for coverage; otherwise
/// token overlap, where a whole-token match counts full and a prefix match
/// counts partial, scaled to a 0–75 band.
fn field_score(query: &str, field: &str) -> f64 {
    let field = field.to_lowercase();
    if field.is_empty() || query.is_empty() {
        return 0.0;
    }
    if field == query {
        return 100.0;
    }
    if field.contains(query) {
        return 80.0 + 20.0 * (query.len() as f64 / field.len() as f64);
    }

    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    if query_tokens.is_empty() {
        return 0.0;
    }
    let field_tokens: Vec<&str> = field
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut matched = 0.0;
    for token in &query_tokens {
        if field_tokens.iter().any(|f| f == token) {
            matched += 1.0;
        } else if field_tokens
            .iter()
            .any(|f| f.starts_with(token) || token.starts_with(f))
        {
            matched += 0.7;
        }
    }
    matched / query_tokens.len() as f64 * 75.0
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
