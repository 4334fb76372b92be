//! Fuzzy Mark Resolver: Matches human queries to marks.

use super::repo::MarkRepo;
use super::types::ProductionMark;
use anyhow::{anyhow, bail, Result};
use rusqlite::Connection;
use std::collections::HashSet;

pub struct ResolveResult {
    pub mark: ProductionMark,
    pub confidence: f64,
}

pub struct MarkResolver<'a> {
    repo: MarkRepo<'a>,
    strict: bool,
}

impl<'a> MarkResolver<'a> {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            repo: MarkRepo::new(conn),
            strict: false,
        }
    }

    /// Creates a resolver that only accepts an id or an exact code.
    #[must_use]
    pub fn strict(conn: &'a Connection) -> Self {
        Self {
            repo: MarkRepo::new(conn),
            strict: true,
        }
    }

    /// Resolves a user query into a mark.
    ///
    /// Tries, in order: numeric id, exact code, fuzzy code/title match.
    ///
    /// # Errors
    /// Returns an error if no match is found or the code exists in several projects.
    pub fn resolve(&self, query: &str) -> Result<ResolveResult> {
        if let Ok(id) = query.trim().parse::<i64>() {
            if let Some(mark) = self.repo.find_by_id(id)? {
                return Ok(ResolveResult {
                    mark,
                    confidence: 1.0,
                });
            }
        }

        let mut exact = self.repo.find_by_code(query)?;
        match exact.len() {
            0 => {}
            1 => {
                return Ok(ResolveResult {
                    mark: exact.remove(0),
                    confidence: 1.0,
                })
            }
            n => bail!("Code '{query}' exists in {n} projects; use the mark id instead."),
        }

        if self.strict {
            bail!("No exact match for '{query}' in strict mode.");
        }
        self.fuzzy_resolve(query)
    }

    fn fuzzy_resolve(&self, query: &str) -> Result<ResolveResult> {
        let marks = self.repo.get_all()?;
        let query_lower = query.to_lowercase();
        let words: Vec<_> = query_lower.split_whitespace().collect();

        let mut matches: Vec<_> = marks
            .into_iter()
            .map(|m| (calculate_score(&m, &query_lower, &words), m))
            .filter(|(s, _)| *s > 0.3)
            .collect();

        matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let (confidence, mark) = matches
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No mark matches '{query}'"))?;

        Ok(ResolveResult { mark, confidence })
    }
}

/// Calculates a match score between a mark and a query.
fn calculate_score(mark: &ProductionMark, query: &str, query_words: &[&str]) -> f64 {
    let code_lower = mark.code.to_lowercase();
    let title_lower = mark.title.to_lowercase();

    let mut score = 0.0;

    if code_lower.contains(query) {
        score += 0.8;
    }
    if title_lower.contains(query) {
        score += 0.7;
    }

    for word in query_words {
        if code_lower.contains(word) {
            score += 0.3;
        }
        if title_lower.contains(word) {
            score += 0.25;
        }
    }

    if code_lower.starts_with(query) {
        score += 0.5;
    }

    score += string_similarity(&code_lower, query) * 0.4;

    score.min(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: HashSet<char> = a.chars().collect();
    let b_chars: HashSet<char> = b.chars().collect();

    let intersection = a_chars.intersection(&b_chars).count();
    let union = a_chars.union(&b_chars).count();

    if union == 0 {
        return 0.0;
    }

    intersection as f64 / union as f64
}
