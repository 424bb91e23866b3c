//! Taxonomy Matcher: finds canonical skills mentioned in normalized CV text.
//!
//! A term matches when it occurs case-insensitively and is neither preceded
//! nor followed by an ASCII letter or digit, so "react" never matches inside
//! "reactive". Dots in a term are optional in the text ("node.js" also matches
//! "nodejs"); every other punctuation character is literal.

use std::collections::HashSet;

use regex::Regex;

use crate::taxonomy::{TaxonomyError, TaxonomySkill};

/// Lowercases text and replaces every whitespace run with a single space.
pub fn normalize_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_was_whitespace = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_whitespace {
                result.push(' ');
            }
            last_was_whitespace = true;
        } else {
            result.extend(c.to_lowercase());
            last_was_whitespace = false;
        }
    }

    result
}

/// Builds the boundary-safe pattern for one skill name or alias.
///
/// The regex crate has no look-around, so the boundaries are expressed as
/// "start of text or a non-alphanumeric character" on each side. That is
/// equivalent for a yes/no search.
fn compile_term(term: &str) -> Result<Regex, TaxonomyError> {
    let body = regex::escape(&normalize_text(term.trim())).replace(r"\.", r"\.?");
    let pattern = format!(r"(?i)(?:^|[^a-z0-9]){body}(?:[^a-z0-9]|$)");
    Regex::new(&pattern).map_err(|source| TaxonomyError::Pattern {
        term: term.to_string(),
        source,
    })
}

#[derive(Debug)]
struct CompiledSkill {
    name: String,
    /// The canonical name first, then aliases in taxonomy order.
    patterns: Vec<Regex>,
}

/// Precompiled patterns for every taxonomy entry. Immutable after construction.
#[derive(Debug)]
pub struct TaxonomyMatcher {
    skills: Vec<CompiledSkill>,
}

impl TaxonomyMatcher {
    pub fn compile(skills: &[TaxonomySkill]) -> Result<Self, TaxonomyError> {
        let skills = skills
            .iter()
            .map(|skill| {
                let terms = std::iter::once(&skill.name)
                    .chain(skill.aliases.iter())
                    // A blank alias would match every text.
                    .filter(|term| !term.trim().is_empty());
                let patterns: Vec<Regex> = terms
                    .map(|t| compile_term(t))
                    .collect::<Result<_, TaxonomyError>>()?;
                Ok::<_, TaxonomyError>(CompiledSkill {
                    name: skill.name.clone(),
                    patterns,
                })
            })
            .collect::<Result<_, TaxonomyError>>()?;

        Ok(Self { skills })
    }

    /// Returns the canonical names whose name or any alias occurs in `normalized_text`.
    ///
    /// The name is tested first; aliases are only tested when it misses, and the
    /// first alias hit ends the search for that entry. Aliases are never returned.
    pub fn find_matches(&self, normalized_text: &str) -> HashSet<String> {
        self.skills
            .iter()
            .filter(|skill| skill.patterns.iter().any(|p| p.is_match(normalized_text)))
            .map(|skill| skill.name.clone())
            .collect()
    }
}
