//! Skills taxonomy: the fixed catalog of canonical skill names used for
//! deterministic matching. Loaded once at startup and shared read-only.

pub mod matcher;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::taxonomy::matcher::TaxonomyMatcher;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to read skills taxonomy at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse skills taxonomy: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Skills taxonomy is empty")]
    Empty,

    #[error("Skills taxonomy contains a skill with a blank name")]
    BlankName,

    #[error("Skills taxonomy contains duplicate skill name '{0}'")]
    DuplicateName(String),

    #[error("Failed to compile pattern for '{term}': {source}")]
    Pattern {
        term: String,
        #[source]
        source: regex::Error,
    },
}

/// A canonical skill with its category and alternate surface forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySkill {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyDocument {
    skills: Vec<TaxonomySkill>,
}

/// The validated taxonomy plus its precompiled matcher.
#[derive(Debug)]
pub struct Taxonomy {
    skills: Vec<TaxonomySkill>,
    matcher: TaxonomyMatcher,
}

impl Taxonomy {
    /// Validates the skill list and compiles every name and alias pattern.
    pub fn new(skills: Vec<TaxonomySkill>) -> Result<Self, TaxonomyError> {
        if skills.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut seen = HashSet::new();
        for skill in &skills {
            let key = skill.name.trim().to_lowercase();
            if key.is_empty() {
                return Err(TaxonomyError::BlankName);
            }
            if !seen.insert(key) {
                return Err(TaxonomyError::DuplicateName(skill.name.clone()));
            }
        }

        let matcher = TaxonomyMatcher::compile(&skills)?;
        Ok(Self { skills, matcher })
    }

    pub fn from_json(json: &str) -> Result<Self, TaxonomyError> {
        let document: TaxonomyDocument = serde_json::from_str(json)?;
        Self::new(document.skills)
    }

    /// Reads and validates the taxonomy resource. Any failure is fatal at startup.
    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let json = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let taxonomy = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            skills = taxonomy.skills.len(),
            "Skills taxonomy loaded"
        );
        Ok(taxonomy)
    }

    pub fn skills(&self) -> &[TaxonomySkill] {
        &self.skills
    }

    pub fn matcher(&self) -> &TaxonomyMatcher {
        &self.matcher
    }
}
