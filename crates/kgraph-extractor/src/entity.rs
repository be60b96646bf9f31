//! Entity filtering
//!
//! Cleans raw named-entity spans and keeps only those worth becoming
//! graph nodes:
//! - whitespace collapsed, punctuation other than `-` and `.` removed
//! - at least three characters, not purely numeric, not a stop word
//! - labelled with one of the important entity types

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parse::EntitySpan;
use kgraph_core::{EntityLabel, EntityMention};

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\s\-.]").expect("static regex"));

const DEFAULT_STOP_WORDS: [&str; 5] = ["the", "a", "an", "this", "that"];
const DEFAULT_MIN_LENGTH: usize = 3;

/// Clean and normalize entity text
pub fn clean_entity_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    DISALLOWED_CHARS.replace_all(&collapsed, "").into_owned()
}

/// Quality gate for entity mentions
pub struct EntityFilter {
    stop_words: HashSet<String>,
    min_length: usize,
}

impl EntityFilter {
    /// Create a filter with the default stop words and minimum length
    pub fn new() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
            min_length: DEFAULT_MIN_LENGTH,
        }
    }

    /// Replace the stop-word list
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Whether an already-cleaned mention passes the quality and type gates
    pub fn is_quality_entity(&self, clean_text: &str, label: &EntityLabel) -> bool {
        if clean_text.chars().count() < self.min_length
            || clean_text.chars().all(|c| c.is_ascii_digit())
            || self.stop_words.contains(&clean_text.to_lowercase())
            || label.is_numeric()
        {
            return false;
        }

        label.is_important()
    }

    /// Clean, gate and deduplicate (case-insensitively, first seen wins) the spans of one document
    pub fn filter(&self, spans: &[EntitySpan]) -> Vec<EntityMention> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        for span in spans {
            let clean_text = clean_entity_text(&span.text);

            if self.is_quality_entity(&clean_text, &span.label)
                && seen.insert(clean_text.to_lowercase())
            {
                entities.push(EntityMention::new(clean_text, span.label.clone()));
            }
        }

        entities
    }
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self::new()
    }
}
