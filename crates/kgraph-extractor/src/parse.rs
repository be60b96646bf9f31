//! Dependency parse model
//!
//! The shape of what a linguistic annotator returns for one document:
//! tokens with lemma, part-of-speech, dependency label and head index,
//! plus named-entity spans.

use serde::{Deserialize, Serialize};

use kgraph_core::{EntityLabel, KgError, Result};

/// A single token of the parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Surface text
    pub text: String,

    /// Base form
    pub lemma: String,

    /// Coarse part-of-speech tag (VERB, AUX, PROPN, ...)
    pub pos: String,

    /// Dependency label (nsubj, dobj, prep, poss, ...)
    pub dep: String,

    /// Index of the syntactic head; the root points at itself
    pub head: usize,

    /// Whether the annotator considers this token a stop word
    #[serde(default)]
    pub is_stop: bool,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        lemma: impl Into<String>,
        pos: impl Into<String>,
        dep: impl Into<String>,
        head: usize,
    ) -> Self {
        Self {
            text: text.into(),
            lemma: lemma.into(),
            pos: pos.into(),
            dep: dep.into(),
            head,
            is_stop: false,
        }
    }

    /// Mark as stop word
    pub fn stop(mut self) -> Self {
        self.is_stop = true;
        self
    }
}

/// A named-entity span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: EntityLabel,
}

impl EntitySpan {
    pub fn new(text: impl Into<String>, label: impl Into<EntityLabel>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Annotated document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parse {
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
}

impl Parse {
    pub fn new(tokens: Vec<Token>, entities: Vec<EntitySpan>) -> Self {
        Self { tokens, entities }
    }

    /// Reject parses whose head indices point outside the token list
    pub fn validate(&self) -> Result<()> {
        match self
            .tokens
            .iter()
            .enumerate()
            .find(|(_, t)| t.head >= self.tokens.len())
        {
            Some((i, t)) => Err(KgError::AnnotationError(format!(
                "token {i} ({:?}) has head {} outside {} tokens",
                t.text,
                t.head,
                self.tokens.len()
            ))),
            None => Ok(()),
        }
    }

    /// Syntactic head of the token at `index`
    pub fn head_of(&self, index: usize) -> Option<&Token> {
        self.tokens
            .get(index)
            .and_then(|t| self.tokens.get(t.head))
    }

    /// Direct syntactic children of the token at `index`, in sentence order
    pub fn children(&self, index: usize) -> impl Iterator<Item = (usize, &Token)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .filter(move |(i, t)| t.head == index && *i != index)
    }
}
