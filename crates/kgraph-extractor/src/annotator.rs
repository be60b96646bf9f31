//! Linguistic annotator interface
//!
//! The annotator is an external collaborator. This module defines the
//! trait the pipeline depends on and an HTTP client for annotation
//! services speaking the `Parse` JSON shape.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::parse::Parse;
use kgraph_core::{AnnotatorConfig, KgError, Result};

/// Trait for linguistic annotators
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Parse at most the first `max_chars` characters of `text`
    async fn annotate(&self, text: &str, max_chars: usize) -> Result<Parse>;

    /// Annotator name for logging
    fn name(&self) -> &str;
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// ============================================================================
// HTTP Annotator
// ============================================================================

/// Client for an annotation service (e.g. a spaCy wrapper)
pub struct HttpAnnotator {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    text: &'a str,
}

impl HttpAnnotator {
    /// Create from config
    pub fn from_config(config: &AnnotatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KgError::AnnotationError(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Annotator for HttpAnnotator {
    async fn annotate(&self, text: &str, max_chars: usize) -> Result<Parse> {
        let request = AnnotateRequest {
            text: truncate_chars(text, max_chars),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| KgError::AnnotationError(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(KgError::AnnotationError(format!(
                "Annotator returned {status}: {error_text}"
            )));
        }

        let parse: Parse = response
            .json()
            .await
            .map_err(|e| KgError::AnnotationError(format!("Failed to decode parse: {e}")))?;

        parse.validate()?;
        Ok(parse)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_ascii() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ab", 10), "ab");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        // each of these is more than one byte in UTF-8
        let text = "Zürich–Genève";
        assert_eq!(truncate_chars(text, 2), "Zü");
        assert_eq!(truncate_chars(text, 7), "Zürich–");
        assert_eq!(truncate_chars(text, 3000), text);
    }

    #[test]
    fn test_from_config() {
        let annotator = HttpAnnotator::from_config(&AnnotatorConfig::default()).unwrap();
        assert_eq!(annotator.name(), "http");
        assert_eq!(annotator.url, "http://localhost:8081/parse");
    }
}
