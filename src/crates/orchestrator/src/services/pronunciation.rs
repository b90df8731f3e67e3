//! Pronunciation lookup against a public dictionary API

use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::cache::TtlCache;
use crate::models::PronunciationResponse;

pub const DEFAULT_DICTIONARY_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

#[derive(Debug, Error)]
pub enum PronunciationError {
    /// The dictionary has no usable entry for the word
    #[error("{0}")]
    NotFound(String),

    #[error("Pronunciation API timeout")]
    Timeout,

    #[error("Pronunciation service unavailable")]
    Unavailable(String),

    /// The dictionary answered with something unparseable
    #[error("Invalid dictionary response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PronunciationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PronunciationError::Timeout
        } else if err.is_decode() {
            PronunciationError::InvalidResponse(err.to_string())
        } else {
            PronunciationError::Unavailable(err.to_string())
        }
    }
}

pub type PronunciationCache = Arc<dyn TtlCache<String, PronunciationResponse>>;

/// Cached IPA and audio lookups.
#[derive(Clone)]
pub struct PronunciationService {
    client: reqwest::Client,
    base_url: Url,
    cache: PronunciationCache,
}

impl PronunciationService {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        cache: PronunciationCache,
    ) -> Result<Self, PronunciationError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                PronunciationError::Unavailable(format!("Invalid dictionary URL: {base_url}"))
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PronunciationError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            cache,
        })
    }

    /// Dictionary URL for `word`, with the word encoded as one path segment.
    fn entry_url(&self, word: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(word);
        }
        url
    }

    pub async fn lookup(&self, word: &str) -> Result<PronunciationResponse, PronunciationError> {
        let key = word.trim().to_lowercase();
        if let Some(hit) = self.cache.get_fresh(&key) {
            debug!(word, "Pronunciation cache hit");
            return Ok(hit);
        }

        info!(word, "Getting pronunciation");
        let url = self.entry_url(word);
        let response = self.client.get(url).send().await.map_err(|e| {
            error!(word, error = %e, "HTTP error getting pronunciation");
            PronunciationError::from(e)
        })?;

        if response.status() != StatusCode::OK {
            return Err(PronunciationError::NotFound(format!(
                "Pronunciation not found for word: {word}"
            )));
        }

        let data: Value = response.json().await?;
        let entry = data
            .as_array()
            .and_then(|entries| entries.first())
            .ok_or_else(|| {
                PronunciationError::NotFound(format!("No pronunciation data for word: {word}"))
            })?;

        let pronunciation = parse_entry(word, entry);
        self.cache.put(key, pronunciation.clone());
        Ok(pronunciation)
    }
}

/// First phonetic text and first audio URL of a dictionary entry.
fn parse_entry(word: &str, entry: &Value) -> PronunciationResponse {
    let phonetics = entry
        .get("phonetics")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let non_empty = |phonetic: &Value, key: &str| {
        phonetic
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let ipa = phonetics
        .iter()
        .find_map(|p| non_empty(p, "text"))
        .or_else(|| non_empty(entry, "phonetic"))
        .unwrap_or_else(|| "N/A".to_string());
    let audio_url = phonetics.iter().find_map(|p| non_empty(p, "audio"));

    PronunciationResponse {
        word: word.to_string(),
        ipa,
        audio_url,
    }
}
