//! Inbound request payloads

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::interests::InterestTopic;

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An optional analysis stage that runs after the word-sense stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Example contexts
    Layer2,
    /// Common mistakes
    Layer3,
    /// Related words plus personalized coaching
    Layer4,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Layer2, Layer::Layer3, Layer::Layer4];

    /// Event name used for this stage's success payload.
    pub fn id(&self) -> &'static str {
        match self {
            Layer::Layer2 => "layer2",
            Layer::Layer3 => "layer3",
            Layer::Layer4 => "layer4",
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            2 => Some(Layer::Layer2),
            3 => Some(Layer::Layer3),
            4 => Some(Layer::Layer4),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Selected word or phrase
    pub word: String,

    /// Sentence or paragraph containing the word
    pub context: String,

    /// Kind of page: news, academic, social, email, ...
    #[serde(default)]
    pub page_type: Option<String>,

    /// Learner proficiency hint, e.g. "B1" or "below A1 (Starter)"
    #[serde(default)]
    pub english_level: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Previously looked-up words, oldest first
    #[serde(default, deserialize_with = "null_as_default")]
    pub learning_history: Vec<String>,

    /// Favorite words (a subset of the history)
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorite_words: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<InterestTopic>,

    /// Topic titles the learner removed
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocked_titles: Vec<String>,

    /// Stages to run after layer 1; any subset of 2, 3 and 4
    #[serde(default)]
    pub layers: Option<Vec<i64>>,
}

impl AnalysisRequest {
    pub fn new(word: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            context: context.into(),
            ..Default::default()
        }
    }

    pub fn with_layers(mut self, layers: Vec<i64>) -> Self {
        self.layers = Some(layers);
        self
    }

    /// The effective stage set.
    ///
    /// Unknown numbers are ignored; a missing list, an empty list, or one
    /// without a single valid member selects every stage.
    pub fn requested_layers(&self) -> BTreeSet<Layer> {
        let selected: BTreeSet<Layer> = self
            .layers
            .iter()
            .flatten()
            .filter_map(|n| Layer::from_number(*n))
            .collect();

        if selected.is_empty() {
            Layer::ALL.into_iter().collect()
        } else {
            selected
        }
    }

    /// Inputs for the related-words stage.
    pub fn lexical_map_request(&self) -> LexicalMapRequest {
        LexicalMapRequest {
            word: self.word.clone(),
            context: self.context.clone(),
            learning_history: self.learning_history.clone(),
            english_level: self.english_level.clone(),
            interests: self.interests.clone(),
            blocked_titles: self.blocked_titles.clone(),
            favorite_words: self.favorite_words.clone(),
        }
    }
}

/// Body of `POST /api/analyze/mistakes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistakesRequest {
    pub word: String,
    pub context: String,
    #[serde(default)]
    pub english_level: Option<String>,
    /// Upper bound on returned mistakes; defaults to 2
    #[serde(default)]
    pub max_items: Option<usize>,
}

/// Body of `POST /api/lexical-map/text`, also the related-words stage input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexicalMapRequest {
    pub word: String,
    pub context: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub learning_history: Vec<String>,
    #[serde(default)]
    pub english_level: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<InterestTopic>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocked_titles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorite_words: Vec<String>,
}

/// Body of `POST /api/lexical-map/image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalImageRequest {
    #[serde(default)]
    pub base_word: String,
    #[serde(default)]
    pub related_word: String,
}
