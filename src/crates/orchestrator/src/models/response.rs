//! Stage results and endpoint response bodies

use serde::{Deserialize, Serialize};

/// One example sentence tagged with its register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveContext {
    /// twitter, news, academic, ...
    pub source: String,
    pub text: String,
    /// Clients derive icons from `source`; never populated from the model.
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonMistake {
    pub wrong: String,
    pub why: String,
    pub correct: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedWord {
    pub word: String,
    /// synonym, antonym, narrower, broader, collocate
    pub relationship: String,
    pub difference: String,
    pub when_to_use: String,
}

/// A related-word lead from the fast recall phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedWordCandidate {
    pub word: String,
    pub relationship: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer1Response {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer2Response {
    pub contexts: Vec<LiveContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer3Response {
    pub mistakes: Vec<CommonMistake>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer4Response {
    pub related_words: Vec<RelatedWord>,
    #[serde(default)]
    pub personalized: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PronunciationResponse {
    pub word: String,
    /// IPA notation, "N/A" when the dictionary has none
    pub ipa: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalImageResponse {
    pub image_url: String,
    pub prompt: String,
}
