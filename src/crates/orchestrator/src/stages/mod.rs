//! Stage functions
//!
//! One async operation per generation stage. Each wraps the generation client
//! and the prompt renderer, then validates the raw model output into a typed
//! result or a typed [`LlmError`].
//!
//! [`StageGenerator`] is the seam consumed by the streaming orchestrator and
//! the synchronous HTTP handlers; [`LexiStages`] is the production
//! implementation.

mod lexi;

pub use lexi::LexiStages;

use async_trait::async_trait;
use llm::{Result, TextStream};

use crate::models::{
    InterestFromUsageRequest, InterestTopic, Layer2Response, Layer3Response, Layer4Response,
    LexicalImageResponse, LexicalMapRequest, RelatedWordCandidate,
};

/// Default cap on common mistakes.
pub const DEFAULT_MAX_MISTAKES: usize = 2;

/// Upper bound on related words kept from enrichment.
pub const MAX_RELATED_WORDS: usize = 5;

#[async_trait]
pub trait StageGenerator: Send + Sync {
    /// Word-sense explanation as incremental text fragments.
    async fn generate_layer1_stream(
        &self,
        word: &str,
        context: &str,
        english_level: Option<&str>,
    ) -> Result<TextStream>;

    /// Exactly three example contexts.
    async fn generate_layer2(&self, word: &str, context: &str) -> Result<Layer2Response>;

    /// Between one and `max(1, max_items)` common mistakes.
    async fn generate_layer3(
        &self,
        word: &str,
        context: &str,
        english_level: Option<&str>,
        max_items: usize,
    ) -> Result<Layer3Response>;

    /// Fast recall of up to five related-word leads.
    async fn generate_layer4_candidates(
        &self,
        word: &str,
        context: &str,
    ) -> Result<Vec<RelatedWordCandidate>>;

    /// Elaborate recalled leads into full related-word records.
    async fn enrich_layer4_from_candidates(
        &self,
        input: &LexicalMapRequest,
        candidates: &[RelatedWordCandidate],
    ) -> Result<Layer4Response>;

    /// Candidate recall followed by enrichment.
    ///
    /// A recall failure fails the whole stage; enrichment is not attempted.
    async fn generate_layer4(&self, input: &LexicalMapRequest) -> Result<Layer4Response> {
        let candidates = self
            .generate_layer4_candidates(&input.word, &input.context)
            .await?;
        self.enrich_layer4_from_candidates(input, &candidates).await
    }

    /// Coaching prose only, streamed alongside the structured stage.
    async fn generate_layer4_personalized_stream(
        &self,
        input: &LexicalMapRequest,
    ) -> Result<TextStream>;

    /// Full replacement topic list after the latest usage.
    async fn summarize_interests_from_usage(
        &self,
        request: &InterestFromUsageRequest,
    ) -> Result<Vec<InterestTopic>>;

    /// Illustration contrasting two related words.
    async fn generate_lexical_image(
        &self,
        base_word: &str,
        related_word: &str,
    ) -> Result<LexicalImageResponse>;
}
