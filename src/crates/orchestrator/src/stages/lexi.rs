//! Production stage functions over a [`GenerationClient`]

use async_trait::async_trait;
use futures::StreamExt;
use llm::{CompletionRequest, GenerationClient, LlmError, Result, TextStream};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{StageGenerator, MAX_RELATED_WORDS};
use crate::config::{ModelRouting, ModelSlot};
use crate::models::{
    BlockList, CommonMistake, InterestFromUsageRequest, InterestTopic, Layer2Response,
    Layer3Response, Layer4Response, LexicalImageResponse, LexicalMapRequest, LiveContext,
    RelatedWord, RelatedWordCandidate,
};
use crate::prompts::{PromptRenderer, RenderedPrompt, MAX_CANDIDATES};

/// Example contexts returned by the second stage.
const LAYER2_CONTEXTS: usize = 3;

/// Generation parameters for one call site.
#[derive(Debug, Clone, Copy)]
struct CallParams {
    slot: ModelSlot,
    temperature: f32,
    max_tokens: u32,
}

const LAYER1: CallParams = CallParams { slot: ModelSlot::Default, temperature: 0.7, max_tokens: 300 };
const LAYER2: CallParams = CallParams { slot: ModelSlot::Layer2, temperature: 0.8, max_tokens: 600 };
const LAYER3: CallParams = CallParams { slot: ModelSlot::Layer3, temperature: 0.7, max_tokens: 400 };
const CANDIDATES: CallParams = CallParams { slot: ModelSlot::Layer4Fast, temperature: 0.7, max_tokens: 200 };
const ENRICHMENT: CallParams = CallParams { slot: ModelSlot::Layer4, temperature: 0.7, max_tokens: 600 };
const PERSONALIZED: CallParams = CallParams { slot: ModelSlot::Layer4, temperature: 0.7, max_tokens: 400 };
const INTERESTS: CallParams = CallParams { slot: ModelSlot::Default, temperature: 0.6, max_tokens: 800 };

/// Stage functions backed by a remote generation client.
#[derive(Clone)]
pub struct LexiStages {
    client: Arc<dyn GenerationClient>,
    renderer: PromptRenderer,
    routing: ModelRouting,
}

impl LexiStages {
    pub fn new(client: Arc<dyn GenerationClient>, routing: ModelRouting) -> Self {
        Self {
            client,
            renderer: PromptRenderer::new(),
            routing,
        }
    }

    fn request(&self, prompt: RenderedPrompt, params: CallParams) -> CompletionRequest {
        CompletionRequest::new(prompt.user)
            .with_system_prompt(prompt.system)
            .with_temperature(params.temperature)
            .with_max_tokens(params.max_tokens)
            .with_model(Some(self.routing.model_for(params.slot)))
            .with_extra_params(self.routing.reasoning_for(params.slot))
    }
}

#[async_trait]
impl StageGenerator for LexiStages {
    async fn generate_layer1_stream(
        &self,
        word: &str,
        context: &str,
        english_level: Option<&str>,
    ) -> Result<TextStream> {
        let prompt = self.renderer.layer1(word, context, english_level);
        let mut inner = self.client.stream(self.request(prompt, LAYER1)).await?;

        let stream = async_stream::stream! {
            let mut has_text = false;
            while let Some(item) = inner.next().await {
                match item {
                    Ok(fragment) => {
                        has_text |= !fragment.trim().is_empty();
                        yield Ok(fragment);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            if !has_text {
                yield Err(LlmError::EmptyResult("Layer 1 returned empty content".to_string()));
            }
        };

        Ok(Box::pin(stream))
    }

    async fn generate_layer2(&self, word: &str, context: &str) -> Result<Layer2Response> {
        let prompt = self.renderer.layer2(word, context);
        let response = self.client.complete_json(self.request(prompt, LAYER2)).await?;
        parse_layer2(response)
    }

    async fn generate_layer3(
        &self,
        word: &str,
        context: &str,
        english_level: Option<&str>,
        max_items: usize,
    ) -> Result<Layer3Response> {
        let prompt = self.renderer.layer3(word, context, english_level);
        let response = self.client.complete_json(self.request(prompt, LAYER3)).await?;
        parse_layer3(response, max_items)
    }

    async fn generate_layer4_candidates(
        &self,
        word: &str,
        context: &str,
    ) -> Result<Vec<RelatedWordCandidate>> {
        let prompt = self.renderer.layer4_candidates(word, context);
        let response = self
            .client
            .complete_json(self.request(prompt, CANDIDATES))
            .await?;
        let candidates = parse_candidates(response)?;
        debug!(word, count = candidates.len(), "Recalled related-word candidates");
        Ok(candidates)
    }

    async fn enrich_layer4_from_candidates(
        &self,
        input: &LexicalMapRequest,
        candidates: &[RelatedWordCandidate],
    ) -> Result<Layer4Response> {
        let grounding: Vec<RelatedWordCandidate> = candidates
            .iter()
            .take(MAX_CANDIDATES)
            .filter(|c| !c.word.trim().is_empty())
            .map(|c| RelatedWordCandidate {
                word: c.word.trim().to_string(),
                relationship: c.relationship.trim().to_string(),
            })
            .collect();

        let prompt = self.renderer.layer4_enrichment(input, &grounding);
        let response = self
            .client
            .complete_json(self.request(prompt, ENRICHMENT))
            .await?;
        parse_enrichment(response)
    }

    async fn generate_layer4_personalized_stream(
        &self,
        input: &LexicalMapRequest,
    ) -> Result<TextStream> {
        let prompt = self.renderer.layer4_personalized(input);
        self.client.stream(self.request(prompt, PERSONALIZED)).await
    }

    async fn summarize_interests_from_usage(
        &self,
        request: &InterestFromUsageRequest,
    ) -> Result<Vec<InterestTopic>> {
        let prompt = self.renderer.interests(
            &request.word,
            &request.context,
            request.page_type.as_deref(),
            request.url.as_deref(),
            &request.existing_topics,
            &request.blocked_titles,
        );
        let response = self
            .client
            .complete_json(self.request(prompt, INTERESTS))
            .await?;

        let topics = parse_topics(response)?;
        Ok(BlockList::new(&request.blocked_titles).retain_allowed(topics))
    }

    async fn generate_lexical_image(
        &self,
        base_word: &str,
        related_word: &str,
    ) -> Result<LexicalImageResponse> {
        let prompt = self.renderer.lexical_image(base_word, related_word);
        let image_url = self.client.generate_image(&prompt).await?;
        Ok(LexicalImageResponse { image_url, prompt })
    }
}

/// Trimmed string value of `key`, empty when absent or not a string.
fn text_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn parse_layer2(response: Value) -> Result<Layer2Response> {
    let items = match response.as_array() {
        Some(items) if items.len() == LAYER2_CONTEXTS => items,
        _ => {
            return Err(LlmError::malformed(
                "Layer 2 response must be a list of 3 contexts",
            ))
        }
    };

    let contexts = items
        .iter()
        .map(|item| {
            let object = item
                .as_object()
                .ok_or_else(|| LlmError::malformed("Layer 2 context must be an object"))?;
            let text = text_field(object, "text");
            if text.is_empty() {
                return Err(LlmError::malformed("Layer 2 context is missing its text"));
            }
            let source = match text_field(object, "source") {
                s if s.is_empty() => "unknown".to_string(),
                s => s,
            };
            Ok(LiveContext { source, text, icon: None })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Layer2Response { contexts })
}

fn parse_layer3(response: Value, max_items: usize) -> Result<Layer3Response> {
    let items = match response.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => {
            return Err(LlmError::malformed(
                "Layer 3 response must be a list of at least 1 mistake",
            ))
        }
    };

    let limit = max_items.max(1);
    let mistakes = items
        .iter()
        .take(limit)
        .map(|item| {
            let object = item
                .as_object()
                .ok_or_else(|| LlmError::malformed("Layer 3 mistake must be an object"))?;
            for key in ["wrong", "why", "correct"] {
                if !object.get(key).is_some_and(Value::is_string) {
                    return Err(LlmError::malformed(format!(
                        "Layer 3 mistake is missing '{key}'"
                    )));
                }
            }
            Ok(CommonMistake {
                wrong: text_field(object, "wrong"),
                why: text_field(object, "why"),
                correct: text_field(object, "correct"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Layer3Response { mistakes })
}

fn parse_candidates(response: Value) -> Result<Vec<RelatedWordCandidate>> {
    let items = match response.as_array() {
        Some(items) if !items.is_empty() => items,
        _ => {
            return Err(LlmError::malformed(
                "Layer 4 candidate response must be a non-empty JSON array",
            ))
        }
    };

    let candidates: Vec<RelatedWordCandidate> = items
        .iter()
        .take(MAX_CANDIDATES)
        .filter_map(|item| {
            let Some(object) = item.as_object() else {
                warn!(%item, "Skipping non-object layer4 candidate");
                return None;
            };
            let word = text_field(object, "word");
            if word.is_empty() {
                warn!(%item, "Skipping layer4 candidate without a word");
                return None;
            }
            Some(RelatedWordCandidate {
                word,
                relationship: text_field(object, "relationship"),
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(LlmError::malformed(
            "Layer 4 candidate generation produced no valid items",
        ));
    }
    Ok(candidates)
}

fn parse_enrichment(response: Value) -> Result<Layer4Response> {
    let object = response
        .as_object()
        .filter(|o| o.contains_key("related_words"))
        .ok_or_else(|| LlmError::malformed("Layer 4 response must contain 'related_words' key"))?;

    let items = match object.get("related_words").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => {
            return Err(LlmError::malformed(
                "Layer 4 must contain at least 1 related word",
            ))
        }
    };

    let related_words: Vec<RelatedWord> = items
        .iter()
        .take(MAX_RELATED_WORDS)
        .filter_map(|item| {
            let Some(entry) = item.as_object() else {
                warn!(%item, "Skipping non-object related word");
                return None;
            };
            let word = text_field(entry, "word");
            if word.is_empty() {
                warn!(%item, "Skipping related word without a word");
                return None;
            }
            Some(RelatedWord {
                word,
                relationship: text_field(entry, "relationship"),
                difference: text_field(entry, "difference"),
                when_to_use: text_field(entry, "when_to_use"),
            })
        })
        .collect();

    if related_words.is_empty() {
        return Err(LlmError::malformed(
            "Layer 4 enrichment did not yield any valid related words",
        ));
    }

    let personalized = Some(text_field(object, "personalized")).filter(|s| !s.is_empty());

    Ok(Layer4Response {
        related_words,
        personalized,
    })
}

fn parse_topics(response: Value) -> Result<Vec<InterestTopic>> {
    let items = response
        .as_array()
        .ok_or_else(|| LlmError::malformed("Interests response must be a JSON array of topics"))?;

    let topics = items
        .iter()
        .filter_map(|item| {
            let Some(object) = item.as_object() else {
                warn!(%item, "Skipping non-object interest topic");
                return None;
            };
            let title = text_field(object, "title");
            if title.is_empty() {
                warn!(%item, "Skipping interest topic without a title");
                return None;
            }
            let id = match object.get("id") {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            let urls = object
                .get("urls")
                .and_then(Value::as_array)
                .map(|urls| {
                    urls.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            Some(InterestTopic {
                id,
                title,
                summary: text_field(object, "summary"),
                urls,
            })
        })
        .collect();

    Ok(topics)
}
