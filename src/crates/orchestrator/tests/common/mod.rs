//! Scripted stage generator shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use llm::{LlmError, Result, TextStream};
use orchestrator::execution::AnalysisEvent;
use orchestrator::models::{
    CommonMistake, InterestFromUsageRequest, InterestTopic, Layer2Response, Layer3Response,
    Layer4Response, LexicalImageResponse, LexicalMapRequest, LiveContext, RelatedWord,
    RelatedWordCandidate,
};
use orchestrator::StageGenerator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How one scripted stage behaves.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub delay: Duration,
    pub failure: Option<LlmError>,
    pub panic: bool,
}

impl Script {
    pub fn after(millis: u64) -> Self {
        Self {
            delay: Duration::from_millis(millis),
            ..Default::default()
        }
    }

    pub fn failing(mut self, err: LlmError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    async fn play(&self, stage: &str) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        if self.panic {
            panic!("{stage} exploded");
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Where the personalized coaching stream breaks.
#[derive(Debug, Clone)]
pub enum CoachingFailure {
    /// The stream cannot be opened at all
    OnOpen(LlmError),
    /// The scripted fragments are followed by an error item, then a fragment
    /// that must never reach the client
    MidStream(LlmError),
}

/// Sets its flag when dropped, so tests can observe task cancellation.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct FakeStages {
    pub layer1: Vec<&'static str>,
    pub layer1_failure: Option<LlmError>,
    pub layer2: Script,
    pub layer3: Script,
    pub layer4: Script,
    /// (delay before the fragment, fragment)
    pub personalized: Vec<(u64, &'static str)>,
    pub personalized_failure: Option<CoachingFailure>,
    pub image: Script,
    pub interests: Script,
    pub calls: Mutex<Vec<String>>,
    pub image_calls: AtomicUsize,
    pub dropped: Arc<AtomicBool>,
}

impl Default for FakeStages {
    fn default() -> Self {
        Self {
            layer1: vec!["A **tactic** is ", "a planned action."],
            layer1_failure: None,
            layer2: Script::default(),
            layer3: Script::default(),
            layer4: Script::default(),
            personalized: vec![(0, "Like your "), (0, "strategy notes.")],
            personalized_failure: None,
            image: Script::default(),
            interests: Script::default(),
            calls: Mutex::new(Vec::new()),
            image_calls: AtomicUsize::new(0),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FakeStages {
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl StageGenerator for FakeStages {
    async fn generate_layer1_stream(
        &self,
        word: &str,
        _context: &str,
        _english_level: Option<&str>,
    ) -> Result<TextStream> {
        self.record(format!("layer1:{word}"));
        if let Some(err) = &self.layer1_failure {
            return Err(err.clone());
        }
        let fragments: Vec<Result<String>> =
            self.layer1.iter().map(|s| Ok(s.to_string())).collect();
        Ok(Box::pin(futures::stream::iter(fragments)))
    }

    async fn generate_layer2(&self, word: &str, _context: &str) -> Result<Layer2Response> {
        self.record("layer2");
        let _guard = DropFlag(self.dropped.clone());
        self.layer2.play("layer2").await?;
        let contexts = ["twitter", "news", "academic"]
            .into_iter()
            .map(|source| LiveContext {
                source: source.to_string(),
                text: format!("A {source} sentence with **{word}**."),
                icon: None,
            })
            .collect();
        Ok(Layer2Response { contexts })
    }

    async fn generate_layer3(
        &self,
        word: &str,
        _context: &str,
        _english_level: Option<&str>,
        max_items: usize,
    ) -> Result<Layer3Response> {
        self.record(format!("layer3:{max_items}"));
        self.layer3.play("layer3").await?;
        let mistakes = (0..max_items.max(1))
            .map(|i| CommonMistake {
                wrong: format!("wrong {word} {i}"),
                why: "because".to_string(),
                correct: format!("right {word} {i}"),
            })
            .collect();
        Ok(Layer3Response { mistakes })
    }

    async fn generate_layer4_candidates(
        &self,
        _word: &str,
        _context: &str,
    ) -> Result<Vec<RelatedWordCandidate>> {
        self.record("layer4_candidates");
        Ok(vec![RelatedWordCandidate {
            word: "strategy".to_string(),
            relationship: "broader".to_string(),
        }])
    }

    async fn enrich_layer4_from_candidates(
        &self,
        _input: &LexicalMapRequest,
        candidates: &[RelatedWordCandidate],
    ) -> Result<Layer4Response> {
        self.record("layer4_enrich");
        self.layer4.play("layer4").await?;
        let related_words = candidates
            .iter()
            .map(|c| RelatedWord {
                word: c.word.clone(),
                relationship: c.relationship.clone(),
                difference: "wider in scope".to_string(),
                when_to_use: "for long-term plans".to_string(),
            })
            .collect();
        Ok(Layer4Response {
            related_words,
            personalized: None,
        })
    }

    async fn generate_layer4_personalized_stream(
        &self,
        _input: &LexicalMapRequest,
    ) -> Result<TextStream> {
        self.record("personalized");
        let tail: Vec<Result<String>> = match &self.personalized_failure {
            Some(CoachingFailure::OnOpen(err)) => return Err(err.clone()),
            Some(CoachingFailure::MidStream(err)) => {
                vec![Err(err.clone()), Ok("after the failure".to_string())]
            }
            None => Vec::new(),
        };

        let fragments = self.personalized.clone();
        let stream = futures::stream::iter(fragments)
            .then(|(delay, fragment)| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, LlmError>(fragment.to_string())
            })
            .chain(futures::stream::iter(tail));
        Ok(Box::pin(stream))
    }

    async fn summarize_interests_from_usage(
        &self,
        request: &InterestFromUsageRequest,
    ) -> Result<Vec<InterestTopic>> {
        self.record("interests");
        self.interests.play("interests").await?;
        let mut topics = request.existing_topics.clone();
        topics.push(InterestTopic {
            id: None,
            title: format!("Topic about {}", request.word),
            summary: "The learner keeps reading about this.".to_string(),
            urls: request.url.iter().cloned().collect(),
        });
        Ok(topics)
    }

    async fn generate_lexical_image(
        &self,
        base_word: &str,
        related_word: &str,
    ) -> Result<LexicalImageResponse> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image.play("image").await?;
        Ok(LexicalImageResponse {
            image_url: format!("data:image/png;base64,{base_word}-{related_word}"),
            prompt: format!("{base_word} versus {related_word}"),
        })
    }
}

pub fn coaching_chunks(events: &[AnalysisEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            AnalysisEvent::PersonalizedChunk { content } => Some(content.clone()),
            _ => None,
        })
        .collect()
}

pub fn names(events: &[AnalysisEvent]) -> Vec<String> {
    events.iter().map(|e| e.name().into_owned()).collect()
}
