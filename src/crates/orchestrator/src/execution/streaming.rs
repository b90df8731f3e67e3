//! Streaming analysis orchestrator
//!
//! Drives one analysis request end to end:
//!
//! 1. Streams the word-sense stage, forwarding every fragment.
//! 2. Fans out the requested stages as concurrent tasks, plus the personalized
//!    coaching producer when the related-words stage is requested.
//! 3. Merges stage completions and coaching fragments into one ordered feed,
//!    in true completion order.
//! 4. Terminates with `done`, or with a single `error` when the word-sense
//!    stage fails or the driver itself breaks.
//!
//! Events flow through a bounded channel. When the consumer goes away every
//! outstanding task is aborted.

use futures::{FutureExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::events::AnalysisEvent;
use crate::models::{AnalysisRequest, LexicalMapRequest, Layer};
use crate::stages::{StageGenerator, DEFAULT_MAX_MISTAKES};
use crate::{OrchestratorError, Result};

/// Default capacity of the outbound event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Capacity of the personalized coaching queue.
const PERSONALIZED_BUFFER: usize = 32;

/// Event stream handed to the transport.
pub type AnalysisStream = ReceiverStream<AnalysisEvent>;

/// Message from the personalized coaching producer.
#[derive(Debug)]
enum PersonalizedMessage {
    Chunk(String),
    End,
}

/// Outcome of one stage task: the stage and its payload or error message.
type StageOutcome = (Layer, std::result::Result<Value, String>);

/// Sending half of an analysis stream.
pub struct AnalysisStreamHandler {
    sender: mpsc::Sender<AnalysisEvent>,
}

impl AnalysisStreamHandler {
    /// Create a handler and the receiver the transport reads from.
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<AnalysisEvent>) {
        let (sender, rx) = mpsc::channel(buffer_size.max(1));
        (Self { sender }, rx)
    }

    /// Send one event; fails once the consumer is gone.
    pub async fn send_event(&self, event: AnalysisEvent) -> Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| OrchestratorError::ClientDisconnected)
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.sender.closed().await
    }

    /// Resolve `fut`, unless the consumer disconnects first.
    pub async fn until_closed<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.sender.closed() => Err(OrchestratorError::ClientDisconnected),
            output = fut => Ok(output),
        }
    }
}

/// Runs analysis requests against a [`StageGenerator`].
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    stages: Arc<dyn StageGenerator>,
    buffer_size: usize,
}

impl AnalysisOrchestrator {
    pub fn new(stages: Arc<dyn StageGenerator>) -> Self {
        Self {
            stages,
            buffer_size: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Start analysing `request` and return its event stream.
    ///
    /// Must be called within a tokio runtime. Dropping the stream cancels the
    /// request.
    pub fn analyze(&self, request: AnalysisRequest) -> AnalysisStream {
        let (handler, rx) = AnalysisStreamHandler::new(self.buffer_size);
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id, word = %request.word);

        tokio::spawn(drive(self.stages.clone(), Arc::new(request), handler).instrument(span));

        ReceiverStream::new(rx)
    }
}

/// Run the request and convert any escaping failure into one `error` event.
async fn drive(
    stages: Arc<dyn StageGenerator>,
    request: Arc<AnalysisRequest>,
    handler: AnalysisStreamHandler,
) {
    info!(context_len = request.context.len(), "Analysis started");

    let outcome = AssertUnwindSafe(run(stages, request, &handler))
        .catch_unwind()
        .await;

    let error = match outcome {
        Ok(Ok(())) => {
            info!("Analysis finished");
            return;
        }
        Ok(Err(OrchestratorError::ClientDisconnected)) => {
            debug!("Client disconnected, outstanding stages cancelled");
            return;
        }
        Ok(Err(e)) => e.to_string(),
        Err(panic) => panic_message(panic.as_ref()),
    };

    error!(error = %error, "Analysis failed");
    // Nothing left to do if the consumer is already gone
    let _ = handler.send_event(AnalysisEvent::Error { error }).await;
}

async fn run(
    stages: Arc<dyn StageGenerator>,
    request: Arc<AnalysisRequest>,
    handler: &AnalysisStreamHandler,
) -> Result<()> {
    let mut layer1 = handler
        .until_closed(stages.generate_layer1_stream(
            &request.word,
            &request.context,
            request.english_level.as_deref(),
        ))
        .await??;

    let mut full_text = String::new();
    while let Some(fragment) = handler.until_closed(layer1.next()).await? {
        let fragment = fragment?;
        full_text.push_str(&fragment);
        handler
            .send_event(AnalysisEvent::Layer1Chunk { content: fragment })
            .await?;
    }
    drop(layer1);

    if full_text.trim().is_empty() {
        return Err(llm::LlmError::EmptyResult("Layer 1 returned empty content".to_string()).into());
    }
    handler
        .send_event(AnalysisEvent::Layer1Complete { content: full_text })
        .await?;
    info!("Layer 1 completed");

    let layers = request.requested_layers();
    debug!(?layers, "Launching stages");

    let mut tasks: JoinSet<StageOutcome> = JoinSet::new();
    for layer in layers.iter().copied() {
        tasks.spawn(run_stage(stages.clone(), request.clone(), layer).in_current_span());
    }

    // Aborted on drop together with `tasks`
    let mut producers: JoinSet<()> = JoinSet::new();
    let (personalized_tx, mut personalized_rx) = mpsc::channel(PERSONALIZED_BUFFER);
    let mut personalized_done = true;
    if layers.contains(&Layer::Layer4) {
        personalized_done = false;
        producers.spawn(
            stream_personalized(stages.clone(), request.lexical_map_request(), personalized_tx)
                .in_current_span(),
        );
    } else {
        drop(personalized_tx);
    }

    while !tasks.is_empty() || !personalized_done {
        tokio::select! {
            biased;

            _ = handler.closed() => return Err(OrchestratorError::ClientDisconnected),

            message = personalized_rx.recv(), if !personalized_done => match message {
                Some(PersonalizedMessage::Chunk(content)) => {
                    handler
                        .send_event(AnalysisEvent::PersonalizedChunk { content })
                        .await?;
                }
                Some(PersonalizedMessage::End) | None => personalized_done = true,
            },

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                Ok((layer, Ok(data))) => {
                    info!(%layer, "Stage completed");
                    handler
                        .send_event(AnalysisEvent::LayerCompleted { layer, data })
                        .await?;
                }
                Ok((layer, Err(error))) => {
                    error!(%layer, error = %error, "Stage failed");
                    handler
                        .send_event(AnalysisEvent::LayerFailed { layer, error })
                        .await?;
                }
                Err(e) => warn!(error = %e, "Stage task ended without a result"),
            },
        }
    }

    producers.abort_all();
    handler.send_event(AnalysisEvent::Done).await
}

/// Run one stage to completion, capturing failures and panics as messages.
async fn run_stage(
    stages: Arc<dyn StageGenerator>,
    request: Arc<AnalysisRequest>,
    layer: Layer,
) -> StageOutcome {
    let work = async {
        match layer {
            Layer::Layer2 => to_payload(stages.generate_layer2(&request.word, &request.context).await),
            Layer::Layer3 => to_payload(
                stages
                    .generate_layer3(
                        &request.word,
                        &request.context,
                        request.english_level.as_deref(),
                        DEFAULT_MAX_MISTAKES,
                    )
                    .await,
            ),
            Layer::Layer4 => to_payload(stages.generate_layer4(&request.lexical_map_request()).await),
        }
    };

    let outcome = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(panic) => Err(panic_message(panic.as_ref())),
    };
    (layer, outcome)
}

fn to_payload<T: Serialize>(result: llm::Result<T>) -> Result<Value> {
    Ok(serde_json::to_value(result?)?)
}

/// Forward coaching fragments to the merge loop, always finishing with `End`.
async fn stream_personalized(
    stages: Arc<dyn StageGenerator>,
    input: LexicalMapRequest,
    tx: mpsc::Sender<PersonalizedMessage>,
) {
    match stages.generate_layer4_personalized_stream(&input).await {
        Ok(mut stream) => {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => {
                        if tx.send(PersonalizedMessage::Chunk(chunk)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Personalized coaching stream failed");
                        break;
                    }
                }
            }
        }
        Err(e) => error!(error = %e, "Personalized coaching stream failed to start"),
    }

    let _ = tx.send(PersonalizedMessage::End).await;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unexpected internal error".to_string()
    }
}
