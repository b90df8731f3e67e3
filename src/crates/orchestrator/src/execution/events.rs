//! Analysis stream events

use serde_json::{json, Value};
use std::borrow::Cow;

use crate::models::Layer;

/// One named, payload-bearing unit of an analysis stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    /// Incremental word-sense fragment
    Layer1Chunk { content: String },
    /// Full word-sense text, emitted once
    Layer1Complete { content: String },
    /// Incremental personalized coaching fragment
    PersonalizedChunk { content: String },
    /// A stage finished with a result
    LayerCompleted { layer: Layer, data: Value },
    /// A stage failed; the others are unaffected
    LayerFailed { layer: Layer, error: String },
    /// Terminal success marker
    Done,
    /// Terminal request-level failure, sent instead of `Done`
    Error { error: String },
}

impl AnalysisEvent {
    /// Wire event name.
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            AnalysisEvent::Layer1Chunk { .. } => Cow::Borrowed("layer1_chunk"),
            AnalysisEvent::Layer1Complete { .. } => Cow::Borrowed("layer1_complete"),
            AnalysisEvent::PersonalizedChunk { .. } => Cow::Borrowed("layer4_personalized_chunk"),
            AnalysisEvent::LayerCompleted { layer, .. } => Cow::Borrowed(layer.id()),
            AnalysisEvent::LayerFailed { layer, .. } => Cow::Owned(format!("{}_error", layer.id())),
            AnalysisEvent::Done => Cow::Borrowed("done"),
            AnalysisEvent::Error { .. } => Cow::Borrowed("error"),
        }
    }

    /// JSON payload carried by the event.
    pub fn payload(&self) -> Value {
        match self {
            AnalysisEvent::Layer1Chunk { content }
            | AnalysisEvent::Layer1Complete { content }
            | AnalysisEvent::PersonalizedChunk { content } => json!({ "content": content }),
            AnalysisEvent::LayerCompleted { data, .. } => data.clone(),
            AnalysisEvent::LayerFailed { error, .. } | AnalysisEvent::Error { error } => {
                json!({ "error": error })
            }
            AnalysisEvent::Done => json!({}),
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisEvent::Done | AnalysisEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(AnalysisEvent::Layer1Chunk { content: "a".into() }.name(), "layer1_chunk");
        assert_eq!(
            AnalysisEvent::PersonalizedChunk { content: "a".into() }.name(),
            "layer4_personalized_chunk"
        );
        assert_eq!(
            AnalysisEvent::LayerCompleted { layer: Layer::Layer3, data: json!({}) }.name(),
            "layer3"
        );
        assert_eq!(
            AnalysisEvent::LayerFailed { layer: Layer::Layer2, error: "x".into() }.name(),
            "layer2_error"
        );
        assert_eq!(AnalysisEvent::Done.name(), "done");
    }

    #[test]
    fn test_event_payloads() {
        assert_eq!(
            AnalysisEvent::Layer1Complete { content: "full".into() }.payload(),
            json!({"content": "full"})
        );
        assert_eq!(
            AnalysisEvent::LayerFailed { layer: Layer::Layer4, error: "boom".into() }.payload(),
            json!({"error": "boom"})
        );
        assert_eq!(AnalysisEvent::Done.payload(), json!({}));
        assert!(AnalysisEvent::Done.is_terminal());
        assert!(AnalysisEvent::Error { error: "x".into() }.is_terminal());
        assert!(!AnalysisEvent::Layer1Chunk { content: String::new() }.is_terminal());
    }
}
