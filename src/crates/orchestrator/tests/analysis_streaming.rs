mod common;

use common::{coaching_chunks, names, CoachingFailure, FakeStages, Script};
use futures::StreamExt;
use llm::LlmError;
use orchestrator::execution::AnalysisEvent;
use orchestrator::models::{AnalysisRequest, Layer};
use orchestrator::AnalysisOrchestrator;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn request() -> AnalysisRequest {
    AnalysisRequest::new("tactic", "The coach changed his tactic at half time.")
}

async fn run_to_end(stages: Arc<FakeStages>, request: AnalysisRequest) -> Vec<AnalysisEvent> {
    AnalysisOrchestrator::new(stages).analyze(request).collect().await
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_completion_order() {
    let stages = FakeStages {
        layer2: Script::after(30),
        layer3: Script::after(10),
        layer4: Script::after(20),
        personalized: vec![(5, "Like your "), (20, "strategy notes.")],
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages, request()).await;

    assert_eq!(
        names(&events),
        vec![
            "layer1_chunk",
            "layer1_chunk",
            "layer1_complete",
            "layer4_personalized_chunk",
            "layer3",
            "layer4",
            "layer4_personalized_chunk",
            "layer2",
            "done",
        ]
    );
    assert_eq!(
        events[2],
        AnalysisEvent::Layer1Complete {
            content: "A **tactic** is a planned action.".to_string()
        }
    );
}

#[tokio::test]
async fn test_default_request_runs_every_stage() {
    let stages = FakeStages::default().into_arc();
    let events = run_to_end(stages.clone(), request()).await;
    let names = names(&events);

    assert_eq!(names.first().map(String::as_str), Some("layer1_chunk"));
    assert_eq!(names.last().map(String::as_str), Some("done"));
    for stage in ["layer2", "layer3", "layer4"] {
        assert_eq!(names.iter().filter(|n| *n == stage).count(), 1, "{stage}");
    }
    assert_eq!(names.iter().filter(|n| *n == "layer1_complete").count(), 1);
    assert_eq!(names.iter().filter(|n| *n == "layer4_personalized_chunk").count(), 2);

    // Stage events never precede the full word-sense text
    let complete_at = names.iter().position(|n| n == "layer1_complete").unwrap();
    let first_stage = names
        .iter()
        .position(|n| n.starts_with("layer2") || n.starts_with("layer3") || n == "layer4")
        .unwrap();
    assert!(complete_at < first_stage);
}

#[tokio::test]
async fn test_requested_subset_skips_other_stages() {
    let stages = FakeStages::default().into_arc();
    let events = run_to_end(stages.clone(), request().with_layers(vec![2, 4])).await;
    let names = names(&events);

    assert!(names.contains(&"layer2".to_string()));
    assert!(names.contains(&"layer4".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("layer3")));
    assert!(!stages.calls().iter().any(|c| c.starts_with("layer3")));
    assert_eq!(names.last().map(String::as_str), Some("done"));
}

#[tokio::test]
async fn test_personalized_stream_only_with_related_words() {
    let stages = FakeStages::default().into_arc();
    let events = run_to_end(stages.clone(), request().with_layers(vec![3])).await;

    assert_eq!(
        names(&events),
        vec!["layer1_chunk", "layer1_chunk", "layer1_complete", "layer3", "done"]
    );
    assert!(!stages.calls().contains(&"personalized".to_string()));
}

#[tokio::test]
async fn test_stage_failure_is_isolated() {
    let stages = FakeStages {
        layer2: Script::default()
            .failing(LlmError::malformed("Layer 2 response must be a list of 3 contexts")),
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages, request()).await;
    let names = names(&events);

    let failed = events
        .iter()
        .find(|e| e.name() == "layer2_error")
        .expect("layer2_error event");
    assert_eq!(
        failed.payload(),
        json!({"error": "Layer 2 response must be a list of 3 contexts"})
    );
    assert!(names.contains(&"layer3".to_string()));
    assert!(names.contains(&"layer4".to_string()));
    assert!(!names.contains(&"layer2".to_string()));
    assert_eq!(names.last().map(String::as_str), Some("done"));
}

#[tokio::test]
async fn test_stage_panic_becomes_stage_error() {
    let stages = FakeStages {
        layer3: Script::default().panicking(),
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages, request()).await;

    assert!(events.contains(&AnalysisEvent::LayerFailed {
        layer: Layer::Layer3,
        error: "layer3 exploded".to_string(),
    }));
    assert_eq!(events.last(), Some(&AnalysisEvent::Done));
}

#[tokio::test]
async fn test_coaching_stream_that_fails_to_open_still_reaches_done() {
    let stages = FakeStages {
        personalized_failure: Some(CoachingFailure::OnOpen(LlmError::Connection(
            "refused".to_string(),
        ))),
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages.clone(), request()).await;
    let names = names(&events);

    assert!(stages.calls().contains(&"personalized".to_string()));
    assert!(coaching_chunks(&events).is_empty());
    assert!(names.contains(&"layer4".to_string()));
    assert!(!names.iter().any(|n| n == "error" || n.ends_with("_error")));
    assert_eq!(names.last().map(String::as_str), Some("done"));
}

#[tokio::test(start_paused = true)]
async fn test_coaching_stream_error_ends_coaching_only() {
    let stages = FakeStages {
        layer4: Script::after(50),
        personalized: vec![(0, "Like your ")],
        personalized_failure: Some(CoachingFailure::MidStream(LlmError::Connection(
            "stream reset".to_string(),
        ))),
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages, request()).await;
    let names = names(&events);

    assert_eq!(coaching_chunks(&events), vec!["Like your ".to_string()]);
    let coaching_at = names
        .iter()
        .position(|n| n == "layer4_personalized_chunk")
        .unwrap();
    let layer4_at = names.iter().position(|n| n == "layer4").unwrap();
    assert!(coaching_at < layer4_at);
    assert_eq!(
        names.iter().filter(|n| *n == "layer4_personalized_chunk").count(),
        1
    );
    assert_eq!(names.last().map(String::as_str), Some("done"));
}

#[tokio::test]
async fn test_word_sense_failure_ends_with_single_error() {
    let stages = FakeStages {
        layer1_failure: Some(LlmError::rate_limited("slow down", None)),
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages.clone(), request()).await;

    assert_eq!(
        events,
        vec![AnalysisEvent::Error {
            error: "Rate limit exceeded: slow down".to_string()
        }]
    );
    assert_eq!(stages.calls(), vec!["layer1:tactic".to_string()]);
}

#[tokio::test]
async fn test_blank_word_sense_is_an_error() {
    let stages = FakeStages {
        layer1: vec!["  ", "\n"],
        ..Default::default()
    }
    .into_arc();

    let events = run_to_end(stages, request()).await;

    assert_eq!(
        names(&events),
        vec!["layer1_chunk", "layer1_chunk", "error"]
    );
    assert_eq!(
        events.last().map(AnalysisEvent::payload),
        Some(json!({"error": "Layer 1 returned empty content"}))
    );
}

#[tokio::test]
async fn test_tactic_scenario_payloads() {
    let stages = FakeStages::default().into_arc();
    let events = run_to_end(stages.clone(), request()).await;

    let layer2 = events.iter().find(|e| e.name() == "layer2").unwrap().payload();
    assert_eq!(layer2["contexts"].as_array().unwrap().len(), 3);
    assert_eq!(layer2["contexts"][1]["source"], "news");

    let layer3 = events.iter().find(|e| e.name() == "layer3").unwrap().payload();
    assert_eq!(layer3["mistakes"].as_array().unwrap().len(), 2);
    assert!(stages.calls().contains(&"layer3:2".to_string()));

    let layer4 = events.iter().find(|e| e.name() == "layer4").unwrap().payload();
    assert_eq!(layer4["related_words"][0]["word"], "strategy");

    assert_eq!(coaching_chunks(&events).concat(), "Like your strategy notes.");
}

#[tokio::test]
async fn test_small_buffer_still_delivers_everything() {
    let stages = FakeStages::default().into_arc();
    let events: Vec<AnalysisEvent> = AnalysisOrchestrator::new(stages)
        .with_buffer_size(1)
        .analyze(request())
        .collect()
        .await;

    assert_eq!(events.len(), 9);
    assert_eq!(events.last(), Some(&AnalysisEvent::Done));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_outstanding_stages() {
    let stages = FakeStages {
        layer2: Script::after(3_600_000),
        ..Default::default()
    }
    .into_arc();

    let mut events = AnalysisOrchestrator::new(stages.clone()).analyze(request().with_layers(vec![2]));
    while let Some(event) = events.next().await {
        if event.name() == "layer1_complete" {
            break;
        }
    }
    // Let the stage task start before hanging up
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(stages.calls().contains(&"layer2".to_string()));
    assert!(!stages.dropped.load(Ordering::SeqCst));

    drop(events);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(stages.dropped.load(Ordering::SeqCst));
}
