//! Server-sent event transport for analysis streams
//!
//! Each [`AnalysisEvent`] becomes one `event: <name>` / `data: <json>` frame.
//! Intermediary caching and buffering are disabled so fragments reach the
//! client as soon as they are produced.

use axum::http::{header, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use crate::execution::AnalysisEvent;

/// Frame one event.
pub fn to_sse_event(event: &AnalysisEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.payload().to_string())
}

/// Wrap an event stream as a `text/event-stream` response.
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = AnalysisEvent> + Send + 'static,
{
    let frames = events.map(|event| {
        if event.is_terminal() {
            tracing::debug!(event = %event.name(), "Closing analysis stream");
        }
        Ok::<_, Infallible>(to_sse_event(&event))
    });

    let mut response = Sse::new(frames)
        .keep_alive(KeepAlive::default())
        .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
