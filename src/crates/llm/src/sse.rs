//! Decoder for OpenAI-style streamed chat completions.
//!
//! The upstream body is a sequence of `data: <json>` lines terminated by
//! `data: [DONE]`. Bytes arrive in arbitrary chunks, so lines are buffered
//! until complete.

use serde::Deserialize;
use tracing::warn;

/// One decoded line of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// A non-empty content fragment.
    Content(String),
    /// The `[DONE]` terminator.
    Done,
}

#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and collect every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = decode_line(&String::from_utf8_lossy(&line)) {
                let done = frame == StreamFrame::Done;
                frames.push(frame);
                if done {
                    self.buffer.clear();
                    break;
                }
            }
        }
        frames
    }

    /// Decode whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Option<StreamFrame> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

fn decode_line(line: &str) -> Option<StreamFrame> {
    let line = line.trim();
    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(StreamFrame::Done);
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
            .map(StreamFrame::Content),
        Err(e) => {
            warn!(error = %e, data = data, "Failed to parse streaming data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decodes_content_and_done() {
        let mut decoder = ChunkDecoder::new();
        let body = format!("{}{}data: [DONE]\n\n", chunk("Hel"), chunk("lo"));

        let frames = decoder.push(body.as_bytes());
        assert_eq!(
            frames,
            vec![
                StreamFrame::Content("Hel".into()),
                StreamFrame::Content("lo".into()),
                StreamFrame::Done,
            ]
        );
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut decoder = ChunkDecoder::new();
        let body = chunk("word");
        let (a, b) = body.split_at(10);

        assert!(decoder.push(a.as_bytes()).is_empty());
        assert_eq!(decoder.push(b.as_bytes()), vec![StreamFrame::Content("word".into())]);
    }

    #[test]
    fn test_skips_comments_empty_deltas_and_garbage() {
        let mut decoder = ChunkDecoder::new();
        let body = format!(
            ": OPENROUTER PROCESSING\n\ndata: {{broken\n\n{}{}",
            chunk(""),
            chunk("ok")
        );

        assert_eq!(decoder.push(body.as_bytes()), vec![StreamFrame::Content("ok".into())]);
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut decoder = ChunkDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(StreamFrame::Done));
    }
}
