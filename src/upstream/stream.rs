//! Incremental decoding of streamed generations
//!
//! With `stream: true` the model server sends newline-delimited JSON:
//!
//! ```text
//! {"response":"{\"sco","done":false}
//! {"response":"res\": [","done":false}
//! ...
//! {"response":"","done":true}
//! ```
//!
//! [`StreamAccumulator`] folds these chunks into the model's text. After
//! each fragment it checks whether the text so far already holds a complete
//! JSON object, so the reader can stop early instead of waiting for a model
//! that keeps talking after the closing brace.

use serde::Deserialize;
use serde_json::Value;

use crate::analysis::parse::{ModelReply, first_complete_object};
use crate::error::UpstreamError;

/// One line of a streamed generation
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// What the reader should do after feeding bytes
#[derive(Debug, PartialEq)]
pub enum StreamProgress {
    /// Keep reading
    Pending,
    /// The accumulated text already contains a complete JSON object
    Parsed(Value),
    /// The server sent its terminal `done: true` chunk
    Done,
}

/// Fold over streamed NDJSON chunks
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    pending: Vec<u8>,
    text: String,
    chunks: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the response body
    ///
    /// Bytes may split lines (and UTF-8 sequences) anywhere; incomplete
    /// lines are buffered until their newline arrives.
    pub fn push(&mut self, bytes: &[u8]) -> Result<StreamProgress, UpstreamError> {
        self.pending.extend_from_slice(bytes);

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let progress = self.consume_line(&line)?;
            if progress != StreamProgress::Pending {
                return Ok(progress);
            }
        }

        Ok(StreamProgress::Pending)
    }

    /// End of body: consume any unterminated last line and return the text
    pub fn finish(mut self) -> Result<ModelReply, UpstreamError> {
        let rest = std::mem::take(&mut self.pending);
        if let StreamProgress::Parsed(value) = self.consume_line(&rest)? {
            return Ok(ModelReply::Document(value));
        }
        Ok(ModelReply::Text(self.text))
    }

    /// Text received so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of chunks received so far
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Consume the accumulator after an early exit or `done`
    pub fn into_reply(self) -> ModelReply {
        ModelReply::Text(self.text)
    }

    fn consume_line(&mut self, line: &[u8]) -> Result<StreamProgress, UpstreamError> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(StreamProgress::Pending);
        }

        let chunk: StreamChunk =
            serde_json::from_slice(line).map_err(|e| UpstreamError::Stream {
                reason: format!("malformed stream chunk after {} chunks: {e}", self.chunks),
            })?;

        if let Some(reason) = chunk.error {
            return Err(UpstreamError::Stream { reason });
        }

        self.chunks += 1;
        self.text.push_str(&chunk.response);

        if chunk.done {
            return Ok(StreamProgress::Done);
        }
        if chunk.response.contains('}') {
            if let Some(value) = first_complete_object(&self.text) {
                return Ok(StreamProgress::Parsed(value));
            }
        }

        Ok(StreamProgress::Pending)
    }
}
