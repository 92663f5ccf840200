//! Wire format of the Ollama chat API and the NDJSON frame decoder.
//!
//! A streamed answer arrives as newline-delimited JSON objects of the form
//! `{"message": {"role": "assistant", "content": "..."}, "done": false}`.
//! The decoder turns the raw body into an ordered stream of content
//! fragments:
//!
//! - blank lines, unparseable lines and frames without content are skipped
//! - a frame with `"done": true` ends the stream; any bytes after it are dropped
//! - a frame with an `"error"` field ends the stream with [`ChatError::Remote`]
//! - a transport error ends the stream with that error
//!
//! A body that ends without a `done` frame still ends the stream cleanly.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};
use crate::types::{GenerationParams, Message, MessageRole, ModelInfo};

/// Ordered, finite stream of content fragments.
pub type FragmentStream = BoxStream<'static, ChatResult<String>>;

/// One message as sent to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body for `POST /api/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequestBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatTurn],
    pub stream: bool,
    pub options: ChatOptions,
}

/// Generation options understood by Ollama
#[derive(Debug, Serialize, PartialEq)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

impl From<GenerationParams> for ChatOptions {
    fn from(params: GenerationParams) -> Self {
        let params = params.normalized();
        Self {
            temperature: params.temperature,
            num_predict: params.max_length,
        }
    }
}

/// Request body for `POST /api/generate`, used for model smoke tests
#[derive(Debug, Serialize)]
pub struct GenerateRequestBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateOptions {
    pub num_predict: u32,
}

/// One frame of a chat answer (streamed) or the whole answer (non-streamed)
#[derive(Debug, Deserialize)]
pub struct ChatFrame {
    #[serde(default)]
    pub message: Option<FrameMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrameMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatFrame {
    fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Structured error body returned by Ollama
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response of `GET /api/tags`
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
pub struct TagModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub details: Option<TagDetails>,
}

#[derive(Debug, Deserialize)]
pub struct TagDetails {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
}

impl From<TagModel> for ModelInfo {
    fn from(model: TagModel) -> Self {
        let (family, parameter_size) = match model.details {
            Some(d) => (d.family, d.parameter_size),
            None => (None, None),
        };
        Self {
            name: model.name,
            size: model.size,
            family,
            parameter_size,
        }
    }
}

/// Turn an error response body into a [`ChatError::Remote`].
pub fn remote_error(status: u16, body: &str) -> ChatError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ChatError::Remote(parsed.error),
        Err(_) => ChatError::Remote(format!("{} - {}", status, body.trim())),
    }
}

/// Parse the single JSON object of a non-streaming chat answer.
pub fn parse_complete(body: &str) -> ChatResult<String> {
    let frame: ChatFrame = serde_json::from_str(body)
        .map_err(|e| ChatError::Protocol(format!("malformed chat response: {}", e)))?;

    if let Some(error) = frame.error {
        return Err(ChatError::Remote(error));
    }

    let message = frame
        .message
        .ok_or_else(|| ChatError::Protocol("chat response has no message".to_string()))?;

    Ok(message.content.unwrap_or_default())
}

/// Decode a raw NDJSON body into content fragments.
pub fn decode_fragments<S, E>(body: S) -> FragmentStream
where
    S: futures::Stream<Item = Result<Bytes, E>> + Send + 'static,
    ChatError: From<E>,
{
    let decoder = FrameDecoder {
        body: body.map(|chunk| chunk.map_err(ChatError::from)).boxed(),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
        frames: 0,
    };

    futures::stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(item) = decoder.ready.pop_front() {
                return Some((item, decoder));
            }
            if decoder.finished {
                return None;
            }
            match decoder.body.next().await {
                Some(Ok(chunk)) => {
                    decoder.buffer.extend_from_slice(&chunk);
                    decoder.drain_lines();
                }
                Some(Err(err)) => {
                    tracing::error!(frames = decoder.frames, "Stream transport failed: {}", err);
                    decoder.finish();
                    decoder.ready.push_back(Err(err));
                }
                None => {
                    let tail = std::mem::take(&mut decoder.buffer);
                    decoder.handle_line(&tail);
                    tracing::debug!(frames = decoder.frames, "Stream body ended");
                    decoder.finish();
                }
            }
        }
    })
    .boxed()
}

struct FrameDecoder {
    body: BoxStream<'static, ChatResult<Bytes>>,
    buffer: Vec<u8>,
    ready: VecDeque<ChatResult<String>>,
    finished: bool,
    frames: usize,
}

impl FrameDecoder {
    fn finish(&mut self) {
        self.finished = true;
        self.buffer.clear();
    }

    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.handle_line(&line[..pos]) {
                self.finish();
                return;
            }
        }
    }

    /// Returns true once the stream must stop.
    fn handle_line(&mut self, line: &[u8]) -> bool {
        let Ok(text) = std::str::from_utf8(line) else {
            tracing::warn!("Skipping frame that is not valid UTF-8");
            return false;
        };
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let frame: ChatFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(line = %text, "Skipping unparseable frame: {}", e);
                return false;
            }
        };
        self.frames += 1;

        if let Some(error) = frame.error {
            self.ready.push_back(Err(ChatError::Remote(error)));
            return true;
        }

        match frame.content() {
            Some(content) => self.ready.push_back(Ok(content.to_string())),
            None if !frame.done => tracing::debug!("Frame carries no content, ignoring"),
            None => {}
        }

        if frame.done {
            tracing::debug!(frames = self.frames, "Received done frame");
        }
        frame.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: &[&str]) -> impl futures::Stream<Item = Result<Bytes, ChatError>> {
        let owned: Vec<Result<Bytes, ChatError>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        futures::stream::iter(owned)
    }

    async fn collect(stream: FragmentStream) -> Vec<ChatResult<String>> {
        stream.collect().await
    }

    fn frame(content: &str) -> String {
        format!(
            "{{\"message\":{{\"role\":\"assistant\",\"content\":{}}},\"done\":false}}\n",
            serde_json::to_string(content).unwrap()
        )
    }

    const DONE: &str = "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n";

    #[tokio::test]
    async fn test_frames_split_across_chunks() {
        let all = format!("{}{}{}", frame("Hel"), frame("lo "), frame("world"));
        let (a, b) = all.split_at(17);
        let (b, c) = b.split_at(40);
        let out = collect(decode_fragments(body(&[a, b, c, DONE]))).await;

        let fragments: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(fragments, vec!["Hel", "lo ", "world"]);
    }

    #[tokio::test]
    async fn test_done_discards_trailing_bytes() {
        let tail = frame("ignored");
        let out = collect(decode_fragments(body(&[&frame("a"), DONE, &tail, "garbage"]))).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "a");
    }

    #[tokio::test]
    async fn test_malformed_and_empty_frames_are_skipped() {
        let out = collect(decode_fragments(body(&[
            "\n",
            "{not json}\n",
            "{\"done\":false}\n",
            &frame("x"),
            DONE,
        ])))
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_error_frame_is_remote_error() {
        let out = collect(decode_fragments(body(&[
            &frame("partial"),
            "{\"error\":\"model 'nope' not found\"}\n",
        ])))
        .await;
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Err(ChatError::Remote(msg)) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let last = "{\"message\":{\"content\":\"end\"},\"done\":true}";
        let out = collect(decode_fragments(body(&[&frame("the "), last]))).await;
        let fragments: Vec<String> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(fragments, vec!["the ", "end"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let all = frame("IRC ✅");
        let bytes = all.as_bytes();
        // Split inside the three-byte check mark
        let cut = all.find('✅').unwrap() + 1;
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..cut])),
            Ok(Bytes::copy_from_slice(&bytes[cut..])),
        ];

        let out = tokio_test::block_on(collect(decode_fragments(futures::stream::iter(chunks))));
        assert_eq!(out.len(), 1);
        let fragment = tokio_test::assert_ok!(out.into_iter().next().unwrap());
        assert_eq!(fragment, "IRC ✅");
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from(frame("one"))),
            Err(ChatError::Connection("connection reset".to_string())),
            Ok(Bytes::from(frame("never"))),
        ];
        let out = collect(decode_fragments(futures::stream::iter(chunks))).await;
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Err(ChatError::Connection(_))));
    }

    #[test]
    fn test_parse_complete() {
        let body = "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":true}";
        assert_eq!(parse_complete(body).unwrap(), "Hi");
        assert!(matches!(parse_complete("<html>"), Err(ChatError::Protocol(_))));
        assert!(matches!(
            parse_complete("{\"error\":\"boom\"}"),
            Err(ChatError::Remote(msg)) if msg == "boom"
        ));
    }

    #[test]
    fn test_remote_error_body() {
        assert!(matches!(
            remote_error(404, "{\"error\":\"model not found\"}"),
            ChatError::Remote(msg) if msg == "model not found"
        ));
        assert!(matches!(
            remote_error(502, "Bad Gateway"),
            ChatError::Remote(msg) if msg == "502 - Bad Gateway"
        ));
    }

    #[test]
    fn test_options_from_params() {
        let options = ChatOptions::from(GenerationParams::new(0.4, 256));
        assert_eq!(options, ChatOptions { temperature: 0.4, num_predict: 256 });
    }
}
