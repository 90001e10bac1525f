//! Line framing for streamed HTTP bodies. Providers stream either server-sent
//! events (`data: {...}` lines) or newline-delimited JSON.

/// Sentinel OpenAI sends as the final SSE payload.
pub const SSE_DONE: &str = "[DONE]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    ServerSentEvents,
    NdJson,
}

impl Framing {
    /// Extracts the JSON payload carried by one complete line, if any.
    pub fn payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        match self {
            Self::ServerSentEvents => {
                let data = line.strip_prefix("data:")?.trim();
                (!data.is_empty()).then_some(data)
            }
            Self::NdJson => {
                let trimmed = line.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
        }
    }
}

/// Accumulates body chunks and yields complete lines. Chunk boundaries may fall
/// anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=position).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Returns the trailing unterminated line, if the stream ended without one.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{Framing, LineBuffer, SSE_DONE};

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let mut buffer = LineBuffer::new();

        assert!(buffer.push(b"data: {\"a\":").is_empty());
        let lines = buffer.push(b"1}\r\n\ndata: [DONE]\n");

        assert_eq!(lines, vec!["data: {\"a\":1}".to_owned(), String::new(), "data: [DONE]".to_owned()]);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let text = "{\"t\":\"no cap 💀\"}\n".as_bytes();
        let split = text.len() - 4;
        let mut buffer = LineBuffer::new();

        assert!(buffer.push(&text[..split]).is_empty());
        let lines = buffer.push(&text[split..]);

        assert_eq!(lines, vec!["{\"t\":\"no cap 💀\"}".to_owned()]);
    }

    #[test]
    fn trailing_line_is_flushed_on_finish() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"{\"done\":true}");

        assert_eq!(buffer.finish().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn sse_framing_ignores_comments_and_event_names() {
        let framing = Framing::ServerSentEvents;

        assert_eq!(framing.payload("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(framing.payload("data:[DONE]"), Some(SSE_DONE));
        assert_eq!(framing.payload("event: content_block_delta"), None);
        assert_eq!(framing.payload(": keep-alive"), None);
        assert_eq!(framing.payload(""), None);
    }

    #[test]
    fn ndjson_framing_skips_blank_lines() {
        assert_eq!(Framing::NdJson.payload("  "), None);
        assert_eq!(Framing::NdJson.payload("{\"done\":false} "), Some("{\"done\":false}"));
    }
}
