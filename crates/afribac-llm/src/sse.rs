//! Server-sent event decoding for streamed provider responses

use afribac_core::traits::{LlmError, LlmResult};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;

/// One `data:` payload from an event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseData {
    /// Payload text (JSON for both providers)
    Data(String),
    /// OpenAI's `[DONE]` terminator
    Done,
}

/// Splits a byte stream into SSE `data:` payloads.
///
/// Bytes are buffered until a newline, so multi-byte UTF-8 sequences split
/// across network chunks decode intact. Comments (`:`), `event:`/`id:` fields
/// and blank lines are skipped.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseData> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(data) = parse_line(&line) {
                out.push(data);
            }
        }
        out
    }

    /// Process an unterminated final line, if any
    pub fn finish(&mut self) -> Option<SseData> {
        let line = std::mem::take(&mut self.buffer);
        parse_line(&line)
    }
}

fn parse_line(line: &[u8]) -> Option<SseData> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let payload = line.strip_prefix("data:")?.trim_start();

    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(SseData::Done);
    }
    Some(SseData::Data(payload.to_string()))
}

/// Map a non-success response to [`LlmError::Api`]
pub(crate) async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    LlmError::Api { status, body }
}

pub(crate) fn http_error(e: reqwest::Error) -> LlmError {
    LlmError::Http(e.to_string())
}

/// Send `request` and stream its SSE payloads until `[DONE]` or EOF
pub(crate) fn sse_payloads(request: reqwest::RequestBuilder) -> BoxStream<'static, LlmResult<String>> {
    Box::pin(stream! {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                yield Err(http_error(e));
                return;
            }
        };

        if !response.status().is_success() {
            yield Err(api_error(response).await);
            return;
        }

        let mut bytes = response.bytes_stream();
        let mut decoder = SseLineDecoder::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for data in decoder.push(&chunk) {
                        match data {
                            SseData::Data(payload) => yield Ok(payload),
                            SseData::Done => return,
                        }
                    }
                }
                Err(e) => {
                    yield Err(http_error(e));
                    return;
                }
            }
        }

        if let Some(SseData::Data(payload)) = decoder.finish() {
            yield Ok(payload);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extracts_data_lines() {
        let mut decoder = SseLineDecoder::new();
        let out = decoder.push(b": keep-alive\nevent: message\ndata: {\"a\":1}\n\ndata: [DONE]\n");
        assert_eq!(
            out,
            vec![SseData::Data("{\"a\":1}".into()), SseData::Done]
        );
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {\"text\":\"Bon").is_empty());
        assert_eq!(
            decoder.push(b"jour\"}\r\n"),
            vec![SseData::Data("{\"text\":\"Bonjour\"}".into())]
        );
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {}").is_empty());
        assert_eq!(decoder.finish(), Some(SseData::Data("{}".into())));
        assert_eq!(decoder.finish(), None);
    }

    proptest! {
        #[test]
        fn prop_split_points_do_not_change_payloads(
            texts in proptest::collection::vec("[a-zéèàç€🙂 ]{1,12}", 1..6),
            split in 0usize..200,
        ) {
            let body: String = texts.iter().map(|t| format!("data: {t}\n\n")).collect();
            let bytes = body.as_bytes();
            let split = split.min(bytes.len());

            let mut decoder = SseLineDecoder::new();
            let mut out = decoder.push(&bytes[..split]);
            out.extend(decoder.push(&bytes[split..]));

            let expected: Vec<SseData> = texts
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| SseData::Data(t.to_string()))
                .collect();
            prop_assert_eq!(out, expected);
        }
    }
}
