//! Incremental extraction of JSON array elements from streamed text
//!
//! Structured output arrives as text deltas of a document such as
//! `{"elements":[{...},{...}]}`. [`JsonArrayScanner`] finds the first array
//! and hands back each element as soon as its closing brace arrives.

use afribac_core::traits::{LlmError, LlmResult};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingArray,
    InArray,
    Done,
}

#[derive(Debug)]
pub struct JsonArrayScanner {
    state: ScanState,
    depth: usize,
    in_string: bool,
    escaped: bool,
    current: String,
}

impl Default for JsonArrayScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonArrayScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::SeekingArray,
            depth: 0,
            in_string: false,
            escaped: false,
            current: String::new(),
        }
    }

    /// The closing `]` of the array has been seen
    pub fn is_done(&self) -> bool {
        self.state == ScanState::Done
    }

    /// Feed text; returns every element completed by it
    pub fn push(&mut self, text: &str) -> Vec<Result<Value, serde_json::Error>> {
        let mut out = Vec::new();

        for c in text.chars() {
            if self.state == ScanState::Done {
                break;
            }
            let collecting = self.state == ScanState::InArray;

            if self.in_string {
                if collecting {
                    self.current.push(c);
                }
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match self.state {
                ScanState::SeekingArray => match c {
                    '"' => self.in_string = true,
                    '[' => self.state = ScanState::InArray,
                    _ => {}
                },
                ScanState::InArray if self.depth == 0 => match c {
                    ',' => self.emit(&mut out),
                    ']' => {
                        self.emit(&mut out);
                        self.state = ScanState::Done;
                    }
                    c if c.is_whitespace() => {}
                    c => {
                        self.current.push(c);
                        match c {
                            '{' | '[' => self.depth = 1,
                            '"' => self.in_string = true,
                            _ => {}
                        }
                    }
                },
                ScanState::InArray => {
                    self.current.push(c);
                    match c {
                        '"' => self.in_string = true,
                        '{' | '[' => self.depth += 1,
                        '}' | ']' => {
                            self.depth -= 1;
                            if self.depth == 0 {
                                self.emit(&mut out);
                            }
                        }
                        _ => {}
                    }
                }
                ScanState::Done => {}
            }
        }

        out
    }

    fn emit(&mut self, out: &mut Vec<Result<Value, serde_json::Error>>) {
        let element = std::mem::take(&mut self.current);
        let element = element.trim();
        if !element.is_empty() {
            out.push(serde_json::from_str(element));
        }
    }
}

/// Turn streamed text of a JSON document into its array elements.
///
/// Ends with an error if the text stops before the array closes.
pub(crate) fn array_elements(
    mut content: BoxStream<'static, LlmResult<String>>,
) -> BoxStream<'static, LlmResult<Value>> {
    Box::pin(stream! {
        let mut scanner = JsonArrayScanner::new();
        while let Some(delta) = content.next().await {
            let delta = match delta {
                Ok(delta) => delta,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for item in scanner.push(&delta) {
                match item {
                    Ok(value) => yield Ok(value),
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(format!(
                            "Malformed array element: {e}"
                        )));
                        return;
                    }
                }
            }
        }
        if !scanner.is_done() {
            yield Err(LlmError::InvalidResponse(
                "Structured output ended before the array closed".to_string(),
            ));
        }
    })
}
