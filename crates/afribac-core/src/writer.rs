//! Typed writers over the command event channel
//!
//! A stream always opens with the tool announcement. [`EventSink::announce`]
//! is the only way to obtain a [`BodySink`], and the body sinks consume
//! themselves when they write their terminal events, so the event order is
//! enforced by the types:
//!
//! ```text
//! EventSink --announce--> BodySink --comments--> CommentSink --finish--> ()
//!                                   \--text-----> TextSink ----end-----> ()
//! ```

use crate::events::{CommentData, CommentResult, CommentStatus, StreamEvent};
use crate::router::ToolSelection;
use tokio::sync::mpsc;
use uuid::Uuid;

/// The receiving half was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event stream closed by the receiver")]
pub struct StreamClosed;

type SendResult = Result<(), StreamClosed>;

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> SendResult {
    tx.send(event).await.map_err(|_| StreamClosed)
}

/// Fresh stream; nothing has been written yet
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// Bounded channel; a slow reader applies backpressure to the producer
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Write the tool announcement
    pub async fn announce(self, selection: &ToolSelection) -> Result<BodySink, StreamClosed> {
        send(
            &self.tx,
            StreamEvent::ToolName {
                data: selection.clone(),
            },
        )
        .await?;
        Ok(BodySink { tx: self.tx })
    }

    /// Fail before any tool could be announced
    pub async fn fail(self, message: impl Into<String>) -> SendResult {
        send(
            &self.tx,
            StreamEvent::Error {
                error_text: message.into(),
            },
        )
        .await
    }
}

/// Announced stream waiting for its body
#[derive(Debug)]
pub struct BodySink {
    tx: mpsc::Sender<StreamEvent>,
}

impl BodySink {
    pub fn comments(self) -> CommentSink {
        CommentSink { tx: self.tx }
    }

    pub fn text(self) -> TextSink {
        TextSink {
            tx: self.tx,
            id: Uuid::new_v4().to_string(),
            started: false,
        }
    }

    pub async fn fail(self, message: impl Into<String>) -> SendResult {
        EventSink { tx: self.tx }.fail(message).await
    }

    /// End the stream with nothing after the announcement
    pub fn close(self) {}
}

/// Streams `data-comment` events and ends with the finished sentinel
#[derive(Debug)]
pub struct CommentSink {
    tx: mpsc::Sender<StreamEvent>,
}

impl CommentSink {
    /// A fresh id per event
    fn event(&self, comment: Option<CommentResult>, status: CommentStatus) -> StreamEvent {
        StreamEvent::Comment {
            id: Uuid::new_v4().to_string(),
            data: CommentData { comment, status },
        }
    }

    pub async fn push(&mut self, comment: CommentResult) -> SendResult {
        let event = self.event(Some(comment), CommentStatus::Streaming);
        send(&self.tx, event).await
    }

    /// Emit the `{comment: null, status: finished}` sentinel
    pub async fn finish(self) -> SendResult {
        let event = self.event(None, CommentStatus::Finished);
        send(&self.tx, event).await
    }

    /// Report an error, then close with the sentinel so the client can stop
    /// waiting for comments
    pub async fn fail(self, message: impl Into<String>) -> SendResult {
        send(
            &self.tx,
            StreamEvent::Error {
                error_text: message.into(),
            },
        )
        .await?;
        self.finish().await
    }
}

/// Streams one text part: `text-start`, deltas, `text-end`
#[derive(Debug)]
pub struct TextSink {
    tx: mpsc::Sender<StreamEvent>,
    id: String,
    started: bool,
}

impl TextSink {
    async fn ensure_started(&mut self) -> SendResult {
        if !self.started {
            self.started = true;
            send(&self.tx, StreamEvent::TextStart { id: self.id.clone() }).await?;
        }
        Ok(())
    }

    pub async fn delta(&mut self, delta: impl Into<String>) -> SendResult {
        let delta = delta.into();
        if delta.is_empty() {
            return Ok(());
        }
        self.ensure_started().await?;
        send(
            &self.tx,
            StreamEvent::TextDelta {
                id: self.id.clone(),
                delta,
            },
        )
        .await
    }

    pub async fn end(mut self) -> SendResult {
        self.ensure_started().await?;
        send(&self.tx, StreamEvent::TextEnd { id: self.id }).await
    }

    /// Close an open text part, then report the error
    pub async fn fail(self, message: impl Into<String>) -> SendResult {
        if self.started {
            send(&self.tx, StreamEvent::TextEnd { id: self.id.clone() }).await?;
        }
        send(
            &self.tx,
            StreamEvent::Error {
                error_text: message.into(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ToolName;

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn comment(block: &str) -> CommentResult {
        CommentResult {
            block_id: block.into(),
            content: "texte".into(),
            comment: "remarque".into(),
        }
    }

    #[tokio::test]
    async fn test_comment_stream_order() {
        let (sink, rx) = EventSink::channel(8);
        let body = sink
            .announce(&ToolSelection::Tool(ToolName::Comment))
            .await
            .unwrap();
        let mut comments = body.comments();
        comments.push(comment("a")).await.unwrap();
        comments.push(comment("b")).await.unwrap();
        comments.finish().await.unwrap();

        let events = drain(rx).await;
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], StreamEvent::ToolName { .. }));
        assert!(events[3].is_finished_sentinel());
        assert!(events[..3].iter().all(|e| !e.is_finished_sentinel()));
    }

    #[tokio::test]
    async fn test_comment_failure_still_ends_with_sentinel() {
        let (sink, rx) = EventSink::channel(8);
        let body = sink
            .announce(&ToolSelection::Tool(ToolName::Comment))
            .await
            .unwrap();
        body.comments().fail("provider down").await.unwrap();

        let events = drain(rx).await;
        assert!(matches!(events[1], StreamEvent::Error { .. }));
        assert!(events.last().unwrap().is_finished_sentinel());
    }

    #[tokio::test]
    async fn test_text_part_shares_one_id() {
        let (sink, rx) = EventSink::channel(8);
        let body = sink
            .announce(&ToolSelection::Tool(ToolName::Generate))
            .await
            .unwrap();
        let mut text = body.text();
        text.delta("Bon").await.unwrap();
        text.delta("").await.unwrap();
        text.delta("jour").await.unwrap();
        text.end().await.unwrap();

        let events = drain(rx).await;
        let ids: Vec<&str> = events[1..]
            .iter()
            .map(|e| match e {
                StreamEvent::TextStart { id }
                | StreamEvent::TextEnd { id }
                | StreamEvent::TextDelta { id, .. } => id.as_str(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_dropped_receiver_reports_closed() {
        let (sink, rx) = EventSink::channel(1);
        drop(rx);
        let result = sink.announce(&ToolSelection::Tool(ToolName::Edit)).await;
        assert_eq!(result.unwrap_err(), StreamClosed);
    }
}
