//! AI command endpoint with SSE streaming

use crate::{AppState, WebError};
use afribac_core::CommandRequest;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::post,
    Json, Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Terminal SSE payload after the last pipeline event
pub const DONE_MARKER: &str = "[DONE]";

pub fn command_routes() -> Router<AppState> {
    Router::new().route("/api/ai/command", post(command_handler))
}

/// Prepare the command, then stream its events.
///
/// Preparation failures (missing keys, edit without selection, ...) are
/// returned as JSON errors; once streaming starts, failures arrive as a
/// terminal `error` event instead.
async fn command_handler(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, WebError> {
    tracing::debug!(
        blocks = request.ctx.children.len(),
        messages = request.messages.len(),
        tool = ?request.ctx.tool_name,
        "Received AI command"
    );

    let prepared = state.pipeline.prepare(request)?;
    let events = prepared.spawn();

    let stream = ReceiverStream::new(events)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())))
        .chain(tokio_stream::once(Ok(Event::default().data(DONE_MARKER))));

    Ok(Sse::new(stream))
}
