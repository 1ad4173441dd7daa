//! Driving a chunked response body through the parser.

use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::error::ClientError;

use super::events::{ChatEvent, StreamEnd};
use super::handler::ChatHandler;
use super::parser::ChatStreamParser;

/// Turn a stream of body chunks into a stream of chat events.
///
/// The returned stream ends after the first terminal event, even if the
/// transport is still open, or when the transport closes. A transport error
/// is yielded once and ends the stream.
pub fn parse_event_stream<S, B, E>(chunks: S) -> impl Stream<Item = Result<ChatEvent, ClientError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    stream! {
        let mut parser = ChatStreamParser::new();
        let mut chunks = std::pin::pin!(chunks);

        while let Some(chunk_result) = chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    for event in parser.feed(chunk.as_ref()) {
                        yield Ok(event);
                    }
                    if parser.is_finished() {
                        return;
                    }
                }
                Err(e) => {
                    yield Err(ClientError::Stream(e.to_string()));
                    return;
                }
            }
        }

        for event in parser.finish() {
            yield Ok(event);
        }
    }
}

/// Consume a chunked chat body, invoking `handler` once per event.
///
/// Stops reading as soon as a `done` or `error` event arrives.
///
/// # Errors
///
/// Returns `ClientError::Stream` if the transport fails mid-body. Events
/// parsed before the failure have already been dispatched.
pub async fn consume_stream<S, B, E, H>(chunks: S, handler: &mut H) -> Result<StreamEnd, ClientError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    H: ChatHandler + ?Sized,
{
    dispatch_events(parse_event_stream(chunks), handler).await
}

/// Dispatch already-parsed events until a terminal one or the end of input.
pub(crate) async fn dispatch_events<S, H>(events: S, handler: &mut H) -> Result<StreamEnd, ClientError>
where
    S: Stream<Item = Result<ChatEvent, ClientError>>,
    H: ChatHandler + ?Sized,
{
    let mut events = std::pin::pin!(events);
    while let Some(event) = events.next().await {
        let event = event?;
        event.dispatch(handler);
        if let Some(end) = StreamEnd::from_event(&event) {
            return Ok(end);
        }
    }
    Ok(StreamEnd::Closed)
}
