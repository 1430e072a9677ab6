//! Reader for the service's `text/event-stream` change feed.

use std::collections::VecDeque;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tracing::warn;

use swapmeet_shared::types::ChangeNotice;

use crate::error::ClientError;

/// Event name the service uses when this subscriber fell behind.
const LAG_EVENT: &str = "_warning";

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Change(ChangeNotice),
    /// Some notices were dropped; reload rather than trust the cache.
    Lagged(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder. Chunks may split lines anywhere, including
/// inside a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=end).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
            if let Some(frame) = self.line(line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment, used for keep-alives.
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            id: self.id.clone(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Change notices for one match, read off an open feed response.
pub struct ChangeFeedSubscriber {
    stream: BoxStream<'static, Result<Vec<u8>, ClientError>>,
    parser: SseParser,
    pending: VecDeque<SseFrame>,
}

impl ChangeFeedSubscriber {
    pub fn new<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]>,
        E: Into<ClientError>,
    {
        let stream = stream
            .map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(Into::into))
            .boxed();
        Self {
            stream,
            parser: SseParser::default(),
            pending: VecDeque::new(),
        }
    }

    /// Next event, or `None` once the service closes the feed.
    pub async fn recv(&mut self) -> Option<Result<FeedEvent, ClientError>> {
        loop {
            while let Some(frame) = self.pending.pop_front() {
                if let Some(event) = frame_event(frame) {
                    return Some(Ok(event));
                }
            }

            match self.stream.next().await? {
                Ok(chunk) => self.pending.extend(self.parser.push(&chunk)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn frame_event(frame: SseFrame) -> Option<FeedEvent> {
    if frame.event.as_deref() == Some(LAG_EVENT) {
        return Some(FeedEvent::Lagged(frame.data));
    }
    match serde_json::from_str::<ChangeNotice>(&frame.data) {
        Ok(notice) => Some(FeedEvent::Change(notice)),
        Err(e) => {
            warn!(event = ?frame.event, "feed: skipping undecodable frame: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use swapmeet_shared::types::{ChangeOp, ChangeTable};
    use uuid::Uuid;

    use super::*;

    fn notice_frame(notice: &ChangeNotice) -> String {
        format!(
            "event: {}\nid: {}\ndata: {}\n\n",
            notice.event_name(),
            notice.id,
            serde_json::to_string(notice).unwrap()
        )
    }

    #[test]
    fn parser_joins_multiline_data_and_skips_comments() {
        let mut parser = SseParser::default();
        let frames = parser.push(b":heartbeat\n\nevent: note\ndata: one\ndata: two\n\n");
        assert_eq!(
            frames,
            vec![SseFrame { event: Some("note".into()), id: None, data: "one\ntwo".into() }]
        );
    }

    #[test]
    fn parser_handles_split_chunks_and_crlf() {
        let mut parser = SseParser::default();
        assert!(parser.push(b"event: a\r\nda").is_empty());
        assert!(parser.push(b"ta: x").is_empty());
        let frames = parser.push(b"yz\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("a"));
        assert_eq!(frames[0].data, "xyz");
    }

    #[test]
    fn parser_survives_utf8_split_across_chunks() {
        let mut parser = SseParser::default();
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        let split = bytes.len() - 3;
        assert!(parser.push(&bytes[..split]).is_empty());
        let frames = parser.push(&bytes[split..]);
        assert_eq!(frames[0].data, "caf\u{e9}");
    }

    #[tokio::test]
    async fn subscriber_yields_notices_and_lag_warnings() {
        let notice = ChangeNotice::new(ChangeTable::Trades, ChangeOp::Update, Uuid::new_v4(), Uuid::new_v4(), "inst-a");
        let body = format!(
            "{}event: _warning\ndata: {{\"message\":\"lagged, skipped 3 notices\"}}\n\ndata: garbage\n\n",
            notice_frame(&notice)
        );
        // Split mid-frame to exercise buffering.
        let (a, b) = body.split_at(17);
        let chunks: Vec<Result<Vec<u8>, ClientError>> = vec![Ok(a.as_bytes().to_vec()), Ok(b.as_bytes().to_vec())];
        let mut feed = ChangeFeedSubscriber::new(futures::stream::iter(chunks));

        assert_eq!(feed.recv().await.unwrap().unwrap(), FeedEvent::Change(notice));
        assert!(matches!(feed.recv().await, Some(Ok(FeedEvent::Lagged(msg))) if msg.contains("skipped 3")));
        assert!(feed.recv().await.is_none());
    }

    #[tokio::test]
    async fn subscriber_surfaces_stream_errors() {
        let chunks: Vec<Result<Vec<u8>, ClientError>> = vec![Err(ClientError::Decode("connection reset".into()))];
        let mut feed = ChangeFeedSubscriber::new(futures::stream::iter(chunks));
        assert!(matches!(feed.recv().await, Some(Err(ClientError::Decode(_)))));
    }
}
