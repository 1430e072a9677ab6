//! `GET /matches/:id/feed`: change notices for one match as Server-Sent Events.
//!
//! Each frame carries `event: {table}.{op}`, `id: chg_…` and the notice as
//! JSON data. A `_warning` frame reports notices skipped because the client
//! lagged; it should reload the view when it sees one.

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use swapmeet_shared::errors::AppResult;
use swapmeet_shared::types::auth::AuthUser;
use swapmeet_shared::types::ChangeNotice;

use crate::feed::ChangeFeed;
use crate::AppState;

/// Passes notices for a single match.
#[derive(Debug, Clone, Copy)]
pub struct FeedFilter {
    pub match_id: Uuid,
}

impl FeedFilter {
    pub fn matches(&self, notice: &ChangeNotice) -> bool {
        notice.match_id == self.match_id
    }
}

pub async fn match_feed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    // Participants only; also 404s unknown matches before the stream opens.
    state.trades.view(user.id, match_id)?;

    info!(match_id = %match_id, user_id = %user.id, "feed client connected");

    let stream = notice_stream(&state.feed, FeedFilter { match_id });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

/// What a feed subscriber observes.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Notice(ChangeNotice),
    Lagged(u64),
}

impl FeedItem {
    fn into_sse(self) -> Option<SseEvent> {
        match self {
            FeedItem::Notice(notice) => {
                let json = match serde_json::to_string(&notice) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!("feed: failed to serialize notice: {e}");
                        return None;
                    }
                };
                Some(
                    SseEvent::default()
                        .event(notice.event_name())
                        .id(notice.id.clone())
                        .data(json),
                )
            }
            FeedItem::Lagged(n) => Some(
                SseEvent::default()
                    .event("_warning")
                    .data(format!("{{\"message\":\"lagged, skipped {n} notices\"}}")),
            ),
        }
    }
}

/// Subscribes immediately; the stream ends when the feed closes or the
/// client goes away.
pub fn filtered_notices(feed: &ChangeFeed, filter: FeedFilter) -> impl Stream<Item = FeedItem> {
    let mut rx = feed.subscribe();

    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(notice) => {
                    if filter.matches(&notice) {
                        yield FeedItem::Notice(notice);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!(match_id = %filter.match_id, "feed client lagged, skipped {n} notices");
                    yield FeedItem::Lagged(n);
                }
                Err(RecvError::Closed) => {
                    info!("feed closed, ending stream");
                    break;
                }
            }
        }
    }
}

fn notice_stream(
    feed: &ChangeFeed,
    filter: FeedFilter,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    filtered_notices(feed, filter).filter_map(|item| futures::future::ready(item.into_sse().map(Ok)))
}
