//! In-process fan-out of committed row changes.
//!
//! The coordinator emits a `ChangeNotice` after every write. Subscribers are
//! the SSE streams and the RabbitMQ relay; notices relayed in from other
//! instances are emitted here too, so SSE clients see every writer.

use tokio::sync::broadcast;
use tracing::debug;

use swapmeet_shared::types::ChangeNotice;

const DEFAULT_CAPACITY: usize = 1024;

/// Cheap to clone. Receivers that fall more than `capacity` notices behind
/// observe `RecvError::Lagged` and skip ahead.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeNotice>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(cap: usize) -> Self {
        let (tx, _) = broadcast::channel(cap);
        Self { tx }
    }

    /// Returns the number of receivers that will see the notice.
    pub fn emit(&self, notice: ChangeNotice) -> usize {
        debug!(
            event = %notice.event_name(),
            match_id = %notice.match_id,
            notice_id = %notice.id,
            "change emitted"
        );
        // No receivers is normal before any SSE client connects.
        self.tx.send(notice).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
