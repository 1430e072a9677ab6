use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `swapmeet.{domain}.{entity}.{action}`
/// Example: `swapmeet.trade.change.trades`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    use super::ChangeTable;

    /// Binding pattern covering every row change emitted by the trade service.
    pub const TRADE_CHANGE_ALL: &str = "swapmeet.trade.change.*";

    pub const TRADE_CHANGE_MATCHES: &str = "swapmeet.trade.change.matches";
    pub const TRADE_CHANGE_TRADES: &str = "swapmeet.trade.change.trades";
    pub const TRADE_CHANGE_MESSAGES: &str = "swapmeet.trade.change.messages";

    pub fn trade_change(table: ChangeTable) -> &'static str {
        match table {
            ChangeTable::Matches => TRADE_CHANGE_MATCHES,
            ChangeTable::Trades => TRADE_CHANGE_TRADES,
            ChangeTable::Messages => TRADE_CHANGE_MESSAGES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTable {
    Matches,
    Trades,
    Messages,
}

impl ChangeTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matches => "matches",
            Self::Trades => "trades",
            Self::Messages => "messages",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
        }
    }
}

/// Row-level change notification scoped to a match.
///
/// Carries no row data: receivers treat it as an invalidation and reload the
/// whole trade aggregate for `match_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeNotice {
    /// `chg_<uuid>`
    pub id: String,
    pub table: ChangeTable,
    pub op: ChangeOp,
    pub match_id: Uuid,
    pub row_id: Uuid,
    /// Instance id of the service process that committed the change.
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

impl ChangeNotice {
    pub fn new(table: ChangeTable, op: ChangeOp, match_id: Uuid, row_id: Uuid, origin: impl Into<String>) -> Self {
        Self {
            id: format!("chg_{}", Uuid::new_v4()),
            table,
            op,
            match_id,
            row_id,
            origin: origin.into(),
            created_at: Utc::now(),
        }
    }

    /// SSE `event:` name, e.g. `trades.update`.
    pub fn event_name(&self) -> String {
        format!("{}.{}", self.table.as_str(), self.op.as_str())
    }
}
