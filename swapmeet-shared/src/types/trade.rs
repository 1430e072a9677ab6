use std::fmt;
use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

/// Persisted trade state. Ordering follows the lifecycle, so `a < b` means
/// `b` comes later and a write may only move `state` upward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum TradeState {
    Waiting,
    Accepted,
    Shipping,
    Completed,
}

impl TradeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Accepted => "accepted",
            Self::Shipping => "shipping",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "accepted" => Ok(Self::Accepted),
            "shipping" => Ok(Self::Shipping),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown trade state: {s}")),
        }
    }
}

impl ToSql<Text, Pg> for TradeState {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for TradeState {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(bytes.as_bytes())?;
        Ok(raw.parse()?)
    }
}

/// Which half of an arity-2 record a participant owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    User1,
    User2,
}

impl Side {
    /// Resolve the caller's side of a pairing, or `None` for outsiders.
    pub fn of(user1_id: Uuid, user2_id: Uuid, user_id: Uuid) -> Option<Self> {
        if user_id == user1_id {
            Some(Self::User1)
        } else if user_id == user2_id {
            Some(Self::User2)
        } else {
            None
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::User1 => Self::User2,
            Self::User2 => Self::User1,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User1 => "user1",
            Self::User2 => "user2",
        }
    }
}

/// An action the caller may take right now on a match/trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    ChooseItem,
    ConfirmTrade,
    Accept,
    SubmitShipping,
    ConfirmReceipt,
}

/// Longest chat message, in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// A validated shipping submission, minus the proof image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetails {
    pub courier: String,
    pub tracking_code: String,
    pub message: Option<String>,
}

impl ShippingDetails {
    /// Check that courier, tracking code and proof image are all present.
    ///
    /// Runs before any upload on both client and server. The error lists the
    /// missing fields under `details.missing`.
    pub fn validate(
        courier: Option<&str>,
        tracking_code: Option<&str>,
        message: Option<&str>,
        has_image: bool,
    ) -> AppResult<Self> {
        let courier = courier.map(str::trim).filter(|s| !s.is_empty());
        let tracking_code = tracking_code.map(str::trim).filter(|s| !s.is_empty());

        let mut missing = Vec::new();
        if courier.is_none() {
            missing.push("courier");
        }
        if tracking_code.is_none() {
            missing.push("tracking");
        }
        if !has_image {
            missing.push("image");
        }

        match (courier, tracking_code) {
            (Some(courier), Some(tracking_code)) if missing.is_empty() => Ok(Self {
                courier: courier.to_string(),
                tracking_code: tracking_code.to_string(),
                message: message
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            }),
            _ => Err(AppError::with_details(
                ErrorCode::ShippingIncomplete,
                "courier, tracking code and proof image are required",
                serde_json::json!({ "missing": missing }),
            )),
        }
    }

    /// Value stored in `user{n}_tracking`.
    pub fn tracking_label(&self) -> String {
        format!("{} - {}", self.courier, self.tracking_code)
    }
}
