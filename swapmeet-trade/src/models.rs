use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use swapmeet_shared::types::{Side, TradeState};

use crate::schema::{matches, messages, posts, profiles, trades, user_swipes};

// --- Profile / Post (read-only) ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub detail: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Swipe ---

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = user_swipes)]
pub struct NewSwipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub swiped_user_id: Uuid,
    pub post_id: Uuid,
    pub is_like: bool,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    /// Partner post that user1 wants.
    pub post1_id: Option<Uuid>,
    /// Partner post that user2 wants.
    pub post2_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn side_of(&self, user_id: Uuid) -> Option<Side> {
        Side::of(self.user1_id, self.user2_id, user_id)
    }

    pub fn user(&self, side: Side) -> Uuid {
        match side {
            Side::User1 => self.user1_id,
            Side::User2 => self.user2_id,
        }
    }

    pub fn choice(&self, side: Side) -> Option<Uuid> {
        match side {
            Side::User1 => self.post1_id,
            Side::User2 => self.post2_id,
        }
    }
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
}

#[derive(Debug, Default, AsChangeset, Clone, PartialEq)]
#[diesel(table_name = matches)]
pub struct MatchChanges {
    pub post1_id: Option<Uuid>,
    pub post2_id: Option<Uuid>,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

// --- Trade ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = trades)]
pub struct Trade {
    pub id: Uuid,
    pub match_id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub user1_post_id: Uuid,
    pub user2_post_id: Uuid,
    pub state: TradeState,
    pub user1_accept: bool,
    pub user2_accept: bool,
    pub user1_tracking: Option<String>,
    pub user2_tracking: Option<String>,
    pub user1_item_img: Option<String>,
    pub user2_item_img: Option<String>,
    pub user1_message: Option<String>,
    pub user2_message: Option<String>,
    pub user1_received: bool,
    pub user2_received: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trade {
    pub fn side_of(&self, user_id: Uuid) -> Option<Side> {
        Side::of(self.user1_id, self.user2_id, user_id)
    }

    pub fn accepted_by(&self, side: Side) -> bool {
        match side {
            Side::User1 => self.user1_accept,
            Side::User2 => self.user2_accept,
        }
    }

    pub fn received_by(&self, side: Side) -> bool {
        match side {
            Side::User1 => self.user1_received,
            Side::User2 => self.user2_received,
        }
    }

    pub fn tracking_of(&self, side: Side) -> Option<&str> {
        match side {
            Side::User1 => self.user1_tracking.as_deref(),
            Side::User2 => self.user2_tracking.as_deref(),
        }
    }

    /// Post the given side receives from its partner.
    pub fn wanted_post(&self, side: Side) -> Uuid {
        match side {
            Side::User1 => self.user1_post_id,
            Side::User2 => self.user2_post_id,
        }
    }
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = trades)]
pub struct NewTrade {
    pub id: Uuid,
    pub match_id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub user1_post_id: Uuid,
    pub user2_post_id: Uuid,
    pub state: TradeState,
}

impl NewTrade {
    /// Copy ids off a fully-specified match. `None` while either choice is open.
    pub fn from_match(m: &Match) -> Option<Self> {
        Some(Self {
            id: Uuid::now_v7(),
            match_id: m.id,
            user1_id: m.user1_id,
            user2_id: m.user2_id,
            user1_post_id: m.post1_id?,
            user2_post_id: m.post2_id?,
            state: TradeState::Waiting,
        })
    }
}

/// Partial trade update. `None` fields are left untouched by diesel; the
/// message columns take `Some(None)` to write NULL.
#[derive(Debug, Default, AsChangeset, Clone, PartialEq)]
#[diesel(table_name = trades)]
pub struct TradeChanges {
    pub state: Option<TradeState>,
    pub user1_accept: Option<bool>,
    pub user2_accept: Option<bool>,
    pub user1_tracking: Option<String>,
    pub user2_tracking: Option<String>,
    pub user1_item_img: Option<String>,
    pub user2_item_img: Option<String>,
    pub user1_message: Option<Option<String>>,
    pub user2_message: Option<Option<String>>,
    pub user1_received: Option<bool>,
    pub user2_received: Option<bool>,
}

impl TradeChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to an in-memory row, mirroring what the UPDATE does.
    pub fn apply(&self, trade: &mut Trade) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }

        set(&mut trade.state, &self.state);
        set(&mut trade.user1_accept, &self.user1_accept);
        set(&mut trade.user2_accept, &self.user2_accept);
        set_opt(&mut trade.user1_tracking, &self.user1_tracking);
        set_opt(&mut trade.user2_tracking, &self.user2_tracking);
        set_opt(&mut trade.user1_item_img, &self.user1_item_img);
        set_opt(&mut trade.user2_item_img, &self.user2_item_img);
        set(&mut trade.user1_message, &self.user1_message);
        set(&mut trade.user2_message, &self.user2_message);
        set(&mut trade.user1_received, &self.user1_received);
        set(&mut trade.user2_received, &self.user2_received);
    }
}

impl MatchChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, m: &mut Match) {
        if self.post1_id.is_some() {
            m.post1_id = self.post1_id;
        }
        if self.post2_id.is_some() {
            m.post2_id = self.post2_id;
        }
    }
}
