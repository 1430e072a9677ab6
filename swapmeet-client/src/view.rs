//! Wire shapes returned by the trade service, as seen from a client.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use swapmeet_shared::types::{Side, TradeAction, TradeState};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub detail: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub post1_id: Option<Uuid>,
    pub post2_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
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
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PostRef {
    pub id: Uuid,
    pub title: String,
}

/// One participant's snapshot of a match and its trade.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TradeView {
    pub r#match: Match,
    pub side: Side,
    pub partner: Option<Profile>,
    pub liked_posts: Vec<Post>,
    pub my_choice: Option<PostRef>,
    pub partner_choice: Option<PostRef>,
    pub messages: Vec<Message>,
    pub trade: Option<Trade>,
    pub actions: Vec<TradeAction>,
}

impl TradeView {
    pub fn match_id(&self) -> Uuid {
        self.r#match.id
    }

    pub fn both_chosen(&self) -> bool {
        self.my_choice.is_some() && self.partner_choice.is_some()
    }

    pub fn state(&self) -> Option<TradeState> {
        self.trade.as_ref().map(|t| t.state)
    }

    pub fn can(&self, action: TradeAction) -> bool {
        self.actions.contains(&action)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchSummary {
    pub r#match: Match,
    pub partner: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeSummary {
    pub trade: Trade,
    pub side: Side,
    pub wanted: Option<PostRef>,
    pub offered: Option<PostRef>,
    pub partner_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwipeOutcome {
    pub recorded: bool,
    pub r#match: Option<Match>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn view(match_id: Uuid) -> TradeView {
        let now = Utc::now();
        TradeView {
            r#match: Match {
                id: match_id,
                user1_id: Uuid::new_v4(),
                user2_id: Uuid::new_v4(),
                post1_id: None,
                post2_id: None,
                created_at: now,
            },
            side: Side::User1,
            partner: None,
            liked_posts: vec![],
            my_choice: None,
            partner_choice: None,
            messages: vec![],
            trade: None,
            actions: vec![TradeAction::ChooseItem],
        }
    }

    pub fn trade(match_id: Uuid, state: TradeState) -> Trade {
        let now = Utc::now();
        Trade {
            id: Uuid::new_v4(),
            match_id,
            user1_id: Uuid::new_v4(),
            user2_id: Uuid::new_v4(),
            user1_post_id: Uuid::new_v4(),
            user2_post_id: Uuid::new_v4(),
            state,
            user1_accept: false,
            user2_accept: false,
            user1_tracking: None,
            user2_tracking: None,
            user1_item_img: None,
            user2_item_img: None,
            user1_message: None,
            user2_message: None,
            user1_received: false,
            user2_received: false,
            created_at: now,
            updated_at: now,
        }
    }
}
