use serde::Serialize;
use uuid::Uuid;

use swapmeet_shared::types::{Side, TradeAction};

use crate::models::{Match, Message, Post, Profile, Trade};

/// Everything a participant's trade screen needs for one match.
///
/// Every mutation responds with a freshly loaded view, and clients reload it
/// on any change notice for the match.
#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    pub r#match: Match,
    pub side: Side,
    pub partner: Option<Profile>,
    /// Partner posts the caller liked; the candidates for a proposal.
    pub liked_posts: Vec<Post>,
    /// Partner post the caller wants.
    pub my_choice: Option<PostRef>,
    /// Caller post the partner wants.
    pub partner_choice: Option<PostRef>,
    pub messages: Vec<Message>,
    pub trade: Option<Trade>,
    pub actions: Vec<TradeAction>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PostRef {
    pub id: Uuid,
    pub title: String,
}

impl From<&Post> for PostRef {
    fn from(post: &Post) -> Self {
        Self { id: post.id, title: post.title.clone() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub r#match: Match,
    pub partner: Option<Profile>,
}

/// One row of the caller's trade history.
#[derive(Debug, Clone, Serialize)]
pub struct TradeSummary {
    pub trade: Trade,
    pub side: Side,
    /// Item the caller receives.
    pub wanted: Option<PostRef>,
    /// Item the caller gives away.
    pub offered: Option<PostRef>,
    pub partner_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwipeOutcome {
    pub recorded: bool,
    pub r#match: Option<Match>,
}
