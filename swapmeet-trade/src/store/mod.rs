//! Row access for the trade service.
//!
//! `update_*` methods hand the locked current row to a rule closure and write
//! whatever change it returns within the same transaction. They return the
//! resulting row and whether anything was written.

use uuid::Uuid;

use swapmeet_shared::errors::AppResult;
use swapmeet_shared::types::PaginationParams;

use crate::models::{
    Match, MatchChanges, Message, NewMatch, NewMessage, NewSwipe, NewTrade, Post, Profile, Trade,
    TradeChanges,
};

mod pg;
#[cfg(test)]
pub mod memory;

pub use pg::PgTradeStore;

pub trait TradeStore: Send + Sync + 'static {
    fn ping(&self) -> AppResult<()>;

    fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>>;
    fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>>;

    fn find_post(&self, id: Uuid) -> AppResult<Option<Post>>;
    fn posts_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Post>>;
    /// Posts owned by `owner` that `liker` swiped right on, latest like first.
    fn liked_posts(&self, liker: Uuid, owner: Uuid) -> AppResult<Vec<Post>>;

    /// Posts the caller can still swipe on: not their own and not yet
    /// swiped, newest first, with the unpaged total.
    fn swipe_candidates(&self, user_id: Uuid, page: &PaginationParams) -> AppResult<(Vec<Post>, u64)>;

    /// Returns `false` when the (swiper, post) pair was already recorded.
    fn insert_swipe(&self, swipe: &NewSwipe) -> AppResult<bool>;
    /// `is_like` of the recorded swipe, if any.
    fn stored_swipe(&self, swiper_id: Uuid, post_id: Uuid) -> AppResult<Option<bool>>;

    /// Insert unless a match for the unordered user pair exists. The flag is
    /// `true` when this call created the row.
    fn insert_match_if_absent(&self, new: &NewMatch) -> AppResult<(Match, bool)>;
    fn find_match(&self, id: Uuid) -> AppResult<Option<Match>>;
    /// Newest first.
    fn matches_for(&self, user_id: Uuid) -> AppResult<Vec<Match>>;
    fn update_match<F>(&self, id: Uuid, rule: F) -> AppResult<(Match, bool)>
    where
        F: FnOnce(&Match) -> AppResult<MatchChanges>;

    /// `None` when the match already has a trade.
    fn insert_trade_if_absent(&self, new: &NewTrade) -> AppResult<Option<Trade>>;
    fn find_trade(&self, id: Uuid) -> AppResult<Option<Trade>>;
    fn trade_for_match(&self, match_id: Uuid) -> AppResult<Option<Trade>>;
    /// Newest first.
    fn trades_for(&self, user_id: Uuid) -> AppResult<Vec<Trade>>;
    fn update_trade<F>(&self, id: Uuid, rule: F) -> AppResult<(Trade, bool)>
    where
        F: FnOnce(&Trade) -> AppResult<TradeChanges>;

    fn insert_message(&self, new: &NewMessage) -> AppResult<Message>;
    /// Oldest first, with the unpaged total.
    fn messages(&self, match_id: Uuid, page: Option<&PaginationParams>) -> AppResult<(Vec<Message>, u64)>;
}
