use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};
use swapmeet_shared::types::PaginationParams;

use crate::models::{
    Match, MatchChanges, Message, NewMatch, NewMessage, NewSwipe, NewTrade, Post, Profile, Trade,
    TradeChanges,
};

use super::TradeStore;

/// In-process `TradeStore` for tests. One mutex guards all tables, which
/// gives the same all-or-nothing behaviour as the row-locked transactions.
#[derive(Default)]
pub struct MemoryTradeStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    profiles: Vec<Profile>,
    posts: Vec<Post>,
    swipes: Vec<(NewSwipe, DateTime<Utc>)>,
    matches: Vec<Match>,
    trades: Vec<Trade>,
    messages: Vec<Message>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().profiles.push(Profile {
            id,
            full_name: Some(name.to_string()),
            email: None,
            avatar_url: None,
            created_at: Utc::now(),
        });
        id
    }

    pub fn add_post(&self, owner: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().posts.push(Post {
            id,
            user_id: owner,
            title: title.to_string(),
            detail: None,
            image_url: None,
            created_at: Utc::now(),
        });
        id
    }

    pub fn trade_count(&self) -> usize {
        self.inner.lock().unwrap().trades.len()
    }

    pub fn match_count(&self) -> usize {
        self.inner.lock().unwrap().matches.len()
    }
}

impl TradeStore for MemoryTradeStore {
    fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let t = self.inner.lock().unwrap();
        Ok(t.profiles.iter().find(|p| p.id == id).cloned())
    }

    fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        let t = self.inner.lock().unwrap();
        Ok(t.profiles.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    fn find_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let t = self.inner.lock().unwrap();
        Ok(t.posts.iter().find(|p| p.id == id).cloned())
    }

    fn posts_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Post>> {
        let t = self.inner.lock().unwrap();
        Ok(t.posts.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    fn liked_posts(&self, liker: Uuid, owner: Uuid) -> AppResult<Vec<Post>> {
        let t = self.inner.lock().unwrap();
        Ok(t.swipes
            .iter()
            .rev()
            .filter(|(s, _)| s.swiper_id == liker && s.is_like)
            .filter_map(|(s, _)| t.posts.iter().find(|p| p.id == s.post_id))
            .filter(|p| p.user_id == owner)
            .cloned()
            .collect())
    }

    fn swipe_candidates(&self, user_id: Uuid, page: &PaginationParams) -> AppResult<(Vec<Post>, u64)> {
        let t = self.inner.lock().unwrap();
        let mut deck: Vec<Post> = t
            .posts
            .iter()
            .rev()
            .filter(|p| p.user_id != user_id)
            .filter(|p| !t.swipes.iter().any(|(s, _)| s.swiper_id == user_id && s.post_id == p.id))
            .cloned()
            .collect();
        deck.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = deck.len() as u64;
        let items = deck.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect();
        Ok((items, total))
    }

    fn insert_swipe(&self, swipe: &NewSwipe) -> AppResult<bool> {
        let mut t = self.inner.lock().unwrap();
        let exists = t
            .swipes
            .iter()
            .any(|(s, _)| s.swiper_id == swipe.swiper_id && s.post_id == swipe.post_id);
        if exists {
            return Ok(false);
        }
        t.swipes.push((swipe.clone(), Utc::now()));
        Ok(true)
    }

    fn stored_swipe(&self, swiper_id: Uuid, post_id: Uuid) -> AppResult<Option<bool>> {
        let t = self.inner.lock().unwrap();
        Ok(t.swipes
            .iter()
            .find(|(s, _)| s.swiper_id == swiper_id && s.post_id == post_id)
            .map(|(s, _)| s.is_like))
    }

    fn insert_match_if_absent(&self, new: &NewMatch) -> AppResult<(Match, bool)> {
        let mut t = self.inner.lock().unwrap();
        let pair = |m: &Match| {
            (m.user1_id == new.user1_id && m.user2_id == new.user2_id)
                || (m.user1_id == new.user2_id && m.user2_id == new.user1_id)
        };
        if let Some(existing) = t.matches.iter().find(|m| pair(m)) {
            return Ok((existing.clone(), false));
        }
        let created = Match {
            id: new.id,
            user1_id: new.user1_id,
            user2_id: new.user2_id,
            post1_id: None,
            post2_id: None,
            created_at: Utc::now(),
        };
        t.matches.push(created.clone());
        Ok((created, true))
    }

    fn find_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        let t = self.inner.lock().unwrap();
        Ok(t.matches.iter().find(|m| m.id == id).cloned())
    }

    fn matches_for(&self, user_id: Uuid) -> AppResult<Vec<Match>> {
        let t = self.inner.lock().unwrap();
        Ok(t.matches
            .iter()
            .rev()
            .filter(|m| m.user1_id == user_id || m.user2_id == user_id)
            .cloned()
            .collect())
    }

    fn update_match<F>(&self, id: Uuid, rule: F) -> AppResult<(Match, bool)>
    where
        F: FnOnce(&Match) -> AppResult<MatchChanges>,
    {
        let mut t = self.inner.lock().unwrap();
        let row = t
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
        let changes = rule(row)?;
        if changes.is_empty() {
            return Ok((row.clone(), false));
        }
        changes.apply(row);
        Ok((row.clone(), true))
    }

    fn insert_trade_if_absent(&self, new: &NewTrade) -> AppResult<Option<Trade>> {
        let mut t = self.inner.lock().unwrap();
        if t.trades.iter().any(|tr| tr.match_id == new.match_id) {
            return Ok(None);
        }
        let now = Utc::now();
        let trade = Trade {
            id: new.id,
            match_id: new.match_id,
            user1_id: new.user1_id,
            user2_id: new.user2_id,
            user1_post_id: new.user1_post_id,
            user2_post_id: new.user2_post_id,
            state: new.state,
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
        };
        t.trades.push(trade.clone());
        Ok(Some(trade))
    }

    fn find_trade(&self, id: Uuid) -> AppResult<Option<Trade>> {
        let t = self.inner.lock().unwrap();
        Ok(t.trades.iter().find(|tr| tr.id == id).cloned())
    }

    fn trade_for_match(&self, match_id: Uuid) -> AppResult<Option<Trade>> {
        let t = self.inner.lock().unwrap();
        Ok(t.trades.iter().find(|tr| tr.match_id == match_id).cloned())
    }

    fn trades_for(&self, user_id: Uuid) -> AppResult<Vec<Trade>> {
        let t = self.inner.lock().unwrap();
        Ok(t.trades
            .iter()
            .rev()
            .filter(|tr| tr.user1_id == user_id || tr.user2_id == user_id)
            .cloned()
            .collect())
    }

    fn update_trade<F>(&self, id: Uuid, rule: F) -> AppResult<(Trade, bool)>
    where
        F: FnOnce(&Trade) -> AppResult<TradeChanges>,
    {
        let mut t = self.inner.lock().unwrap();
        let row = t
            .trades
            .iter_mut()
            .find(|tr| tr.id == id)
            .ok_or_else(|| AppError::new(ErrorCode::TradeNotFound, "trade not found"))?;
        let changes = rule(row)?;
        if changes.is_empty() {
            return Ok((row.clone(), false));
        }
        changes.apply(row);
        row.updated_at = Utc::now();
        Ok((row.clone(), true))
    }

    fn insert_message(&self, new: &NewMessage) -> AppResult<Message> {
        let mut t = self.inner.lock().unwrap();
        let message = Message {
            id: new.id,
            match_id: new.match_id,
            sender_id: new.sender_id,
            content: new.content.clone(),
            created_at: Utc::now(),
        };
        t.messages.push(message.clone());
        Ok(message)
    }

    fn messages(&self, match_id: Uuid, page: Option<&PaginationParams>) -> AppResult<(Vec<Message>, u64)> {
        let t = self.inner.lock().unwrap();
        let all: Vec<Message> = t.messages.iter().filter(|m| m.match_id == match_id).cloned().collect();
        let total = all.len() as u64;
        let items = match page {
            Some(p) => all.into_iter().skip(p.offset() as usize).take(p.limit() as usize).collect(),
            None => all,
        };
        Ok((items, total))
    }
}
