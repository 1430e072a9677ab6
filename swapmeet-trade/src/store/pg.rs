use chrono::Utc;
use diesel::dsl::not;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use swapmeet_shared::clients::db::{DbConn, DbPool};
use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};
use swapmeet_shared::types::PaginationParams;

use crate::models::{
    Match, MatchChanges, Message, NewMatch, NewMessage, NewSwipe, NewTrade, Post, Profile, Trade,
    TradeChanges,
};
use crate::schema::{matches, messages, posts, profiles, trades, user_swipes};

use super::TradeStore;

#[derive(Clone)]
pub struct PgTradeStore {
    pool: DbPool,
}

impl PgTradeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<DbConn> {
        self.pool.get().map_err(|e| AppError::Internal(e.into()))
    }
}

fn deck(user_id: Uuid) -> posts::BoxedQuery<'static, Pg> {
    let swiped = user_swipes::table
        .filter(user_swipes::swiper_id.eq(user_id))
        .select(user_swipes::post_id);
    posts::table
        .filter(posts::user_id.ne(user_id))
        .filter(not(posts::id.eq_any(swiped)))
        .into_boxed()
}

impl TradeStore for PgTradeStore {
    fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    fn find_profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table.find(id).first::<Profile>(&mut conn).optional()?)
    }

    fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::id.eq_any(ids))
            .load::<Profile>(&mut conn)?)
    }

    fn find_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let mut conn = self.conn()?;
        Ok(posts::table.find(id).first::<Post>(&mut conn).optional()?)
    }

    fn posts_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn()?;
        Ok(posts::table
            .filter(posts::id.eq_any(ids))
            .load::<Post>(&mut conn)?)
    }

    fn liked_posts(&self, liker: Uuid, owner: Uuid) -> AppResult<Vec<Post>> {
        let mut conn = self.conn()?;
        Ok(posts::table
            .inner_join(user_swipes::table)
            .filter(user_swipes::swiper_id.eq(liker))
            .filter(user_swipes::is_like.eq(true))
            .filter(posts::user_id.eq(owner))
            .order(user_swipes::created_at.desc())
            .select(Post::as_select())
            .load::<Post>(&mut conn)?)
    }

    fn swipe_candidates(&self, user_id: Uuid, page: &PaginationParams) -> AppResult<(Vec<Post>, u64)> {
        let mut conn = self.conn()?;
        let total: i64 = deck(user_id).count().get_result(&mut conn)?;
        let items = deck(user_id)
            .order((posts::created_at.desc(), posts::id.desc()))
            .offset(page.offset())
            .limit(page.limit())
            .load::<Post>(&mut conn)?;
        Ok((items, total as u64))
    }

    fn insert_swipe(&self, swipe: &NewSwipe) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let inserted = diesel::insert_into(user_swipes::table)
            .values(swipe)
            .on_conflict((user_swipes::swiper_id, user_swipes::post_id))
            .do_nothing()
            .execute(&mut conn)?;
        Ok(inserted > 0)
    }

    fn stored_swipe(&self, swiper_id: Uuid, post_id: Uuid) -> AppResult<Option<bool>> {
        let mut conn = self.conn()?;
        Ok(user_swipes::table
            .filter(user_swipes::swiper_id.eq(swiper_id))
            .filter(user_swipes::post_id.eq(post_id))
            .select(user_swipes::is_like)
            .first::<bool>(&mut conn)
            .optional()?)
    }

    fn insert_match_if_absent(&self, new: &NewMatch) -> AppResult<(Match, bool)> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            // The pair index is on an expression, so no conflict target.
            let inserted = diesel::insert_into(matches::table)
                .values(new)
                .on_conflict_do_nothing()
                .get_result::<Match>(conn)
                .optional()?;

            if let Some(created) = inserted {
                return Ok((created, true));
            }

            let (a, b) = (new.user1_id, new.user2_id);
            let existing = matches::table
                .filter(
                    matches::user1_id.eq(a).and(matches::user2_id.eq(b))
                        .or(matches::user1_id.eq(b).and(matches::user2_id.eq(a))),
                )
                .first::<Match>(conn)?;
            Ok((existing, false))
        })
    }

    fn find_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        let mut conn = self.conn()?;
        Ok(matches::table.find(id).first::<Match>(&mut conn).optional()?)
    }

    fn matches_for(&self, user_id: Uuid) -> AppResult<Vec<Match>> {
        let mut conn = self.conn()?;
        Ok(matches::table
            .filter(matches::user1_id.eq(user_id).or(matches::user2_id.eq(user_id)))
            .order(matches::created_at.desc())
            .load::<Match>(&mut conn)?)
    }

    fn update_match<F>(&self, id: Uuid, rule: F) -> AppResult<(Match, bool)>
    where
        F: FnOnce(&Match) -> AppResult<MatchChanges>,
    {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let current = matches::table
                .find(id)
                .for_update()
                .first::<Match>(conn)
                .optional()?
                .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

            let changes = rule(&current)?;
            if changes.is_empty() {
                return Ok((current, false));
            }

            let updated = diesel::update(matches::table.find(id))
                .set(&changes)
                .get_result::<Match>(conn)?;
            Ok((updated, true))
        })
    }

    fn insert_trade_if_absent(&self, new: &NewTrade) -> AppResult<Option<Trade>> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(trades::table)
            .values(new)
            .on_conflict(trades::match_id)
            .do_nothing()
            .get_result::<Trade>(&mut conn)
            .optional()?)
    }

    fn find_trade(&self, id: Uuid) -> AppResult<Option<Trade>> {
        let mut conn = self.conn()?;
        Ok(trades::table.find(id).first::<Trade>(&mut conn).optional()?)
    }

    fn trade_for_match(&self, match_id: Uuid) -> AppResult<Option<Trade>> {
        let mut conn = self.conn()?;
        Ok(trades::table
            .filter(trades::match_id.eq(match_id))
            .first::<Trade>(&mut conn)
            .optional()?)
    }

    fn trades_for(&self, user_id: Uuid) -> AppResult<Vec<Trade>> {
        let mut conn = self.conn()?;
        Ok(trades::table
            .filter(trades::user1_id.eq(user_id).or(trades::user2_id.eq(user_id)))
            .order(trades::created_at.desc())
            .load::<Trade>(&mut conn)?)
    }

    fn update_trade<F>(&self, id: Uuid, rule: F) -> AppResult<(Trade, bool)>
    where
        F: FnOnce(&Trade) -> AppResult<TradeChanges>,
    {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let current = trades::table
                .find(id)
                .for_update()
                .first::<Trade>(conn)
                .optional()?
                .ok_or_else(|| AppError::new(ErrorCode::TradeNotFound, "trade not found"))?;

            let changes = rule(&current)?;
            if changes.is_empty() {
                return Ok((current, false));
            }

            let updated = diesel::update(trades::table.find(id))
                .set((&changes, trades::updated_at.eq(Utc::now())))
                .get_result::<Trade>(conn)?;
            Ok((updated, true))
        })
    }

    fn insert_message(&self, new: &NewMessage) -> AppResult<Message> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(messages::table)
            .values(new)
            .get_result::<Message>(&mut conn)?)
    }

    fn messages(&self, match_id: Uuid, page: Option<&PaginationParams>) -> AppResult<(Vec<Message>, u64)> {
        let mut conn = self.conn()?;

        let mut query = messages::table
            .filter(messages::match_id.eq(match_id))
            .order((messages::created_at.asc(), messages::id.asc()))
            .into_boxed();

        let Some(page) = page else {
            let items = query.load::<Message>(&mut conn)?;
            let total = items.len() as u64;
            return Ok((items, total));
        };

        let total: i64 = messages::table
            .filter(messages::match_id.eq(match_id))
            .count()
            .get_result(&mut conn)?;

        query = query.offset(page.offset()).limit(page.limit());
        let items = query.load::<Message>(&mut conn)?;
        Ok((items, total as u64))
    }
}
