use metrics::counter;
use tracing::{info, warn};
use uuid::Uuid;

use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};
use swapmeet_shared::types::{
    ChangeNotice, ChangeOp, ChangeTable, Paginated, PaginationParams, ShippingDetails, Side,
    TradeState, MAX_MESSAGE_CHARS,
};

use crate::feed::ChangeFeed;
use crate::lifecycle;
use crate::models::{Match, Message, NewMatch, NewMessage, NewSwipe, Post, Trade, TradeChanges};
use crate::storage::{image_extension, proof_key, ObjectStore, ProofImage};
use crate::store::TradeStore;
use crate::view::{MatchSummary, PostRef, SwipeOutcome, TradeSummary, TradeView};

/// Raw shipping submission; validated before anything is uploaded.
#[derive(Debug, Default, Clone)]
pub struct ShippingForm {
    pub courier: Option<String>,
    pub tracking: Option<String>,
    pub message: Option<String>,
    pub image: Option<ProofImage>,
}

/// Runs trade operations for an authenticated participant.
///
/// Writes go through the store's locked update so the guard and the write see
/// the same row. Each committed write emits a `ChangeNotice` stamped with
/// this instance's id.
pub struct TradeCoordinator<S> {
    store: S,
    feed: ChangeFeed,
    origin: String,
}

impl<S: TradeStore> TradeCoordinator<S> {
    pub fn new(store: S, feed: ChangeFeed, origin: impl Into<String>) -> Self {
        Self { store, feed, origin: origin.into() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Reads ---

    pub fn view(&self, user_id: Uuid, match_id: Uuid) -> AppResult<TradeView> {
        let (m, side) = self.participant_match(user_id, match_id)?;
        self.assemble(m, side)
    }

    /// View of the caller's most recent match, if any.
    pub fn current_view(&self, user_id: Uuid) -> AppResult<Option<TradeView>> {
        let Some(latest) = self.store.matches_for(user_id)?.into_iter().next() else {
            return Ok(None);
        };
        let side = self.side_in_match(&latest, user_id)?;
        self.assemble(latest, side).map(Some)
    }

    pub fn list_matches(&self, user_id: Uuid) -> AppResult<Vec<MatchSummary>> {
        let matches = self.store.matches_for(user_id)?;
        let partner_ids: Vec<Uuid> = matches
            .iter()
            .filter_map(|m| m.side_of(user_id).map(|side| m.user(side.other())))
            .collect();
        let partners = self.store.profiles_by_ids(&partner_ids)?;

        Ok(matches
            .into_iter()
            .filter_map(|m| {
                let side = m.side_of(user_id)?;
                let partner_id = m.user(side.other());
                let partner = partners.iter().find(|p| p.id == partner_id).cloned();
                Some(MatchSummary { r#match: m, partner })
            })
            .collect())
    }

    pub fn list_messages(
        &self,
        user_id: Uuid,
        match_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<Paginated<Message>> {
        self.participant_match(user_id, match_id)?;
        let (items, total) = self.store.messages(match_id, Some(params))?;
        Ok(Paginated::new(items, total, params))
    }

    pub fn trade_history(&self, user_id: Uuid) -> AppResult<Vec<TradeSummary>> {
        let trades = self.store.trades_for(user_id)?;

        let post_ids: Vec<Uuid> = trades
            .iter()
            .flat_map(|t| [t.user1_post_id, t.user2_post_id])
            .collect();
        let posts = self.store.posts_by_ids(&post_ids)?;

        let partner_ids: Vec<Uuid> = trades
            .iter()
            .filter_map(|t| t.side_of(user_id).map(|side| partner_of(t, side)))
            .collect();
        let partners = self.store.profiles_by_ids(&partner_ids)?;

        let post_ref = |id: Uuid| posts.iter().find(|p| p.id == id).map(PostRef::from);

        Ok(trades
            .into_iter()
            .filter_map(|trade| {
                let side = trade.side_of(user_id)?;
                let partner_id = partner_of(&trade, side);
                Some(TradeSummary {
                    wanted: post_ref(trade.wanted_post(side)),
                    offered: post_ref(trade.wanted_post(side.other())),
                    partner_name: partners
                        .iter()
                        .find(|p| p.id == partner_id)
                        .and_then(|p| p.full_name.clone()),
                    side,
                    trade,
                })
            })
            .collect())
    }

    // --- Matching ---

    /// Partner posts the caller has not swiped on yet, newest first.
    pub fn swipe_deck(&self, user_id: Uuid, params: &PaginationParams) -> AppResult<Paginated<Post>> {
        let (items, total) = self.store.swipe_candidates(user_id, params)?;
        Ok(Paginated::new(items, total, params))
    }

    /// Record a like/dislike and open a match when the like is mutual.
    pub fn record_swipe(&self, user_id: Uuid, post_id: Uuid, is_like: bool) -> AppResult<SwipeOutcome> {
        let post = self
            .store
            .find_post(post_id)?
            .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))?;

        if post.user_id == user_id {
            return Err(AppError::new(ErrorCode::CannotSwipeOwnPost, "you cannot swipe on your own post"));
        }

        let recorded = self.store.insert_swipe(&NewSwipe {
            id: Uuid::now_v7(),
            swiper_id: user_id,
            swiped_user_id: post.user_id,
            post_id,
            is_like,
        })?;

        // Only the first swipe on a post counts; a repeat reads back what was stored.
        let is_like = if recorded {
            is_like
        } else {
            self.store.stored_swipe(user_id, post_id)?.unwrap_or(false)
        };

        if !is_like {
            return Ok(SwipeOutcome { recorded, r#match: None });
        }

        // Mutual once the owner has liked anything of ours.
        if self.store.liked_posts(post.user_id, user_id)?.is_empty() {
            return Ok(SwipeOutcome { recorded, r#match: None });
        }

        let (m, created) = self.store.insert_match_if_absent(&NewMatch {
            id: Uuid::now_v7(),
            user1_id: post.user_id,
            user2_id: user_id,
        })?;

        if created {
            info!(match_id = %m.id, user1_id = %m.user1_id, user2_id = %m.user2_id, "match created");
            counter!("matches_created_total").increment(1);
            self.notify(ChangeTable::Matches, ChangeOp::Insert, m.id, m.id);
        }

        Ok(SwipeOutcome { recorded, r#match: Some(m) })
    }

    // --- Trade lifecycle ---

    /// Set the partner post the caller wants. The caller must have liked it.
    pub fn propose(&self, user_id: Uuid, match_id: Uuid, post_id: Option<Uuid>) -> AppResult<TradeView> {
        let (m, side) = self.participant_match(user_id, match_id)?;

        if let Some(post_id) = post_id {
            let liked = self
                .store
                .liked_posts(user_id, m.user(side.other()))?
                .iter()
                .any(|p| p.id == post_id);
            if !liked {
                return Err(AppError::new(
                    ErrorCode::ItemNotLiked,
                    "you can only choose an item of your partner that you liked",
                ));
            }
        }

        let (m, changed) = self
            .store
            .update_match(match_id, |current| lifecycle::propose(current, side, post_id))?;

        if changed {
            info!(match_id = %m.id, side = side.prefix(), "item proposed");
            counter!("trade_transitions_total", "transition" => "proposed").increment(1);
            self.notify(ChangeTable::Matches, ChangeOp::Update, m.id, m.id);
        }

        self.assemble(m, side)
    }

    /// Create the trade for a fully-specified match.
    pub fn confirm_trade(&self, user_id: Uuid, match_id: Uuid) -> AppResult<TradeView> {
        let (m, side) = self.participant_match(user_id, match_id)?;
        let new = lifecycle::new_trade(&m)?;

        let trade = self.store.insert_trade_if_absent(&new)?.ok_or_else(|| {
            AppError::new(ErrorCode::TradeAlreadyExists, "a trade already exists for this match")
        })?;

        info!(trade_id = %trade.id, match_id = %m.id, "trade created");
        counter!("trade_transitions_total", "transition" => "created").increment(1);
        self.notify(ChangeTable::Trades, ChangeOp::Insert, m.id, trade.id);

        self.assemble(m, side)
    }

    pub fn accept(&self, user_id: Uuid, trade_id: Uuid) -> AppResult<TradeView> {
        self.transition(user_id, trade_id, "accept", lifecycle::accept)
    }

    pub fn confirm_receipt(&self, user_id: Uuid, trade_id: Uuid) -> AppResult<TradeView> {
        self.transition(user_id, trade_id, "receive", lifecycle::receive)
    }

    /// Validate, upload the proof image, then record tracking on the caller's
    /// side. Nothing is written if validation or the upload fails.
    pub async fn submit_shipping<O: ObjectStore>(
        &self,
        objects: &O,
        user_id: Uuid,
        trade_id: Uuid,
        form: ShippingForm,
    ) -> AppResult<TradeView> {
        let details = ShippingDetails::validate(
            form.courier.as_deref(),
            form.tracking.as_deref(),
            form.message.as_deref(),
            form.image.is_some(),
        )?;
        let image = form
            .image
            .ok_or_else(|| AppError::new(ErrorCode::ShippingIncomplete, "proof image is required"))?;
        let ext = image_extension(&image.content_type).ok_or_else(|| {
            AppError::bad_request("unsupported image format, accepted: jpeg, png, webp, gif")
        })?;

        let (trade, _) = self.participant_trade(user_id, trade_id)?;
        lifecycle::ensure_can_ship(&trade)?;

        let key = proof_key(trade.id, user_id, ext);
        let image_url = objects
            .upload(&key, image.bytes, &image.content_type)
            .await
            .map_err(|e| {
                warn!(trade_id = %trade_id, error = %e, "proof upload failed");
                AppError::new(ErrorCode::ProofUploadFailed, "failed to upload the proof image")
            })?;

        self.transition(user_id, trade_id, "ship", |current, side| {
            lifecycle::ship(current, side, &details, &image_url)
        })
    }

    // --- Chat ---

    pub fn send_message(&self, user_id: Uuid, match_id: Uuid, content: &str) -> AppResult<TradeView> {
        let (m, side) = self.participant_match(user_id, match_id)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::new(ErrorCode::MessageEmpty, "message cannot be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let message = self.store.insert_message(&NewMessage {
            id: Uuid::now_v7(),
            match_id,
            sender_id: user_id,
            content: content.to_string(),
        })?;

        counter!("messages_sent_total").increment(1);
        self.notify(ChangeTable::Messages, ChangeOp::Insert, match_id, message.id);

        self.assemble(m, side)
    }

    // --- Internals ---

    fn transition<F>(&self, user_id: Uuid, trade_id: Uuid, action: &'static str, rule: F) -> AppResult<TradeView>
    where
        F: FnOnce(&Trade, Side) -> AppResult<TradeChanges>,
    {
        let (_, side) = self.participant_trade(user_id, trade_id)?;

        let mut before = TradeState::Waiting;
        let (trade, changed) = self.store.update_trade(trade_id, |current| {
            before = current.state;
            rule(current, side)
        })?;

        if changed {
            let transition = lifecycle::transition_label(before, trade.state, action);
            info!(
                trade_id = %trade.id,
                side = side.prefix(),
                from = %before,
                to = %trade.state,
                transition,
                "trade updated"
            );
            counter!("trade_transitions_total", "transition" => transition).increment(1);
            self.notify(ChangeTable::Trades, ChangeOp::Update, trade.match_id, trade.id);
        }

        let m = self
            .store
            .find_match(trade.match_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
        self.assemble(m, side)
    }

    fn participant_match(&self, user_id: Uuid, match_id: Uuid) -> AppResult<(Match, Side)> {
        let m = self
            .store
            .find_match(match_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
        let side = self.side_in_match(&m, user_id)?;
        Ok((m, side))
    }

    fn participant_trade(&self, user_id: Uuid, trade_id: Uuid) -> AppResult<(Trade, Side)> {
        let trade = self
            .store
            .find_trade(trade_id)?
            .ok_or_else(|| AppError::new(ErrorCode::TradeNotFound, "trade not found"))?;
        let side = trade
            .side_of(user_id)
            .ok_or_else(|| AppError::new(ErrorCode::NotMatchParticipant, "you are not part of this trade"))?;
        Ok((trade, side))
    }

    fn side_in_match(&self, m: &Match, user_id: Uuid) -> AppResult<Side> {
        m.side_of(user_id)
            .ok_or_else(|| AppError::new(ErrorCode::NotMatchParticipant, "you are not part of this match"))
    }

    fn assemble(&self, m: Match, side: Side) -> AppResult<TradeView> {
        let partner_id = m.user(side.other());
        let partner = self.store.find_profile(partner_id)?;
        let liked_posts = self.store.liked_posts(m.user(side), partner_id)?;

        let chosen: Vec<Uuid> = [m.choice(side), m.choice(side.other())]
            .into_iter()
            .flatten()
            .collect();
        let posts = self.store.posts_by_ids(&chosen)?;
        let post_ref = |id: Option<Uuid>| {
            id.and_then(|id| posts.iter().find(|p| p.id == id))
                .map(PostRef::from)
        };

        let (messages, _) = self.store.messages(m.id, None)?;
        let trade = self.store.trade_for_match(m.id)?;
        let actions = lifecycle::available_actions(&m, side, trade.as_ref());

        Ok(TradeView {
            my_choice: post_ref(m.choice(side)),
            partner_choice: post_ref(m.choice(side.other())),
            r#match: m,
            side,
            partner,
            liked_posts,
            messages,
            trade,
            actions,
        })
    }

    fn notify(&self, table: ChangeTable, op: ChangeOp, match_id: Uuid, row_id: Uuid) {
        self.feed
            .emit(ChangeNotice::new(table, op, match_id, row_id, self.origin.clone()));
    }
}

fn partner_of(trade: &Trade, side: Side) -> Uuid {
    match side {
        Side::User1 => trade.user2_id,
        Side::User2 => trade.user1_id,
    }
}
