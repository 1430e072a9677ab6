//! Pure trade state machine.
//!
//! Every function here takes the current row and the caller's side and returns
//! the change to write, or the reason it is refused. Nothing touches storage,
//! so the same rules run inside a row-locked transaction and in tests.

use uuid::Uuid;

use swapmeet_shared::errors::{AppError, AppResult, ErrorCode};
use swapmeet_shared::types::{ShippingDetails, Side, TradeAction, TradeState};

use crate::models::{Match, MatchChanges, NewTrade, Trade, TradeChanges};

/// Record the post `side` wants from its partner.
pub fn propose(m: &Match, side: Side, post_id: Option<Uuid>) -> AppResult<MatchChanges> {
    let post_id = post_id.ok_or_else(|| {
        AppError::new(ErrorCode::NoItemSelected, "choose an item from your partner first")
    })?;

    if m.choice(side).is_some() {
        return Err(AppError::new(
            ErrorCode::AlreadyProposed,
            "you have already chosen an item for this match",
        ));
    }

    Ok(match side {
        Side::User1 => MatchChanges { post1_id: Some(post_id), ..Default::default() },
        Side::User2 => MatchChanges { post2_id: Some(post_id), ..Default::default() },
    })
}

/// Build the trade row for a match. Both sides must have chosen.
pub fn new_trade(m: &Match) -> AppResult<NewTrade> {
    NewTrade::from_match(m).ok_or_else(|| {
        AppError::new(ErrorCode::ItemsNotChosen, "both sides must choose an item first")
    })
}

pub fn accept(trade: &Trade, side: Side) -> AppResult<TradeChanges> {
    if trade.accepted_by(side) {
        return Ok(TradeChanges::default());
    }
    if trade.state != TradeState::Waiting {
        return Err(invalid(trade.state, "accept"));
    }

    let mut changes = TradeChanges::default();
    match side {
        Side::User1 => changes.user1_accept = Some(true),
        Side::User2 => changes.user2_accept = Some(true),
    }
    if trade.accepted_by(side.other()) {
        changes.state = Some(TradeState::Accepted);
    }
    Ok(changes)
}

/// Shipping is open once both accepted and stays open until completion, so
/// the second shipper can still submit after the first moved the trade on.
pub fn ensure_can_ship(trade: &Trade) -> AppResult<()> {
    match trade.state {
        TradeState::Accepted | TradeState::Shipping => Ok(()),
        state => Err(invalid(state, "submit shipping")),
    }
}

pub fn ship(
    trade: &Trade,
    side: Side,
    details: &ShippingDetails,
    image_url: &str,
) -> AppResult<TradeChanges> {
    ensure_can_ship(trade)?;

    let tracking = Some(details.tracking_label());
    let image = Some(image_url.to_string());
    // Always written so a resubmission without a note clears the old one.
    let message = Some(details.message.clone());

    let mut changes = match side {
        Side::User1 => TradeChanges {
            user1_tracking: tracking,
            user1_item_img: image,
            user1_message: message,
            ..Default::default()
        },
        Side::User2 => TradeChanges {
            user2_tracking: tracking,
            user2_item_img: image,
            user2_message: message,
            ..Default::default()
        },
    };
    if trade.state < TradeState::Shipping {
        changes.state = Some(TradeState::Shipping);
    }
    Ok(changes)
}

pub fn receive(trade: &Trade, side: Side) -> AppResult<TradeChanges> {
    if trade.received_by(side) {
        return Ok(TradeChanges::default());
    }
    if trade.state != TradeState::Shipping {
        return Err(invalid(trade.state, "confirm receipt"));
    }

    let mut changes = TradeChanges::default();
    match side {
        Side::User1 => changes.user1_received = Some(true),
        Side::User2 => changes.user2_received = Some(true),
    }
    if trade.received_by(side.other()) {
        changes.state = Some(TradeState::Completed);
    }
    Ok(changes)
}

/// Actions `side` may take right now.
pub fn available_actions(m: &Match, side: Side, trade: Option<&Trade>) -> Vec<TradeAction> {
    let mut actions = Vec::new();

    let Some(trade) = trade else {
        if m.choice(side).is_none() {
            actions.push(TradeAction::ChooseItem);
        }
        if m.post1_id.is_some() && m.post2_id.is_some() {
            actions.push(TradeAction::ConfirmTrade);
        }
        return actions;
    };

    match trade.state {
        TradeState::Waiting => {
            if !trade.accepted_by(side) {
                actions.push(TradeAction::Accept);
            }
        }
        TradeState::Accepted => actions.push(TradeAction::SubmitShipping),
        TradeState::Shipping => {
            if trade.tracking_of(side).is_none() {
                actions.push(TradeAction::SubmitShipping);
            }
            if !trade.received_by(side) {
                actions.push(TradeAction::ConfirmReceipt);
            }
        }
        TradeState::Completed => {}
    }
    actions
}

/// Label for the `trade_transitions_total` counter.
pub fn transition_label(before: TradeState, after: TradeState, action: &'static str) -> &'static str {
    if before == after {
        return action;
    }
    match after {
        TradeState::Waiting => "created",
        TradeState::Accepted => "accepted",
        TradeState::Shipping => "shipping",
        TradeState::Completed => "completed",
    }
}

fn invalid(state: TradeState, action: &str) -> AppError {
    AppError::with_details(
        ErrorCode::InvalidTransition,
        format!("cannot {action} while the trade is {state}"),
        serde_json::json!({ "state": state }),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn match_between(user1: Uuid, user2: Uuid) -> Match {
        Match {
            id: Uuid::new_v4(),
            user1_id: user1,
            user2_id: user2,
            post1_id: None,
            post2_id: None,
            created_at: Utc::now(),
        }
    }

    fn trade_in(state: TradeState) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
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
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn kerry() -> ShippingDetails {
        ShippingDetails::validate(Some("Kerry"), Some("TH123"), None, true).unwrap()
    }

    #[test]
    fn propose_without_selection_is_refused() {
        let m = match_between(Uuid::new_v4(), Uuid::new_v4());
        let err = propose(&m, Side::User1, None).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NoItemSelected));
    }

    #[test]
    fn propose_sets_own_slot_only() {
        let m = match_between(Uuid::new_v4(), Uuid::new_v4());
        let post = Uuid::new_v4();
        let changes = propose(&m, Side::User2, Some(post)).unwrap();
        assert_eq!(changes, MatchChanges { post1_id: None, post2_id: Some(post) });
    }

    #[test]
    fn second_proposal_on_same_slot_is_refused() {
        let mut m = match_between(Uuid::new_v4(), Uuid::new_v4());
        m.post1_id = Some(Uuid::new_v4());
        let err = propose(&m, Side::User1, Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AlreadyProposed));
    }

    #[test]
    fn confirm_needs_both_choices() {
        let mut m = match_between(Uuid::new_v4(), Uuid::new_v4());
        m.post1_id = Some(Uuid::new_v4());
        let err = new_trade(&m).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ItemsNotChosen));
        assert_eq!(err.to_string(), "both sides must choose an item first");

        m.post2_id = Some(Uuid::new_v4());
        let trade = new_trade(&m).unwrap();
        assert_eq!(trade.user1_post_id, m.post1_id.unwrap());
        assert_eq!(trade.user2_post_id, m.post2_id.unwrap());
        assert_eq!(trade.state, TradeState::Waiting);
    }

    #[test]
    fn accepted_fires_on_second_accept_in_either_order() {
        for first in [Side::User1, Side::User2] {
            let mut trade = trade_in(TradeState::Waiting);

            let changes = accept(&trade, first).unwrap();
            assert_eq!(changes.state, None);
            changes.apply(&mut trade);

            let changes = accept(&trade, first.other()).unwrap();
            assert_eq!(changes.state, Some(TradeState::Accepted));
            changes.apply(&mut trade);
            assert!(trade.user1_accept && trade.user2_accept);
        }
    }

    #[test]
    fn repeated_accept_is_a_no_op() {
        let mut trade = trade_in(TradeState::Accepted);
        trade.user1_accept = true;
        trade.user2_accept = true;
        assert!(accept(&trade, Side::User1).unwrap().is_empty());
    }

    #[test]
    fn accept_outside_waiting_is_invalid() {
        let trade = trade_in(TradeState::Shipping);
        let err = accept(&trade, Side::User2).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidTransition));
    }

    #[test]
    fn shipping_writes_own_fields_and_advances() {
        let trade = trade_in(TradeState::Accepted);
        let changes = ship(&trade, Side::User1, &kerry(), "http://img/1.png").unwrap();
        assert_eq!(changes.user1_tracking.as_deref(), Some("Kerry - TH123"));
        assert_eq!(changes.user1_item_img.as_deref(), Some("http://img/1.png"));
        assert_eq!(changes.user2_tracking, None);
        assert_eq!(changes.user1_message, Some(None));
        assert_eq!(changes.user2_message, None);
        assert_eq!(changes.state, Some(TradeState::Shipping));
    }

    #[test]
    fn resubmission_without_note_clears_the_old_one() {
        let mut trade = trade_in(TradeState::Accepted);
        let noted = ShippingDetails::validate(Some("Kerry"), Some("TH1"), Some("fragile"), true).unwrap();
        ship(&trade, Side::User1, &noted, "http://img/1.png").unwrap().apply(&mut trade);
        assert_eq!(trade.user1_message.as_deref(), Some("fragile"));

        let plain = ShippingDetails::validate(Some("Flash"), Some("TH2"), None, true).unwrap();
        ship(&trade, Side::User1, &plain, "http://img/2.png").unwrap().apply(&mut trade);
        assert_eq!(trade.user1_tracking.as_deref(), Some("Flash - TH2"));
        assert_eq!(trade.user1_message, None);
    }

    #[test]
    fn second_shipper_does_not_touch_state() {
        let mut trade = trade_in(TradeState::Shipping);
        trade.user1_tracking = Some("Kerry - TH123".into());
        let changes = ship(&trade, Side::User2, &kerry(), "http://img/2.png").unwrap();
        assert_eq!(changes.state, None);
        assert!(changes.user2_tracking.is_some());
    }

    #[test]
    fn shipping_before_acceptance_is_invalid() {
        let trade = trade_in(TradeState::Waiting);
        let err = ship(&trade, Side::User1, &kerry(), "x").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidTransition));
        assert!(ensure_can_ship(&trade_in(TradeState::Completed)).is_err());
    }

    #[test]
    fn completed_fires_on_second_receipt() {
        let mut trade = trade_in(TradeState::Shipping);
        let changes = receive(&trade, Side::User2).unwrap();
        assert_eq!(changes.state, None);
        changes.apply(&mut trade);

        assert!(receive(&trade, Side::User2).unwrap().is_empty());

        let changes = receive(&trade, Side::User1).unwrap();
        assert_eq!(changes.state, Some(TradeState::Completed));
    }

    #[test]
    fn receipt_before_shipping_is_invalid() {
        let trade = trade_in(TradeState::Accepted);
        let err = receive(&trade, Side::User1).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidTransition));
    }

    #[test]
    fn state_never_moves_backwards() {
        type Step = fn(&Trade) -> AppResult<TradeChanges>;
        let steps: [Step; 7] = [
            |t| accept(t, Side::User1),
            |t| accept(t, Side::User2),
            |t| ship(t, Side::User1, &kerry(), "a"),
            |t| accept(t, Side::User1),
            |t| ship(t, Side::User2, &kerry(), "b"),
            |t| receive(t, Side::User1),
            |t| receive(t, Side::User2),
        ];

        let mut trade = trade_in(TradeState::Waiting);
        for step in steps {
            let before = trade.state;
            step(&trade).unwrap().apply(&mut trade);
            assert!(trade.state >= before);
        }
        assert_eq!(trade.state, TradeState::Completed);
    }

    #[test]
    fn actions_follow_the_lifecycle() {
        let mut m = match_between(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(available_actions(&m, Side::User1, None), vec![TradeAction::ChooseItem]);

        m.post1_id = Some(Uuid::new_v4());
        assert!(available_actions(&m, Side::User1, None).is_empty());
        assert_eq!(available_actions(&m, Side::User2, None), vec![TradeAction::ChooseItem]);

        m.post2_id = Some(Uuid::new_v4());
        assert_eq!(available_actions(&m, Side::User1, None), vec![TradeAction::ConfirmTrade]);

        let mut trade = trade_in(TradeState::Waiting);
        trade.user1_accept = true;
        assert!(available_actions(&m, Side::User1, Some(&trade)).is_empty());
        assert_eq!(available_actions(&m, Side::User2, Some(&trade)), vec![TradeAction::Accept]);

        trade.state = TradeState::Shipping;
        trade.user1_tracking = Some("Kerry - TH123".into());
        assert_eq!(available_actions(&m, Side::User1, Some(&trade)), vec![TradeAction::ConfirmReceipt]);
        assert_eq!(
            available_actions(&m, Side::User2, Some(&trade)),
            vec![TradeAction::SubmitShipping, TradeAction::ConfirmReceipt]
        );
    }

    #[test]
    fn transition_labels() {
        assert_eq!(transition_label(TradeState::Waiting, TradeState::Accepted, "accept"), "accepted");
        assert_eq!(transition_label(TradeState::Waiting, TradeState::Waiting, "accept"), "accept");
    }
}
