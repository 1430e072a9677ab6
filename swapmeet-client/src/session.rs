use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};
use uuid::Uuid;

use swapmeet_shared::types::{ChangeNotice, ShippingDetails, MAX_MESSAGE_CHARS};

use crate::api::{ShippingSubmission, TradeApi};
use crate::error::ClientError;
use crate::feed::{ChangeFeedSubscriber, FeedEvent};
use crate::view::TradeView;

/// One participant's live trade screen for a single match.
///
/// Holds the last [`TradeView`] the service returned and replaces it wholesale
/// after every action or change notice. Only one action runs at a time; a
/// second one started meanwhile fails with [`ClientError::InFlight`].
pub struct TradeSession<A> {
    api: A,
    match_id: Uuid,
    view: RwLock<Option<TradeView>>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag on drop, including when the action errors.
struct Busy<'a>(&'a AtomicBool);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: TradeApi> TradeSession<A> {
    pub fn new(api: A, match_id: Uuid) -> Self {
        Self {
            api,
            match_id,
            view: RwLock::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Start from a view fetched elsewhere, e.g. `current_view`.
    pub fn with_view(api: A, view: TradeView) -> Self {
        let session = Self::new(api, view.match_id());
        session.store(view);
        session
    }

    pub async fn open(api: A, match_id: Uuid) -> Result<Self, ClientError> {
        let session = Self::new(api, match_id);
        session.reload().await?;
        Ok(session)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn match_id(&self) -> Uuid {
        self.match_id
    }

    pub fn view(&self) -> Option<TradeView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn reload(&self) -> Result<TradeView, ClientError> {
        let view = self.api.view(self.match_id).await?;
        Ok(self.store(view))
    }

    /// Propose taking `post_id` from the partner.
    pub async fn choose_item(&self, post_id: Option<Uuid>) -> Result<TradeView, ClientError> {
        let post_id = post_id.ok_or_else(|| ClientError::Validation("choose an item first".into()))?;
        let _busy = self.begin()?;
        let view = self.api.propose(self.match_id, post_id).await?;
        Ok(self.store(view))
    }

    pub async fn confirm_trade(&self) -> Result<TradeView, ClientError> {
        if !self.cached()?.both_chosen() {
            return Err(ClientError::Validation("both sides must choose an item first".into()));
        }
        let _busy = self.begin()?;
        let view = self.api.confirm_trade(self.match_id).await?;
        Ok(self.store(view))
    }

    pub async fn accept(&self) -> Result<TradeView, ClientError> {
        let trade_id = self.trade_id()?;
        let _busy = self.begin()?;
        let view = self.api.accept(trade_id).await?;
        Ok(self.store(view))
    }

    /// Validates the form locally so an incomplete one never uploads.
    pub async fn submit_shipping(&self, form: ShippingSubmission) -> Result<TradeView, ClientError> {
        let has_image = form.image.as_ref().is_some_and(|img| !img.bytes.is_empty());
        let details = ShippingDetails::validate(
            Some(form.courier.as_str()),
            Some(form.tracking.as_str()),
            form.message.as_deref(),
            has_image,
        )
        .map_err(|e| ClientError::Validation(e.to_string()))?;
        let trade_id = self.trade_id()?;

        let form = ShippingSubmission {
            courier: details.courier,
            tracking: details.tracking_code,
            message: details.message,
            image: form.image,
        };

        let _busy = self.begin()?;
        let view = self.api.submit_shipping(trade_id, form).await?;
        Ok(self.store(view))
    }

    pub async fn confirm_receipt(&self) -> Result<TradeView, ClientError> {
        let trade_id = self.trade_id()?;
        let _busy = self.begin()?;
        let view = self.api.confirm_receipt(trade_id).await?;
        Ok(self.store(view))
    }

    pub async fn send_message(&self, content: &str) -> Result<TradeView, ClientError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::Validation("message cannot be empty".into()));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ClientError::Validation(format!(
                "message must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }
        let _busy = self.begin()?;
        let view = self.api.send_message(self.match_id, content.to_string()).await?;
        Ok(self.store(view))
    }

    /// Reload when the notice concerns this match. Returns the new view, or
    /// `None` for notices about other matches.
    pub async fn on_notice(&self, notice: &ChangeNotice) -> Result<Option<TradeView>, ClientError> {
        if notice.match_id != self.match_id {
            return Ok(None);
        }
        debug!(match_id = %self.match_id, event = %notice.event_name(), "reloading after change notice");
        self.reload().await.map(Some)
    }

    /// Keep the view fresh until the feed closes.
    pub async fn follow(&self, mut feed: ChangeFeedSubscriber) -> Result<(), ClientError> {
        while let Some(event) = feed.recv().await {
            match event? {
                FeedEvent::Change(notice) => {
                    self.on_notice(&notice).await?;
                }
                FeedEvent::Lagged(detail) => {
                    warn!(match_id = %self.match_id, "change feed lagged: {detail}");
                    self.reload().await?;
                }
            }
        }
        Ok(())
    }

    fn begin(&self) -> Result<Busy<'_>, ClientError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(ClientError::InFlight);
        }
        Ok(Busy(&self.in_flight))
    }

    fn store(&self, view: TradeView) -> TradeView {
        *self.view.write().unwrap_or_else(PoisonError::into_inner) = Some(view.clone());
        view
    }

    fn cached(&self) -> Result<TradeView, ClientError> {
        self.view()
            .ok_or_else(|| ClientError::Validation("trade view is not loaded".into()))
    }

    fn trade_id(&self) -> Result<Uuid, ClientError> {
        self.cached()?
            .trade
            .map(|t| t.id)
            .ok_or_else(|| ClientError::Validation("no trade exists for this match yet".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use swapmeet_shared::types::{ChangeOp, ChangeTable, TradeState};
    use tokio::sync::Notify;

    use super::*;
    use crate::api::ProofImage;
    use crate::view::fixtures;
    use crate::view::PostRef;

    /// Answers every call with the current `view`, logging the call name.
    struct FakeApi {
        view: Mutex<TradeView>,
        calls: Mutex<Vec<&'static str>>,
        shipped: Mutex<Option<ShippingSubmission>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeApi {
        fn new(view: TradeView) -> Self {
            Self {
                view: Mutex::new(view),
                calls: Mutex::new(vec![]),
                shipped: Mutex::new(None),
                gate: None,
            }
        }

        fn gated(view: TradeView, gate: Arc<Notify>) -> Self {
            Self { gate: Some(gate), ..Self::new(view) }
        }

        fn set_view(&self, view: TradeView) {
            *self.view.lock().unwrap() = view;
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        async fn answer(&self, call: &'static str) -> Result<TradeView, ClientError> {
            self.calls.lock().unwrap().push(call);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(self.view.lock().unwrap().clone())
        }
    }

    impl TradeApi for FakeApi {
        async fn view(&self, _match_id: Uuid) -> Result<TradeView, ClientError> {
            self.calls.lock().unwrap().push("view");
            Ok(self.view.lock().unwrap().clone())
        }

        async fn propose(&self, _match_id: Uuid, _post_id: Uuid) -> Result<TradeView, ClientError> {
            self.answer("propose").await
        }

        async fn confirm_trade(&self, _match_id: Uuid) -> Result<TradeView, ClientError> {
            self.answer("confirm_trade").await
        }

        async fn accept(&self, _trade_id: Uuid) -> Result<TradeView, ClientError> {
            self.answer("accept").await
        }

        async fn submit_shipping(&self, _trade_id: Uuid, form: ShippingSubmission) -> Result<TradeView, ClientError> {
            *self.shipped.lock().unwrap() = Some(form);
            self.answer("submit_shipping").await
        }

        async fn confirm_receipt(&self, _trade_id: Uuid) -> Result<TradeView, ClientError> {
            self.answer("confirm_receipt").await
        }

        async fn send_message(&self, _match_id: Uuid, _content: String) -> Result<TradeView, ClientError> {
            self.answer("send_message").await
        }
    }

    fn with_trade(state: TradeState) -> TradeView {
        let mut view = fixtures::view(Uuid::new_v4());
        view.trade = Some(fixtures::trade(view.match_id(), state));
        view
    }

    fn image() -> ProofImage {
        ProofImage {
            bytes: b"PNGDATA".to_vec(),
            content_type: "image/png".into(),
            file_name: "box.png".into(),
        }
    }

    fn assert_validation(result: Result<TradeView, ClientError>) {
        assert!(matches!(result, Err(ClientError::Validation(_))), "got {result:?}");
    }

    #[tokio::test]
    async fn open_loads_the_view() {
        let view = fixtures::view(Uuid::new_v4());
        let session = TradeSession::open(FakeApi::new(view.clone()), view.match_id()).await.unwrap();
        assert_eq!(session.view(), Some(view));
        assert_eq!(session.api().calls(), vec!["view"]);
    }

    #[tokio::test]
    async fn choosing_nothing_is_rejected_locally() {
        let view = fixtures::view(Uuid::new_v4());
        let session = TradeSession::new(FakeApi::new(view.clone()), view.match_id());
        assert_validation(session.choose_item(None).await);
        assert!(session.api().calls().is_empty());
    }

    #[tokio::test]
    async fn confirm_needs_both_choices() {
        let mut view = fixtures::view(Uuid::new_v4());
        view.my_choice = Some(PostRef { id: Uuid::new_v4(), title: "Lens".into() });
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view);

        assert_validation(session.confirm_trade().await);
        assert!(session.api().calls().is_empty());
    }

    #[tokio::test]
    async fn action_result_replaces_the_cache() {
        let mut view = fixtures::view(Uuid::new_v4());
        view.my_choice = Some(PostRef { id: Uuid::new_v4(), title: "Lens".into() });
        view.partner_choice = Some(PostRef { id: Uuid::new_v4(), title: "Tripod".into() });
        let api = FakeApi::new(view.clone());
        let mut after = view.clone();
        after.trade = Some(fixtures::trade(view.match_id(), TradeState::Waiting));
        api.set_view(after.clone());

        let session = TradeSession::with_view(api, view);
        let returned = session.confirm_trade().await.unwrap();

        assert_eq!(returned, after);
        assert_eq!(session.view(), Some(after));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn accept_without_trade_is_rejected() {
        let view = fixtures::view(Uuid::new_v4());
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view);
        assert_validation(session.accept().await);
    }

    #[tokio::test]
    async fn incomplete_shipping_never_reaches_the_service() {
        let view = with_trade(TradeState::Accepted);
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view);

        let missing_image = ShippingSubmission {
            courier: "Kerry".into(),
            tracking: "TH123".into(),
            ..Default::default()
        };
        assert_validation(session.submit_shipping(missing_image).await);

        let blank_courier = ShippingSubmission {
            courier: "  ".into(),
            tracking: "TH123".into(),
            image: Some(image()),
            ..Default::default()
        };
        assert_validation(session.submit_shipping(blank_courier).await);
        assert!(session.api().calls().is_empty());
    }

    #[tokio::test]
    async fn shipping_form_is_trimmed_before_sending() {
        let view = with_trade(TradeState::Accepted);
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view);

        let form = ShippingSubmission {
            courier: " Kerry ".into(),
            tracking: "TH123\n".into(),
            message: Some("   ".into()),
            image: Some(image()),
        };
        session.submit_shipping(form).await.unwrap();

        let sent = session.api().shipped.lock().unwrap().clone().unwrap();
        assert_eq!(sent.courier, "Kerry");
        assert_eq!(sent.tracking, "TH123");
        assert_eq!(sent.message, None);
        assert_eq!(sent.image.unwrap().bytes, b"PNGDATA".to_vec());
    }

    #[tokio::test]
    async fn blank_message_is_rejected_locally() {
        let view = fixtures::view(Uuid::new_v4());
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view);
        assert_validation(session.send_message(" \n ").await);
        assert_validation(session.send_message(&"x".repeat(MAX_MESSAGE_CHARS + 1)).await);
        session.send_message(" hi ").await.unwrap();
        assert_eq!(session.api().calls(), vec!["send_message"]);
    }

    #[tokio::test]
    async fn second_action_while_busy_is_rejected() {
        let gate = Arc::new(Notify::new());
        let view = with_trade(TradeState::Shipping);
        let session = TradeSession::with_view(FakeApi::gated(view.clone(), gate.clone()), view);

        let first = session.accept();
        let second = async {
            let result = session.confirm_receipt().await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(ClientError::InFlight)));
        assert_eq!(session.api().calls(), vec!["accept"]);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn notices_for_other_matches_are_ignored() {
        let view = fixtures::view(Uuid::new_v4());
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view.clone());

        let other = ChangeNotice::new(ChangeTable::Trades, ChangeOp::Update, Uuid::new_v4(), Uuid::new_v4(), "inst-a");
        assert!(session.on_notice(&other).await.unwrap().is_none());
        assert!(session.api().calls().is_empty());

        let mine = ChangeNotice::new(ChangeTable::Messages, ChangeOp::Insert, view.match_id(), Uuid::new_v4(), "inst-a");
        assert!(session.on_notice(&mine).await.unwrap().is_some());
        assert_eq!(session.api().calls(), vec!["view"]);
    }

    #[tokio::test]
    async fn follow_reloads_on_each_relevant_event() {
        let view = fixtures::view(Uuid::new_v4());
        let session = TradeSession::with_view(FakeApi::new(view.clone()), view.clone());

        let mine = ChangeNotice::new(ChangeTable::Matches, ChangeOp::Update, view.match_id(), view.match_id(), "inst-b");
        let body = format!(
            "event: matches.update\ndata: {}\n\n:heartbeat\n\nevent: _warning\ndata: {{\"message\":\"lagged\"}}\n\n",
            serde_json::to_string(&mine).unwrap()
        );
        let chunks: Vec<Result<Vec<u8>, ClientError>> = vec![Ok(body.into_bytes())];

        session
            .follow(ChangeFeedSubscriber::new(futures::stream::iter(chunks)))
            .await
            .unwrap();
        assert_eq!(session.api().calls(), vec!["view", "view"]);
    }
}
