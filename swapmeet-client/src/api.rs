use std::future::Future;

use uuid::Uuid;

use crate::error::ClientError;
use crate::view::TradeView;

/// Photo of the packed item, attached to a shipping submission.
#[derive(Debug, Clone)]
pub struct ProofImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Shipping form as the user filled it in; validated before sending.
#[derive(Debug, Clone, Default)]
pub struct ShippingSubmission {
    pub courier: String,
    pub tracking: String,
    pub message: Option<String>,
    pub image: Option<ProofImage>,
}

/// The trade-screen operations a [`TradeSession`](crate::TradeSession)
/// drives. Every mutation answers with the refreshed view.
pub trait TradeApi: Send + Sync {
    fn view(&self, match_id: Uuid) -> impl Future<Output = Result<TradeView, ClientError>> + Send;

    fn propose(
        &self,
        match_id: Uuid,
        post_id: Uuid,
    ) -> impl Future<Output = Result<TradeView, ClientError>> + Send;

    fn confirm_trade(&self, match_id: Uuid) -> impl Future<Output = Result<TradeView, ClientError>> + Send;

    fn accept(&self, trade_id: Uuid) -> impl Future<Output = Result<TradeView, ClientError>> + Send;

    fn submit_shipping(
        &self,
        trade_id: Uuid,
        form: ShippingSubmission,
    ) -> impl Future<Output = Result<TradeView, ClientError>> + Send;

    fn confirm_receipt(&self, trade_id: Uuid) -> impl Future<Output = Result<TradeView, ClientError>> + Send;

    fn send_message(
        &self,
        match_id: Uuid,
        content: String,
    ) -> impl Future<Output = Result<TradeView, ClientError>> + Send;
}
