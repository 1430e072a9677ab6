use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use swapmeet_shared::types::{ApiErrorResponse, ApiResponse, Paginated, SessionInfo};

use crate::api::{ShippingSubmission, TradeApi};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::feed::ChangeFeedSubscriber;
use crate::view::{MatchSummary, Message, Post, SwipeOutcome, TradeSummary, TradeView};

/// HTTP client for the trade service.
#[derive(Clone)]
pub struct TradeClient {
    http: Client,
    /// No overall timeout, for the long-lived change feed.
    stream_http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct SwipeBody {
    post_id: Uuid,
    is_like: bool,
}

#[derive(Serialize)]
struct ProposeBody {
    post_id: Option<Uuid>,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    content: &'a str,
}

impl TradeClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let stream_http = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            stream_http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode(status, &body)
    }

    pub async fn session(&self) -> Result<SessionInfo, ClientError> {
        self.send(self.request(Method::GET, "/session")).await
    }

    /// Partner posts not swiped yet, newest first.
    pub async fn swipe_deck(&self, page: u64, per_page: u64) -> Result<Paginated<Post>, ClientError> {
        let req = self
            .request(Method::GET, "/posts/deck")
            .query(&[("page", page), ("per_page", per_page)]);
        self.send(req).await
    }

    pub async fn record_swipe(&self, post_id: Uuid, is_like: bool) -> Result<SwipeOutcome, ClientError> {
        let req = self.request(Method::POST, "/swipes").json(&SwipeBody { post_id, is_like });
        self.send(req).await
    }

    pub async fn list_matches(&self) -> Result<Vec<MatchSummary>, ClientError> {
        self.send(self.request(Method::GET, "/matches")).await
    }

    /// View of the caller's most recent match, if any.
    pub async fn current_view(&self) -> Result<Option<TradeView>, ClientError> {
        self.send(self.request(Method::GET, "/matches/current")).await
    }

    pub async fn list_messages(
        &self,
        match_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<Paginated<Message>, ClientError> {
        let req = self
            .request(Method::GET, &format!("/matches/{match_id}/messages"))
            .query(&[("page", page), ("per_page", per_page)]);
        self.send(req).await
    }

    pub async fn trade_history(&self) -> Result<Vec<TradeSummary>, ClientError> {
        self.send(self.request(Method::GET, "/trades")).await
    }

    /// Open the change feed for one match.
    pub async fn subscribe(&self, match_id: Uuid) -> Result<ChangeFeedSubscriber, ClientError> {
        let mut req = self
            .stream_http
            .get(format!("{}/matches/{match_id}/feed", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(api_error(status, &body));
        }

        Ok(ChangeFeedSubscriber::new(response.bytes_stream()))
    }
}

impl TradeApi for TradeClient {
    async fn view(&self, match_id: Uuid) -> Result<TradeView, ClientError> {
        self.send(self.request(Method::GET, &format!("/matches/{match_id}"))).await
    }

    async fn propose(&self, match_id: Uuid, post_id: Uuid) -> Result<TradeView, ClientError> {
        let req = self
            .request(Method::POST, &format!("/matches/{match_id}/proposal"))
            .json(&ProposeBody { post_id: Some(post_id) });
        self.send(req).await
    }

    async fn confirm_trade(&self, match_id: Uuid) -> Result<TradeView, ClientError> {
        self.send(self.request(Method::POST, &format!("/matches/{match_id}/trade"))).await
    }

    async fn accept(&self, trade_id: Uuid) -> Result<TradeView, ClientError> {
        self.send(self.request(Method::POST, &format!("/trades/{trade_id}/accept"))).await
    }

    async fn submit_shipping(&self, trade_id: Uuid, form: ShippingSubmission) -> Result<TradeView, ClientError> {
        let req = self
            .request(Method::POST, &format!("/trades/{trade_id}/shipping"))
            .multipart(shipping_form(form)?);
        self.send(req).await
    }

    async fn confirm_receipt(&self, trade_id: Uuid) -> Result<TradeView, ClientError> {
        self.send(self.request(Method::POST, &format!("/trades/{trade_id}/receipt"))).await
    }

    async fn send_message(&self, match_id: Uuid, content: String) -> Result<TradeView, ClientError> {
        let req = self
            .request(Method::POST, &format!("/matches/{match_id}/messages"))
            .json(&MessageBody { content: &content });
        self.send(req).await
    }
}

fn shipping_form(form: ShippingSubmission) -> Result<Form, ClientError> {
    let mut multipart = Form::new()
        .text("courier", form.courier)
        .text("tracking", form.tracking);

    if let Some(message) = form.message {
        multipart = multipart.text("message", message);
    }

    if let Some(image) = form.image {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        multipart = multipart.part("image", part);
    }

    Ok(multipart)
}

/// Unwrap the success envelope, or turn the error envelope into
/// [`ClientError::Api`].
pub(crate) fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ClientError> {
    if status.is_success() {
        let envelope: ApiResponse<T> =
            serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        return Ok(envelope.data);
    }
    Err(api_error(status, body))
}

fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(err) => ClientError::Api {
            status: status.as_u16(),
            code: err.error.code,
            message: err.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: String::new(),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
