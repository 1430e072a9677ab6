//! Client half of the Swapmeet trade protocol.
//!
//! [`TradeClient`] talks to the trade service over HTTP, [`TradeSession`]
//! keeps one match's [`TradeView`] fresh, and [`ChangeFeedSubscriber`] reads
//! the service's change feed so a session can reload when the partner acts.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod session;
pub mod view;

pub use api::{ProofImage, ShippingSubmission, TradeApi};
pub use client::TradeClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use feed::{ChangeFeedSubscriber, FeedEvent};
pub use session::TradeSession;
pub use view::TradeView;
