// src/backend/mod.rs — Viral Daily backend client layer

pub mod http;
pub mod retry;
pub mod types;

use async_trait::async_trait;

use crate::catalog::Plan;
use crate::infra::errors::ViralDailyError;
use crate::session::Session;

pub use http::HttpBackend;
pub use retry::{RetryBackend, RetryConfig};
pub use types::*;

/// Every backend call the client makes. Bearer credentials are passed per
/// call; `None` means the call goes out anonymously.
#[async_trait]
pub trait Backend: Send + Sync {
    fn id(&self) -> &str;

    async fn register(&self, email: &str) -> Result<Session, ViralDailyError>;

    async fn current_user(&self, api_key: &str) -> Result<Session, ViralDailyError>;

    async fn user_analytics(&self, api_key: &str) -> Result<UsageAnalytics, ViralDailyError>;

    async fn videos(
        &self,
        query: &VideoQuery,
        api_key: Option<&str>,
    ) -> Result<VideoPage, ViralDailyError>;

    async fn subscribe(&self, opt_in: &NotificationOptIn) -> Result<(), ViralDailyError>;

    async fn plans(&self) -> Result<Vec<Plan>, ViralDailyError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<CheckoutSessionResponse, ViralDailyError>;

    async fn inline_config(&self) -> Result<InlineConfig, ViralDailyError>;

    async fn create_inline_order(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<InlineOrder, ViralDailyError>;

    async fn capture_inline_order(&self, order_id: &str)
        -> Result<CaptureResponse, ViralDailyError>;

    async fn transactions(&self, api_key: &str) -> Result<Vec<Transaction>, ViralDailyError>;
}
