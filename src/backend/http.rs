// src/backend/http.rs — reqwest implementation of the backend REST surface

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::types::*;
use super::Backend;
use crate::catalog::Plan;
use crate::infra::config::BackendConfig;
use crate::infra::errors::ViralDailyError;
use crate::session::Session;
use crate::util::truncate_str;

const REGISTER: &str = "users/register";
const CURRENT_USER: &str = "users/me";
const USER_ANALYTICS: &str = "users/me/analytics";
const VIDEOS: &str = "videos";
const SUBSCRIBE: &str = "subscribe";
const PLANS: &str = "subscription/plans";
const CHECKOUT_SESSION: &str = "payments/v1/checkout/session";
const TRANSACTIONS: &str = "payments/v1/transactions/me";
const INLINE_CONFIG: &str = "payments/paypal/config";
const INLINE_CREATE_ORDER: &str = "payments/paypal/create-order";
const INLINE_CAPTURE_ORDER: &str = "payments/paypal/capture-order";

pub struct HttpBackend {
    api_base: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, ViralDailyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("viral-daily/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ViralDailyError::Config(format!("HTTP client: {e}")))?;
        Self::with_client(&config.base_url, client)
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, ViralDailyError> {
        let mut api_base = Url::parse(base_url.trim())
            .map_err(|e| ViralDailyError::Config(format!("invalid backend URL '{base_url}': {e}")))?;
        api_base
            .path_segments_mut()
            .map_err(|_| ViralDailyError::Config(format!("backend URL '{base_url}' cannot be a base")))?
            .pop_if_empty()
            .push("api");
        Ok(Self { api_base, client })
    }

    fn url(&self, endpoint: &str, extra: Option<&str>) -> Result<Url, ViralDailyError> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ViralDailyError::Config(format!("backend URL '{}' cannot be a base", self.api_base))
            })?;
            segments.extend(endpoint.split('/'));
            if let Some(extra) = extra {
                segments.push(extra);
            }
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ViralDailyError> {
        tracing::debug!(endpoint, "backend request");

        let response = request.send().await.map_err(|e| ViralDailyError::Backend {
            endpoint: endpoint.into(),
            message: e.to_string(),
            retriable: e.is_timeout() || e.is_connect(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(endpoint, status, retry_after, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ViralDailyError::InvalidResponse {
                endpoint: endpoint.into(),
                message: e.to_string(),
            })
    }
}

fn with_bearer(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

/// Map a non-success status to the error taxonomy. FastAPI puts the reason
/// in `{"detail": ...}`.
pub(crate) fn status_error(
    endpoint: &str,
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
) -> ViralDailyError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["detail"].as_str().map(str::to_string))
        .unwrap_or_else(|| truncate_str(body.trim(), 200).to_string());

    match status {
        StatusCode::UNAUTHORIZED => ViralDailyError::Unauthorized {
            endpoint: endpoint.into(),
        },
        StatusCode::FORBIDDEN => ViralDailyError::Forbidden {
            endpoint: endpoint.into(),
            message: detail,
        },
        StatusCode::TOO_MANY_REQUESTS => ViralDailyError::RateLimited {
            endpoint: endpoint.into(),
            retry_after_ms: retry_after_secs.unwrap_or(0).saturating_mul(1000),
        },
        s => ViralDailyError::Backend {
            endpoint: endpoint.into(),
            message: if detail.is_empty() {
                format!("HTTP {}", s.as_u16())
            } else {
                format!("HTTP {}: {}", s.as_u16(), detail)
            },
            retriable: s.is_server_error() || s == StatusCode::REQUEST_TIMEOUT,
        },
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn id(&self) -> &str {
        "http"
    }

    async fn register(&self, email: &str) -> Result<Session, ViralDailyError> {
        let body = RegisterRequest { email, name: None };
        let request = self.client.post(self.url(REGISTER, None)?).json(&body);
        self.send(REGISTER, request).await
    }

    async fn current_user(&self, api_key: &str) -> Result<Session, ViralDailyError> {
        let request = self.client.get(self.url(CURRENT_USER, None)?).bearer_auth(api_key);
        self.send(CURRENT_USER, request).await
    }

    async fn user_analytics(&self, api_key: &str) -> Result<UsageAnalytics, ViralDailyError> {
        let request = self
            .client
            .get(self.url(USER_ANALYTICS, None)?)
            .bearer_auth(api_key);
        self.send(USER_ANALYTICS, request).await
    }

    async fn videos(
        &self,
        query: &VideoQuery,
        api_key: Option<&str>,
    ) -> Result<VideoPage, ViralDailyError> {
        let mut params = vec![("limit", query.limit.to_string())];
        if let Some(platform) = query.platform {
            params.insert(0, ("platform", platform.as_str().to_string()));
        }
        let request = with_bearer(
            self.client.get(self.url(VIDEOS, None)?).query(&params),
            api_key,
        );
        self.send(VIDEOS, request).await
    }

    async fn subscribe(&self, opt_in: &NotificationOptIn) -> Result<(), ViralDailyError> {
        let request = self.client.post(self.url(SUBSCRIBE, None)?).json(opt_in);
        let _: serde_json::Value = self.send(SUBSCRIBE, request).await?;
        Ok(())
    }

    async fn plans(&self) -> Result<Vec<Plan>, ViralDailyError> {
        let request = self.client.get(self.url(PLANS, None)?);
        let response: PlansResponse = self.send(PLANS, request).await?;
        Ok(response.plans)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<CheckoutSessionResponse, ViralDailyError> {
        let http = with_bearer(
            self.client.post(self.url(CHECKOUT_SESSION, None)?).json(request),
            api_key,
        );
        self.send(CHECKOUT_SESSION, http).await
    }

    async fn inline_config(&self) -> Result<InlineConfig, ViralDailyError> {
        let request = self.client.get(self.url(INLINE_CONFIG, None)?);
        self.send(INLINE_CONFIG, request).await
    }

    async fn create_inline_order(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<InlineOrder, ViralDailyError> {
        let http = with_bearer(
            self.client
                .post(self.url(INLINE_CREATE_ORDER, None)?)
                .json(request),
            api_key,
        );
        self.send(INLINE_CREATE_ORDER, http).await
    }

    async fn capture_inline_order(
        &self,
        order_id: &str,
    ) -> Result<CaptureResponse, ViralDailyError> {
        let request = self
            .client
            .post(self.url(INLINE_CAPTURE_ORDER, Some(order_id))?);
        self.send(INLINE_CAPTURE_ORDER, request).await
    }

    async fn transactions(&self, api_key: &str) -> Result<Vec<Transaction>, ViralDailyError> {
        let request = self
            .client
            .get(self.url(TRANSACTIONS, None)?)
            .bearer_auth(api_key);
        let response: TransactionsResponse = self.send(TRANSACTIONS, request).await?;
        Ok(response.transactions)
    }
}
