// tests/common/mod.rs — Programmable in-memory backend shared by integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use viral_daily::backend::*;
use viral_daily::catalog::Plan;
use viral_daily::feed::{Platform, VideoItem};
use viral_daily::infra::errors::ViralDailyError;
use viral_daily::session::{Session, SubscriptionTier};

/// Canned failure for a mocked call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fail {
    Unauthorized,
    Forbidden,
    Server,
    Unreachable,
}

impl Fail {
    fn error(self, endpoint: &str) -> ViralDailyError {
        match self {
            Fail::Unauthorized => ViralDailyError::Unauthorized {
                endpoint: endpoint.into(),
            },
            Fail::Forbidden => ViralDailyError::Forbidden {
                endpoint: endpoint.into(),
                message: "Pro or Business subscription required".into(),
            },
            Fail::Server => ViralDailyError::Backend {
                endpoint: endpoint.into(),
                message: "HTTP 500: Internal Server Error".into(),
                retriable: true,
            },
            Fail::Unreachable => ViralDailyError::Backend {
                endpoint: endpoint.into(),
                message: "connection refused".into(),
                retriable: true,
            },
        }
    }
}

/// Every call the mock received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Register(String),
    CurrentUser(String),
    Analytics(String),
    Videos {
        platform: Option<Platform>,
        limit: u32,
        api_key: Option<String>,
    },
    Subscribe(NotificationOptIn),
    Plans,
    CheckoutSession {
        request: CheckoutRequest,
        api_key: Option<String>,
    },
    InlineConfig,
    CreateOrder {
        request: CheckoutRequest,
        api_key: Option<String>,
    },
    Capture(String),
    Transactions(String),
}

pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    /// Bearer credential the backend refuses with 401 wherever one is sent.
    pub rejected_key: Mutex<Option<String>>,
    /// `None` synthesizes a fresh free-tier session for the given email.
    pub register: Mutex<Option<Result<Session, Fail>>>,
    pub current_user: Mutex<Result<Session, Fail>>,
    pub current_user_delay: Mutex<Duration>,
    pub videos: Mutex<HashMap<Option<Platform>, Result<Vec<VideoItem>, Fail>>>,
    pub video_delays: Mutex<HashMap<Option<Platform>, Duration>>,
    pub plans: Mutex<Result<Vec<Plan>, Fail>>,
    pub checkout_session: Mutex<Result<CheckoutSessionResponse, Fail>>,
    pub inline_config: Mutex<Result<InlineConfig, Fail>>,
    pub create_order: Mutex<Result<InlineOrder, Fail>>,
    pub capture: Mutex<Result<CaptureResponse, Fail>>,
    pub capture_delay: Mutex<Duration>,
    pub analytics: Mutex<Result<UsageAnalytics, Fail>>,
    pub transactions: Mutex<Result<Vec<Transaction>, Fail>>,
    pub subscribe: Mutex<Result<(), Fail>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            rejected_key: Mutex::new(None),
            register: Mutex::new(None),
            current_user: Mutex::new(Err(Fail::Unauthorized)),
            current_user_delay: Mutex::new(Duration::ZERO),
            videos: Mutex::new(HashMap::new()),
            video_delays: Mutex::new(HashMap::new()),
            plans: Mutex::new(Ok(standard_plans())),
            checkout_session: Mutex::new(Ok(CheckoutSessionResponse {
                url: Some("https://checkout.stripe.example/c/pay/cs_test_1".into()),
                session_id: Some("cs_test_1".into()),
            })),
            inline_config: Mutex::new(Ok(inline_config("AbC123"))),
            create_order: Mutex::new(Ok(InlineOrder {
                order_id: "O1".into(),
                approval_url: Some("https://www.sandbox.paypal.example/checkoutnow?token=O1".into()),
                order_status: Some("CREATED".into()),
            })),
            capture: Mutex::new(Ok(CaptureResponse {
                status: "COMPLETED".into(),
                capture_id: Some("C1".into()),
                amount: Some(95.88),
                currency: Some("USD".into()),
            })),
            capture_delay: Mutex::new(Duration::ZERO),
            analytics: Mutex::new(Err(Fail::Forbidden)),
            transactions: Mutex::new(Ok(Vec::new())),
            subscribe: Mutex::new(Ok(())),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn video_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Videos { .. }))
            .collect()
    }

    pub fn set<T>(slot: &Mutex<T>, value: T) {
        *slot.lock().unwrap() = value;
    }

    pub fn set_videos(&self, platform: Option<Platform>, reply: Result<Vec<VideoItem>, Fail>) {
        self.videos.lock().unwrap().insert(platform, reply);
    }

    pub fn set_video_delay(&self, platform: Option<Platform>, delay: Duration) {
        self.video_delays.lock().unwrap().insert(platform, delay);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_key(&self, api_key: Option<&str>, endpoint: &str) -> Result<(), ViralDailyError> {
        let rejected = self.rejected_key.lock().unwrap().clone();
        match (api_key, rejected) {
            (Some(key), Some(bad)) if key == bad => Err(Fail::Unauthorized.error(endpoint)),
            _ => Ok(()),
        }
    }

    fn reply<T: Clone>(slot: &Mutex<Result<T, Fail>>, endpoint: &str) -> Result<T, ViralDailyError> {
        slot.lock().unwrap().clone().map_err(|f| f.error(endpoint))
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn id(&self) -> &str {
        "mock"
    }

    async fn register(&self, email: &str) -> Result<Session, ViralDailyError> {
        self.record(Call::Register(email.into()));
        match self.register.lock().unwrap().clone() {
            Some(reply) => reply.map_err(|f| f.error("users/register")),
            None => Ok(session(email, "vd_new_key", SubscriptionTier::Free)),
        }
    }

    async fn current_user(&self, api_key: &str) -> Result<Session, ViralDailyError> {
        self.record(Call::CurrentUser(api_key.into()));
        let delay = *self.current_user_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_key(Some(api_key), "users/me")?;
        Self::reply(&self.current_user, "users/me")
    }

    async fn user_analytics(&self, api_key: &str) -> Result<UsageAnalytics, ViralDailyError> {
        self.record(Call::Analytics(api_key.into()));
        self.check_key(Some(api_key), "users/me/analytics")?;
        Self::reply(&self.analytics, "users/me/analytics")
    }

    async fn videos(
        &self,
        query: &VideoQuery,
        api_key: Option<&str>,
    ) -> Result<VideoPage, ViralDailyError> {
        self.record(Call::Videos {
            platform: query.platform,
            limit: query.limit,
            api_key: api_key.map(str::to_string),
        });
        let delay = self
            .video_delays
            .lock()
            .unwrap()
            .get(&query.platform)
            .copied()
            .unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check_key(api_key, "videos")?;
        let reply = self
            .videos
            .lock()
            .unwrap()
            .get(&query.platform)
            .cloned()
            .unwrap_or_else(|| Ok(videos(query.platform.unwrap_or(Platform::YouTube), 3)));
        reply
            .map(|videos| VideoPage {
                videos,
                total: None,
                has_ads: api_key.is_none(),
                user_tier: None,
            })
            .map_err(|f| f.error("videos"))
    }

    async fn subscribe(&self, opt_in: &NotificationOptIn) -> Result<(), ViralDailyError> {
        self.record(Call::Subscribe(opt_in.clone()));
        Self::reply(&self.subscribe, "subscribe")
    }

    async fn plans(&self) -> Result<Vec<Plan>, ViralDailyError> {
        self.record(Call::Plans);
        Self::reply(&self.plans, "subscription/plans")
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<CheckoutSessionResponse, ViralDailyError> {
        self.record(Call::CheckoutSession {
            request: request.clone(),
            api_key: api_key.map(str::to_string),
        });
        self.check_key(api_key, "payments/v1/checkout/session")?;
        Self::reply(&self.checkout_session, "payments/v1/checkout/session")
    }

    async fn inline_config(&self) -> Result<InlineConfig, ViralDailyError> {
        self.record(Call::InlineConfig);
        Self::reply(&self.inline_config, "payments/paypal/config")
    }

    async fn create_inline_order(
        &self,
        request: &CheckoutRequest,
        api_key: Option<&str>,
    ) -> Result<InlineOrder, ViralDailyError> {
        self.record(Call::CreateOrder {
            request: request.clone(),
            api_key: api_key.map(str::to_string),
        });
        self.check_key(api_key, "payments/paypal/create-order")?;
        Self::reply(&self.create_order, "payments/paypal/create-order")
    }

    async fn capture_inline_order(&self, order_id: &str) -> Result<CaptureResponse, ViralDailyError> {
        self.record(Call::Capture(order_id.into()));
        let delay = *self.capture_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Self::reply(&self.capture, "payments/paypal/capture-order")
    }

    async fn transactions(&self, api_key: &str) -> Result<Vec<Transaction>, ViralDailyError> {
        self.record(Call::Transactions(api_key.into()));
        self.check_key(Some(api_key), "payments/v1/transactions/me")?;
        Self::reply(&self.transactions, "payments/v1/transactions/me")
    }
}

pub fn session(email: &str, api_key: &str, tier: SubscriptionTier) -> Session {
    Session {
        email: email.into(),
        api_key: Some(api_key.into()),
        subscription_tier: tier,
        name: None,
        daily_api_calls: 0,
        max_daily_api_calls: match tier {
            SubscriptionTier::Free => 100,
            SubscriptionTier::Pro => 10_000,
            SubscriptionTier::Business => 100_000,
        },
        created_at: Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap(),
        subscription_expires_at: None,
        is_active: true,
    }
}

pub fn videos(platform: Platform, n: usize) -> Vec<VideoItem> {
    (0..n)
        .map(|i| VideoItem {
            id: Some(format!("{platform}-{i}")),
            platform,
            title: format!("{} viral #{}", platform.label(), i + 1),
            url: format!("https://{platform}.example/v/{i}"),
            author: Some(format!("creator{i}")),
            views: Some(1_000_000 - i as u64 * 1000),
            likes: Some(50_000),
            viral_score: Some(99.0 - i as f64),
            thumbnail: None,
            duration: None,
        })
        .collect()
}

pub fn standard_plans() -> Vec<Plan> {
    vec![
        Plan {
            tier: SubscriptionTier::Free,
            name: "Free Explorer".into(),
            price_monthly: 0.0,
            price_yearly: 0.0,
            savings_percentage: None,
            features: vec!["10 viral videos per day".into(), "Ads included".into()],
        },
        Plan {
            tier: SubscriptionTier::Pro,
            name: "Pro Creator".into(),
            price_monthly: 9.99,
            price_yearly: 99.99,
            savings_percentage: Some(17.0),
            features: vec!["Unlimited viral videos".into(), "No ads".into()],
        },
        Plan {
            tier: SubscriptionTier::Business,
            name: "Business Intelligence".into(),
            price_monthly: 29.99,
            price_yearly: 95.88,
            savings_percentage: Some(73.0),
            features: vec!["Full API access".into(), "Analytics".into()],
        },
    ]
}

pub fn inline_config(client_id: &str) -> InlineConfig {
    InlineConfig {
        client_id: Some(client_id.into()),
        currency: "USD".into(),
        mode: Some("sandbox".into()),
        disable_funding: "credit,card".into(),
    }
}
