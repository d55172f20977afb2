// src/backend/types.rs — Request and response bodies of the backend REST surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::catalog::Plan;
use crate::feed::{Platform, VideoItem};
use crate::payment::BillingCycle;
use crate::session::SubscriptionTier;
use crate::util::timestamp;

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

/// Query of `GET videos`. `platform = None` means all platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    pub platform: Option<Platform>,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoPage {
    #[serde(default)]
    pub videos: Vec<VideoItem>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub has_ads: bool,
    #[serde(default)]
    pub user_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlansResponse {
    #[serde(default)]
    pub plans: Vec<Plan>,
}

/// Body shared by the redirect checkout session and the inline create-order call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub subscription_tier: SubscriptionTier,
    pub billing_cycle: BillingCycle,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSessionResponse {
    #[serde(default, alias = "checkout_url")]
    pub url: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InlineConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default = "default_disabled_funding")]
    pub disable_funding: String,
}

fn default_currency() -> String {
    "USD".into()
}

fn default_disabled_funding() -> String {
    "credit,card".into()
}

impl InlineConfig {
    /// Client id, if one that can actually be used was configured.
    pub fn usable_client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != "None")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineOrder {
    pub order_id: String,
    #[serde(default)]
    pub approval_url: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureResponse {
    pub status: String,
    #[serde(default)]
    pub capture_id: Option<String>,
    #[serde(default, deserialize_with = "amount_from_string_or_number")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl CaptureResponse {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }
}

/// Provider amounts arrive as decimal strings ("95.88") or plain numbers.
fn amount_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageAnalytics {
    #[serde(default)]
    pub total_api_calls: u64,
    #[serde(default)]
    pub usage_by_day: BTreeMap<String, u64>,
    #[serde(default)]
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<String>,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub subscription_tier: Option<SubscriptionTier>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Email,
    Telegram,
    Whatsapp,
}

/// Daily digest opt-in (`POST subscribe`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationOptIn {
    pub delivery_methods: Vec<DeliveryMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
}

impl NotificationOptIn {
    /// Build an opt-in from whichever contacts were given; each given contact
    /// enables its delivery method.
    pub fn from_contacts(
        email: Option<String>,
        telegram_id: Option<String>,
        whatsapp_number: Option<String>,
    ) -> Result<Self, String> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let opt_in = Self {
            delivery_methods: Vec::new(),
            email: clean(email),
            telegram_id: clean(telegram_id),
            whatsapp_number: clean(whatsapp_number),
        };
        let mut methods = Vec::new();
        if opt_in.email.is_some() {
            methods.push(DeliveryMethod::Email);
        }
        if opt_in.telegram_id.is_some() {
            methods.push(DeliveryMethod::Telegram);
        }
        if opt_in.whatsapp_number.is_some() {
            methods.push(DeliveryMethod::Whatsapp);
        }
        if methods.is_empty() {
            return Err("Please select at least one delivery method".into());
        }
        Ok(Self {
            delivery_methods: methods,
            ..opt_in
        })
    }
}
