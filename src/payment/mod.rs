// src/payment/mod.rs — Checkout intents and normalized payment outcomes
//
// Two providers with different shapes sit behind one orchestrator:
// a redirect (card) checkout that hands control to a hosted page, and an
// inline (wallet) checkout driven by create/approve/cancel/error callbacks.
// Both end in a `PaymentOutcome`; nothing downstream branches on provider.

pub mod inline;
pub mod orchestrator;
pub mod redirect;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::Plan;

pub use inline::OrderCreation;
pub use orchestrator::PaymentOrchestrator;
pub use redirect::RedirectResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    pub fn period(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "month",
            BillingCycle::Yearly => "year",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(BillingCycle::Monthly),
            "yearly" | "year" | "annual" => Ok(BillingCycle::Yearly),
            other => Err(format!("unknown billing cycle '{other}' (expected monthly or yearly)")),
        }
    }
}

/// Which provider the visitor pays with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Redirect-based card checkout.
    Card,
    /// Inline wallet approval.
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Credit card (Stripe)",
            PaymentMethod::Wallet => "PayPal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "card" | "stripe" => Ok(PaymentMethod::Card),
            "wallet" | "paypal" => Ok(PaymentMethod::Wallet),
            other => Err(format!("unknown payment method '{other}' (expected card or wallet)")),
        }
    }
}

/// The one checkout in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutIntent {
    pub id: Uuid,
    pub plan: Plan,
    pub billing_cycle: BillingCycle,
    pub payment_method: Option<PaymentMethod>,
    pub email: Option<String>,
}

impl CheckoutIntent {
    pub fn new(plan: Plan, billing_cycle: BillingCycle, email: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan,
            billing_cycle,
            payment_method: None,
            email: email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
        }
    }

    pub fn price(&self) -> f64 {
        self.plan.price(self.billing_cycle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentResult {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub result: PaymentResult,
    pub provider: PaymentMethod,
    pub order_id: Option<String>,
    pub capture_id: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub message: Option<String>,
}

impl PaymentOutcome {
    pub fn failed(provider: PaymentMethod, message: impl Into<String>) -> Self {
        Self {
            result: PaymentResult::Failed,
            provider,
            order_id: None,
            capture_id: None,
            amount: None,
            currency: None,
            message: Some(message.into()),
        }
    }

    pub fn cancelled(provider: PaymentMethod) -> Self {
        Self {
            result: PaymentResult::Cancelled,
            message: Some(CANCELLED.into()),
            ..Self::failed(provider, "")
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == PaymentResult::Succeeded
    }
}

pub(crate) const CANCELLED: &str = "Payment was cancelled";
pub(crate) const REDIRECT_FAILED: &str = "Failed to initiate payment. Please try again.";
pub(crate) const ORDER_FAILED: &str = "Failed to create PayPal payment";
pub(crate) const NOT_COMPLETED: &str = "Payment was not completed";
pub(crate) const CAPTURE_FAILED: &str = "Failed to complete PayPal payment";
pub(crate) const PROVIDER_FAILED: &str = "PayPal payment failed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    PlanChosen,
    MethodChosen,
    AwaitingProvider,
    /// An approved inline order is being captured.
    Capturing,
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckoutPhase::Idle => "idle",
            CheckoutPhase::PlanChosen => "plan chosen",
            CheckoutPhase::MethodChosen => "method chosen",
            CheckoutPhase::AwaitingProvider => "awaiting provider",
            CheckoutPhase::Capturing => "capturing",
        };
        f.write_str(s)
    }
}

/// A checkout call made in a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckoutError {
    #[error("The free plan does not need a checkout")]
    FreePlan,

    #[error("A checkout is already in progress ({0})")]
    Busy(CheckoutPhase),

    #[error("No checkout in progress")]
    NoIntent,

    #[error("Checkout is {actual}, expected {expected}")]
    WrongPhase {
        expected: CheckoutPhase,
        actual: CheckoutPhase,
    },

    #[error("Please enter your email address")]
    EmailRequired,

    #[error("PayPal payments are not available")]
    InlineUnavailable,

    #[error("This step belongs to the {0} checkout")]
    WrongMethod(PaymentMethod),

    #[error("Checkout was dismissed before the provider answered")]
    Dismissed,
}
