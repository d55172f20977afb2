// src/catalog.rs — Subscription plan catalog and upgrade rules

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::payment::BillingCycle;
use crate::session::{Session, SubscriptionTier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub tier: SubscriptionTier,
    pub name: String,
    pub price_monthly: f64,
    pub price_yearly: f64,
    #[serde(default)]
    pub savings_percentage: Option<f64>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Plan {
    pub fn price(&self, cycle: BillingCycle) -> f64 {
        match cycle {
            BillingCycle::Monthly => self.price_monthly,
            BillingCycle::Yearly => self.price_yearly,
        }
    }

    /// Yearly savings in percent; derived from prices when the backend
    /// doesn't send it.
    pub fn savings(&self) -> f64 {
        if let Some(pct) = self.savings_percentage {
            return pct;
        }
        let yearly_at_monthly = self.price_monthly * 12.0;
        if yearly_at_monthly <= 0.0 {
            return 0.0;
        }
        let pct = (yearly_at_monthly - self.price_yearly) / yearly_at_monthly * 100.0;
        (pct * 10.0).round() / 10.0
    }

    /// "$9.99/month", "Free Forever"
    pub fn price_label(&self, cycle: BillingCycle) -> String {
        if self.tier == SubscriptionTier::Free {
            return "Free Forever".into();
        }
        format!("${:.2}/{}", self.price(cycle), cycle.period())
    }

    /// Only shown for paid plans on the yearly cycle.
    pub fn savings_label(&self, cycle: BillingCycle) -> Option<String> {
        let pct = self.savings();
        if cycle != BillingCycle::Yearly || !self.tier.is_paid() || pct <= 0.0 {
            return None;
        }
        Some(format!("Save {pct}%"))
    }
}

/// True iff a session exists and is on `tier`.
pub fn is_current_plan(tier: SubscriptionTier, session: Option<&Session>) -> bool {
    session.is_some_and(|s| s.subscription_tier == tier)
}

/// Anonymous visitors are offered every tier as a new signup; otherwise
/// only tiers strictly above the current one count.
pub fn is_upgrade(tier: SubscriptionTier, session: Option<&Session>) -> bool {
    match session {
        None => true,
        Some(s) => tier > s.subscription_tier,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanListing {
    Available(Vec<Plan>),
    /// The backend answered with no plans; render nothing.
    Empty,
    /// The fetch failed; render nothing, the visitor may reopen the screen.
    Unavailable,
}

impl PlanListing {
    pub fn plans(&self) -> &[Plan] {
        match self {
            PlanListing::Available(plans) => plans,
            _ => &[],
        }
    }
}

pub struct PlanCatalog {
    backend: Arc<dyn Backend>,
    cache: Mutex<Option<Vec<Plan>>>,
}

impl PlanCatalog {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(None),
        }
    }

    /// Fetch a fresh snapshot. Called every time the plan screen opens.
    pub async fn list_plans(&self) -> PlanListing {
        match self.backend.plans().await {
            Ok(plans) if plans.is_empty() => {
                tracing::info!("Backend returned no subscription plans");
                PlanListing::Empty
            }
            Ok(plans) => {
                if let Ok(mut cache) = self.cache.lock() {
                    *cache = Some(plans.clone());
                }
                PlanListing::Available(plans)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch subscription plans: {}", e);
                PlanListing::Unavailable
            }
        }
    }

    /// Last successful snapshot, if any.
    pub fn cached(&self) -> Option<Vec<Plan>> {
        self.cache.lock().ok().and_then(|c| c.clone())
    }

    pub fn find(&self, tier: SubscriptionTier) -> Option<Plan> {
        self.cached()?.into_iter().find(|p| p.tier == tier)
    }
}
