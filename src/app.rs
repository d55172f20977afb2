// src/app.rs — Application controller
//
// Composes session, catalog, feed and checkout; owns which screen is active
// and routes visitor intents. Backend faults arrive here already converted
// into typed outcomes and notices.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::backend::{Backend, NotificationOptIn, Transaction, UsageAnalytics};
use crate::catalog::{self, PlanCatalog, PlanListing};
use crate::feed::{
    AutoRefresh, FeedFetch, FeedState, FeedSynchronizer, PlatformFilter, RefreshKey, RefreshTick,
};
use crate::infra::config::FeedConfig;
use crate::infra::errors::ViralDailyError;
use crate::payment::{
    BillingCycle, CheckoutError, CheckoutIntent, OrderCreation, PaymentMethod,
    PaymentOrchestrator, PaymentOutcome, PaymentResult, RedirectResult,
};
use crate::session::{
    RestoreOutcome, Session, SessionManager, SessionStore, SubscriptionTier, VerifyOutcome,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Feed,
    Pricing,
    Checkout,
    Dashboard,
}

/// One-line message for the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(t) | Notice::Success(t) | Notice::Error(t) => t,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// Result of picking a plan on the pricing screen.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanPick {
    /// Anonymous visitor signed up on the free plan.
    Registered(Session),
    /// Paid plan: checkout is open (registration done first if needed).
    CheckoutOpened(CheckoutIntent),
    /// Nothing happened; tell the visitor why.
    Declined(Notice),
}

#[derive(Debug, Clone)]
pub struct StartReport {
    pub restore: RestoreOutcome,
    pub verify: Option<VerifyOutcome>,
    pub feed: FeedFetch,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub session: Session,
    /// `None` when the tier does not include analytics or the call failed.
    pub analytics: Option<UsageAnalytics>,
    pub transactions: Vec<Transaction>,
}

pub struct App {
    backend: Arc<dyn Backend>,
    pub session: SessionManager,
    pub catalog: PlanCatalog,
    pub feed: FeedSynchronizer,
    pub checkout: PaymentOrchestrator,
    refresh: Mutex<AutoRefresh>,
    ticks: tokio::sync::Mutex<mpsc::Receiver<RefreshTick>>,
    screen: Mutex<Screen>,
    notice: Mutex<Option<Notice>>,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn SessionStore>, feed: FeedConfig) -> Self {
        let (refresh, ticks) = AutoRefresh::new(feed.refresh_interval());
        Self {
            session: SessionManager::new(backend.clone(), store),
            catalog: PlanCatalog::new(backend.clone()),
            feed: FeedSynchronizer::new(backend.clone(), feed),
            checkout: PaymentOrchestrator::new(backend.clone()),
            backend,
            refresh: Mutex::new(refresh),
            ticks: tokio::sync::Mutex::new(ticks),
            screen: Mutex::new(Screen::Feed),
            notice: Mutex::new(None),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn feed_state(&self) -> FeedState {
        self.feed.snapshot()
    }

    /// Last notice, cleared on read.
    pub fn take_notice(&self) -> Option<Notice> {
        self.notice.lock().ok().and_then(|mut n| n.take())
    }

    pub fn refresh_armed(&self) -> bool {
        self.refresh.lock().map(|r| r.is_armed()).unwrap_or(false)
    }

    /// Restore + verify the session while the first feed page loads.
    pub async fn start(&self) -> StartReport {
        let restore = self.session.restore();
        let filter = self.feed.filter();

        let verify = async {
            match &restore {
                RestoreOutcome::Restored(session) => Some(self.session.verify(session).await),
                _ => None,
            }
        };
        let (verify, feed) = tokio::join!(verify, self.load_feed(filter));
        self.rearm();
        tracing::info!(signed_in = self.session.is_signed_in(), "started");
        StartReport {
            restore,
            verify,
            feed,
        }
    }

    pub async fn select_platform(&self, filter: PlatformFilter) -> FeedFetch {
        let outcome = self.load_feed(filter).await;
        self.rearm();
        outcome
    }

    pub async fn refresh(&self) -> FeedFetch {
        self.select_platform(self.feed.filter()).await
    }

    pub async fn open_pricing(&self) -> PlanListing {
        self.set_screen(Screen::Pricing);
        self.catalog.list_plans().await
    }

    pub fn close_pricing(&self) {
        if self.screen() == Screen::Pricing {
            self.set_screen(Screen::Feed);
        }
    }

    pub async fn pick_plan(
        &self,
        tier: SubscriptionTier,
        cycle: BillingCycle,
        email: Option<&str>,
    ) -> PlanPick {
        let current = self.session.current();

        // Any signed-in visitor already has free access.
        if catalog::is_current_plan(tier, current.as_ref())
            || (current.is_some() && !tier.is_paid())
        {
            return self.decline(Notice::Info(format!("You are already on the {tier} plan!")));
        }
        if !catalog::is_upgrade(tier, current.as_ref()) {
            return self.decline(Notice::Info(format!(
                "The {tier} plan is below your current plan."
            )));
        }

        let plan = if tier.is_paid() {
            match self.plan_for(tier).await {
                Some(plan) => Some(plan),
                None => {
                    return self.decline(Notice::Error(format!(
                        "The {tier} plan is not available right now."
                    )))
                }
            }
        } else {
            None
        };

        let email = match current {
            Some(session) => session.email,
            None => {
                let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
                    return self.decline(Notice::Error(CheckoutError::EmailRequired.to_string()));
                };
                match self.session.register(email).await {
                    Ok(session) => {
                        self.on_session_changed().await;
                        if !tier.is_paid() {
                            self.set_notice(Notice::Success(
                                "Successfully signed up for the free plan!".into(),
                            ));
                            self.set_screen(Screen::Feed);
                            return PlanPick::Registered(session);
                        }
                        session.email
                    }
                    Err(e) => {
                        tracing::warn!("{}", e);
                        let text = if tier.is_paid() {
                            "Failed to create account. Please try again."
                        } else {
                            "Failed to sign up. Please try again."
                        };
                        return self.decline(Notice::Error(text.into()));
                    }
                }
            }
        };

        // Signed-in visitors never reach here with the free tier: it is
        // either their current plan or below it.
        let Some(plan) = plan else {
            return self.decline(Notice::Info(format!("You are already on the {tier} plan!")));
        };
        match self.checkout.choose_plan(plan, cycle, Some(email)) {
            Ok(intent) => {
                self.set_screen(Screen::Checkout);
                PlanPick::CheckoutOpened(intent)
            }
            Err(e) => self.decline(Notice::Error(e.to_string())),
        }
    }

    pub async fn choose_payment_method(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.checkout.choose_method(method).await
    }

    /// Whether the inline wallet option can be offered.
    pub async fn inline_available(&self) -> bool {
        self.checkout.inline_available().await
    }

    /// Card path: create the hosted session and return where to send the visitor.
    pub async fn start_redirect_checkout(&self) -> Result<RedirectResult, CheckoutError> {
        let credential = self.session.credential();
        let result = self.checkout.start_redirect(credential.as_deref()).await?;
        match &result {
            RedirectResult::Navigate { .. } => self.set_screen(Screen::Feed),
            RedirectResult::Failed(outcome) => self.finish_checkout(outcome).await,
        }
        Ok(result)
    }

    pub async fn inline_create_order(&self) -> Result<OrderCreation, CheckoutError> {
        let credential = self.session.credential();
        let result = self.checkout.create_order(credential.as_deref()).await?;
        if let OrderCreation::Failed(outcome) = &result {
            self.finish_checkout(outcome).await;
        }
        Ok(result)
    }

    pub async fn inline_approve(&self, order_id: &str) -> Result<PaymentOutcome, CheckoutError> {
        let outcome = self.checkout.approve(order_id).await?;
        self.finish_checkout(&outcome).await;
        Ok(outcome)
    }

    pub async fn inline_cancel(&self) -> Result<PaymentOutcome, CheckoutError> {
        let outcome = self.checkout.cancel()?;
        self.finish_checkout(&outcome).await;
        Ok(outcome)
    }

    pub async fn inline_provider_error(&self, detail: &str) -> Result<PaymentOutcome, CheckoutError> {
        let outcome = self.checkout.provider_error(detail)?;
        self.finish_checkout(&outcome).await;
        Ok(outcome)
    }

    /// Visitor closed the checkout modal.
    pub async fn dismiss_checkout(&self) -> Option<PaymentOutcome> {
        let outcome = self.checkout.dismiss();
        if let Some(outcome) = &outcome {
            self.finish_checkout(outcome).await;
        } else if self.screen() == Screen::Checkout {
            self.set_screen(Screen::Feed);
        }
        outcome
    }

    pub async fn logout(&self) {
        self.checkout.dismiss();
        self.session.logout();
        self.set_screen(Screen::Feed);
        self.on_session_changed().await;
    }

    pub async fn open_dashboard(&self) -> Result<Dashboard, ViralDailyError> {
        let session = self.session.current().ok_or(ViralDailyError::NoSession)?;
        let key = session.credential().ok_or(ViralDailyError::NoSession)?.to_string();

        let (analytics, transactions) = tokio::join!(
            self.backend.user_analytics(&key),
            self.backend.transactions(&key)
        );
        if [analytics.as_ref().err(), transactions.as_ref().err()]
            .into_iter()
            .flatten()
            .any(ViralDailyError::is_unauthorized)
        {
            self.session.reject_credential(&key);
            self.on_session_changed().await;
            return Err(ViralDailyError::NoSession);
        }

        let analytics = analytics
            .map_err(|e| tracing::debug!("analytics unavailable: {}", e))
            .ok();
        let transactions = transactions.unwrap_or_else(|e| {
            tracing::warn!("Could not load transactions: {}", e);
            Vec::new()
        });
        self.set_screen(Screen::Dashboard);
        Ok(Dashboard {
            session,
            analytics,
            transactions,
        })
    }

    pub fn close_dashboard(&self) {
        if self.screen() == Screen::Dashboard {
            self.set_screen(Screen::Feed);
        }
    }

    pub async fn subscribe_notifications(&self, opt_in: &NotificationOptIn) -> Notice {
        let notice = match self.backend.subscribe(opt_in).await {
            Ok(()) => Notice::Success("Successfully subscribed to daily viral videos!".into()),
            Err(e) => {
                tracing::warn!("Notification opt-in failed: {}", e);
                Notice::Error("Failed to subscribe. Please try again.".into())
            }
        };
        self.set_notice(notice.clone());
        notice
    }

    /// Wait for the next auto-refresh tick and re-fetch. `None` once the
    /// timer channel is closed.
    pub async fn next_refresh(&self) -> Option<FeedFetch> {
        let mut ticks = self.ticks.lock().await;
        loop {
            let tick = ticks.recv().await?;
            if Some(&tick.key) != self.refresh_key().as_ref() {
                tracing::debug!(seq = tick.seq, "dropping tick from a previous timer");
                continue;
            }
            drop(ticks);
            tracing::debug!(seq = tick.seq, "auto-refresh");
            return Some(self.refresh().await);
        }
    }

    /// Drive auto-refresh until `shutdown` resolves.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                refreshed = self.next_refresh() => {
                    if refreshed.is_none() {
                        break;
                    }
                }
            }
        }
        self.shutdown();
    }

    pub fn shutdown(&self) {
        if let Ok(mut refresh) = self.refresh.lock() {
            refresh.cancel();
        }
    }

    // -- internals --

    /// Fetch with the current credential; on rejection demote and retry anonymously.
    async fn load_feed(&self, filter: PlatformFilter) -> FeedFetch {
        let credential = self.session.credential();
        let outcome = self.feed.fetch(filter, credential.as_deref()).await;
        if outcome != FeedFetch::Unauthorized {
            return outcome;
        }
        if let Some(key) = credential {
            self.session.reject_credential(&key);
        }
        self.feed.fetch(filter, None).await
    }

    async fn on_session_changed(&self) {
        let filter = self.feed.filter();
        self.load_feed(filter).await;
        self.rearm();
    }

    async fn finish_checkout(&self, outcome: &PaymentOutcome) {
        self.set_screen(Screen::Feed);
        match outcome.result {
            PaymentResult::Succeeded => {
                self.set_notice(Notice::Success(
                    "Payment successful! Your subscription has been upgraded.".into(),
                ));
                self.session.reverify().await;
                self.on_session_changed().await;
            }
            PaymentResult::Failed => {
                if let Some(message) = &outcome.message {
                    self.set_notice(Notice::Error(message.clone()));
                }
            }
            PaymentResult::Cancelled => {}
        }
    }

    async fn plan_for(&self, tier: SubscriptionTier) -> Option<catalog::Plan> {
        if let Some(plan) = self.catalog.find(tier) {
            return Some(plan);
        }
        self.catalog
            .list_plans()
            .await
            .plans()
            .iter()
            .find(|p| p.tier == tier)
            .cloned()
    }

    fn refresh_key(&self) -> Option<RefreshKey> {
        self.refresh.lock().ok().and_then(|r| r.key().cloned())
    }

    fn rearm(&self) {
        let key = RefreshKey {
            filter: self.feed.filter(),
            identity: self.session.current().map(|s| s.email),
        };
        if let Ok(mut refresh) = self.refresh.lock() {
            refresh.arm(key);
        }
    }

    fn decline(&self, notice: Notice) -> PlanPick {
        self.set_notice(notice.clone());
        PlanPick::Declined(notice)
    }

    fn set_screen(&self, screen: Screen) {
        if let Ok(mut s) = self.screen.lock() {
            *s = screen;
        }
    }

    fn set_notice(&self, notice: Notice) {
        if let Ok(mut n) = self.notice.lock() {
            *n = Some(notice);
        }
    }
}
