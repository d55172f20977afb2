// src/payment/orchestrator.rs — Checkout state machine
//
// Idle -> PlanChosen -> MethodChosen -> AwaitingProvider -> terminal.
// Every terminal outcome (success, failure, cancel, dismissal) clears the
// intent and returns to Idle. The orchestrator never touches the session.

use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{
    BillingCycle, CheckoutError, CheckoutIntent, CheckoutPhase, PaymentMethod, PaymentOutcome,
};
use crate::backend::{Backend, CheckoutRequest, InlineConfig};
use crate::catalog::Plan;

#[derive(Debug, Default)]
pub(super) struct CheckoutState {
    pub(super) phase: CheckoutPhase,
    pub(super) intent: Option<CheckoutIntent>,
    pub(super) order_id: Option<String>,
}

impl CheckoutState {
    pub(super) fn reset(&mut self) -> Option<CheckoutIntent> {
        self.phase = CheckoutPhase::Idle;
        self.order_id = None;
        self.intent.take()
    }
}

pub struct PaymentOrchestrator {
    pub(super) backend: Arc<dyn Backend>,
    inline_config: OnceCell<Option<InlineConfig>>,
    pub(super) state: Mutex<CheckoutState>,
}

impl PaymentOrchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            inline_config: OnceCell::new(),
            state: Mutex::new(CheckoutState::default()),
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.state.lock().map(|s| s.phase).unwrap_or_default()
    }

    pub fn intent(&self) -> Option<CheckoutIntent> {
        self.state.lock().ok().and_then(|s| s.intent.clone())
    }

    /// Open a checkout for a paid plan.
    pub fn choose_plan(
        &self,
        plan: Plan,
        billing_cycle: BillingCycle,
        email: Option<String>,
    ) -> Result<CheckoutIntent, CheckoutError> {
        if !plan.tier.is_paid() {
            return Err(CheckoutError::FreePlan);
        }
        let mut state = self.lock()?;
        if state.phase != CheckoutPhase::Idle {
            return Err(CheckoutError::Busy(state.phase));
        }
        let intent = CheckoutIntent::new(plan, billing_cycle, email);
        tracing::info!(
            intent_id = %intent.id,
            tier = %intent.plan.tier,
            cycle = %billing_cycle,
            "checkout opened"
        );
        state.intent = Some(intent.clone());
        state.phase = CheckoutPhase::PlanChosen;
        Ok(intent)
    }

    /// Fill in the email once registration has produced one.
    pub fn attach_email(&self, email: &str) -> Result<(), CheckoutError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(CheckoutError::EmailRequired);
        }
        let mut state = self.lock()?;
        expect_phase(&state, &[CheckoutPhase::PlanChosen, CheckoutPhase::MethodChosen])?;
        if let Some(intent) = state.intent.as_mut() {
            intent.email = Some(email.to_string());
        }
        Ok(())
    }

    /// Pick the provider. Switching between providers is allowed until one
    /// of them has been engaged.
    pub async fn choose_method(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        {
            let state = self.lock()?;
            expect_phase(&state, &[CheckoutPhase::PlanChosen, CheckoutPhase::MethodChosen])?;
            if state.intent.as_ref().and_then(|i| i.email.as_ref()).is_none() {
                return Err(CheckoutError::EmailRequired);
            }
        }

        if method == PaymentMethod::Wallet && !self.inline_available().await {
            return Err(CheckoutError::InlineUnavailable);
        }

        let mut state = self.lock()?;
        // Re-check: the intent may have been dismissed while the config loaded.
        expect_phase(&state, &[CheckoutPhase::PlanChosen, CheckoutPhase::MethodChosen])?;
        if let Some(intent) = state.intent.as_mut() {
            intent.payment_method = Some(method);
            tracing::info!(intent_id = %intent.id, %method, "payment method chosen");
        }
        state.phase = CheckoutPhase::MethodChosen;
        Ok(())
    }

    /// Inline provider configuration, fetched once on first use. `None` when
    /// the fetch failed or no usable client id is configured.
    pub async fn inline_config(&self) -> Option<&InlineConfig> {
        self.inline_config
            .get_or_init(|| async {
                match self.backend.inline_config().await {
                    Ok(config) if config.usable_client_id().is_some() => Some(config),
                    Ok(_) => {
                        tracing::info!("Inline payments disabled: no client id configured");
                        None
                    }
                    Err(e) => {
                        tracing::warn!("Inline payment config unavailable: {}", e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }

    pub async fn inline_available(&self) -> bool {
        self.inline_config().await.is_some()
    }

    /// Visitor closed the checkout before a terminal state.
    pub fn dismiss(&self) -> Option<PaymentOutcome> {
        let mut state = self.state.lock().ok()?;
        let intent = state.reset()?;
        tracing::info!(intent_id = %intent.id, "checkout dismissed");
        let provider = intent.payment_method.unwrap_or(PaymentMethod::Card);
        Some(PaymentOutcome::cancelled(provider))
    }

    pub(super) fn lock(&self) -> Result<std::sync::MutexGuard<'_, CheckoutState>, CheckoutError> {
        self.state.lock().map_err(|_| CheckoutError::NoIntent)
    }

    /// Move a dispatched intent to AwaitingProvider and build its request.
    pub(super) fn dispatch(
        &self,
        method: PaymentMethod,
    ) -> Result<(Uuid, CheckoutRequest), CheckoutError> {
        let mut state = self.lock()?;
        expect_phase(&state, &[CheckoutPhase::MethodChosen])?;
        let intent = state.intent.as_ref().ok_or(CheckoutError::NoIntent)?;
        if intent.payment_method != Some(method) {
            return Err(CheckoutError::WrongMethod(
                intent.payment_method.unwrap_or(PaymentMethod::Card),
            ));
        }
        let email = intent.email.clone().ok_or(CheckoutError::EmailRequired)?;
        let request = CheckoutRequest {
            subscription_tier: intent.plan.tier,
            billing_cycle: intent.billing_cycle,
            email: Some(email),
        };
        let id = intent.id;
        state.phase = CheckoutPhase::AwaitingProvider;
        Ok((id, request))
    }

    /// Finish intent `id` if it is still the active one.
    pub(super) fn finish(&self, id: Uuid) -> Result<(), CheckoutError> {
        let mut state = self.lock()?;
        if state.intent.as_ref().map(|i| i.id) != Some(id) {
            return Err(CheckoutError::Dismissed);
        }
        state.reset();
        Ok(())
    }
}

pub(super) fn expect_phase(
    state: &CheckoutState,
    allowed: &[CheckoutPhase],
) -> Result<(), CheckoutError> {
    if state.phase == CheckoutPhase::Idle {
        return Err(CheckoutError::NoIntent);
    }
    if allowed.contains(&state.phase) {
        Ok(())
    } else {
        Err(CheckoutError::WrongPhase {
            expected: allowed[0],
            actual: state.phase,
        })
    }
}
