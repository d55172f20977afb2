// src/payment/inline.rs — Inline (wallet approval) provider path
//
// The provider widget drives four callbacks: create order, approve, cancel,
// error. `create -> approve` is strictly sequential; each of approve, cancel
// and error ends the intent. Approve claims the intent by moving it to
// Capturing under the lock, so a repeated approve never captures twice.

use super::orchestrator::{expect_phase, PaymentOrchestrator};
use super::{
    CheckoutError, CheckoutPhase, PaymentMethod, PaymentOutcome, PaymentResult, CAPTURE_FAILED,
    NOT_COMPLETED, ORDER_FAILED, PROVIDER_FAILED,
};
use crate::backend::InlineOrder;

#[derive(Debug, Clone)]
pub enum OrderCreation {
    /// Order exists at the provider; waiting for the visitor to approve it.
    Created(InlineOrder),
    Failed(PaymentOutcome),
}

impl PaymentOrchestrator {
    /// "create order" callback.
    pub async fn create_order(
        &self,
        credential: Option<&str>,
    ) -> Result<OrderCreation, CheckoutError> {
        let (id, request) = self.dispatch(PaymentMethod::Wallet)?;
        tracing::debug!(intent_id = %id, "creating inline order");

        match self.backend.create_inline_order(&request, credential).await {
            Ok(order) => {
                let mut state = self.lock()?;
                if state.intent.as_ref().map(|i| i.id) != Some(id) {
                    return Err(CheckoutError::Dismissed);
                }
                tracing::info!(intent_id = %id, order_id = %order.order_id, "inline order created");
                state.order_id = Some(order.order_id.clone());
                Ok(OrderCreation::Created(order))
            }
            Err(e) => {
                self.finish(id)?;
                tracing::warn!(intent_id = %id, "Inline order creation failed: {}", e);
                Ok(OrderCreation::Failed(PaymentOutcome::failed(
                    PaymentMethod::Wallet,
                    ORDER_FAILED,
                )))
            }
        }
    }

    /// "approve" callback: capture the approved order.
    pub async fn approve(&self, order_id: &str) -> Result<PaymentOutcome, CheckoutError> {
        let id = {
            let mut state = self.lock()?;
            expect_phase(&state, &[CheckoutPhase::AwaitingProvider])?;
            let intent = state.intent.as_ref().ok_or(CheckoutError::NoIntent)?;
            if intent.payment_method != Some(PaymentMethod::Wallet) {
                return Err(CheckoutError::WrongMethod(PaymentMethod::Card));
            }
            if state.order_id.as_deref() != Some(order_id) {
                tracing::warn!(
                    intent_id = %intent.id,
                    "approved order {} differs from created order {:?}",
                    order_id,
                    state.order_id
                );
            }
            let id = intent.id;
            state.phase = CheckoutPhase::Capturing;
            id
        };

        let capture = self.backend.capture_inline_order(order_id).await;
        self.finish(id)?;

        let outcome = match capture {
            Ok(capture) if capture.is_completed() => PaymentOutcome {
                result: PaymentResult::Succeeded,
                provider: PaymentMethod::Wallet,
                order_id: Some(order_id.to_string()),
                capture_id: capture.capture_id,
                amount: capture.amount,
                currency: capture.currency,
                message: None,
            },
            Ok(capture) => {
                tracing::warn!(intent_id = %id, status = %capture.status, "capture not completed");
                PaymentOutcome {
                    order_id: Some(order_id.to_string()),
                    ..PaymentOutcome::failed(PaymentMethod::Wallet, NOT_COMPLETED)
                }
            }
            Err(e) => {
                tracing::warn!(intent_id = %id, "Capture failed: {}", e);
                PaymentOutcome {
                    order_id: Some(order_id.to_string()),
                    ..PaymentOutcome::failed(PaymentMethod::Wallet, CAPTURE_FAILED)
                }
            }
        };
        tracing::info!(intent_id = %id, result = ?outcome.result, "inline checkout finished");
        Ok(outcome)
    }

    /// "cancel" callback. No backend call.
    pub fn cancel(&self) -> Result<PaymentOutcome, CheckoutError> {
        let id = self.wallet_intent_id()?;
        self.finish(id)?;
        tracing::info!(intent_id = %id, "inline checkout cancelled");
        Ok(PaymentOutcome::cancelled(PaymentMethod::Wallet))
    }

    /// "error" callback from the provider widget.
    pub fn provider_error(&self, detail: &str) -> Result<PaymentOutcome, CheckoutError> {
        let id = self.wallet_intent_id()?;
        self.finish(id)?;
        tracing::warn!(intent_id = %id, "Inline provider error: {}", detail);
        Ok(PaymentOutcome::failed(PaymentMethod::Wallet, PROVIDER_FAILED))
    }

    fn wallet_intent_id(&self) -> Result<uuid::Uuid, CheckoutError> {
        let state = self.lock()?;
        expect_phase(
            &state,
            &[CheckoutPhase::MethodChosen, CheckoutPhase::AwaitingProvider],
        )?;
        let intent = state.intent.as_ref().ok_or(CheckoutError::NoIntent)?;
        match intent.payment_method {
            Some(PaymentMethod::Wallet) => Ok(intent.id),
            _ => Err(CheckoutError::WrongMethod(PaymentMethod::Card)),
        }
    }
}
