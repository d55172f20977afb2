// src/payment/redirect.rs — Redirect (hosted card checkout) provider path
//
// One backend call creates a hosted checkout session. On success the only
// thing left to do is send the visitor to its URL; the client never observes
// the payment itself.

use url::Url;

use super::orchestrator::PaymentOrchestrator;
use super::{CheckoutError, PaymentMethod, PaymentOutcome, REDIRECT_FAILED};

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectResult {
    /// Hand control to the hosted checkout page.
    Navigate { url: Url, session_id: Option<String> },
    Failed(PaymentOutcome),
}

impl PaymentOrchestrator {
    pub async fn start_redirect(
        &self,
        credential: Option<&str>,
    ) -> Result<RedirectResult, CheckoutError> {
        let (id, request) = self.dispatch(PaymentMethod::Card)?;
        tracing::debug!(intent_id = %id, "creating hosted checkout session");

        let response = self
            .backend
            .create_checkout_session(&request, credential)
            .await;
        self.finish(id)?;

        let failed = |detail: String| -> Result<RedirectResult, CheckoutError> {
            tracing::warn!(intent_id = %id, "Checkout session failed: {}", detail);
            Ok(RedirectResult::Failed(PaymentOutcome::failed(
                PaymentMethod::Card,
                REDIRECT_FAILED,
            )))
        };

        match response {
            Ok(session) => match session.url.as_deref().map(Url::parse) {
                Some(Ok(url)) => {
                    tracing::info!(intent_id = %id, "redirecting to hosted checkout");
                    Ok(RedirectResult::Navigate {
                        url,
                        session_id: session.session_id,
                    })
                }
                Some(Err(e)) => failed(format!("invalid checkout URL: {e}")),
                None => failed("no checkout URL received".into()),
            },
            Err(e) => failed(e.to_string()),
        }
    }
}
