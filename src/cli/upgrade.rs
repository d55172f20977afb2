// src/cli/upgrade.rs — `upgrade` command: plan pick, payment method, checkout

use crate::app::{App, PlanPick};
use crate::payment::{
    BillingCycle, OrderCreation, PaymentMethod, PaymentOutcome, PaymentResult, RedirectResult,
};
use crate::session::SubscriptionTier;

use super::account::report;

pub async fn run_upgrade(
    app: &App,
    tier: SubscriptionTier,
    cycle: BillingCycle,
    method: Option<PaymentMethod>,
    email: Option<String>,
) -> anyhow::Result<()> {
    app.session.restore_and_verify().await;

    let email = match (app.session.is_signed_in(), email) {
        (false, None) => inquire::Text::new("Email address:")
            .with_help_message("A free account is created first; the plan is paid next")
            .prompt_skippable()?,
        (_, email) => email,
    };

    let intent = match app.pick_plan(tier, cycle, email.as_deref()).await {
        PlanPick::CheckoutOpened(intent) => intent,
        PlanPick::Registered(_) => return Ok(()),
        PlanPick::Declined(notice) => return report(notice),
    };
    println!(
        "{}: {} ({})",
        intent.plan.name,
        intent.plan.price_label(cycle),
        intent.email.as_deref().unwrap_or_default()
    );

    let method = match method {
        Some(method) => method,
        None => match pick_method(app).await? {
            Some(method) => method,
            None => {
                app.dismiss_checkout().await;
                println!("Checkout cancelled.");
                return Ok(());
            }
        },
    };
    if let Err(e) = app.choose_payment_method(method).await {
        app.dismiss_checkout().await;
        anyhow::bail!("{e}");
    }

    match method {
        PaymentMethod::Card => pay_with_card(app).await,
        PaymentMethod::Wallet => pay_with_wallet(app).await,
    }
}

async fn pick_method(app: &App) -> anyhow::Result<Option<PaymentMethod>> {
    let mut options = vec![PaymentMethod::Card];
    if app.inline_available().await {
        options.push(PaymentMethod::Wallet);
    }
    if options.len() == 1 {
        return Ok(Some(PaymentMethod::Card));
    }
    let labels: Vec<&str> = options.iter().map(|m| m.label()).collect();
    let picked = inquire::Select::new("Payment method:", labels).prompt_skippable()?;
    Ok(picked.and_then(|label| options.into_iter().find(|m| m.label() == label)))
}

async fn pay_with_card(app: &App) -> anyhow::Result<()> {
    match app.start_redirect_checkout().await? {
        RedirectResult::Navigate { url, .. } => {
            println!("Open this link to complete your payment:");
            println!("  {url}");
            println!("Run `viral-daily whoami` afterwards to see your new plan.");
            Ok(())
        }
        RedirectResult::Failed(outcome) => print_outcome(app, &outcome),
    }
}

async fn pay_with_wallet(app: &App) -> anyhow::Result<()> {
    let order = match app.inline_create_order().await? {
        OrderCreation::Created(order) => order,
        OrderCreation::Failed(outcome) => return print_outcome(app, &outcome),
    };

    match &order.approval_url {
        Some(url) => {
            println!("Approve the payment in your browser:");
            println!("  {url}");
        }
        None => println!("Approve order {} with PayPal.", order.order_id),
    }

    let approved = inquire::Confirm::new("Approved?")
        .with_default(true)
        .prompt_skippable();
    let outcome = match approved {
        Ok(Some(true)) => app.inline_approve(&order.order_id).await?,
        Ok(_) => app.inline_cancel().await?,
        Err(e) => app.inline_provider_error(&e.to_string()).await?,
    };
    print_outcome(app, &outcome)
}

fn print_outcome(app: &App, outcome: &PaymentOutcome) -> anyhow::Result<()> {
    match outcome.result {
        PaymentResult::Succeeded => {
            println!("Payment successful!");
            if let (Some(amount), Some(currency)) = (outcome.amount, &outcome.currency) {
                println!("  Charged {amount:.2} {currency}");
            }
            if let Some(capture) = &outcome.capture_id {
                println!("  Reference {capture}");
            }
            if let Some(session) = app.session.current() {
                println!("  You are now on the {} plan.", session.subscription_tier);
            }
            Ok(())
        }
        PaymentResult::Cancelled => {
            println!("Payment was cancelled.");
            Ok(())
        }
        PaymentResult::Failed => {
            anyhow::bail!("{}", outcome.message.as_deref().unwrap_or("Payment failed"))
        }
    }
}
