// src/cli/account.rs — Account commands: signup, whoami, logout, dashboard, notify

use crate::app::{App, Notice, PlanPick};
use crate::backend::NotificationOptIn;
use crate::infra::errors::ViralDailyError;
use crate::payment::BillingCycle;
use crate::session::{RestoreOutcome, SubscriptionTier, VerifyOutcome};

pub async fn run_signup(app: &App, email: &str) -> anyhow::Result<()> {
    app.session.restore_and_verify().await;
    match app
        .pick_plan(SubscriptionTier::Free, BillingCycle::Monthly, Some(email))
        .await
    {
        PlanPick::Registered(session) => {
            println!("Successfully signed up for the free plan!");
            println!("  Email:   {}", session.email);
            if let Some(key) = session.credential() {
                println!("  API key: {key}");
            }
            Ok(())
        }
        PlanPick::Declined(notice) => report(notice),
        PlanPick::CheckoutOpened(_) => Ok(()),
    }
}

pub async fn run_whoami(app: &App) -> anyhow::Result<()> {
    let (restored, verified) = app.session.restore_and_verify().await;
    if let RestoreOutcome::Corrupt(reason) = restored {
        println!("Stored session was unreadable and has been reset ({reason}).");
    }
    if verified == Some(VerifyOutcome::Unreachable) {
        println!("(backend unreachable; showing stored details)");
    }

    let Some(session) = app.session.current() else {
        println!("Not signed in. Run `viral-daily signup <email>` to create a free account.");
        return Ok(());
    };
    println!("Signed in as {}", session.display_name());
    println!("  Email:      {}", session.email);
    println!("  Plan:       {}", session.subscription_tier);
    println!(
        "  API usage:  {} / {} today",
        session.daily_api_calls, session.max_daily_api_calls
    );
    println!("  Member since {}", session.created_at.format("%Y-%m-%d"));
    if let Some(expires) = session.subscription_expires_at {
        println!("  Renews {}", expires.format("%Y-%m-%d"));
    }
    Ok(())
}

pub fn run_logout(app: &App) -> anyhow::Result<()> {
    app.session.restore();
    let was = app.session.current().map(|s| s.email);
    app.session.logout();
    match was {
        Some(email) => println!("Signed out {email}."),
        None => println!("Not signed in."),
    }
    Ok(())
}

pub async fn run_dashboard(app: &App) -> anyhow::Result<()> {
    app.session.restore_and_verify().await;
    let dashboard = match app.open_dashboard().await {
        Ok(d) => d,
        Err(ViralDailyError::NoSession) => {
            println!("{}", ViralDailyError::NoSession);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let s = &dashboard.session;
    println!("{} ({} plan)", s.display_name(), s.subscription_tier);
    println!(
        "  API calls today: {} / {}",
        s.daily_api_calls, s.max_daily_api_calls
    );

    println!();
    match &dashboard.analytics {
        Some(analytics) => {
            println!("Usage");
            println!("  Total API calls:   {}", analytics.total_api_calls);
            println!("  Avg response time: {:.0} ms", analytics.avg_response_time);
            for (day, calls) in analytics.usage_by_day.iter().rev().take(7) {
                println!("  {day}  {calls}");
            }
        }
        None => println!("Usage analytics are available on the Pro and Business plans."),
    }

    println!();
    if dashboard.transactions.is_empty() {
        println!("No payments yet.");
    } else {
        println!("Payments");
        for t in &dashboard.transactions {
            let when = t
                .created_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".into());
            let tier = t.subscription_tier.map(|t| t.to_string()).unwrap_or_default();
            println!(
                "  {when}  {:.2} {}  {}  {}",
                t.amount,
                t.currency.to_uppercase(),
                t.status,
                tier
            );
        }
    }
    app.close_dashboard();
    Ok(())
}

pub async fn run_notify(
    app: &App,
    email: Option<String>,
    telegram: Option<String>,
    whatsapp: Option<String>,
) -> anyhow::Result<()> {
    let email = if email.is_none() && telegram.is_none() && whatsapp.is_none() {
        inquire::Text::new("Email for the daily digest:")
            .prompt_skippable()
            .unwrap_or(None)
    } else {
        email
    };
    let opt_in = NotificationOptIn::from_contacts(email, telegram, whatsapp)
        .map_err(|e| anyhow::anyhow!(e))?;
    report(app.subscribe_notifications(&opt_in).await)
}

pub(crate) fn report(notice: Notice) -> anyhow::Result<()> {
    if notice.is_error() {
        anyhow::bail!("{}", notice.text());
    }
    println!("{}", notice.text());
    Ok(())
}
