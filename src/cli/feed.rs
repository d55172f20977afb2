// src/cli/feed.rs — `feed` and `plans` commands

use crate::app::App;
use crate::catalog::{self, PlanListing};
use crate::feed::{FeedFetch, FeedState, PlatformFilter};
use crate::payment::BillingCycle;
use crate::session::RestoreOutcome;
use crate::util::{format_count, truncate_str};

pub async fn run_feed(app: &App, platform: Option<PlatformFilter>, watch: bool) -> anyhow::Result<()> {
    let report = app.start().await;
    if let RestoreOutcome::Corrupt(reason) = &report.restore {
        eprintln!("Stored session was unreadable and has been reset ({reason}).");
    }

    let mut outcome = report.feed;
    if let Some(filter) = platform {
        if filter != app.feed.filter() {
            outcome = app.select_platform(filter).await;
        }
    }
    print_feed(&app.feed_state(), &outcome);

    if !watch {
        app.shutdown();
        return Ok(());
    }

    println!();
    println!("Watching {}; Ctrl-C to stop.", app.feed.filter());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            refreshed = app.next_refresh() => match refreshed {
                Some(outcome) => print_feed(&app.feed_state(), &outcome),
                None => break,
            },
        }
    }
    app.shutdown();
    Ok(())
}

fn print_feed(state: &FeedState, outcome: &FeedFetch) {
    println!();
    let heading = match state.filter {
        PlatformFilter::All => "All platforms".to_string(),
        PlatformFilter::Platform(p) => p.label().to_string(),
    };
    match state.last_updated {
        Some(at) => println!("Viral today: {heading} (updated {})", at.format("%H:%M UTC")),
        None => println!("Viral today: {heading}"),
    }

    if let FeedFetch::Failed(message) = outcome {
        println!("  ! {message}");
    }
    if state.items.is_empty() {
        println!("  No videos right now.");
        return;
    }

    for (i, video) in state.items.iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, video.platform.label(), truncate_str(&video.title, 80));
        let mut meta = Vec::new();
        if let Some(author) = &video.author {
            meta.push(author.clone());
        }
        if let Some(views) = video.views {
            meta.push(format!("{} views", format_count(views)));
        }
        if let Some(likes) = video.likes {
            meta.push(format!("{} likes", format_count(likes)));
        }
        if let Some(score) = video.viral_score {
            meta.push(format!("score {score:.1}"));
        }
        if !meta.is_empty() {
            println!("     {}", meta.join(" · "));
        }
        println!("     {}", video.url);
    }

    if state.has_ads {
        println!();
        println!("  Free plan: upgrade with `viral-daily upgrade pro` for an ad-free feed.");
    }
}

pub async fn run_plans(app: &App, cycle: BillingCycle) -> anyhow::Result<()> {
    app.session.restore();
    let listing = app.open_pricing().await;
    let current = app.session.current();

    match &listing {
        PlanListing::Available(plans) => {
            for plan in plans {
                let marker = if catalog::is_current_plan(plan.tier, current.as_ref()) {
                    " (current)"
                } else {
                    ""
                };
                println!();
                println!("{}{marker}", plan.name);
                match plan.savings_label(cycle) {
                    Some(savings) => println!("  {}  {savings}", plan.price_label(cycle)),
                    None => println!("  {}", plan.price_label(cycle)),
                }
                for feature in &plan.features {
                    println!("  - {feature}");
                }
            }
        }
        PlanListing::Empty => println!("No plans available."),
        PlanListing::Unavailable => println!("Could not load plans. Please try again later."),
    }
    app.close_pricing();
    Ok(())
}
