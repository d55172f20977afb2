// src/cli/mod.rs — CLI definition (clap derive)

pub mod account;
pub mod feed;
pub mod upgrade;

use clap::{Parser, Subcommand};

use crate::feed::PlatformFilter;
use crate::payment::{BillingCycle, PaymentMethod};
use crate::session::SubscriptionTier;

#[derive(Parser)]
#[command(
    name = "viral-daily",
    about = "Today's most viral videos from YouTube, TikTok, Twitter and Instagram",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Show the viral video feed (default command)
    Feed {
        /// all, youtube, tiktok, twitter or instagram
        #[arg(short, long)]
        platform: Option<PlatformFilter>,
        /// Keep running and re-fetch on the refresh interval
        #[arg(short, long)]
        watch: bool,
    },
    /// List subscription plans
    Plans {
        #[arg(short, long, default_value_t = BillingCycle::Monthly)]
        cycle: BillingCycle,
    },
    /// Create a free account
    Signup { email: String },
    /// Show the signed-in account
    Whoami,
    /// Upgrade to a paid plan
    Upgrade {
        /// pro or business
        tier: SubscriptionTier,
        #[arg(short, long, default_value_t = BillingCycle::Monthly)]
        cycle: BillingCycle,
        /// card or wallet (prompted when omitted)
        #[arg(short, long)]
        method: Option<PaymentMethod>,
        /// Email for a new account when not signed in
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Usage analytics and payment history
    Dashboard,
    /// Get the daily top videos delivered
    Notify {
        #[arg(long)]
        email: Option<String>,
        /// Telegram user id
        #[arg(long)]
        telegram: Option<String>,
        /// WhatsApp number, with country code
        #[arg(long)]
        whatsapp: Option<String>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Feed {
            platform: None,
            watch: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Platform;

    #[test]
    fn test_parse_feed_platform() {
        let cli = Cli::try_parse_from(["viral-daily", "feed", "--platform", "tiktok", "--watch"]).unwrap();
        match cli.command {
            Some(Commands::Feed { platform, watch }) => {
                assert_eq!(platform, Some(PlatformFilter::Platform(Platform::TikTok)));
                assert!(watch);
            }
            _ => panic!("expected feed command"),
        }
    }

    #[test]
    fn test_parse_upgrade() {
        let cli = Cli::try_parse_from([
            "viral-daily",
            "upgrade",
            "business",
            "--cycle",
            "yearly",
            "--method",
            "wallet",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Upgrade {
                tier,
                cycle,
                method,
                email,
            }) => {
                assert_eq!(tier, SubscriptionTier::Business);
                assert_eq!(cycle, BillingCycle::Yearly);
                assert_eq!(method, Some(PaymentMethod::Wallet));
                assert_eq!(email, None);
            }
            _ => panic!("expected upgrade command"),
        }
    }

    #[test]
    fn test_rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["viral-daily", "feed", "-p", "myspace"]).is_err());
    }
}
