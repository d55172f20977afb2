// src/feed/mod.rs — Platform-filtered video feed
//
// Only the most recently initiated fetch may update the displayed state.
// Each fetch takes a generation number; responses from older generations are
// dropped on arrival.

pub mod refresh;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{Backend, VideoQuery};
use crate::infra::config::FeedConfig;
use crate::session::SubscriptionTier;

pub use refresh::{AutoRefresh, RefreshKey, RefreshTick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Twitter,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::YouTube,
        Platform::TikTok,
        Platform::Twitter,
        Platform::Instagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::Twitter => "Twitter/X",
            Platform::Instagram => "Instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "youtube" => Ok(Platform::YouTube),
            "tiktok" => Ok(Platform::TikTok),
            "twitter" | "x" => Ok(Platform::Twitter),
            "instagram" => Ok(Platform::Instagram),
            other => Err(format!(
                "unknown platform '{other}' (expected youtube, tiktok, twitter or instagram)"
            )),
        }
    }
}

/// Feed filter: one platform, or everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlatformFilter {
    #[default]
    All,
    Platform(Platform),
}

impl PlatformFilter {
    pub fn platform(&self) -> Option<Platform> {
        match self {
            PlatformFilter::All => None,
            PlatformFilter::Platform(p) => Some(*p),
        }
    }
}

impl fmt::Display for PlatformFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformFilter::All => f.write_str("all"),
            PlatformFilter::Platform(p) => p.fmt(f),
        }
    }
}

impl FromStr for PlatformFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PlatformFilter::All);
        }
        s.parse().map(PlatformFilter::Platform)
    }
}

impl TryFrom<String> for PlatformFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlatformFilter> for String {
    fn from(filter: PlatformFilter) -> Self {
        filter.to_string()
    }
}

/// One video as delivered by the backend. Never modified client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    #[serde(default)]
    pub id: Option<String>,
    pub platform: Platform,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub viral_score: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// What the feed screen shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub items: Vec<VideoItem>,
    pub filter: PlatformFilter,
    pub error: Option<String>,
    pub loading: bool,
    pub has_ads: bool,
    pub user_tier: Option<SubscriptionTier>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedFetch {
    /// Response applied; number of items now displayed.
    Applied(usize),
    /// A newer fetch was started before this one resolved.
    Superseded,
    /// Fetch failed; error recorded, previous items kept.
    Failed(String),
    /// The attached credential was rejected. Nothing recorded.
    Unauthorized,
}

pub const FETCH_ERROR: &str = "Failed to fetch viral videos. Please try again.";

pub struct FeedSynchronizer {
    backend: Arc<dyn Backend>,
    config: FeedConfig,
    generation: AtomicU64,
    state: Mutex<FeedState>,
}

impl FeedSynchronizer {
    pub fn new(backend: Arc<dyn Backend>, config: FeedConfig) -> Self {
        let state = FeedState {
            filter: config.default_platform,
            ..FeedState::default()
        };
        Self {
            backend,
            config,
            generation: AtomicU64::new(0),
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> FeedState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn filter(&self) -> PlatformFilter {
        self.state
            .lock()
            .map(|s| s.filter)
            .unwrap_or_default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetch `filter`, attaching `api_key` when present.
    pub async fn fetch(&self, filter: PlatformFilter, api_key: Option<&str>) -> FeedFetch {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|state| {
            state.filter = filter;
            state.error = None;
            state.loading = true;
        });

        let query = VideoQuery {
            platform: filter.platform(),
            limit: self.config.limit_for(&filter),
        };
        tracing::debug!(generation, %filter, limit = query.limit, authed = api_key.is_some(), "feed fetch");
        let result = self.backend.videos(&query, api_key).await;

        let Ok(mut state) = self.state.lock() else {
            return FeedFetch::Superseded;
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded feed response");
            return FeedFetch::Superseded;
        }
        state.loading = false;

        match result {
            Ok(page) => {
                state.items = page.videos;
                state.has_ads = page.has_ads;
                state.user_tier = page.user_tier;
                state.last_updated = Some(Utc::now());
                FeedFetch::Applied(state.items.len())
            }
            Err(e) if e.is_unauthorized() && api_key.is_some() => FeedFetch::Unauthorized,
            Err(e) => {
                tracing::warn!("Feed fetch failed: {}", e);
                state.error = Some(FETCH_ERROR.into());
                FeedFetch::Failed(FETCH_ERROR.into())
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut FeedState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }
}
