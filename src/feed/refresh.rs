// src/feed/refresh.rs — Recurring feed refresh timer
//
// One timer task at a time. Re-arming with the same key is a no-op; a
// different key replaces the task. Ticks carry the key they were armed with
// so a consumer can ignore ticks queued before a re-arm.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::PlatformFilter;

/// What the timer re-fetches for: current filter and session identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshKey {
    pub filter: PlatformFilter,
    pub identity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTick {
    pub key: RefreshKey,
    pub seq: u64,
}

pub struct AutoRefresh {
    interval: Duration,
    tx: mpsc::Sender<RefreshTick>,
    armed: Option<(RefreshKey, JoinHandle<()>)>,
}

impl AutoRefresh {
    pub fn new(interval: Duration) -> (Self, mpsc::Receiver<RefreshTick>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Self {
                interval,
                tx,
                armed: None,
            },
            rx,
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    pub fn key(&self) -> Option<&RefreshKey> {
        self.armed.as_ref().map(|(key, _)| key)
    }

    /// Start (or restart) the timer for `key`. Returns false when a timer
    /// for the same key is already running.
    pub fn arm(&mut self, key: RefreshKey) -> bool {
        if self.is_armed() && self.key() == Some(&key) {
            return false;
        }
        self.cancel();

        let interval = self.interval;
        let tx = self.tx.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seq = 0;
            loop {
                ticker.tick().await;
                seq += 1;
                let tick = RefreshTick {
                    key: task_key.clone(),
                    seq,
                };
                if tx.send(tick).await.is_err() {
                    break;
                }
            }
        });

        tracing::debug!(filter = %key.filter, interval_secs = interval.as_secs(), "auto-refresh armed");
        self.armed = Some((key, handle));
        true
    }

    pub fn cancel(&mut self) {
        if let Some((_, handle)) = self.armed.take() {
            handle.abort();
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Platform;

    const INTERVAL: Duration = Duration::from_secs(30 * 60);

    fn key(filter: PlatformFilter) -> RefreshKey {
        RefreshKey {
            filter,
            identity: Some("ana@example.com".into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_full_interval() {
        let (mut timer, mut rx) = AutoRefresh::new(INTERVAL);
        let start = Instant::now();
        assert!(timer.arm(key(PlatformFilter::All)));

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.seq, 1);
        assert!(start.elapsed() >= INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_same_key_does_not_duplicate() {
        let (mut timer, mut rx) = AutoRefresh::new(INTERVAL);
        assert!(timer.arm(key(PlatformFilter::All)));
        assert!(!timer.arm(key(PlatformFilter::All)));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.seq, 1);
        let early = tokio::time::timeout(INTERVAL / 2, rx.recv()).await;
        assert!(early.is_err(), "second timer would have ticked too");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_new_key_restarts_timer() {
        let (mut timer, mut rx) = AutoRefresh::new(INTERVAL);
        timer.arm(key(PlatformFilter::All));
        tokio::time::sleep(INTERVAL / 2).await;

        let rearmed_at = Instant::now();
        let tiktok = key(PlatformFilter::Platform(Platform::TikTok));
        assert!(timer.arm(tiktok.clone()));

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.key, tiktok);
        assert!(rearmed_at.elapsed() >= INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (mut timer, mut rx) = AutoRefresh::new(INTERVAL);
        timer.arm(key(PlatformFilter::All));
        timer.cancel();
        assert!(!timer.is_armed());

        let tick = tokio::time::timeout(INTERVAL * 3, rx.recv()).await;
        assert!(tick.is_err());
    }
}
