// tests/session_test.rs — Integration test: session restore, verify, register, logout

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{session, Call, Fail, MockBackend};
use viral_daily::infra::errors::ViralDailyError;
use viral_daily::session::*;

fn manager(backend: &Arc<MockBackend>, store: &Arc<MemorySessionStore>) -> SessionManager {
    SessionManager::new(backend.clone(), store.clone())
}

fn stored(s: &Session) -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_record(serde_json::to_string(s).unwrap()))
}

#[test]
fn test_persist_then_restore_round_trip() {
    let base = session("ana@example.com", "vd_abc", SubscriptionTier::Pro);
    let shapes = vec![
        base.clone(),
        Session {
            name: Some("Ana Lima".into()),
            subscription_tier: SubscriptionTier::Business,
            daily_api_calls: 4_210,
            subscription_expires_at: Some(
                Utc.with_ymd_and_hms(2026, 3, 1, 8, 15, 42).unwrap()
                    + chrono::Duration::microseconds(123_456),
            ),
            ..base.clone()
        },
        Session {
            api_key: None,
            subscription_tier: SubscriptionTier::Free,
            created_at: base.created_at + chrono::Duration::nanoseconds(987_654_321),
            is_active: false,
            ..base.clone()
        },
    ];

    for original in shapes {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileSessionStore::new(dir.path().join("viralDailyUser.json")));
        let backend = Arc::new(MockBackend::new());

        let writer = SessionManager::new(backend.clone(), store.clone());
        writer.persist(&original).unwrap();

        let reader = SessionManager::new(backend, store);
        assert_eq!(reader.restore(), RestoreOutcome::Restored(original.clone()));
        assert_eq!(reader.current(), Some(original));
    }
}

#[test]
fn test_restore_absent_is_anonymous() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let m = manager(&backend, &store);
    assert_eq!(m.restore(), RestoreOutcome::Anonymous);
    assert!(m.current().is_none());
}

#[test]
fn test_restore_malformed_discards_record() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::with_record("{not json"));
    let m = manager(&backend, &store);

    assert!(matches!(m.restore(), RestoreOutcome::Corrupt(_)));
    assert!(m.current().is_none());
    assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn test_verify_rejected_credential_demotes_silently() {
    let held = session("ana@example.com", "vd_expired", SubscriptionTier::Pro);
    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Err(Fail::Unauthorized));
    let store = stored(&held);
    let m = manager(&backend, &store);

    let (restored, verified) = m.restore_and_verify().await;
    assert_eq!(restored, RestoreOutcome::Restored(held));
    assert_eq!(verified, Some(VerifyOutcome::Demoted));
    assert!(m.current().is_none());
    assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn test_verify_unchanged_does_not_rewrite() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Pro);
    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Ok(held.clone()));
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();
    store.write("sentinel").unwrap();

    assert_eq!(m.verify(&held).await, VerifyOutcome::Unchanged);
    assert_eq!(m.current(), Some(held));
    assert_eq!(store.snapshot().as_deref(), Some("sentinel"));
}

#[tokio::test]
async fn test_verify_refreshes_changed_record() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Free);
    let mut upgraded = session("ana@example.com", "vd_abc", SubscriptionTier::Business);
    upgraded.daily_api_calls = 42;

    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Ok(upgraded.clone()));
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    assert_eq!(m.verify(&held).await, VerifyOutcome::Refreshed(upgraded.clone()));
    assert_eq!(m.current(), Some(upgraded.clone()));
    let persisted: Session = serde_json::from_str(&store.snapshot().unwrap()).unwrap();
    assert_eq!(persisted, upgraded);
}

#[tokio::test]
async fn test_verify_keeps_credential_when_backend_omits_it() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Free);
    let mut fresh = session("ana@example.com", "vd_abc", SubscriptionTier::Pro);
    fresh.api_key = None;

    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Ok(fresh));
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    let outcome = m.verify(&held).await;
    assert!(matches!(outcome, VerifyOutcome::Refreshed(_)));
    assert_eq!(m.credential().as_deref(), Some("vd_abc"));
    assert_eq!(m.current().unwrap().tier(), SubscriptionTier::Pro);
}

#[tokio::test]
async fn test_verify_unreachable_keeps_session() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Pro);
    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Err(Fail::Unreachable));
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    assert_eq!(m.verify(&held).await, VerifyOutcome::Unreachable);
    assert_eq!(m.current(), Some(held));
    assert!(store.snapshot().is_some());
}

#[tokio::test]
async fn test_verify_forbidden_is_not_a_rejection() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Free);
    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Err(Fail::Forbidden));
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    assert_eq!(m.verify(&held).await, VerifyOutcome::Unreachable);
    assert!(m.current().is_some());
}

#[tokio::test]
async fn test_verify_without_credential_demotes() {
    let mut held = session("ana@example.com", "", SubscriptionTier::Free);
    held.api_key = None;
    let backend = Arc::new(MockBackend::new());
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    assert_eq!(m.verify(&held).await, VerifyOutcome::Demoted);
    assert!(m.current().is_none());
    assert_eq!(backend.count(|c| matches!(c, Call::CurrentUser(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_verify_is_discarded_after_logout() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Free);
    let upgraded = session("ana@example.com", "vd_abc", SubscriptionTier::Pro);
    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.current_user, Ok(upgraded));
    MockBackend::set(&backend.current_user_delay, Duration::from_millis(200));
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    let (outcome, ()) = tokio::join!(m.verify(&held), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        m.logout();
    });

    assert_eq!(outcome, VerifyOutcome::Superseded);
    assert!(m.current().is_none());
    assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn test_register_stores_and_persists() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let m = manager(&backend, &store);

    let s = m.register("  new@example.com ").await.unwrap();
    assert_eq!(s.email, "new@example.com");
    assert_eq!(backend.calls(), vec![Call::Register("new@example.com".into())]);
    assert_eq!(m.current(), Some(s.clone()));

    let persisted: Session = serde_json::from_str(&store.snapshot().unwrap()).unwrap();
    assert_eq!(persisted, s);
}

#[tokio::test]
async fn test_register_failure_stays_anonymous() {
    let backend = Arc::new(MockBackend::new());
    MockBackend::set(&backend.register, Some(Err(Fail::Server)));
    let store = Arc::new(MemorySessionStore::new());
    let m = manager(&backend, &store);

    let err = m.register("new@example.com").await.unwrap_err();
    assert!(matches!(err, ViralDailyError::RegistrationFailed(_)));
    assert!(m.current().is_none());
    assert_eq!(store.snapshot(), None);
}

#[tokio::test]
async fn test_register_rejects_bad_email_without_calling_backend() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemorySessionStore::new());
    let m = manager(&backend, &store);

    assert!(m.register("not-an-email").await.is_err());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_register_while_signed_in_fails() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Free);
    let backend = Arc::new(MockBackend::new());
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    let err = m.register("other@example.com").await.unwrap_err();
    assert!(matches!(err, ViralDailyError::RegistrationFailed(_)));
    assert_eq!(m.current(), Some(held));
}

#[test]
fn test_logout_clears_memory_and_storage() {
    let held = session("ana@example.com", "vd_abc", SubscriptionTier::Pro);
    let backend = Arc::new(MockBackend::new());
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    m.logout();
    assert!(m.current().is_none());
    assert_eq!(store.snapshot(), None);

    // Logging out while anonymous is fine too.
    m.logout();
}

#[test]
fn test_reject_credential_only_clears_matching_session() {
    let held = session("ana@example.com", "vd_current", SubscriptionTier::Pro);
    let backend = Arc::new(MockBackend::new());
    let store = stored(&held);
    let m = manager(&backend, &store);
    m.restore();

    assert!(!m.reject_credential("vd_previous"));
    assert_eq!(m.current(), Some(held));

    assert!(m.reject_credential("vd_current"));
    assert!(m.current().is_none());
    assert_eq!(store.snapshot(), None);
}
