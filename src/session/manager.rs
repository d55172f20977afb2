// src/session/manager.rs — Single writer of the live session
//
// Every change to the in-memory session goes through here: restore, verify,
// register, logout, reject_credential. Successful changes re-persist the
// full record; clears remove it. Readers get snapshots via `current()` or a
// `watch` subscription.

use std::sync::Arc;
use tokio::sync::watch;

use super::store::SessionStore;
use super::Session;
use crate::backend::Backend;
use crate::infra::errors::ViralDailyError;

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// Nothing persisted.
    Anonymous,
    Restored(Session),
    /// A record was present but could not be decoded. It has been discarded.
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// Backend record matches the held one field-for-field.
    Unchanged,
    /// Backend record differed; it is now held and persisted.
    Refreshed(Session),
    /// Credential rejected (or missing); session cleared.
    Demoted,
    /// Backend unreachable or failing; held session kept as-is.
    Unreachable,
    /// The session was replaced or cleared while the check was in flight.
    Superseded,
}

pub struct SessionManager {
    backend: Arc<dyn Backend>,
    store: Arc<dyn SessionStore>,
    current: watch::Sender<Option<Session>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn SessionStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            backend,
            store,
            current,
        }
    }

    /// Snapshot of the live session.
    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn credential(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .and_then(|s| s.credential().map(str::to_string))
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Load the persisted record into memory. Does not touch the network.
    pub fn restore(&self) -> RestoreOutcome {
        let raw = match self.store.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return RestoreOutcome::Anonymous,
            Err(e) => {
                tracing::warn!("Could not read stored session: {}", e);
                return RestoreOutcome::Anonymous;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                tracing::debug!(email = %session.email, tier = %session.subscription_tier, "session restored");
                self.current.send_replace(Some(session.clone()));
                RestoreOutcome::Restored(session)
            }
            Err(e) => {
                let err = ViralDailyError::SessionCorrupt(e.to_string());
                tracing::warn!("{}; discarding it", err);
                if let Err(e) = self.store.remove() {
                    tracing::warn!("Could not remove corrupt session: {}", e);
                }
                RestoreOutcome::Corrupt(err.to_string())
            }
        }
    }

    /// Re-validate `session` against `users/me`.
    pub async fn verify(&self, session: &Session) -> VerifyOutcome {
        let result = match session.credential() {
            Some(key) => Some(self.backend.current_user(key).await),
            None => None,
        };

        let mut outcome = VerifyOutcome::Superseded;
        self.current.send_if_modified(|held| {
            if held.as_ref() != Some(session) {
                return false;
            }
            match result {
                None => {
                    *held = None;
                    outcome = VerifyOutcome::Demoted;
                    true
                }
                Some(Ok(mut fresh)) => {
                    if fresh.credential().is_none() {
                        fresh.api_key = session.api_key.clone();
                    }
                    if fresh == *session {
                        outcome = VerifyOutcome::Unchanged;
                        false
                    } else {
                        *held = Some(fresh.clone());
                        outcome = VerifyOutcome::Refreshed(fresh);
                        true
                    }
                }
                Some(Err(e)) if e.is_unauthorized() => {
                    *held = None;
                    outcome = VerifyOutcome::Demoted;
                    true
                }
                Some(Err(e)) => {
                    tracing::warn!("Session check failed, keeping stored session: {}", e);
                    outcome = VerifyOutcome::Unreachable;
                    false
                }
            }
        });

        match &outcome {
            VerifyOutcome::Refreshed(fresh) => {
                tracing::info!(tier = %fresh.subscription_tier, "session refreshed");
                self.persist_logged(fresh);
            }
            VerifyOutcome::Demoted => {
                tracing::info!("Stored credential no longer valid; continuing anonymously");
                self.remove_logged();
            }
            VerifyOutcome::Superseded => {
                tracing::debug!("discarding stale session check");
            }
            VerifyOutcome::Unchanged | VerifyOutcome::Unreachable => {}
        }
        outcome
    }

    /// Startup sequence: restore, then verify whatever was restored.
    pub async fn restore_and_verify(&self) -> (RestoreOutcome, Option<VerifyOutcome>) {
        let restored = self.restore();
        let verified = match &restored {
            RestoreOutcome::Restored(session) => Some(self.verify(session).await),
            _ => None,
        };
        (restored, verified)
    }

    /// Verify whatever is held right now. `None` when anonymous.
    pub async fn reverify(&self) -> Option<VerifyOutcome> {
        let session = self.current()?;
        Some(self.verify(&session).await)
    }

    /// Create a session for an anonymous visitor.
    pub async fn register(&self, email: &str) -> Result<Session, ViralDailyError> {
        let email = email.trim();
        validate_email(email)?;
        if let Some(existing) = self.current() {
            return Err(ViralDailyError::RegistrationFailed(format!(
                "already signed in as {}",
                existing.email
            )));
        }

        let session = self.backend.register(email).await.map_err(|e| {
            tracing::warn!("Registration for {} failed: {}", email, e);
            ViralDailyError::RegistrationFailed(registration_message(&e))
        })?;

        self.current.send_replace(Some(session.clone()));
        self.persist_logged(&session);
        tracing::info!(tier = %session.subscription_tier, "registered {}", session.email);
        Ok(session)
    }

    /// Clear memory and storage. Never fails.
    pub fn logout(&self) {
        if let Some(old) = self.current.send_replace(None) {
            tracing::info!("Signed out {}", old.email);
        }
        self.remove_logged();
    }

    /// The backend refused `credential` somewhere other than `verify`.
    /// Clears the session only if it still carries that credential.
    pub fn reject_credential(&self, credential: &str) -> bool {
        let cleared = self.current.send_if_modified(|held| {
            if held.as_ref().and_then(Session::credential) == Some(credential) {
                *held = None;
                true
            } else {
                false
            }
        });
        if cleared {
            tracing::info!("Credential rejected by backend; continuing anonymously");
            self.remove_logged();
        }
        cleared
    }

    /// Full-record write of `session` to storage.
    pub fn persist(&self, session: &Session) -> Result<(), ViralDailyError> {
        let record = serde_json::to_string(session)?;
        self.store.write(&record)
    }

    fn persist_logged(&self, session: &Session) {
        if let Err(e) = self.persist(session) {
            tracing::warn!("Could not persist session: {}", e);
        }
    }

    fn remove_logged(&self) {
        if let Err(e) = self.store.remove() {
            tracing::warn!("Could not remove stored session: {}", e);
        }
    }
}

fn validate_email(email: &str) -> Result<(), ViralDailyError> {
    let valid = !email.is_empty()
        && !email.contains(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && !domain.is_empty());
    if valid {
        Ok(())
    } else {
        Err(ViralDailyError::RegistrationFailed(format!(
            "'{email}' is not a valid email address"
        )))
    }
}

fn registration_message(err: &ViralDailyError) -> String {
    match err {
        ViralDailyError::Backend { message, .. } | ViralDailyError::Forbidden { message, .. } => {
            message.clone()
        }
        _ => "Registration failed. Please try again.".into(),
    }
}
