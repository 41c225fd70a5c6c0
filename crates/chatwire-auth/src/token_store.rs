//! Token store: the single owner of the active credential.
//!
//! Every outgoing request asks [`TokenStore::current_headers`] what to attach.
//! Bearer tokens that carry an expiry are refreshed proactively once they are
//! inside the refresh window. Refresh is single-flight: callers that find a
//! refresh already running join it and observe the same outcome.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::clock::{SharedClock, SystemClock};
use crate::credential::{AuthHeaders, Credential, StoredCredential, TokenGrant};
use crate::error::{AuthError, Result};
use crate::store::SharedCredentialStore;

/// Refresh this long before the recorded expiry.
pub const REFRESH_SKEW_SECS: i64 = 60;

// ============================================================================
// TokenRefresher Trait
// ============================================================================

/// Exchanges a refresh token for a new grant.
#[async_trait]
pub trait TokenRefresher: Send + Sync + std::fmt::Debug {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Shared refresher handle.
pub type SharedRefresher = Arc<dyn TokenRefresher>;

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential>>>;

// ============================================================================
// TokenStore
// ============================================================================

/// Holds the active credential and hides refresh timing from callers.
///
/// Cheap to clone; clones share the same credential.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    refresher: Option<SharedRefresher>,
    store: Option<SharedCredentialStore>,
    clock: SharedClock,
    skew: Duration,
}

#[derive(Default)]
struct State {
    credential: Option<Credential>,
    /// Bumped whenever the credential is replaced or cleared.
    generation: u64,
    refresh: Option<RefreshFuture>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TokenStore")
            .field("credential", &state.credential)
            .field("refresh_in_flight", &state.refresh.is_some())
            .finish()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TokenStore {
    pub fn builder() -> TokenStoreBuilder {
        TokenStoreBuilder::default()
    }

    /// Store holding `credential` with no refresher or persistence.
    pub fn with_credential(credential: Credential) -> Self {
        Self::builder().credential(credential).build()
    }

    /// Headers to attach to the next request, refreshing first if the bearer
    /// token is about to expire.
    pub async fn current_headers(&self) -> Result<AuthHeaders> {
        let (credential, generation) = {
            let state = self.inner.state.lock();
            let credential = state.credential.clone().ok_or(AuthError::MissingToken)?;
            (credential, state.generation)
        };

        if self.inner.needs_refresh(&credential) {
            tracing::debug!("Access token inside refresh window");
            let refreshed = self.refresh_from(Some(generation)).await?;
            return Ok(refreshed.headers());
        }

        Ok(credential.headers())
    }

    /// Mint a new access token from the held refresh token.
    ///
    /// Joins an in-flight refresh if one exists. Fails without any network
    /// call when no refresh token is held.
    pub async fn refresh(&self) -> Result<Credential> {
        self.refresh_from(None).await
    }

    /// Refresh on behalf of a caller that saw the credential at `observed`.
    ///
    /// If the credential has been replaced since and no longer needs a
    /// refresh, the replacement is returned without starting a new one.
    async fn refresh_from(&self, observed: Option<u64>) -> Result<Credential> {
        let refresh = {
            let mut state = self.inner.state.lock();
            if let Some(in_flight) = &state.refresh {
                tracing::debug!("Joining in-flight token refresh");
                in_flight.clone()
            } else {
                if let Some(observed) = observed
                    && observed != state.generation
                    && let Some(current) = &state.credential
                    && !self.inner.needs_refresh(current)
                {
                    tracing::debug!("Credential already replaced; skipping refresh");
                    return Ok(current.clone());
                }

                let refresh_token = match &state.credential {
                    None => return Err(AuthError::MissingToken),
                    Some(Credential::Bearer {
                        refresh_token: Some(token),
                        ..
                    }) => token.clone(),
                    Some(Credential::Bearer { .. }) => {
                        return Err(AuthError::MissingRefreshToken);
                    }
                    Some(other) => return Err(AuthError::RefreshNotSupported(other.kind())),
                };
                let refresher = self
                    .inner
                    .refresher
                    .clone()
                    .ok_or(AuthError::RefreshNotSupported("bearer"))?;

                let fut = start_refresh(
                    Arc::downgrade(&self.inner),
                    refresher,
                    refresh_token,
                    state.generation,
                );
                state.refresh = Some(fut.clone());
                fut
            }
        };

        refresh.await
    }

    /// Replace the bearer credential from a sign-in or refresh response.
    ///
    /// When `refresh_token` is `None` the previously held refresh token is
    /// kept.
    pub async fn update_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: std::time::Duration,
    ) -> Result<()> {
        let expires_at = self.inner.expiry_after(expires_in)?;
        let credential = {
            let mut state = self.inner.state.lock();
            let refresh_token = refresh_token.or_else(|| {
                state
                    .credential
                    .as_ref()
                    .and_then(|c| c.refresh_token())
                    .map(str::to_string)
            });
            let credential = Credential::Bearer {
                access_token: access_token.into(),
                refresh_token,
                expires_at: Some(expires_at),
            };
            state.credential = Some(credential.clone());
            state.generation += 1;
            credential
        };

        tracing::debug!(expires_at = %expires_at, "Bearer token updated");
        self.inner.persist(&credential).await
    }

    /// Apply a token grant returned by an auth endpoint.
    pub async fn apply_grant(&self, grant: TokenGrant) -> Result<()> {
        self.update_tokens(
            grant.access_token,
            grant.refresh_token,
            std::time::Duration::from_secs(grant.expires_in),
        )
        .await
    }

    /// Install a credential set directly by the caller.
    pub async fn set_credential(&self, credential: Credential) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.credential = Some(credential.clone());
            state.generation += 1;
        }
        tracing::debug!(kind = credential.kind(), "Credential set");
        self.inner.persist(&credential).await
    }

    /// Wipe all credential material, in memory and in the credential store.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.credential = None;
            state.generation += 1;
        }
        tracing::info!("Credential cleared");
        match &self.inner.store {
            Some(store) => store.clear().await,
            None => Ok(()),
        }
    }

    /// Hydrate from the credential store. Returns whether a credential was found.
    pub async fn load(&self) -> Result<bool> {
        let Some(store) = &self.inner.store else {
            return Ok(false);
        };
        let Some(stored) = store.load().await? else {
            return Ok(false);
        };

        let mut state = self.inner.state.lock();
        tracing::debug!(kind = stored.credential.kind(), "Credential loaded from store");
        state.credential = Some(stored.credential);
        state.generation += 1;
        Ok(true)
    }

    pub fn has_credential(&self) -> bool {
        self.inner.state.lock().credential.is_some()
    }

    /// Summary of the held credential, without secrets.
    pub fn status(&self) -> Option<AuthStatus> {
        let state = self.inner.state.lock();
        let credential = state.credential.as_ref()?;
        let now = self.inner.clock.now();
        let expires_at = credential.expires_at();

        Some(AuthStatus {
            kind: credential.kind(),
            expires_at,
            expires_in: expires_at.map(|at| (at - now).max(Duration::zero())),
            is_expired: expires_at.is_some_and(|at| now >= at),
            has_refresh_token: credential.refresh_token().is_some(),
        })
    }
}

fn start_refresh(
    inner: Weak<Inner>,
    refresher: SharedRefresher,
    refresh_token: String,
    generation: u64,
) -> RefreshFuture {
    async move {
        tracing::info!("Refreshing access token");
        let outcome = refresher.refresh(&refresh_token).await;
        match inner.upgrade() {
            Some(inner) => inner.complete_refresh(generation, refresh_token, outcome).await,
            None => Err(AuthError::MissingToken),
        }
    }
    .boxed()
    .shared()
}

impl Inner {
    fn needs_refresh(&self, credential: &Credential) -> bool {
        match credential.expires_at() {
            Some(expires_at) => self.clock.now() > expires_at - self.skew,
            None => false,
        }
    }

    fn expiry_after(&self, expires_in: std::time::Duration) -> Result<DateTime<Utc>> {
        Duration::from_std(expires_in)
            .ok()
            .and_then(|d| self.clock.now().checked_add_signed(d))
            .ok_or_else(|| {
                AuthError::InvalidRequest(format!("expires_in out of range: {:?}", expires_in))
            })
    }

    async fn complete_refresh(
        &self,
        generation: u64,
        previous_refresh_token: String,
        outcome: Result<TokenGrant>,
    ) -> Result<Credential> {
        let grant = match outcome {
            Ok(grant) => grant,
            Err(e) => {
                self.state.lock().refresh = None;
                tracing::warn!(error = %e, "Token refresh failed");
                return Err(e);
            }
        };

        let credential = {
            let mut state = self.state.lock();
            state.refresh = None;

            if state.generation != generation {
                // Credential was replaced or cleared while refreshing; the
                // newer state wins.
                tracing::debug!("Discarding refresh result for superseded credential");
                return state.credential.clone().ok_or(AuthError::MissingToken);
            }

            let expires_at =
                self.expiry_after(std::time::Duration::from_secs(grant.expires_in))?;

            let credential = Credential::Bearer {
                access_token: grant.access_token,
                refresh_token: Some(grant.refresh_token.unwrap_or(previous_refresh_token)),
                expires_at: Some(expires_at),
            };
            state.credential = Some(credential.clone());
            state.generation += 1;
            credential
        };

        tracing::info!("Token refreshed successfully");
        if let Err(e) = self.persist(&credential).await {
            tracing::warn!(error = %e, "Failed to persist refreshed credential");
        }
        Ok(credential)
    }

    async fn persist(&self, credential: &Credential) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store
            .save(&StoredCredential {
                credential: credential.clone(),
                saved_at: self.clock.now(),
            })
            .await
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`TokenStore`].
#[derive(Default)]
pub struct TokenStoreBuilder {
    credential: Option<Credential>,
    refresher: Option<SharedRefresher>,
    store: Option<SharedCredentialStore>,
    clock: Option<SharedClock>,
    skew: Option<Duration>,
}

impl TokenStoreBuilder {
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn refresher(mut self, refresher: SharedRefresher) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn store(mut self, store: SharedCredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override the refresh window (default 60 seconds).
    pub fn skew(mut self, skew: Duration) -> Self {
        self.skew = Some(skew);
        self
    }

    pub fn build(self) -> TokenStore {
        TokenStore {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    credential: self.credential,
                    ..Default::default()
                }),
                refresher: self.refresher,
                store: self.store,
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                skew: self.skew.unwrap_or(Duration::seconds(REFRESH_SKEW_SECS)),
            }),
        }
    }
}

// ============================================================================
// AuthStatus
// ============================================================================

/// Information about the held credential for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStatus {
    pub kind: &'static str,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in: Option<Duration>,
    pub is_expired: bool,
    pub has_refresh_token: bool,
}

impl AuthStatus {
    pub fn expires_in_display(&self) -> String {
        match self.expires_in {
            None => "Never".to_string(),
            Some(_) if self.is_expired => {
                if self.has_refresh_token {
                    "Expired (will refresh on next use)".to_string()
                } else {
                    "Expired".to_string()
                }
            }
            Some(remaining) => {
                let secs = remaining.num_seconds();
                format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::{CredentialStore, InMemoryCredentialStore};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug)]
    struct CountingRefresher {
        calls: AtomicU32,
        delay: std::time::Duration,
        fail: bool,
        rotate: bool,
    }

    impl CountingRefresher {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                delay: std::time::Duration::from_millis(20),
                fail: false,
                rotate: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(AuthError::Backend("refresh rejected".to_string()));
            }
            Ok(TokenGrant {
                access_token: format!("access-{}", n),
                refresh_token: self.rotate.then(|| format!("{}-rotated", refresh_token)),
                expires_in: 3600,
                token_type: Some("Bearer".to_string()),
                scope: None,
            })
        }
    }

    fn expiring_bearer(clock: &ManualClock, secs: i64) -> Credential {
        Credential::Bearer {
            access_token: "old".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(clock.now() + Duration::seconds(secs)),
        }
    }

    fn store_with(
        credential: Credential,
        refresher: Arc<CountingRefresher>,
        clock: Arc<ManualClock>,
    ) -> TokenStore {
        TokenStore::builder()
            .credential(credential)
            .refresher(refresher)
            .clock(clock)
            .build()
    }

    #[tokio::test]
    async fn test_missing_token() {
        let store = TokenStore::default();
        assert_eq!(
            store.current_headers().await.unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[tokio::test]
    async fn test_static_credentials_skip_expiry_logic() {
        let store = TokenStore::with_credential(Credential::api_key("X-API-Key", "k"));
        let headers = store.current_headers().await.unwrap();
        assert_eq!(headers["X-API-Key"], "k");

        let store = TokenStore::with_credential(Credential::session_token("s"));
        let headers = store.current_headers().await.unwrap();
        assert_eq!(headers["Authorization"], "Bearer s");
    }

    #[tokio::test]
    async fn test_fresh_token_is_not_refreshed() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(CountingRefresher::new());
        let store = store_with(expiring_bearer(&clock, 3600), refresher.clone(), clock);

        let headers = store.current_headers().await.unwrap();
        assert_eq!(headers["Authorization"], "Bearer old");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_bearer_without_expiry_never_refreshes() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(CountingRefresher::new());
        let store = store_with(
            Credential::bearer("forever", Some("r".to_string())),
            refresher.clone(),
            clock.clone(),
        );

        clock.advance(Duration::days(365));
        let headers = store.current_headers().await.unwrap();
        assert_eq!(headers["Authorization"], "Bearer forever");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_expiring_token_refreshes_once_for_concurrent_callers() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(CountingRefresher::new());
        let store = store_with(expiring_bearer(&clock, 30), refresher.clone(), clock);

        let calls = (0..10).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.current_headers().await })
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(refresher.calls(), 1);
        for result in results {
            let headers = result.unwrap().unwrap();
            assert_eq!(headers["Authorization"], "Bearer access-1");
        }
    }

    #[tokio::test]
    async fn test_refresh_retains_refresh_token_when_not_rotated() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(CountingRefresher {
            rotate: false,
            ..CountingRefresher::new()
        });
        let store = store_with(expiring_bearer(&clock, 10), refresher, clock.clone());

        let credential = store.refresh().await.unwrap();
        assert_eq!(credential.refresh_token(), Some("refresh"));
        assert_eq!(
            credential.expires_at(),
            Some(clock.now() + Duration::seconds(3600))
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_makes_no_calls() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(CountingRefresher::new());
        let credential = Credential::Bearer {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(clock.now()),
        };
        let store = store_with(credential, refresher.clone(), clock);

        assert_eq!(
            store.refresh().await.unwrap_err(),
            AuthError::MissingRefreshToken
        );
        assert_eq!(
            store.current_headers().await.unwrap_err(),
            AuthError::MissingRefreshToken
        );
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_not_supported_for_static_kinds() {
        let store = TokenStore::with_credential(Credential::session_token("s"));
        assert_eq!(
            store.refresh().await.unwrap_err(),
            AuthError::RefreshNotSupported("session_token")
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_is_shared_not_retried() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(CountingRefresher {
            fail: true,
            ..CountingRefresher::new()
        });
        let store = store_with(expiring_bearer(&clock, 0), refresher.clone(), clock);

        let calls = (0..5).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.current_headers().await })
        });
        for result in futures::future::join_all(calls).await {
            assert!(matches!(result.unwrap(), Err(AuthError::Backend(_))));
        }
        assert_eq!(refresher.calls(), 1);

        // The next caller starts a fresh attempt.
        assert!(store.current_headers().await.is_err());
        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn test_update_tokens_sets_expiry_and_keeps_refresh_token() {
        let clock = Arc::new(ManualClock::default());
        let memory = Arc::new(InMemoryCredentialStore::new());
        let store = TokenStore::builder()
            .credential(Credential::bearer("a", Some("keep-me".to_string())))
            .clock(clock.clone())
            .store(memory.clone())
            .build();

        store
            .update_tokens("b", None, std::time::Duration::from_secs(120))
            .await
            .unwrap();

        let status = store.status().unwrap();
        assert_eq!(status.expires_at, Some(clock.now() + Duration::seconds(120)));
        assert!(status.has_refresh_token);
        assert_eq!(memory.save_count(), 1);

        let saved = memory.load().await.unwrap().unwrap();
        assert_eq!(saved.credential.refresh_token(), Some("keep-me"));
        assert_eq!(
            store.current_headers().await.unwrap()["Authorization"],
            "Bearer b"
        );
    }

    #[tokio::test]
    async fn test_clear_wipes_memory_and_store() {
        let memory = Arc::new(InMemoryCredentialStore::new());
        let store = TokenStore::builder().store(memory.clone()).build();

        store
            .set_credential(Credential::session_token("s"))
            .await
            .unwrap();
        assert!(memory.load().await.unwrap().is_some());

        store.clear().await.unwrap();
        assert!(!store.has_credential());
        assert!(memory.load().await.unwrap().is_none());
        assert_eq!(
            store.current_headers().await.unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[tokio::test]
    async fn test_load_hydrates_from_store() {
        let memory = Arc::new(InMemoryCredentialStore::with_credential(
            StoredCredential {
                credential: Credential::session_token("persisted"),
                saved_at: Utc::now(),
            },
        ));
        let store = TokenStore::builder().store(memory).build();

        assert!(store.load().await.unwrap());
        assert_eq!(
            store.current_headers().await.unwrap()["Authorization"],
            "Bearer persisted"
        );
    }

    #[derive(Debug)]
    struct GatedRefresher {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(TokenGrant {
                access_token: "late".to_string(),
                refresh_token: None,
                expires_in: 3600,
                token_type: None,
                scope: None,
            })
        }
    }

    #[tokio::test]
    async fn test_clear_during_refresh_is_not_undone() {
        let clock = Arc::new(ManualClock::default());
        let refresher = Arc::new(GatedRefresher {
            started: Notify::new(),
            release: Notify::new(),
        });
        let store = TokenStore::builder()
            .credential(expiring_bearer(&clock, 0))
            .refresher(refresher.clone())
            .clock(clock)
            .build();

        let pending = {
            let store = store.clone();
            tokio::spawn(async move { store.current_headers().await })
        };
        refresher.started.notified().await;

        store.clear().await.unwrap();
        refresher.release.notify_one();

        assert_eq!(pending.await.unwrap().unwrap_err(), AuthError::MissingToken);
        assert!(!store.has_credential());
    }

    /// Clock whose first reading stalls, holding a caller between reading
    /// the credential and deciding to refresh.
    #[derive(Debug)]
    struct StallOnceClock {
        inner: ManualClock,
        stalled: std::sync::atomic::AtomicBool,
        stall: std::time::Duration,
    }

    impl Clock for StallOnceClock {
        fn now(&self) -> DateTime<Utc> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                std::thread::sleep(self.stall);
            }
            self.inner.now()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_caller_behind_finished_refresh_does_not_refresh_again() {
        let manual = ManualClock::default();
        let credential = expiring_bearer(&manual, 30);
        let clock = Arc::new(StallOnceClock {
            inner: manual,
            stalled: std::sync::atomic::AtomicBool::new(false),
            stall: std::time::Duration::from_millis(200),
        });
        let refresher = Arc::new(CountingRefresher::new());
        let store = TokenStore::builder()
            .credential(credential)
            .refresher(refresher.clone())
            .clock(clock)
            .build();

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.current_headers().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let fast = store.current_headers().await.unwrap();

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(refresher.calls(), 1);
        assert_eq!(fast["Authorization"], "Bearer access-1");
        assert_eq!(slow["Authorization"], "Bearer access-1");
        assert_eq!(store.status().map(|s| s.has_refresh_token), Some(true));
    }

    #[derive(Debug)]
    struct HugeLifetimeRefresher;

    #[async_trait]
    impl TokenRefresher for HugeLifetimeRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant> {
            Ok(TokenGrant {
                access_token: "forever".to_string(),
                refresh_token: None,
                expires_in: u64::MAX,
                token_type: None,
                scope: None,
            })
        }
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_rejected_consistently() {
        let clock = Arc::new(ManualClock::default());
        let credential = expiring_bearer(&clock, 0);
        let original_expiry = credential.expires_at();
        let store = TokenStore::builder()
            .credential(credential)
            .refresher(Arc::new(HugeLifetimeRefresher))
            .clock(clock)
            .build();

        let refreshed = store.refresh().await.unwrap_err();
        assert!(matches!(refreshed, AuthError::InvalidRequest(_)));
        assert_eq!(store.status().unwrap().expires_at, original_expiry);

        let updated = store
            .update_tokens("forever", None, std::time::Duration::from_secs(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(updated, AuthError::InvalidRequest(_)));
    }

    #[test]
    fn test_auth_status_display() {
        let expired = AuthStatus {
            kind: "bearer",
            expires_at: Some(Utc::now()),
            expires_in: Some(Duration::zero()),
            is_expired: true,
            has_refresh_token: true,
        };
        assert!(expired.expires_in_display().contains("will refresh"));

        let valid = AuthStatus {
            expires_in: Some(Duration::seconds(7200)),
            is_expired: false,
            ..expired.clone()
        };
        assert_eq!(valid.expires_in_display(), "2h 0m");

        let static_kind = AuthStatus {
            kind: "api_keys",
            expires_at: None,
            expires_in: None,
            is_expired: false,
            has_refresh_token: false,
        };
        assert_eq!(static_kind.expires_in_display(), "Never");
    }
}
