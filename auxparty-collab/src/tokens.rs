use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use parking_lot::Mutex;

use auxparty_spotify::{PlayerError, PlayerService};

use crate::HostCredential;

/// How many seconds before expiry a credential already counts as stale.
const EXPIRY_BUFFER_SECONDS: i64 = 300;

/// Keeps host credentials usable.
///
/// The store never holds host credentials itself. Callers pass the stored
/// pair in and get a value back, along with whether it changed and should be
/// persisted. The only state here is the application-level token backing
/// guest search, plus counters.
pub struct TokenStore<P> {
    player: Arc<P>,
    app_token: Mutex<Option<AppToken>>,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

struct AppToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// The result of asking for a usable credential.
#[derive(Debug)]
pub enum Freshness {
    /// The stored credential is still comfortably within its lifetime
    Cached(HostCredential),
    /// A new pair was obtained and should be persisted by the caller
    Refreshed(HostCredential),
    /// The provider rejected the refresh token, so the host has to sign in
    /// again. This is a state, not a transport failure.
    Denied { reason: String },
}

/// The result of an unconditional refresh round-trip.
#[derive(Debug)]
pub enum RefreshOutcome {
    Refreshed(HostCredential),
    Denied { reason: String },
}

impl<P> TokenStore<P>
where
    P: PlayerService,
{
    pub fn new(player: &Arc<P>) -> Self {
        Self {
            player: player.clone(),
            app_token: Mutex::new(None),
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Returns a usable credential, refreshing only when the stored one is
    /// within the expiry buffer.
    pub async fn ensure_fresh(
        &self,
        credential: &HostCredential,
    ) -> Result<Freshness, PlayerError> {
        if !is_stale(credential.expires_at) {
            return Ok(Freshness::Cached(credential.clone()));
        }

        match self.force_refresh(credential).await? {
            RefreshOutcome::Refreshed(fresh) => Ok(Freshness::Refreshed(fresh)),
            RefreshOutcome::Denied { reason } => Ok(Freshness::Denied { reason }),
        }
    }

    /// Performs a refresh round-trip regardless of the stored expiry.
    ///
    /// Used when the engine rejects a token the expiry math still considered
    /// valid.
    pub async fn force_refresh(
        &self,
        credential: &HostCredential,
    ) -> Result<RefreshOutcome, PlayerError> {
        match self.player.refresh_token(&credential.refresh_token).await {
            Ok(grant) => {
                self.refreshes.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Refreshed a host credential, valid for another {}s",
                    grant.expires_in
                );

                // Rotation only replaces the refresh token when the provider
                // actually sends a new one
                let fresh = HostCredential {
                    access_token: grant.access_token,
                    refresh_token: grant
                        .refresh_token
                        .unwrap_or_else(|| credential.refresh_token.clone()),
                    expires_at: Utc::now() + Duration::seconds(grant.expires_in),
                };

                Ok(RefreshOutcome::Refreshed(fresh))
            }
            Err(PlayerError::GrantDenied { reason }) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("A host credential refresh was denied: {}", reason);

                Ok(RefreshOutcome::Denied { reason })
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Returns the application-scoped token used for guest search, fetching
    /// a new one when the cached token is stale.
    pub async fn client_token(&self) -> Result<String, PlayerError> {
        {
            let cached = self.app_token.lock();

            if let Some(token) = cached.as_ref() {
                if !is_stale(token.expires_at) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let grant = self.player.client_credentials().await?;
        info!("Obtained a new client credentials token");

        let token = AppToken {
            access_token: grant.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(grant.expires_in),
        };

        *self.app_token.lock() = Some(token);
        Ok(grant.access_token)
    }

    /// How many refresh round-trips have succeeded.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// How many refresh round-trips were denied or failed.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

fn is_stale(expires_at: DateTime<Utc>) -> bool {
    Utc::now() + Duration::seconds(EXPIRY_BUFFER_SECONDS) >= expires_at
}
