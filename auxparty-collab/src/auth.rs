use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{info, warn};

use crate::{
    util::random_string, Database, DatabaseError, HostCredential, NewSession, NewUser, SessionData,
};

pub struct Auth<Db> {
    db: Arc<Db>,
}

/// A provider grant deposited by the host's client after it finishes the
/// interactive sign-in flow. auxparty never sees provider passwords; this is
/// the whole identity contract.
#[derive(Debug)]
pub struct SessionGrant {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 30;

    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Deposits a grant, returning a new session
    pub async fn create_session(&self, grant: SessionGrant) -> Result<SessionData, DatabaseError> {
        self.clear_expired().await;

        let user = self
            .db
            .upsert_user(NewUser {
                id: grant.user_id,
                display_name: grant.display_name,
                avatar_url: grant.avatar_url,
            })
            .await?;

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let session = self
            .db
            .create_session(NewSession {
                token: random_string(32),
                user_id: user.id.clone(),
                credential: HostCredential {
                    access_token: grant.access_token,
                    refresh_token: grant.refresh_token,
                    expires_at: Utc::now() + Duration::seconds(grant.expires_in),
                },
                expires_at,
            })
            .await?;

        info!("User {} logged in", user.id);
        Ok(session)
    }

    /// Returns a session if it exists and has not expired
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        let session = self.db.session_by_token(token).await?;

        if session.expires_at <= Utc::now() {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(session)
    }

    /// Writes a fresher token pair back onto the session row
    pub async fn update_credential(
        &self,
        token: &str,
        credential: &HostCredential,
    ) -> Result<(), DatabaseError> {
        self.db.update_session_credential(token, credential).await
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    async fn clear_expired(&self) {
        // Best effort, the expiry check in session() catches stragglers
        if let Err(e) = self.db.clear_expired_sessions().await {
            warn!("Failed to clear expired sessions: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemoryDatabase;

    fn grant(user_id: &str) -> SessionGrant {
        SessionGrant {
            user_id: user_id.to_string(),
            display_name: "Listener".to_string(),
            avatar_url: None,
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
        }
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let auth = Auth::new(&Arc::new(MemoryDatabase::new()));

        let session = auth.create_session(grant("user-1")).await.expect("created");
        assert_eq!(session.token.len(), 32);
        assert_eq!(session.user.id, "user-1");

        let resolved = auth.session(&session.token).await.expect("resolves");
        assert_eq!(resolved.id, session.id);

        auth.logout(&session.token).await.expect("logged out");
        assert!(auth.session(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn test_login_twice_updates_profile() {
        let auth = Auth::new(&Arc::new(MemoryDatabase::new()));

        auth.create_session(grant("user-1")).await.expect("created");

        let mut second = grant("user-1");
        second.display_name = "Renamed".to_string();

        let session = auth.create_session(second).await.expect("created again");
        assert_eq!(session.user.display_name, "Renamed");
    }
}
