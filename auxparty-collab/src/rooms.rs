use chrono::{Duration, Utc};
use log::{info, warn};
use thiserror::Error;

use auxparty_spotify::{PlayerError, PlayerService};

use crate::{
    util::{random_room_code, random_string},
    CollabContext, Database, DatabaseError, Freshness, HostCredential, NewRoom, RoomData,
};

/// How long a presence row counts as connected without a new heartbeat.
pub const PRESENCE_TTL_MINUTES: i64 = 5;

/// Owns room records and guest presence.
pub struct RoomManager<P, Db> {
    context: CollabContext<P, Db>,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,

    #[error("Room code must be six digits")]
    InvalidCode,

    #[error("User is not the host of this room")]
    NotHost,

    #[error("User already has an active room")]
    AlreadyActive,

    #[error("The credential was rejected and the host must sign in again")]
    CredentialExpired,

    #[error(transparent)]
    Player(PlayerError),

    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// What a joining participant gets back.
#[derive(Debug)]
pub struct JoinOutcome {
    pub room: RoomData,
    /// The id presence was recorded under. Anonymous guests get a generated
    /// one and echo it back in later heartbeats.
    pub participant_id: String,
    /// Active guests plus the host
    pub connected_users: i64,
}

impl<P, Db> RoomManager<P, Db>
where
    P: PlayerService,
    Db: Database,
{
    pub fn new(context: &CollabContext<P, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a room for the host, sampling codes until a free one turns up
    pub async fn create(
        &self,
        host_id: &str,
        credential: HostCredential,
    ) -> Result<RoomData, RoomError> {
        match self.context.database.active_room_for_host(host_id).await {
            Ok(_) => return Err(RoomError::AlreadyActive),
            Err(DatabaseError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let code = loop {
            let candidate = random_room_code();

            match self.context.database.active_room_by_code(&candidate).await {
                Err(DatabaseError::NotFound { .. }) => break candidate,
                Ok(_) => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let room = self
            .context
            .database
            .create_room(NewRoom {
                code,
                host_id: host_id.to_string(),
                credential,
            })
            .await?;

        info!("User {} created room {}", host_id, room.code);
        Ok(room)
    }

    /// Returns the active room with this code
    pub async fn active_room_by_code(&self, code: &str) -> Result<RoomData, RoomError> {
        self.context
            .database
            .active_room_by_code(code)
            .await
            .map_err(not_found_as_room)
    }

    /// Returns the host's active room
    pub async fn active_room_for_host(&self, host_id: &str) -> Result<RoomData, RoomError> {
        self.context
            .database
            .active_room_for_host(host_id)
            .await
            .map_err(not_found_as_room)
    }

    /// Records a presence heartbeat and reports the participant count.
    ///
    /// Stale presence rows for the room are evicted on the way, so the
    /// count only reflects guests seen within the TTL.
    pub async fn join(&self, code: &str, user_id: Option<&str>) -> Result<JoinOutcome, RoomError> {
        if !is_valid_code(code) {
            return Err(RoomError::InvalidCode);
        }

        let room = self.active_room_by_code(code).await?;

        let participant_id = match user_id {
            Some(id) => id.to_string(),
            None => format!("guest-{}", random_string(12)),
        };

        let now = Utc::now();
        let cutoff = now - Duration::minutes(PRESENCE_TTL_MINUTES);
        let database = &self.context.database;

        database
            .upsert_connected_user(room.id, &participant_id, now)
            .await?;
        database.evict_stale_connected_users(room.id, cutoff).await?;

        let connected = database.count_connected_users(room.id, cutoff).await?;

        // The host does not heartbeat, they count as present by definition
        Ok(JoinOutcome {
            room,
            participant_id,
            connected_users: connected + 1,
        })
    }

    /// Removes a participant's presence row. Absence is not an error.
    pub async fn leave(&self, code: &str, user_id: &str) -> Result<(), RoomError> {
        let room = self.active_room_by_code(code).await?;

        self.context
            .database
            .delete_connected_user(room.id, user_id)
            .await?;

        Ok(())
    }

    /// Destroys the host's active room along with its queue and presence
    pub async fn destroy_for_host(&self, host_id: &str) -> Result<(), RoomError> {
        let room = self.active_room_for_host(host_id).await?;

        self.context.database.destroy_room(room.id).await?;

        info!("Room {} was destroyed by its host", room.code);
        Ok(())
    }

    /// Pushes the host's session credential into the room record, so guest
    /// requests keep working after the room's own pair goes bad.
    ///
    /// The pair is run through the token store first, so the room always
    /// receives a live credential. Returns what was stored.
    pub async fn sync_credential(
        &self,
        code: &str,
        host_id: &str,
        credential: &HostCredential,
    ) -> Result<HostCredential, RoomError> {
        let room = self.active_room_by_code(code).await?;

        if room.host.id != host_id {
            return Err(RoomError::NotHost);
        }

        let fresh = match self
            .context
            .tokens
            .ensure_fresh(credential)
            .await
            .map_err(RoomError::Player)?
        {
            Freshness::Cached(c) | Freshness::Refreshed(c) => c,
            Freshness::Denied { reason } => {
                warn!("Rejected credential sync for room {}: {}", room.code, reason);
                return Err(RoomError::CredentialExpired);
            }
        };

        self.context
            .database
            .update_room_credential(room.id, &fresh)
            .await?;

        info!("Room {} received a fresh host credential", room.code);
        Ok(fresh)
    }
}

fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

fn not_found_as_room(e: DatabaseError) -> RoomError {
    match e {
        DatabaseError::NotFound { .. } => RoomError::NotFound,
        e => RoomError::Db(e),
    }
}
