use chrono::{DateTime, Utc};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// An OAuth token pair acting on a host's behalf.
///
/// The pair lives on the room row so guest requests can reach the host's
/// player without the host's own session, and on the session row so the host
/// can push a fresher pair into the room later.
#[derive(Debug, Clone)]
pub struct HostCredential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// A listener known to auxparty, mirrored from the identity provider.
#[derive(Debug, Clone)]
pub struct UserData {
    /// The provider's stable id for this account
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub user: UserData,
    /// The token pair deposited at login, synced into rooms on demand
    pub credential: HostCredential,
    pub expires_at: DateTime<Utc>,
}

/// A listening room
#[derive(Debug, Clone)]
pub struct RoomData {
    pub id: PrimaryKey,
    /// Six digit join code, unique among active rooms
    pub code: String,
    pub host: UserData,
    /// The credential guest requests act through
    pub credential: HostCredential,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A guest-submitted enqueue request, kept locally so guests can see what is
/// pending even when the engine's own queue is not readable for them.
#[derive(Debug, Clone)]
pub struct QueueEntryData {
    pub id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub track_uri: String,
    pub track_name: String,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
    pub played: bool,
}

/// A presence row. Rows are heartbeats, not connections; a row counts as
/// present only while `last_seen` is within the TTL window.
#[derive(Debug, Clone)]
pub struct ConnectedUserData {
    pub room_id: PrimaryKey,
    pub user_id: String,
    pub last_seen: DateTime<Utc>,
}
