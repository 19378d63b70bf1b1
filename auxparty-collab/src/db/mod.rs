use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Represents a type that can store and fetch auxparty data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: &str) -> Result<UserData>;
    /// Creates the user, or refreshes the profile fields if it already exists
    async fn upsert_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn update_session_credential(
        &self,
        token: &str,
        credential: &HostCredential,
    ) -> Result<()>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData>;
    async fn active_room_by_code(&self, code: &str) -> Result<RoomData>;
    async fn active_room_for_host(&self, host_id: &str) -> Result<RoomData>;
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;
    async fn update_room_credential(
        &self,
        room_id: PrimaryKey,
        credential: &HostCredential,
    ) -> Result<()>;
    /// Deletes the room along with its queue and presence rows, atomically
    async fn destroy_room(&self, room_id: PrimaryKey) -> Result<()>;

    async fn create_queue_entry(&self, new_entry: NewQueueEntry) -> Result<QueueEntryData>;
    /// The oldest entries not yet marked played, in submission order
    async fn unplayed_queue_entries(
        &self,
        room_id: PrimaryKey,
        limit: i64,
    ) -> Result<Vec<QueueEntryData>>;
    /// Marks the oldest unplayed entry with this track uri as played.
    /// Returns whether an entry was updated.
    async fn mark_queue_entry_played(&self, room_id: PrimaryKey, track_uri: &str) -> Result<bool>;
    async fn clear_queue(&self, room_id: PrimaryKey) -> Result<()>;

    async fn upsert_connected_user(
        &self,
        room_id: PrimaryKey,
        user_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn delete_connected_user(&self, room_id: PrimaryKey, user_id: &str) -> Result<()>;
    /// Removes presence rows last seen at or before the cutoff
    async fn evict_stale_connected_users(
        &self,
        room_id: PrimaryKey,
        cutoff: DateTime<Utc>,
    ) -> Result<()>;
    /// Counts presence rows seen after the cutoff
    async fn count_connected_users(
        &self,
        room_id: PrimaryKey,
        cutoff: DateTime<Utc>,
    ) -> Result<i64>;
}

#[derive(Debug)]
pub struct NewUser {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: String,
    pub credential: HostCredential,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewRoom {
    pub code: String,
    /// The host of the new room
    pub host_id: String,
    pub credential: HostCredential,
}

#[derive(Debug)]
pub struct NewQueueEntry {
    pub room_id: PrimaryKey,
    pub track_uri: String,
    pub track_name: String,
    pub added_by: String,
}
