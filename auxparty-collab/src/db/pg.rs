use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, FromRow, PgPool,
};

use crate::{
    Database, DatabaseError, HostCredential, IntoDatabaseError, NewQueueEntry, NewRoom, NewSession,
    NewUser, PrimaryKey, QueueEntryData, Result, RoomData, SessionData, UserData,
};

/// A postgres database implementation for auxparty
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    display_name: String,
    avatar_url: Option<String>,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    user_id: String,
    access_token: String,
    refresh_token: String,
    token_expires_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    user_display_name: String,
    user_avatar_url: Option<String>,
}

#[derive(FromRow)]
struct RoomRow {
    id: PrimaryKey,
    code: String,
    host_id: String,
    access_token: String,
    refresh_token: String,
    token_expires_at: DateTime<Utc>,
    active: bool,
    created_at: DateTime<Utc>,
    host_display_name: String,
    host_avatar_url: Option<String>,
}

#[derive(FromRow)]
struct QueueEntryRow {
    id: PrimaryKey,
    room_id: PrimaryKey,
    track_uri: String,
    track_name: String,
    added_by: String,
    added_at: DateTime<Utc>,
    played: bool,
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
        }
    }
}

impl From<SessionRow> for SessionData {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            user: UserData {
                id: row.user_id,
                display_name: row.user_display_name,
                avatar_url: row.user_avatar_url,
            },
            credential: HostCredential {
                access_token: row.access_token,
                refresh_token: row.refresh_token,
                expires_at: row.token_expires_at,
            },
            expires_at: row.expires_at,
        }
    }
}

impl From<RoomRow> for RoomData {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            host: UserData {
                id: row.host_id,
                display_name: row.host_display_name,
                avatar_url: row.host_avatar_url,
            },
            credential: HostCredential {
                access_token: row.access_token,
                refresh_token: row.refresh_token,
                expires_at: row.token_expires_at,
            },
            active: row.active,
            created_at: row.created_at,
        }
    }
}

impl From<QueueEntryRow> for QueueEntryData {
    fn from(row: QueueEntryRow) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            track_uri: row.track_uri,
            track_name: row.track_name,
            added_by: row.added_by,
            added_at: row.added_at,
            played: row.played,
        }
    }
}

const SELECT_SESSION: &str = "
    SELECT
        sessions.*,
        users.display_name AS user_display_name,
        users.avatar_url AS user_avatar_url
    FROM sessions
        INNER JOIN users ON sessions.user_id = users.id
";

const SELECT_ROOM: &str = "
    SELECT
        rooms.*,
        users.display_name AS host_display_name,
        users.avatar_url AS host_avatar_url
    FROM rooms
        INNER JOIN users ON rooms.host_id = users.id
";

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn upsert_user(&self, new_user: NewUser) -> Result<UserData> {
        query_as::<_, UserRow>(
            "INSERT INTO users (id, display_name, avatar_url) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE
                SET display_name = EXCLUDED.display_name, avatar_url = EXCLUDED.avatar_url
             RETURNING *",
        )
        .bind(&new_user.id)
        .bind(&new_user.display_name)
        .bind(&new_user.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        query_as::<_, SessionRow>(&format!("{} WHERE token = $1", SELECT_SESSION))
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        query(
            "INSERT INTO sessions (token, user_id, access_token, refresh_token, token_expires_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&new_session.token)
        .bind(&new_session.user_id)
        .bind(&new_session.credential.access_token)
        .bind(&new_session.credential.refresh_token)
        .bind(new_session.credential.expires_at)
        .bind(new_session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| e.conflict_or_any("session", "token", &new_session.token))?;

        self.session_by_token(&new_session.token).await
    }

    async fn update_session_credential(
        &self,
        token: &str,
        credential: &HostCredential,
    ) -> Result<()> {
        let result = query(
            "UPDATE sessions SET access_token = $1, refresh_token = $2, token_expires_at = $3
             WHERE token = $4",
        )
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(())
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        query("DELETE FROM sessions WHERE now() >= expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        query_as::<_, RoomRow>(&format!("{} WHERE rooms.id = $1", SELECT_ROOM))
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map(Into::into)
            .map_err(|e| e.not_found_or("room", "id"))
    }

    async fn active_room_by_code(&self, code: &str) -> Result<RoomData> {
        query_as::<_, RoomRow>(&format!(
            "{} WHERE rooms.code = $1 AND rooms.active",
            SELECT_ROOM
        ))
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("room", "code"))
    }

    async fn active_room_for_host(&self, host_id: &str) -> Result<RoomData> {
        query_as::<_, RoomRow>(&format!(
            "{} WHERE rooms.host_id = $1 AND rooms.active",
            SELECT_ROOM
        ))
        .bind(host_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("room", "host"))
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let room_id = query_scalar::<_, PrimaryKey>(
            "INSERT INTO rooms (code, host_id, access_token, refresh_token, token_expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(&new_room.code)
        .bind(&new_room.host_id)
        .bind(&new_room.credential.access_token)
        .bind(&new_room.credential.refresh_token)
        .bind(new_room.credential.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or_any("room", "code", &new_room.code))?;

        self.room_by_id(room_id).await
    }

    async fn update_room_credential(
        &self,
        room_id: PrimaryKey,
        credential: &HostCredential,
    ) -> Result<()> {
        let result = query(
            "UPDATE rooms SET access_token = $1, refresh_token = $2, token_expires_at = $3
             WHERE id = $4",
        )
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .bind(room_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn destroy_room(&self, room_id: PrimaryKey) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        query("DELETE FROM room_queue WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        query("DELETE FROM connected_users WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        let result = query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            });
        }

        tx.commit().await.map_err(|e| e.any())
    }

    async fn create_queue_entry(&self, new_entry: NewQueueEntry) -> Result<QueueEntryData> {
        query_as::<_, QueueEntryRow>(
            "INSERT INTO room_queue (room_id, track_uri, track_name, added_by)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(new_entry.room_id)
        .bind(&new_entry.track_uri)
        .bind(&new_entry.track_name)
        .bind(&new_entry.added_by)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn unplayed_queue_entries(
        &self,
        room_id: PrimaryKey,
        limit: i64,
    ) -> Result<Vec<QueueEntryData>> {
        let rows = query_as::<_, QueueEntryRow>(
            "SELECT * FROM room_queue
             WHERE room_id = $1 AND NOT played
             ORDER BY added_at ASC, id ASC
             LIMIT $2",
        )
        .bind(room_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_queue_entry_played(&self, room_id: PrimaryKey, track_uri: &str) -> Result<bool> {
        let result = query(
            "UPDATE room_queue SET played = TRUE
             WHERE id = (
                SELECT id FROM room_queue
                WHERE room_id = $1 AND track_uri = $2 AND NOT played
                ORDER BY added_at ASC, id ASC
                LIMIT 1
             )",
        )
        .bind(room_id)
        .bind(track_uri)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_queue(&self, room_id: PrimaryKey) -> Result<()> {
        query("DELETE FROM room_queue WHERE room_id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn upsert_connected_user(
        &self,
        room_id: PrimaryKey,
        user_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        query(
            "INSERT INTO connected_users (room_id, user_id, last_seen) VALUES ($1, $2, $3)
             ON CONFLICT (room_id, user_id) DO UPDATE SET last_seen = EXCLUDED.last_seen",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(seen_at)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())
        .map(|_| ())
    }

    async fn delete_connected_user(&self, room_id: PrimaryKey, user_id: &str) -> Result<()> {
        query("DELETE FROM connected_users WHERE room_id = $1 AND user_id = $2")
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn evict_stale_connected_users(
        &self,
        room_id: PrimaryKey,
        cutoff: DateTime<Utc>,
    ) -> Result<()> {
        query("DELETE FROM connected_users WHERE room_id = $1 AND last_seen <= $2")
            .bind(room_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn count_connected_users(
        &self,
        room_id: PrimaryKey,
        cutoff: DateTime<Utc>,
    ) -> Result<i64> {
        query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM connected_users WHERE room_id = $1 AND last_seen > $2",
        )
        .bind(room_id)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }

    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        match &self {
            SqlxError::Database(e) if e.code().as_deref() == Some("23505") => {
                DatabaseError::Conflict {
                    resource,
                    field,
                    value: value.to_string(),
                }
            }
            _ => self.any(),
        }
    }
}
