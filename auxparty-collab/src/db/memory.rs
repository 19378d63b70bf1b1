use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    ConnectedUserData, Database, DatabaseError, HostCredential, NewQueueEntry, NewRoom, NewSession,
    NewUser, PrimaryKey, QueueEntryData, Result, RoomData, SessionData, UserData,
};

/// An in-memory database used by tests and local development.
pub struct MemoryDatabase {
    inner: Mutex<Inner>,
    fail_destroy: AtomicBool,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserData>,
    sessions: Vec<StoredSession>,
    rooms: Vec<StoredRoom>,
    queue: Vec<QueueEntryData>,
    connected: Vec<ConnectedUserData>,
    next_session_id: PrimaryKey,
    next_room_id: PrimaryKey,
    next_queue_id: PrimaryKey,
}

struct StoredSession {
    id: PrimaryKey,
    token: String,
    user_id: String,
    credential: HostCredential,
    expires_at: DateTime<Utc>,
}

struct StoredRoom {
    id: PrimaryKey,
    code: String,
    host_id: String,
    credential: HostCredential,
    active: bool,
    created_at: DateTime<Utc>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            fail_destroy: AtomicBool::new(false),
        }
    }

    /// Test hook. Makes the next `destroy_room` call fail before it touches
    /// any rows.
    pub fn break_next_destroy(&self) {
        self.fail_destroy.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn user(&self, user_id: &str) -> Result<UserData> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })
    }

    fn session_data(&self, stored: &StoredSession) -> Result<SessionData> {
        Ok(SessionData {
            id: stored.id,
            token: stored.token.clone(),
            user: self.user(&stored.user_id)?,
            credential: stored.credential.clone(),
            expires_at: stored.expires_at,
        })
    }

    fn room_data(&self, stored: &StoredRoom) -> Result<RoomData> {
        Ok(RoomData {
            id: stored.id,
            code: stored.code.clone(),
            host: self.user(&stored.host_id)?,
            credential: stored.credential.clone(),
            active: stored.active,
            created_at: stored.created_at,
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: &str) -> Result<UserData> {
        self.inner.lock().user(user_id)
    }

    async fn upsert_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut inner = self.inner.lock();

        let user = UserData {
            id: new_user.id.clone(),
            display_name: new_user.display_name,
            avatar_url: new_user.avatar_url,
        };

        inner.users.insert(new_user.id, user.clone());
        Ok(user)
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let inner = self.inner.lock();

        let stored = inner
            .sessions
            .iter()
            .find(|s| s.token == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        inner.session_data(stored)
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut inner = self.inner.lock();

        if inner.sessions.iter().any(|s| s.token == new_session.token) {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "token",
                value: new_session.token,
            });
        }

        inner.user(&new_session.user_id)?;
        inner.next_session_id += 1;

        let stored = StoredSession {
            id: inner.next_session_id,
            token: new_session.token,
            user_id: new_session.user_id,
            credential: new_session.credential,
            expires_at: new_session.expires_at,
        };

        let data = inner.session_data(&stored)?;
        inner.sessions.push(stored);

        Ok(data)
    }

    async fn update_session_credential(
        &self,
        token: &str,
        credential: &HostCredential,
    ) -> Result<()> {
        let mut inner = self.inner.lock();

        let stored = inner
            .sessions
            .iter_mut()
            .find(|s| s.token == token)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            })?;

        stored.credential = credential.clone();
        Ok(())
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        let mut inner = self.inner.lock();

        if !inner.sessions.iter().any(|s| s.token == token) {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        inner.sessions.retain(|s| s.token != token);
        Ok(())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        self.inner.lock().sessions.retain(|s| s.expires_at > now);
        Ok(())
    }

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData> {
        let inner = self.inner.lock();

        let stored = inner
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })?;

        inner.room_data(stored)
    }

    async fn active_room_by_code(&self, code: &str) -> Result<RoomData> {
        let inner = self.inner.lock();

        let stored = inner
            .rooms
            .iter()
            .find(|r| r.code == code && r.active)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "code",
            })?;

        inner.room_data(stored)
    }

    async fn active_room_for_host(&self, host_id: &str) -> Result<RoomData> {
        let inner = self.inner.lock();

        let stored = inner
            .rooms
            .iter()
            .find(|r| r.host_id == host_id && r.active)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "host",
            })?;

        inner.room_data(stored)
    }

    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData> {
        let mut inner = self.inner.lock();

        if inner
            .rooms
            .iter()
            .any(|r| r.code == new_room.code && r.active)
        {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "code",
                value: new_room.code,
            });
        }

        if inner
            .rooms
            .iter()
            .any(|r| r.host_id == new_room.host_id && r.active)
        {
            return Err(DatabaseError::Conflict {
                resource: "room",
                field: "host",
                value: new_room.host_id,
            });
        }

        inner.user(&new_room.host_id)?;
        inner.next_room_id += 1;

        let stored = StoredRoom {
            id: inner.next_room_id,
            code: new_room.code,
            host_id: new_room.host_id,
            credential: new_room.credential,
            active: true,
            created_at: Utc::now(),
        };

        let data = inner.room_data(&stored)?;
        inner.rooms.push(stored);

        Ok(data)
    }

    async fn update_room_credential(
        &self,
        room_id: PrimaryKey,
        credential: &HostCredential,
    ) -> Result<()> {
        let mut inner = self.inner.lock();

        let stored = inner
            .rooms
            .iter_mut()
            .find(|r| r.id == room_id)
            .ok_or(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            })?;

        stored.credential = credential.clone();
        Ok(())
    }

    async fn destroy_room(&self, room_id: PrimaryKey) -> Result<()> {
        if self.fail_destroy.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::Internal(Box::new(io::Error::new(
                io::ErrorKind::Other,
                "simulated destroy failure",
            ))));
        }

        let mut inner = self.inner.lock();

        if !inner.rooms.iter().any(|r| r.id == room_id) {
            return Err(DatabaseError::NotFound {
                resource: "room",
                identifier: "id",
            });
        }

        inner.queue.retain(|entry| entry.room_id != room_id);
        inner.connected.retain(|row| row.room_id != room_id);
        inner.rooms.retain(|room| room.id != room_id);

        Ok(())
    }

    async fn create_queue_entry(&self, new_entry: NewQueueEntry) -> Result<QueueEntryData> {
        let mut inner = self.inner.lock();
        inner.next_queue_id += 1;

        let entry = QueueEntryData {
            id: inner.next_queue_id,
            room_id: new_entry.room_id,
            track_uri: new_entry.track_uri,
            track_name: new_entry.track_name,
            added_by: new_entry.added_by,
            added_at: Utc::now(),
            played: false,
        };

        inner.queue.push(entry.clone());
        Ok(entry)
    }

    async fn unplayed_queue_entries(
        &self,
        room_id: PrimaryKey,
        limit: i64,
    ) -> Result<Vec<QueueEntryData>> {
        let inner = self.inner.lock();

        let mut entries: Vec<_> = inner
            .queue
            .iter()
            .filter(|entry| entry.room_id == room_id && !entry.played)
            .cloned()
            .collect();

        entries.sort_by_key(|entry| (entry.added_at, entry.id));
        entries.truncate(limit as usize);

        Ok(entries)
    }

    async fn mark_queue_entry_played(&self, room_id: PrimaryKey, track_uri: &str) -> Result<bool> {
        let mut inner = self.inner.lock();

        let oldest = inner
            .queue
            .iter_mut()
            .filter(|entry| entry.room_id == room_id && entry.track_uri == track_uri && !entry.played)
            .min_by_key(|entry| (entry.added_at, entry.id));

        match oldest {
            Some(entry) => {
                entry.played = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_queue(&self, room_id: PrimaryKey) -> Result<()> {
        self.inner
            .lock()
            .queue
            .retain(|entry| entry.room_id != room_id);

        Ok(())
    }

    async fn upsert_connected_user(
        &self,
        room_id: PrimaryKey,
        user_id: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock();

        let existing = inner
            .connected
            .iter_mut()
            .find(|row| row.room_id == room_id && row.user_id == user_id);

        match existing {
            Some(row) => row.last_seen = seen_at,
            None => inner.connected.push(ConnectedUserData {
                room_id,
                user_id: user_id.to_string(),
                last_seen: seen_at,
            }),
        }

        Ok(())
    }

    async fn delete_connected_user(&self, room_id: PrimaryKey, user_id: &str) -> Result<()> {
        self.inner
            .lock()
            .connected
            .retain(|row| !(row.room_id == room_id && row.user_id == user_id));

        Ok(())
    }

    async fn evict_stale_connected_users(
        &self,
        room_id: PrimaryKey,
        cutoff: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .lock()
            .connected
            .retain(|row| row.room_id != room_id || row.last_seen > cutoff);

        Ok(())
    }

    async fn count_connected_users(
        &self,
        room_id: PrimaryKey,
        cutoff: DateTime<Utc>,
    ) -> Result<i64> {
        let count = self
            .inner
            .lock()
            .connected
            .iter()
            .filter(|row| row.room_id == room_id && row.last_seen > cutoff)
            .count();

        Ok(count as i64)
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    fn credential() -> HostCredential {
        HostCredential {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    async fn room_with_host(db: &MemoryDatabase) -> RoomData {
        db.upsert_user(NewUser {
            id: "host".to_string(),
            display_name: "Host".to_string(),
            avatar_url: None,
        })
        .await
        .expect("user created");

        db.create_room(NewRoom {
            code: "123456".to_string(),
            host_id: "host".to_string(),
            credential: credential(),
        })
        .await
        .expect("room created")
    }

    #[tokio::test]
    async fn test_played_marking_picks_oldest_entry() {
        let db = MemoryDatabase::new();
        let room = room_with_host(&db).await;

        for _ in 0..2 {
            db.create_queue_entry(NewQueueEntry {
                room_id: room.id,
                track_uri: "spotify:track:a".to_string(),
                track_name: "A".to_string(),
                added_by: "guest".to_string(),
            })
            .await
            .expect("entry created");
        }

        assert!(db
            .mark_queue_entry_played(room.id, "spotify:track:a")
            .await
            .expect("marks"));

        let remaining = db
            .unplayed_queue_entries(room.id, 10)
            .await
            .expect("lists");

        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);
    }

    #[tokio::test]
    async fn test_presence_upsert_does_not_duplicate() {
        let db = MemoryDatabase::new();
        let room = room_with_host(&db).await;
        let now = Utc::now();

        db.upsert_connected_user(room.id, "guest-1", now)
            .await
            .expect("upserted");
        db.upsert_connected_user(room.id, "guest-1", now + Duration::seconds(30))
            .await
            .expect("upserted again");

        let count = db
            .count_connected_users(room.id, now - Duration::minutes(5))
            .await
            .expect("counts");

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_code_reuse_after_room_destroyed() {
        let db = MemoryDatabase::new();
        let room = room_with_host(&db).await;

        db.destroy_room(room.id).await.expect("destroyed");

        let recreated = db
            .create_room(NewRoom {
                code: "123456".to_string(),
                host_id: "host".to_string(),
                credential: credential(),
            })
            .await
            .expect("code is free again");

        assert_eq!(recreated.code, "123456");
    }
}
