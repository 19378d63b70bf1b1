use std::sync::Arc;

use crate::{Database, DatabaseError, NewQueueEntry, PrimaryKey, QueueEntryData};

/// How many pending entries are presented at once.
pub const PENDING_WINDOW: i64 = 10;

/// The locally persisted record of guest enqueue requests.
///
/// The engine's own queue is not readable with guest credentials, so every
/// accepted enqueue is mirrored here and presented back to guests until the
/// engine is observed playing it.
pub struct PendingQueue<Db> {
    db: Arc<Db>,
}

impl<Db> PendingQueue<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Records an accepted enqueue request
    pub async fn record(&self, new_entry: NewQueueEntry) -> Result<QueueEntryData, DatabaseError> {
        self.db.create_queue_entry(new_entry).await
    }

    /// The oldest unplayed entries, in submission order
    pub async fn pending(&self, room_id: PrimaryKey) -> Result<Vec<QueueEntryData>, DatabaseError> {
        self.db.unplayed_queue_entries(room_id, PENDING_WINDOW).await
    }

    /// Marks the oldest unplayed entry for this track as played, advancing
    /// the pending window. Returns whether anything matched.
    pub async fn mark_played(
        &self,
        room_id: PrimaryKey,
        track_uri: &str,
    ) -> Result<bool, DatabaseError> {
        self.db.mark_queue_entry_played(room_id, track_uri).await
    }

    /// Drops every entry for the room
    pub async fn clear(&self, room_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.db.clear_queue(room_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{MemoryDatabase, NewRoom, NewUser};
    use crate::testing::credential_expiring_in;

    async fn queue_with_room() -> (PendingQueue<MemoryDatabase>, PrimaryKey) {
        let db = Arc::new(MemoryDatabase::new());

        db.upsert_user(NewUser {
            id: "host".to_string(),
            display_name: "Host".to_string(),
            avatar_url: None,
        })
        .await
        .expect("host exists");

        let room = db
            .create_room(NewRoom {
                code: "123456".to_string(),
                host_id: "host".to_string(),
                credential: credential_expiring_in(3600),
            })
            .await
            .expect("room created");

        (PendingQueue::new(&db), room.id)
    }

    fn entry(room_id: PrimaryKey, uri: &str, name: &str) -> NewQueueEntry {
        NewQueueEntry {
            room_id,
            track_uri: uri.to_string(),
            track_name: name.to_string(),
            added_by: "guest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pending_is_capped_and_ordered() {
        let (queue, room_id) = queue_with_room().await;

        for i in 0..12 {
            queue
                .record(entry(room_id, &format!("spotify:track:{i}"), "Song"))
                .await
                .expect("recorded");
        }

        let pending = queue.pending(room_id).await.expect("listed");

        assert_eq!(pending.len(), PENDING_WINDOW as usize);
        assert_eq!(pending[0].track_uri, "spotify:track:0");
        assert_eq!(pending[9].track_uri, "spotify:track:9");
    }

    #[tokio::test]
    async fn test_marking_played_advances_the_window() {
        let (queue, room_id) = queue_with_room().await;

        for i in 0..11 {
            queue
                .record(entry(room_id, &format!("spotify:track:{i}"), "Song"))
                .await
                .expect("recorded");
        }

        let advanced = queue
            .mark_played(room_id, "spotify:track:0")
            .await
            .expect("marked");
        assert!(advanced);

        let pending = queue.pending(room_id).await.expect("listed");

        assert_eq!(pending[0].track_uri, "spotify:track:1");
        assert_eq!(pending[9].track_uri, "spotify:track:10");

        let missed = queue
            .mark_played(room_id, "spotify:track:0")
            .await
            .expect("second mark");
        assert!(!missed);
    }

    #[tokio::test]
    async fn test_clear_empties_the_room_queue() {
        let (queue, room_id) = queue_with_room().await;

        queue
            .record(entry(room_id, "spotify:track:a", "Song"))
            .await
            .expect("recorded");

        queue.clear(room_id).await.expect("cleared");

        assert!(queue.pending(room_id).await.expect("listed").is_empty());
    }
}
