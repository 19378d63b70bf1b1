use log::{info, warn};
use thiserror::Error;

use auxparty_spotify::{NowPlaying, PlayerError, PlayerService, Track};

use crate::{
    util::TRACK_URI_REGEX, CollabContext, Database, DatabaseError, Freshness, HostCredential,
    NewQueueEntry, PendingQueue, QueueEntryData, RefreshOutcome, RoomData,
};

/// How many results a catalog search returns.
const SEARCH_LIMIT: u32 = 10;

/// Reconciles what the engine reports with what the room has recorded.
pub struct PlaybackManager<P, Db> {
    context: CollabContext<P, Db>,
    queue: PendingQueue<Db>,
}

/// Where a room's playback stands. Every view lands on exactly one of
/// these, raw engine failures never escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Ok,
    /// The engine answered but nothing is playing
    NoPlayback,
    /// No device is online for the host's account
    NoDevice,
    /// The host's credential was rejected and could not be refreshed
    HostSessionExpired,
    /// The host's account cannot drive playback
    NoPremium,
    /// Anything else, including transport faults
    Error,
}

/// The reconciled state of a room, safe to hand to any participant.
#[derive(Debug, Clone)]
pub struct PlaybackView {
    pub status: PlaybackStatus,
    pub current_track: Option<Track>,
    pub queue: Vec<QueuedItem>,
    pub progress_ms: u64,
    pub is_playing: bool,
}

/// An upcoming track as shown to a room participant.
#[derive(Debug, Clone)]
pub struct QueuedItem {
    pub uri: String,
    pub title: String,
    /// Present for locally recorded requests, absent for engine-reported
    /// queue items
    pub requested_by: Option<String>,
}

/// Which source the upcoming-queue part of a view is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The host sees the engine's own queue
    Host,
    /// Guests see the locally recorded pending entries
    Guest,
}

/// Who is asking for a catalog search.
pub enum Requester {
    /// The room's host, searching with their personal credential
    Host(HostCredential),
    /// Anyone else, served by the application token
    Guest,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Track uri is not playable")]
    InvalidTrackUri,

    #[error("No device is active on the host's account")]
    NoActiveDevice,

    #[error("The host's session has expired")]
    HostSessionExpired,

    #[error(transparent)]
    Player(PlayerError),

    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<P, Db> PlaybackManager<P, Db>
where
    P: PlayerService,
    Db: Database,
{
    pub fn new(context: &CollabContext<P, Db>) -> Self {
        Self {
            context: context.clone(),
            queue: PendingQueue::new(&context.database),
        }
    }

    /// Produces the reconciled view of a room's playback.
    ///
    /// A rejected token triggers exactly one refresh and one retry, with the
    /// room row updated in between so other participants pick up the new
    /// pair.
    pub async fn view(
        &self,
        room: &RoomData,
        audience: Audience,
    ) -> Result<PlaybackView, PlaybackError> {
        let token = &room.credential.access_token;

        match self.context.player.now_playing(token).await {
            Ok(playing) => self.assemble(room, playing, audience, token).await,
            Err(PlayerError::Unauthorized) => self.refresh_and_retry(room, audience).await,
            Err(PlayerError::NoPlayback) => Ok(PlaybackView::empty(PlaybackStatus::NoPlayback)),
            Err(PlayerError::PremiumRequired) => Ok(PlaybackView::empty(PlaybackStatus::NoPremium)),
            Err(PlayerError::NoActiveDevice) => Ok(PlaybackView::empty(PlaybackStatus::NoDevice)),
            Err(e) => {
                warn!("Playback view for room {} degraded: {}", room.code, e);
                Ok(PlaybackView::empty(PlaybackStatus::Error))
            }
        }
    }

    async fn refresh_and_retry(
        &self,
        room: &RoomData,
        audience: Audience,
    ) -> Result<PlaybackView, PlaybackError> {
        let outcome = match self.context.tokens.force_refresh(&room.credential).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Mid-view refresh for room {} failed: {}", room.code, e);
                return Ok(PlaybackView::empty(PlaybackStatus::Error));
            }
        };

        let fresh = match outcome {
            RefreshOutcome::Refreshed(fresh) => fresh,
            RefreshOutcome::Denied { .. } => {
                return Ok(PlaybackView::empty(PlaybackStatus::HostSessionExpired))
            }
        };

        // Guests read their tokens off this row, it must not keep the
        // rejected pair
        self.context
            .database
            .update_room_credential(room.id, &fresh)
            .await?;

        match self.context.player.now_playing(&fresh.access_token).await {
            Ok(playing) => self.assemble(room, playing, audience, &fresh.access_token).await,
            Err(PlayerError::NoPlayback) => Ok(PlaybackView::empty(PlaybackStatus::NoPlayback)),
            Err(e) => {
                // One retry only, a second rejection is a hard failure
                warn!("Playback retry for room {} failed: {}", room.code, e);
                Ok(PlaybackView::empty(PlaybackStatus::Error))
            }
        }
    }

    async fn assemble(
        &self,
        room: &RoomData,
        playing: NowPlaying,
        audience: Audience,
        access_token: &str,
    ) -> Result<PlaybackView, PlaybackError> {
        if let Some(track) = playing.item.as_ref() {
            // Seeing a track play is what advances the pending window
            self.queue.mark_played(room.id, &track.uri).await?;
        }

        let queue = match audience {
            Audience::Host => match self.context.player.player_queue(access_token).await {
                Ok(tracks) => tracks.into_iter().map(QueuedItem::from).collect(),
                Err(e) => {
                    // Best effort, the playing state is the important part
                    warn!("Could not fetch the engine queue for room {}: {}", room.code, e);
                    Vec::new()
                }
            },
            Audience::Guest => self
                .queue
                .pending(room.id)
                .await?
                .into_iter()
                .map(QueuedItem::from)
                .collect(),
        };

        Ok(PlaybackView {
            status: PlaybackStatus::Ok,
            current_track: playing.item,
            queue,
            progress_ms: playing.progress_ms.unwrap_or(0),
            is_playing: playing.is_playing,
        })
    }

    /// Pushes a track into the host's player and records it locally.
    ///
    /// The local record is only written once the engine has accepted the
    /// track, so a rejected push leaves no trace.
    pub async fn enqueue(
        &self,
        room: &RoomData,
        track_uri: &str,
        track_name: &str,
        added_by: &str,
    ) -> Result<QueueEntryData, PlaybackError> {
        if !TRACK_URI_REGEX.is_match(track_uri) {
            return Err(PlaybackError::InvalidTrackUri);
        }

        let credential = self.room_credential(room).await?;

        match self
            .context
            .player
            .enqueue(&credential.access_token, track_uri)
            .await
        {
            Ok(()) => {}
            Err(PlayerError::NoActiveDevice) => return Err(PlaybackError::NoActiveDevice),
            Err(e) => return Err(PlaybackError::Player(e)),
        }

        let entry = self
            .queue
            .record(NewQueueEntry {
                room_id: room.id,
                track_uri: track_uri.to_string(),
                track_name: track_name.to_string(),
                added_by: added_by.to_string(),
            })
            .await?;

        info!("{} queued {} in room {}", added_by, track_uri, room.code);
        Ok(entry)
    }

    /// The engine's own upcoming queue, best effort. Degrades to an empty
    /// list on any failure.
    pub async fn engine_queue(&self, room: &RoomData) -> Vec<Track> {
        match self
            .context
            .player
            .player_queue(&room.credential.access_token)
            .await
        {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Could not fetch the engine queue for room {}: {}", room.code, e);
                Vec::new()
            }
        }
    }

    /// Forwards a next-track command to the host's player
    pub async fn skip(&self, room: &RoomData) -> Result<(), PlaybackError> {
        let credential = self.room_credential(room).await?;

        match self.context.player.skip_next(&credential.access_token).await {
            Ok(()) => Ok(()),
            Err(PlayerError::NoActiveDevice) => Err(PlaybackError::NoActiveDevice),
            Err(e) => Err(PlaybackError::Player(e)),
        }
    }

    /// Searches the catalog on behalf of a room participant.
    ///
    /// Hosts search with their own credential so results match their market.
    /// A denied host refresh falls back to the guest path rather than
    /// failing the search.
    pub async fn search(
        &self,
        query: &str,
        requester: Requester,
    ) -> Result<Vec<Track>, PlaybackError> {
        let token = match requester {
            Requester::Host(credential) => {
                let freshness = self
                    .context
                    .tokens
                    .ensure_fresh(&credential)
                    .await
                    .map_err(PlaybackError::Player)?;

                match freshness {
                    Freshness::Cached(fresh) | Freshness::Refreshed(fresh) => fresh.access_token,
                    Freshness::Denied { .. } => self.client_token().await?,
                }
            }
            Requester::Guest => self.client_token().await?,
        };

        self.context
            .player
            .search_tracks(&token, query, SEARCH_LIMIT)
            .await
            .map_err(PlaybackError::Player)
    }

    async fn client_token(&self) -> Result<String, PlaybackError> {
        self.context
            .tokens
            .client_token()
            .await
            .map_err(PlaybackError::Player)
    }

    /// Resolves the room's stored credential, refreshing and persisting when
    /// it is stale.
    async fn room_credential(&self, room: &RoomData) -> Result<HostCredential, PlaybackError> {
        let freshness = self
            .context
            .tokens
            .ensure_fresh(&room.credential)
            .await
            .map_err(PlaybackError::Player)?;

        match freshness {
            Freshness::Cached(fresh) => Ok(fresh),
            Freshness::Refreshed(fresh) => {
                self.context
                    .database
                    .update_room_credential(room.id, &fresh)
                    .await?;

                Ok(fresh)
            }
            Freshness::Denied { .. } => Err(PlaybackError::HostSessionExpired),
        }
    }
}

impl PlaybackView {
    /// A view carrying no playing state, used for every non-ok status
    fn empty(status: PlaybackStatus) -> Self {
        Self {
            status,
            current_track: None,
            queue: Vec::new(),
            progress_ms: 0,
            is_playing: false,
        }
    }
}

impl From<Track> for QueuedItem {
    fn from(track: Track) -> Self {
        Self {
            uri: track.uri,
            title: track.name,
            requested_by: None,
        }
    }
}

impl From<QueueEntryData> for QueuedItem {
    fn from(entry: QueueEntryData) -> Self {
        Self {
            uri: entry.track_uri,
            title: entry.track_name,
            requested_by: Some(entry.added_by),
        }
    }
}
