//! All schemas that are exposed from endpoints are defined here
//! along with the conversion impls

use serde::Serialize;
use utoipa::ToSchema;

use auxparty_collab::{
    JoinOutcome, PlaybackStatus as CollabPlaybackStatus, PlaybackView, QueueEntryData, QueuedItem,
    RoomData, SessionData, UserData,
};
use auxparty_spotify::Track as SpotifyTrack;

#[derive(Debug, Serialize, ToSchema)]
pub struct User {
    id: String,
    display_name: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Room {
    code: String,
    host: User,
    active: bool,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResult {
    room: Room,
    /// The id presence was recorded under, echoed back in later joins
    participant_id: String,
    connected_users: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Ok,
    NoPlayback,
    NoDevice,
    HostSessionExpired,
    NoPremium,
    Error,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Playback {
    status: PlaybackStatus,
    /// One-line guidance for everything that is not `ok`
    message: Option<String>,
    current_track: Option<Track>,
    queue: Vec<QueueItem>,
    progress_ms: u64,
    is_playing: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueItem {
    uri: String,
    title: String,
    requested_by: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Track {
    name: String,
    uri: String,
    duration_ms: u64,
    artists: Vec<String>,
    album: String,
    album_art: Option<String>,
}

impl PlaybackStatus {
    fn message(&self) -> Option<String> {
        let text = match self {
            Self::Ok => return None,
            Self::NoPlayback => "The host needs to start playing music on their Spotify account.",
            Self::NoDevice => "Please make sure Spotify is open and playing on any device.",
            Self::HostSessionExpired => "The host needs to log in to Spotify again.",
            Self::NoPremium => "This feature requires the host to have a Spotify Premium account.",
            Self::Error => "There was an error connecting to the room. Please try again.",
        };

        Some(text.to_string())
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Room> for RoomData {
    fn to_serialized(&self) -> Room {
        Room {
            code: self.code.clone(),
            host: self.host.to_serialized(),
            active: self.active,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl ToSerialized<JoinResult> for JoinOutcome {
    fn to_serialized(&self) -> JoinResult {
        JoinResult {
            room: self.room.to_serialized(),
            participant_id: self.participant_id.clone(),
            connected_users: self.connected_users,
        }
    }
}

impl ToSerialized<PlaybackStatus> for CollabPlaybackStatus {
    fn to_serialized(&self) -> PlaybackStatus {
        match self {
            CollabPlaybackStatus::Ok => PlaybackStatus::Ok,
            CollabPlaybackStatus::NoPlayback => PlaybackStatus::NoPlayback,
            CollabPlaybackStatus::NoDevice => PlaybackStatus::NoDevice,
            CollabPlaybackStatus::HostSessionExpired => PlaybackStatus::HostSessionExpired,
            CollabPlaybackStatus::NoPremium => PlaybackStatus::NoPremium,
            CollabPlaybackStatus::Error => PlaybackStatus::Error,
        }
    }
}

impl ToSerialized<Playback> for PlaybackView {
    fn to_serialized(&self) -> Playback {
        let status = self.status.to_serialized();

        Playback {
            message: status.message(),
            status,
            current_track: self.current_track.as_ref().map(|t| t.to_serialized()),
            queue: self.queue.to_serialized(),
            progress_ms: self.progress_ms,
            is_playing: self.is_playing,
        }
    }
}

impl ToSerialized<QueueItem> for QueuedItem {
    fn to_serialized(&self) -> QueueItem {
        QueueItem {
            uri: self.uri.clone(),
            title: self.title.clone(),
            requested_by: self.requested_by.clone(),
        }
    }
}

impl ToSerialized<QueueItem> for QueueEntryData {
    fn to_serialized(&self) -> QueueItem {
        QueueItem {
            uri: self.track_uri.clone(),
            title: self.track_name.clone(),
            requested_by: Some(self.added_by.clone()),
        }
    }
}

impl ToSerialized<Track> for SpotifyTrack {
    fn to_serialized(&self) -> Track {
        Track {
            name: self.name.clone(),
            uri: self.uri.clone(),
            duration_ms: self.duration_ms,
            artists: self.artists.iter().map(|a| a.name.clone()).collect(),
            album: self.album.name.clone(),
            album_art: self.album.images.first().map(|image| image.url.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names_are_snake_case() {
        let value = serde_json::to_value(PlaybackStatus::HostSessionExpired).expect("serializes");
        assert_eq!(value, json!("host_session_expired"));

        let value = serde_json::to_value(PlaybackStatus::NoPlayback).expect("serializes");
        assert_eq!(value, json!("no_playback"));
    }

    #[test]
    fn test_every_degraded_status_carries_guidance() {
        assert_eq!(PlaybackStatus::Ok.message(), None);

        let degraded = [
            PlaybackStatus::NoPlayback,
            PlaybackStatus::NoDevice,
            PlaybackStatus::HostSessionExpired,
            PlaybackStatus::NoPremium,
            PlaybackStatus::Error,
        ];

        for status in degraded {
            assert!(status.message().is_some());
        }
    }

    #[test]
    fn test_no_device_guidance_names_the_device() {
        let message = PlaybackStatus::NoDevice.message().expect("has guidance");
        assert!(message.contains("Spotify is open"));
    }

    #[test]
    fn test_track_serialization_picks_the_first_album_image() {
        let track: SpotifyTrack = serde_json::from_value(json!({
            "id": "abc",
            "name": "Song",
            "uri": "spotify:track:abc",
            "duration_ms": 1000,
            "artists": [{ "name": "First" }, { "name": "Second" }],
            "album": {
                "name": "Album",
                "images": [{ "url": "https://i.scdn.co/large" }, { "url": "https://i.scdn.co/small" }]
            }
        }))
        .expect("track parses");

        let serialized = track.to_serialized();
        assert_eq!(serialized.artists, vec!["First", "Second"]);
        assert_eq!(serialized.album_art.as_deref(), Some("https://i.scdn.co/large"));
    }
}
