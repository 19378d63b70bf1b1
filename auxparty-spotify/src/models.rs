use serde::Deserialize;

/// A playable track as the Web API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub artists: Vec<Artist>,
    pub album: Album,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// The playing state of the host's player.
///
/// `item` is absent when the player reports activity without a track, which
/// happens for private sessions and some non-track content.
#[derive(Debug, Clone, Deserialize)]
pub struct NowPlaying {
    pub item: Option<Track>,
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub is_playing: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerQueue {
    #[serde(default)]
    pub queue: Vec<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: TracksPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksPage {
    #[serde(default)]
    pub items: Vec<Track>,
}

/// A successful response from the accounts token endpoint.
///
/// Refresh grants may omit `refresh_token`, in which case the previous one
/// remains valid and must be kept.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// The error body the accounts service returns when it rejects a grant.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantRejection {
    pub error: String,
    pub error_description: Option<String>,
}

impl GrantRejection {
    pub fn reason(self) -> String {
        self.error_description.unwrap_or(self.error)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_now_playing_without_item() {
        let body = r#"{ "item": null, "progress_ms": null, "is_playing": false }"#;
        let parsed: NowPlaying = serde_json::from_str(body).expect("parses");

        assert!(parsed.item.is_none());
        assert!(!parsed.is_playing);
    }

    #[test]
    fn test_track_with_partial_album_art() {
        let body = r#"{
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
            "duration_ms": 213573,
            "artists": [{ "name": "Rick Astley" }],
            "album": { "name": "Whenever You Need Somebody", "images": [{ "url": "https://i.scdn.co/image/a" }] }
        }"#;
        let parsed: Track = serde_json::from_str(body).expect("parses");

        assert_eq!(parsed.artists[0].name, "Rick Astley");
        assert_eq!(parsed.album.images[0].width, None);
    }

    #[test]
    fn test_refresh_grant_without_rotated_token() {
        let body = r#"{ "access_token": "fresh", "expires_in": 3600, "token_type": "Bearer" }"#;
        let parsed: TokenGrant = serde_json::from_str(body).expect("parses");

        assert_eq!(parsed.access_token, "fresh");
        assert!(parsed.refresh_token.is_none());
    }
}
