use async_trait::async_trait;

use crate::{NowPlaying, PlayerError, TokenGrant, Track};

/// The player engine as the domain layer sees it.
///
/// Access tokens are passed per call because every room carries its own host
/// credential. Implementations must not cache or refresh tokens themselves;
/// that is the token store's job.
#[async_trait]
pub trait PlayerService: Send + Sync + 'static {
    /// Returns the playing state of the player the token belongs to.
    ///
    /// An idle player is reported as [PlayerError::NoPlayback], not as an
    /// empty state.
    async fn now_playing(&self, access_token: &str) -> Result<NowPlaying, PlayerError>;

    /// Returns the upcoming tracks of the player's own queue.
    async fn player_queue(&self, access_token: &str) -> Result<Vec<Track>, PlayerError>;

    /// Appends a track to the player's queue.
    async fn enqueue(&self, access_token: &str, track_uri: &str) -> Result<(), PlayerError>;

    /// Skips to the next track.
    async fn skip_next(&self, access_token: &str) -> Result<(), PlayerError>;

    /// Searches the catalog for tracks.
    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, PlayerError>;

    /// Exchanges a refresh token for a new access token.
    ///
    /// A rejected exchange is [PlayerError::GrantDenied]; transport faults
    /// surface as other variants.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, PlayerError>;

    /// Obtains an application-scoped token via the client credentials grant.
    async fn client_credentials(&self) -> Result<TokenGrant, PlayerError>;
}
