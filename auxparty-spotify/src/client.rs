use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{GrantRejection, NowPlaying, PlayerError, PlayerQueue, PlayerService, SearchResponse, TokenGrant, Track};

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials identifying this application to the accounts service.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// [PlayerService] implementation backed by the Spotify Web API.
pub struct SpotifyClient {
    http: Client,
    credentials: AppCredentials,
}

impl SpotifyClient {
    pub fn new(credentials: AppCredentials) -> Result<Self, PlayerError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PlayerError::Network(e.to_string()))?;

        Ok(Self { http, credentials })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, PlayerError> {
        let response = send(
            self.http
                .post(TOKEN_ENDPOINT)
                .basic_auth(
                    &self.credentials.client_id,
                    Some(&self.credentials.client_secret),
                )
                .form(form),
        )
        .await?;

        let status = response.status();

        // The accounts service explains rejections in a structured body
        if status.is_client_error() {
            let reason = response
                .json::<GrantRejection>()
                .await
                .map(GrantRejection::reason)
                .unwrap_or_else(|_| status.to_string());

            return Err(PlayerError::GrantDenied { reason });
        }

        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        parse(response).await
    }
}

#[async_trait]
impl PlayerService for SpotifyClient {
    async fn now_playing(&self, access_token: &str) -> Result<NowPlaying, PlayerError> {
        let url = format!("{}/me/player/currently-playing", API_BASE);
        let response = send(self.http.get(url).bearer_auth(access_token)).await?;

        let status = response.status();

        // An idle player answers with an empty 204
        if status == StatusCode::NO_CONTENT {
            return Err(PlayerError::NoPlayback);
        }

        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        parse(response).await
    }

    async fn player_queue(&self, access_token: &str) -> Result<Vec<Track>, PlayerError> {
        let url = format!("{}/me/player/queue", API_BASE);
        let response = send(self.http.get(url).bearer_auth(access_token)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let queue: PlayerQueue = parse(response).await?;
        Ok(queue.queue)
    }

    async fn enqueue(&self, access_token: &str, track_uri: &str) -> Result<(), PlayerError> {
        let url = format!("{}/me/player/queue", API_BASE);
        let response = send(
            self.http
                .post(url)
                .query(&[("uri", track_uri)])
                .bearer_auth(access_token),
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        Ok(())
    }

    async fn skip_next(&self, access_token: &str) -> Result<(), PlayerError> {
        let url = format!("{}/me/player/next", API_BASE);
        let response = send(self.http.post(url).bearer_auth(access_token)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        Ok(())
    }

    async fn search_tracks(
        &self,
        access_token: &str,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Track>, PlayerError> {
        let url = format!("{}/search", API_BASE);
        let limit = limit.to_string();

        let response = send(
            self.http
                .get(url)
                .query(&[("q", query), ("type", "track"), ("limit", &limit)])
                .bearer_auth(access_token),
        )
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let results: SearchResponse = parse(response).await?;
        Ok(results.tracks.items)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, PlayerError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn client_credentials(&self) -> Result<TokenGrant, PlayerError> {
        self.token_request(&[("grant_type", "client_credentials")])
            .await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, PlayerError> {
    request
        .send()
        .await
        .map_err(|e| PlayerError::Network(e.to_string()))
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, PlayerError> {
    response
        .json()
        .await
        .map_err(|e| PlayerError::Parse(e.to_string()))
}

async fn handle_unsuccessful_request(response: Response, status: StatusCode) -> PlayerError {
    match status {
        StatusCode::UNAUTHORIZED => PlayerError::Unauthorized,
        StatusCode::FORBIDDEN => PlayerError::PremiumRequired,
        StatusCode::NOT_FOUND => PlayerError::NoActiveDevice,
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!("Player service request failed with {}: {}", status, body);

            PlayerError::Upstream {
                status: status.as_u16(),
                body,
            }
        }
    }
}
