//! Scripted doubles shared by the manager tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;

use auxparty_spotify::{
    Album, Artist, NowPlaying, PlayerError, PlayerService, TokenGrant, Track,
};

use crate::HostCredential;

/// A player engine that replays scripted responses and records how it was
/// called. Unscripted calls panic so tests fail loudly on unexpected
/// round-trips.
#[derive(Default, Clone)]
pub struct FakePlayer {
    inner: Arc<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    now_playing: Mutex<VecDeque<Result<NowPlaying, PlayerError>>>,
    player_queue: Mutex<VecDeque<Result<Vec<Track>, PlayerError>>>,
    enqueue: Mutex<VecDeque<Result<(), PlayerError>>>,
    skip: Mutex<VecDeque<Result<(), PlayerError>>>,
    search: Mutex<VecDeque<Result<Vec<Track>, PlayerError>>>,
    refresh: Mutex<VecDeque<Result<TokenGrant, PlayerError>>>,
    client_credentials: Mutex<VecDeque<Result<TokenGrant, PlayerError>>>,

    now_playing_tokens: Mutex<Vec<String>>,
    enqueued: Mutex<Vec<(String, String)>>,
    search_tokens: Mutex<Vec<String>>,
    refresh_calls: AtomicUsize,
    client_credentials_calls: AtomicUsize,
}

impl FakePlayer {
    pub fn script_now_playing(&self, result: Result<NowPlaying, PlayerError>) {
        self.inner.now_playing.lock().push_back(result);
    }

    pub fn script_player_queue(&self, result: Result<Vec<Track>, PlayerError>) {
        self.inner.player_queue.lock().push_back(result);
    }

    pub fn script_enqueue(&self, result: Result<(), PlayerError>) {
        self.inner.enqueue.lock().push_back(result);
    }

    pub fn script_skip(&self, result: Result<(), PlayerError>) {
        self.inner.skip.lock().push_back(result);
    }

    pub fn script_search(&self, result: Result<Vec<Track>, PlayerError>) {
        self.inner.search.lock().push_back(result);
    }

    pub fn script_refresh(&self, result: Result<TokenGrant, PlayerError>) {
        self.inner.refresh.lock().push_back(result);
    }

    pub fn script_client_credentials(&self, result: Result<TokenGrant, PlayerError>) {
        self.inner.client_credentials.lock().push_back(result);
    }

    /// Tokens each now-playing call was made with, in order
    pub fn now_playing_tokens(&self) -> Vec<String> {
        self.inner.now_playing_tokens.lock().clone()
    }

    pub fn now_playing_calls(&self) -> usize {
        self.inner.now_playing_tokens.lock().len()
    }

    /// (token, uri) pairs of every accepted-or-not enqueue call
    pub fn enqueued(&self) -> Vec<(String, String)> {
        self.inner.enqueued.lock().clone()
    }

    pub fn enqueue_calls(&self) -> usize {
        self.inner.enqueued.lock().len()
    }

    pub fn search_tokens(&self) -> Vec<String> {
        self.inner.search_tokens.lock().clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn client_credentials_calls(&self) -> usize {
        self.inner.client_credentials_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerService for FakePlayer {
    async fn now_playing(&self, access_token: &str) -> Result<NowPlaying, PlayerError> {
        self.inner
            .now_playing_tokens
            .lock()
            .push(access_token.to_string());

        self.inner
            .now_playing
            .lock()
            .pop_front()
            .expect("unscripted now_playing call")
    }

    async fn player_queue(&self, _access_token: &str) -> Result<Vec<Track>, PlayerError> {
        self.inner
            .player_queue
            .lock()
            .pop_front()
            .expect("unscripted player_queue call")
    }

    async fn enqueue(&self, access_token: &str, track_uri: &str) -> Result<(), PlayerError> {
        self.inner
            .enqueued
            .lock()
            .push((access_token.to_string(), track_uri.to_string()));

        self.inner
            .enqueue
            .lock()
            .pop_front()
            .expect("unscripted enqueue call")
    }

    async fn skip_next(&self, _access_token: &str) -> Result<(), PlayerError> {
        self.inner
            .skip
            .lock()
            .pop_front()
            .expect("unscripted skip call")
    }

    async fn search_tracks(
        &self,
        access_token: &str,
        _query: &str,
        _limit: u32,
    ) -> Result<Vec<Track>, PlayerError> {
        self.inner
            .search_tokens
            .lock()
            .push(access_token.to_string());

        self.inner
            .search
            .lock()
            .pop_front()
            .expect("unscripted search call")
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenGrant, PlayerError> {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);

        self.inner
            .refresh
            .lock()
            .pop_front()
            .expect("unscripted refresh call")
    }

    async fn client_credentials(&self) -> Result<TokenGrant, PlayerError> {
        self.inner
            .client_credentials_calls
            .fetch_add(1, Ordering::SeqCst);

        self.inner
            .client_credentials
            .lock()
            .pop_front()
            .expect("unscripted client_credentials call")
    }
}

pub fn track(id: &str, name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:track:{id}"),
        duration_ms: 200_000,
        artists: vec![Artist {
            name: "Artist".to_string(),
        }],
        album: Album {
            name: "Album".to_string(),
            images: Vec::new(),
        },
    }
}

pub fn playing(track: Track) -> NowPlaying {
    NowPlaying {
        item: Some(track),
        progress_ms: Some(42_000),
        is_playing: true,
    }
}

pub fn grant(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_in,
    }
}

pub fn credential_expiring_in(seconds: i64) -> HostCredential {
    HostCredential {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now() + Duration::seconds(seconds),
    }
}
