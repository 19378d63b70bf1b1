use std::convert::Infallible;
use std::sync::Arc;

use auxparty_collab::{Collab, PgDatabase};
use auxparty_spotify::SpotifyClient;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

/// The concrete collab composition this server runs.
pub type ServerCollab = Collab<SpotifyClient, PgDatabase>;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub collab: Arc<ServerCollab>,
}

#[async_trait]
impl FromRequestParts<ServerContext> for ServerContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.clone())
    }
}
