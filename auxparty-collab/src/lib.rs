mod auth;
mod db;
mod playback;
mod queue;
mod rooms;
mod tokens;
mod util;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use auth::*;
pub use db::*;
pub use playback::*;
pub use queue::*;
pub use rooms::*;
pub use tokens::*;

use auxparty_spotify::PlayerService;

/// The auxparty collab system, facilitating rooms, sessions, queueing, and
/// playback reconciliation.
pub struct Collab<P, Db> {
    pub database: Arc<Db>,
    pub tokens: Arc<TokenStore<P>>,

    pub auth: Auth<Db>,
    pub rooms: RoomManager<P, Db>,
    pub queue: PendingQueue<Db>,
    pub playback: PlaybackManager<P, Db>,
}

/// A type passed to the components of the collab system, to access shared
/// state and dispatch engine calls.
pub struct CollabContext<P, Db> {
    pub player: Arc<P>,
    pub database: Arc<Db>,
    pub tokens: Arc<TokenStore<P>>,
}

impl<P, Db> Collab<P, Db>
where
    P: PlayerService,
    Db: Database,
{
    pub fn new(player: P, database: Db) -> Self {
        let player = Arc::new(player);
        let database = Arc::new(database);
        let tokens = Arc::new(TokenStore::new(&player));

        let context = CollabContext {
            player,
            database: database.clone(),
            tokens: tokens.clone(),
        };

        let auth = Auth::new(&context.database);
        let queue = PendingQueue::new(&context.database);
        let rooms = RoomManager::new(&context);
        let playback = PlaybackManager::new(&context);

        Self {
            database,
            tokens,
            auth,
            rooms,
            queue,
            playback,
        }
    }
}

impl<P, Db> Clone for CollabContext<P, Db>
where
    P: PlayerService,
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            player: self.player.clone(),
            database: self.database.clone(),
            tokens: self.tokens.clone(),
        }
    }
}
