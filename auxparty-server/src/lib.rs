use std::net::{Ipv6Addr, SocketAddr};

use axum::{middleware, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod context;
mod docs;
mod errors;
mod ratelimit;
mod rooms;
mod schemas;
mod serialized;

pub mod config;
pub mod logging;

pub use context::*;
pub use errors::*;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Starts the auxparty server
pub async fn run_server(context: ServerContext, port: u16) {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let rate_limit = ratelimit::ClientRateLimit::new();
    rate_limit.start_sweeper();

    let version_one_router = Router::new()
        .nest("/sessions", auth::router())
        .nest("/rooms", rooms::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(middleware::from_fn_with_state(
            rate_limit,
            ratelimit::limit_by_client,
        ))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    axum::serve(
        listener,
        root_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
