use axum::{
    extract::{Path, Query},
    routing::{delete, get, post},
    Json,
};
use utoipa::OpenApi;

use auxparty_collab::{Audience, Requester, RoomData};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{
        JoinRoomSchema, LeaveRoomSchema, QueueTrackSchema, SearchQuerySchema, ValidatedJson,
    },
    serialized::{JoinResult, Playback, PlaybackStatus, QueueItem, Room, ToSerialized, Track},
    Router,
};

/// The host view reads the engine queue, everyone else reads the pending list
fn audience_for(room: &RoomData, session: Option<&Session>) -> Audience {
    let is_host = session
        .map(|s| s.user().id == room.host.id)
        .unwrap_or(false);

    if is_host {
        Audience::Host
    } else {
        Audience::Guest
    }
}

#[utoipa::path(
    post,
    path = "/v1/rooms",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room)
    )
)]
async fn create_room(session: Session, context: ServerContext) -> ServerResult<Json<Room>> {
    let room = context
        .collab
        .rooms
        .create(&session.user().id, session.credential())
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/rooms",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200)
    )
)]
async fn close_room(session: Session, context: ServerContext) -> ServerResult<()> {
    context
        .collab
        .rooms
        .destroy_for_host(&session.user().id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/rooms/active",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room)
    )
)]
async fn active_room(session: Session, context: ServerContext) -> ServerResult<Json<Room>> {
    let room = context
        .collab
        .rooms
        .active_room_for_host(&session.user().id)
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/join",
    tag = "rooms",
    request_body = JoinRoomSchema,
    responses(
        (status = 200, body = JoinResult)
    )
)]
async fn join_room(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<JoinRoomSchema>,
) -> ServerResult<Json<JoinResult>> {
    let outcome = context
        .collab
        .rooms
        .join(&body.code, body.guest_id.as_deref())
        .await?;

    Ok(Json(outcome.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/leave",
    tag = "rooms",
    request_body = LeaveRoomSchema,
    responses(
        (status = 200)
    )
)]
async fn leave_room(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<LeaveRoomSchema>,
) -> ServerResult<()> {
    // A leave without an id has nothing to clear, the presence row lapses on its own
    if let Some(guest_id) = body.guest_id {
        context.collab.rooms.leave(&body.code, &guest_id).await?;
    }

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/playback",
    tag = "rooms",
    responses(
        (status = 200, body = Playback)
    )
)]
async fn playback(
    context: ServerContext,
    session: Option<Session>,
    Path(code): Path<String>,
) -> ServerResult<Json<Playback>> {
    let room = context.collab.rooms.active_room_by_code(&code).await?;
    let audience = audience_for(&room, session.as_ref());

    let view = context.collab.playback.view(&room, audience).await?;

    Ok(Json(view.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/queue",
    tag = "rooms",
    responses(
        (status = 200, body = Vec<Track>)
    )
)]
async fn queue(
    context: ServerContext,
    Path(code): Path<String>,
) -> ServerResult<Json<Vec<Track>>> {
    let room = context.collab.rooms.active_room_by_code(&code).await?;
    let tracks = context.collab.playback.engine_queue(&room).await;

    Ok(Json(tracks.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/queue",
    tag = "rooms",
    request_body = QueueTrackSchema,
    responses(
        (status = 200, body = QueueItem)
    )
)]
async fn queue_track(
    context: ServerContext,
    session: Option<Session>,
    Path(code): Path<String>,
    ValidatedJson(body): ValidatedJson<QueueTrackSchema>,
) -> ServerResult<Json<QueueItem>> {
    let room = context.collab.rooms.active_room_by_code(&code).await?;

    let added_by = session
        .map(|s| s.user().id)
        .or(body.guest_id)
        .unwrap_or_else(|| "guest".to_string());

    let entry = context
        .collab
        .playback
        .enqueue(&room, &body.track_uri, &body.track_name, &added_by)
        .await?;

    Ok(Json(entry.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/skip",
    tag = "rooms",
    responses(
        (status = 200)
    )
)]
async fn skip(context: ServerContext, Path(code): Path<String>) -> ServerResult<()> {
    let room = context.collab.rooms.active_room_by_code(&code).await?;

    context.collab.playback.skip(&room).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{code}/search",
    tag = "rooms",
    responses(
        (status = 200, body = Vec<Track>)
    )
)]
async fn search(
    context: ServerContext,
    session: Option<Session>,
    Path(code): Path<String>,
    Query(query): Query<SearchQuerySchema>,
) -> ServerResult<Json<Vec<Track>>> {
    if query.q.trim().is_empty() {
        return Err(ServerError::EmptyQuery);
    }

    let room = context.collab.rooms.active_room_by_code(&code).await?;

    // Hosts search with their own deposited pair, anyone else gets app-level results
    let requester = match session {
        Some(s) if s.user().id == room.host.id => Requester::Host(s.credential()),
        _ => Requester::Guest,
    };

    let results = context.collab.playback.search(&query.q, requester).await?;

    Ok(Json(results.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/rooms/{code}/sync-tokens",
    tag = "rooms",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200)
    )
)]
async fn sync_tokens(
    session: Session,
    context: ServerContext,
    Path(code): Path<String>,
) -> ServerResult<()> {
    context
        .collab
        .rooms
        .sync_credential(&code, &session.user().id, &session.credential())
        .await?;

    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create_room,
        close_room,
        active_room,
        join_room,
        leave_room,
        playback,
        queue,
        queue_track,
        skip,
        search,
        sync_tokens
    ),
    components(schemas(
        Room,
        JoinResult,
        Playback,
        PlaybackStatus,
        QueueItem,
        Track,
        JoinRoomSchema,
        LeaveRoomSchema,
        QueueTrackSchema
    ))
)]
struct RoomsApi;

pub fn api_doc() -> utoipa::openapi::OpenApi {
    RoomsApi::openapi()
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_room))
        .route("/", delete(close_room))
        .route("/active", get(active_room))
        .route("/join", post(join_room))
        .route("/leave", post(leave_room))
        .route("/:code/playback", get(playback))
        .route("/:code/queue", get(queue))
        .route("/:code/queue", post(queue_track))
        .route("/:code/skip", post(skip))
        .route("/:code/search", get(search))
        .route("/:code/sync-tokens", post(sync_tokens))
}
