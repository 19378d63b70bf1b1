use axum::{
    async_trait, debug_handler,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json,
};
use utoipa::OpenApi;

use auxparty_collab::{HostCredential, SessionData, SessionGrant, UserData};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewSessionSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> UserData {
        self.0.user.clone()
    }

    /// Returns the token pair the user deposited at login
    pub fn credential(&self) -> HostCredential {
        self.0.credential.clone()
    }

    /// Returns the session token itself
    pub fn token(&self) -> String {
        self.0.token.clone()
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

        let parts: Vec<_> = token.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err((StatusCode::BAD_REQUEST, "Authorization must be Bearer"));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let session = context
            .collab
            .auth
            .session(token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Session does not exist"))?;

        Ok(Self(session))
    }
}

#[utoipa::path(
    post,
    path = "/v1/sessions",
    tag = "sessions",
    request_body = NewSessionSchema,
    responses(
        (status = 200, body = LoginResult)
    )
)]
async fn create_session(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewSessionSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .collab
        .auth
        .create_session(SessionGrant {
            user_id: body.user_id,
            display_name: body.display_name,
            avatar_url: body.avatar_url,
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/sessions",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200)
    )
)]
async fn logout(session: Session, context: ServerContext) -> ServerResult<()> {
    context.collab.auth.logout(&session.token()).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/sessions/user",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
#[debug_handler(state = ServerContext)]
async fn user(session: Session) -> impl IntoResponse {
    Json(session.user().to_serialized())
}

#[derive(OpenApi)]
#[openapi(
    paths(create_session, logout, user),
    components(schemas(NewSessionSchema, LoginResult, User))
)]
struct SessionsApi;

pub fn api_doc() -> utoipa::openapi::OpenApi {
    SessionsApi::openapi()
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/", delete(logout))
        .route("/user", get(user))
}
