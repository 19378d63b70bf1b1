use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

/// The completed authorization-code grant a host deposits to open a session.
#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSessionSchema {
    #[validate(length(min = 1, max = 64))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub display_name: String,
    pub avatar_url: Option<String>,
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1))]
    pub refresh_token: String,
    #[validate(range(min = 1))]
    pub expires_in: i64,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinRoomSchema {
    #[validate(length(min = 1, max = 12))]
    pub code: String,
    /// Echoed back by guests that joined before, so presence sticks to one id
    #[validate(length(min = 1, max = 64))]
    pub guest_id: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaveRoomSchema {
    #[validate(length(min = 1, max = 12))]
    pub code: String,
    #[validate(length(min = 1, max = 64))]
    pub guest_id: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueueTrackSchema {
    #[validate(length(min = 1, max = 256))]
    pub track_uri: String,
    #[validate(length(min = 1, max = 256))]
    pub track_name: String,
    #[validate(length(min = 1, max = 64))]
    pub guest_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuerySchema {
    pub q: String,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "JSON parse failed"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| (StatusCode::BAD_REQUEST, "Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_schema_requires_a_complete_grant() {
        let complete: NewSessionSchema = serde_json::from_value(json!({
            "userId": "spotify-user",
            "displayName": "Host",
            "avatarUrl": null,
            "accessToken": "access",
            "refreshToken": "refresh",
            "expiresIn": 3600,
        }))
        .expect("deserializes");
        assert!(complete.validate().is_ok());

        let empty_token: NewSessionSchema = serde_json::from_value(json!({
            "userId": "spotify-user",
            "displayName": "Host",
            "accessToken": "",
            "refreshToken": "refresh",
            "expiresIn": 3600,
        }))
        .expect("deserializes");
        assert!(empty_token.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<JoinRoomSchema, _> = serde_json::from_value(json!({
            "code": "123456",
            "hostAccessToken": "sneaky",
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_queue_schema_bounds_track_fields() {
        let oversized: QueueTrackSchema = serde_json::from_value(json!({
            "trackUri": "spotify:track:abc",
            "trackName": "x".repeat(300),
        }))
        .expect("deserializes");

        assert!(oversized.validate().is_err());
    }
}
