use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::warn;
use thiserror::Error;

use auxparty_collab::{DatabaseError, PlaybackError, RoomError};
use auxparty_spotify::PlayerError;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room not found or user is not host")]
    NotHost,

    #[error("Invalid room code")]
    InvalidCode,

    #[error("Search query is required")]
    EmptyQuery,

    #[error("Track uri is not playable")]
    InvalidTrackUri,

    #[error("User already has an active room")]
    RoomExists,

    #[error("No active device found. The host needs to have Spotify open and playing.")]
    NoActiveDevice,

    #[error("The host needs to log in to Spotify again.")]
    HostSessionExpired,

    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },

    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::RoomNotFound | Self::NotHost | Self::NoActiveDevice => StatusCode::NOT_FOUND,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidCode | Self::EmptyQuery | Self::InvalidTrackUri => StatusCode::BAD_REQUEST,
            Self::RoomExists | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::HostSessionExpired => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Engine failures reaching this layer are internal. The upstream body
    /// stays in the log and never travels to a client.
    fn from_player(error: PlayerError) -> Self {
        warn!("Player engine failure: {}", error);
        Self::Unknown("The player engine request failed".to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<RoomError> for ServerError {
    fn from(value: RoomError) -> Self {
        match value {
            RoomError::NotFound => Self::RoomNotFound,
            RoomError::InvalidCode => Self::InvalidCode,
            RoomError::NotHost => Self::NotHost,
            RoomError::AlreadyActive => Self::RoomExists,
            RoomError::CredentialExpired => Self::HostSessionExpired,
            RoomError::Player(e) => Self::from_player(e),
            RoomError::Db(e) => e.into(),
        }
    }
}

impl From<PlaybackError> for ServerError {
    fn from(value: PlaybackError) -> Self {
        match value {
            PlaybackError::InvalidTrackUri => Self::InvalidTrackUri,
            PlaybackError::NoActiveDevice => Self::NoActiveDevice,
            PlaybackError::HostSessionExpired => Self::HostSessionExpired,
            PlaybackError::Player(e) => Self::from_player(e),
            PlaybackError::Db(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup_failures_are_not_found() {
        assert_eq!(
            ServerError::RoomNotFound.as_status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ServerError::NotHost.as_status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::NoActiveDevice.as_status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_bad_input_is_bad_request() {
        assert_eq!(
            ServerError::InvalidCode.as_status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::InvalidTrackUri.as_status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_engine_details_are_not_relayed() {
        let error = ServerError::from(PlaybackError::Player(PlayerError::Upstream {
            status: 502,
            body: "secret upstream diagnostics".to_string(),
        }));

        assert_eq!(error.as_status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.to_string().contains("secret"));
    }

    #[test]
    fn test_not_host_hides_room_existence() {
        let error = ServerError::from(RoomError::NotHost);

        assert_eq!(error.as_status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "Room not found or user is not host");
    }
}
