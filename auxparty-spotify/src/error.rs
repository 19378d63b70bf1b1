use thiserror::Error;

/// Every way the player engine can refuse or fail a request.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Nothing is currently playing")]
    NoPlayback,

    #[error("The access token was rejected")]
    Unauthorized,

    #[error("Playback control requires a premium account")]
    PremiumRequired,

    #[error("No active playback device")]
    NoActiveDevice,

    #[error("Token grant was denied: {reason}")]
    GrantDenied { reason: String },

    #[error("Failed to reach the player service: {0}")]
    Network(String),

    #[error("Failed to parse a player service response: {0}")]
    Parse(String),

    #[error("Player service returned {status}: {body}")]
    Upstream { status: u16, body: String },
}
