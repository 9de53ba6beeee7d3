// error.rs - Error types shared by the moderation core and the Discord glue
//
// Every failure the bot can surface to a user is one of these variants.
// Discord 403 responses are folded into PermissionDenied so callers can
// answer with a "no permission" notice instead of a raw HTTP error.

use serenity::http::error::Error as HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    /// Actor is not an owner, or Discord refused the moderation call
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Missing mention, missing argument, unparsable rule
    #[error("{0}")]
    Validation(String),

    /// Chat or search collaborator failed or timed out
    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("discord error: {0}")]
    Discord(serenity::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, BotError::PermissionDenied(_))
    }
}

impl From<serenity::Error> for BotError {
    fn from(error: serenity::Error) -> Self {
        match &error {
            serenity::Error::Http(http) => {
                if let HttpError::UnsuccessfulRequest(response) = http.as_ref() {
                    if response.status_code.as_u16() == 403 {
                        return BotError::PermissionDenied(response.error.message.clone());
                    }
                }
                BotError::Discord(error)
            }
            serenity::Error::Model(serenity::model::ModelError::InvalidPermissions(_)) => {
                BotError::PermissionDenied("missing guild permissions".to_string())
            }
            _ => BotError::Discord(error),
        }
    }
}
