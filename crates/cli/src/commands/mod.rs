//! CLI command implementations.

pub mod notifications;
pub mod role;
pub mod wishlist;

use organic_market_sync::LoadOutcome;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A store load could not reach the document store.
    #[error("Failed to load {0}; see the log for the remote error")]
    LoadFailed(&'static str),

    /// A remote write failed.
    #[error(transparent)]
    Remote(#[from] organic_market_sync::RemoteError),

    /// The identity provider refused the login.
    #[error(transparent)]
    Identity(#[from] organic_market_sync::IdentityError),
}

/// Turn a swallowed load failure back into an error for the exit code.
fn ensure_loaded(outcome: LoadOutcome, what: &'static str) -> Result<usize, CommandError> {
    match outcome {
        LoadOutcome::Applied { count } => Ok(count),
        LoadOutcome::Superseded | LoadOutcome::Failed => Err(CommandError::LoadFailed(what)),
    }
}
