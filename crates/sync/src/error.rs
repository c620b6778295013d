//! Error types for the sync layer, with Sentry breadcrumbs.
//!
//! The stores distinguish exactly one failure kind at runtime, "remote
//! operation failed" ([`RemoteError`]). Stores log it through
//! [`report_remote_failure`] and swallow it; action handlers also return it
//! to their caller.

use thiserror::Error;

/// A remote document-store operation failed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A document could not be decoded or encoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The addressed document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store is unreachable or refused the operation.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// The durable key-value slot could not be read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The identity provider refused or failed a login.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Login rejected: {0}")]
    Rejected(String),

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Log a swallowed remote failure and leave a Sentry breadcrumb.
///
/// `operation` names the store action (e.g., `"wishlist.load"`). The
/// breadcrumb is dropped silently when Sentry is not initialised.
pub fn report_remote_failure(operation: &str, collection: &str, error: &RemoteError) {
    tracing::warn!(
        operation,
        collection,
        error = %error,
        "Remote operation failed; local state left unchanged"
    );
    add_breadcrumb(
        "remote",
        "Remote operation failed",
        Some(&[
            ("operation", operation),
            ("collection", collection),
            ("error", &error.to_string()),
        ]),
    );
}

/// Set the Sentry user context from a member ID.
///
/// Call this after a role is adopted to associate errors with the member.
pub fn set_sentry_user(member_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(member_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the member.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for store actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
