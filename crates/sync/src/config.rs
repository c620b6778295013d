//! Sync layer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DOCSTORE_BASE_URL` - Base URL of the document store REST API
//!
//! ## Optional
//! - `DOCSTORE_API_KEY` - Bearer token for the document store
//! - `DOCSTORE_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `DOCSTORE_CACHE_TTL_SECS` - `getAll` response cache TTL, 0 disables (default: 30)
//! - `SESSION_STORAGE_PATH` - File backing the session key-value slot
//!   (default: .organic-market/session.json)
//! - `WISHLIST_COLLECTION` - Wishlist collection name (default: wishlist)
//! - `NOTIFICATIONS_COLLECTION` - Notification collection name (default: notifications)
//! - `ROLES_COLLECTION` - Role-assignment collection name (default: userRoles)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const API_KEY_VAR: &str = "DOCSTORE_API_KEY";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Top-level configuration for the sync layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote document store connection settings
    pub docstore: DocStoreConfig,
    /// Collection names used by the stores
    pub collections: CollectionNames,
    /// File backing the durable session slot
    pub session_storage_path: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Document store connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct DocStoreConfig {
    /// Base URL of the REST API (e.g., `https://store.example.net/api`)
    pub base_url: Url,
    /// Optional bearer token
    pub api_key: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// TTL for cached `getAll` responses; zero disables the cache
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for DocStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl DocStoreConfig {
    /// Settings for an unauthenticated store with default timeouts.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(30),
        }
    }
}

/// Names of the remote collections backing each store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub wishlist: String,
    pub notifications: String,
    pub roles: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            wishlist: "wishlist".to_string(),
            notifications: "notifications".to_string(),
            roles: "userRoles".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let docstore = DocStoreConfig::from_env()?;
        let collections = CollectionNames::from_env();
        let session_storage_path = PathBuf::from(get_env_or_default(
            "SESSION_STORAGE_PATH",
            ".organic-market/session.json",
        ));
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            docstore,
            collections,
            session_storage_path,
            sentry_dsn,
        })
    }
}

impl DocStoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("DOCSTORE_BASE_URL")?;
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("DOCSTORE_BASE_URL".to_string(), e.to_string())
        })?;

        let api_key = match get_optional_env(API_KEY_VAR) {
            Some(value) => {
                check_api_key(&value)?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(get_secs("DOCSTORE_TIMEOUT_SECS", 10)?),
            cache_ttl: Duration::from_secs(get_secs("DOCSTORE_CACHE_TTL_SECS", 30)?),
        })
    }
}

impl CollectionNames {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            wishlist: get_env_or_default("WISHLIST_COLLECTION", &defaults.wishlist),
            notifications: get_env_or_default("NOTIFICATIONS_COLLECTION", &defaults.notifications),
            roles: get_env_or_default("ROLES_COLLECTION", &defaults.roles),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a whole number of seconds, falling back to `default` when unset.
fn get_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Shannon entropy of `s`, in bits per character.
fn entropy_bits_per_char(s: &str) -> f64 {
    let mut freq: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_default() += 1;
    }

    let len = f64::from(freq.values().sum::<u32>());
    freq.values()
        .map(|&count| {
            let p = f64::from(count) / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject document store API keys that are templated or guessable.
fn check_api_key(key: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(API_KEY_VAR.to_string(), reason);

    let lower = key.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(insecure(format!(
            "looks like a template value (contains '{pattern}')"
        )));
    }

    let entropy = entropy_bits_per_char(key);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "{entropy:.2} bits/char is below {MIN_ENTROPY_BITS_PER_CHAR:.1}; copy the key issued by the document store"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_entropy_of_empty_key_is_zero() {
        assert!(entropy_bits_per_char("").abs() < f64::EPSILON);
    }

    #[test]
    fn test_entropy_counts_characters_not_bytes() {
        assert!((entropy_bits_per_char("ab") - 1.0).abs() < 0.01);
        assert!((entropy_bits_per_char("aé") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_template_api_key_is_rejected() {
        let err = check_api_key("your-api-key-here").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(ref var, _) if var == "DOCSTORE_API_KEY"));
        assert!(err.to_string().contains("'your-'"));
    }

    #[test]
    fn test_low_entropy_api_key_is_rejected() {
        let err = check_api_key("aaaaaaaaaaaaaaaaaaaaaaaa").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_issued_api_key_is_accepted() {
        assert!(check_api_key("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6").is_ok());
    }

    #[test]
    fn test_default_collection_names() {
        let names = CollectionNames::default();
        assert_eq!(names.wishlist, "wishlist");
        assert_eq!(names.notifications, "notifications");
        assert_eq!(names.roles, "userRoles");
    }

    #[test]
    fn test_docstore_config_defaults() {
        let config = DocStoreConfig::new(Url::parse("http://localhost:8090/api").unwrap());
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_docstore_config_debug_redacts_key() {
        let mut config = DocStoreConfig::new(Url::parse("http://localhost:8090/api").unwrap());
        config.api_key = Some(SecretString::from("super_secret_docstore_key"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:8090"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_docstore_key"));
        assert_eq!(
            config.api_key.unwrap().expose_secret(),
            "super_secret_docstore_key"
        );
    }
}
