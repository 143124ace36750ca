// ABOUTME: Router endpoint checks: URL scheme validation, raw-socket scheme rewriting, realm URIs.
// ABOUTME: Everything here runs before any network activity and fails with ConfigError.

use crate::error::ConfigError;
use tracing::warn;
use url::Url;

/// Schemes a router URL may use.
pub const ACCEPTED_SCHEMES: [&str; 6] = ["ws", "wss", "rs", "rss", "tcp", "tcps"];

/// Parse `raw` and check that its scheme is a WAMP transport.
pub fn validate_url(raw: &str) -> Result<Url, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::InvalidUrl {
            url: String::new(),
            reason: "url must not be empty".to_string(),
        });
    }

    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !ACCEPTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(ConfigError::InvalidScheme(parsed.scheme().to_string()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: "url has no host".to_string(),
        });
    }
    Ok(parsed)
}

/// Rewrite a leading `rs`/`rss` scheme token to `tcp`/`tcps`.
///
/// Only the scheme token changes; host, port, path and query stay verbatim.
/// A raw-socket URL that carries a path is passed through with a warning
/// since raw-socket transports have no notion of one.
pub fn normalize_url(raw: &str) -> String {
    let Some((scheme, rest)) = raw.split_once("://") else {
        return raw.to_string();
    };

    let rewritten = match scheme {
        "rs" => "tcp",
        "rss" => "tcps",
        other => other,
    };

    if is_raw_socket(rewritten) && has_path(rest) {
        warn!(url = %raw, "raw-socket url carries a path, it will be ignored by the transport");
    }

    format!("{rewritten}://{rest}")
}

fn has_path(authority_and_rest: &str) -> bool {
    match authority_and_rest.find(['/', '?', '#']) {
        Some(idx) => authority_and_rest[idx..] != *"/",
        None => false,
    }
}

/// Whether the scheme selects the raw-socket transport.
pub fn is_raw_socket(scheme: &str) -> bool {
    matches!(scheme, "tcp" | "tcps" | "rs" | "rss")
}

/// A realm is a dotted URI: non-empty components without whitespace, `.` or `#`.
pub fn validate_realm(realm: &str) -> Result<(), ConfigError> {
    let valid = !realm.is_empty()
        && realm.split('.').all(|component| {
            !component.is_empty() && !component.chars().any(|c| c.is_whitespace() || c == '#')
        });
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidRealm(realm.to_string()))
    }
}
