//! URL utilities for origin URL handling
//!
//! Origin URLs always carry the access token as a query parameter, so
//! anything that logs or rewrites them goes through here.

use regex::Regex;
use std::sync::LazyLock;
use url::form_urlencoded;

/// Query parameter the origin reads its access token from
pub const TOKEN_PARAM: &str = "X-Plex-Token";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)([?&]{}=)[^&#\s]*", regex::escape(TOKEN_PARAM)))
        .expect("token pattern is valid")
});

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Join a base URL and a path with exactly one slash between them
    ///
    /// ```rust
    /// use plexio::utils::url::UrlUtils;
    ///
    /// assert_eq!(
    ///     UrlUtils::join("http://plex:32400/", "/library/sections"),
    ///     "http://plex:32400/library/sections"
    /// );
    /// ```
    pub fn join(base: &str, path: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Append form-encoded query pairs to a URL that may already have a query
    pub fn with_query<K, V>(url: &str, pairs: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if pairs.is_empty() {
            return url.to_string();
        }
        let encoded = Self::encode_query(pairs);
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{encoded}")
    }

    /// Form-encode query pairs
    pub fn encode_query<K, V>(pairs: &[(K, V)]) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
        serializer.finish()
    }

    /// Split `path?query` into its two halves (query without the `?`)
    pub fn split_path_query(relative: &str) -> (&str, &str) {
        match relative.split_once('?') {
            Some((path, query)) => (path, query),
            None => (relative, ""),
        }
    }

    /// Decode a query string into ordered key/value pairs (repeated keys kept)
    pub fn parse_query(query: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn is_token_param(key: &str) -> bool {
        key.eq_ignore_ascii_case(TOKEN_PARAM)
    }

    /// Mask the access token in a URL or error message for logging
    ///
    /// ```rust
    /// use plexio::utils::url::UrlUtils;
    ///
    /// let url = "http://plex:32400/library/sections?X-Plex-Token=abc123&type=1";
    /// assert_eq!(
    ///     UrlUtils::obfuscate_token(url),
    ///     "http://plex:32400/library/sections?X-Plex-Token=****&type=1"
    /// );
    /// ```
    pub fn obfuscate_token(url: &str) -> String {
        TOKEN_PATTERN.replace_all(url, "${1}****").to_string()
    }

    /// Host portion of an absolute URL
    pub fn extract_host(url: &str) -> Option<String> {
        ::url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}
