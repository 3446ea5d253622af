//! Single-origin cookie store

use regex::Regex;
use reqwest::Url;
use reqwest::header::HeaderValue;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use zeroize::{Zeroize, Zeroizing};

/// Name of the cookie carrying the portal session token
pub const SESSION_COOKIE: &str = "PHPSESSID";

/// A `name=value` cookie pair, without attributes
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse the leading `name=value` pair of a `Set-Cookie` header value
    ///
    /// Attributes such as `path` or `HttpOnly` are ignored. Returns `None` when
    /// the header does not start with a cookie pair.
    pub fn parse_set_cookie(header: &str) -> Option<Cookie> {
        static PAIR: OnceLock<Regex> = OnceLock::new();
        let regex = PAIR.get_or_init(|| {
            Regex::new(r#"^\s*([^=;\s]+)\s*=\s*"?([^";]*)"?"#).expect("cookie pair regex is valid")
        });
        let captures = regex.captures(header)?;
        Some(Cookie::new(&captures[1], captures[2].trim()))
    }
}

impl std::fmt::Debug for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl Drop for Cookie {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// Cookie store for the one origin a client talks to
///
/// Holds at most one value per cookie name; the last write wins. There is no
/// expiry: cookies live until overwritten, removed, or the store is dropped.
/// Requests for any other origin see an empty store.
#[derive(Clone)]
pub struct CookieStore {
    origin: url::Origin,
    cookies: BTreeMap<String, Zeroizing<String>>,
}

impl CookieStore {
    /// Create an empty store bound to the origin of `url`
    pub fn new(url: &Url) -> Self {
        Self {
            origin: url.origin(),
            cookies: BTreeMap::new(),
        }
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Cookies to replay for `url`
    pub fn get(&self, url: &Url) -> Vec<Cookie> {
        if !self.same_origin(url) {
            return Vec::new();
        }
        self.cookies
            .iter()
            .map(|(name, value)| Cookie::new(name.as_str(), value.as_str()))
            .collect()
    }

    /// Merge cookies received from `url`, overwriting existing values by name
    pub fn set(&mut self, url: &Url, cookies: impl IntoIterator<Item = Cookie>) {
        if !self.same_origin(url) {
            tracing::warn!(%url, "ignoring cookies from foreign origin");
            return;
        }
        for cookie in cookies {
            self.insert(cookie);
        }
    }

    /// Store one cookie for this store's origin
    pub fn insert(&mut self, mut cookie: Cookie) {
        let name = std::mem::take(&mut cookie.name);
        let value = Zeroizing::new(std::mem::take(&mut cookie.value));
        self.cookies.insert(name, value);
    }

    /// Current value of the named cookie
    pub fn value(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.cookies.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Build a `Cookie` request header for the stored cookies
    ///
    /// The header is marked sensitive and the temporary string is zeroized.
    /// Returns `None` when the store is empty.
    pub fn header_value(&self) -> Option<HeaderValue> {
        if self.cookies.is_empty() {
            return None;
        }

        let mut cookie_string = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value.as_str()))
            .collect::<Vec<_>>()
            .join("; ");

        let header = HeaderValue::from_str(&cookie_string).ok().map(|mut value| {
            value.set_sensitive(true);
            value
        });
        cookie_string.zeroize();

        if header.is_none() {
            tracing::warn!("stored cookies are not a valid header value; sending none");
        }
        header
    }
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("origin", &self.origin.ascii_serialization())
            .field("names", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn portal() -> Url {
        Url::parse("http://portal.example.edu/portal").unwrap()
    }

    #[test]
    fn test_parse_set_cookie_ignores_attributes() {
        let cookie = Cookie::parse_set_cookie("PHPSESSID=abc123; path=/; HttpOnly").unwrap();
        assert_eq!(cookie.name, "PHPSESSID");
        assert_eq!(cookie.value, "abc123");
    }

    #[test]
    fn test_parse_set_cookie_quoted_and_empty() {
        let quoted = Cookie::parse_set_cookie(r#"lang="es"; Max-Age=60"#).unwrap();
        assert_eq!(quoted.value, "es");

        let empty = Cookie::parse_set_cookie("PHPSESSID=; expires=Thu, 01 Jan 1970 00:00:00 GMT").unwrap();
        assert_eq!(empty.value, "");

        assert!(Cookie::parse_set_cookie("; path=/").is_none());
    }

    #[test]
    fn test_foreign_origin_is_isolated() {
        let mut store = CookieStore::new(&portal());
        let other = Url::parse("http://elsewhere.example.com/").unwrap();

        store.set(&other, [Cookie::new("PHPSESSID", "evil")]);
        assert!(store.is_empty());

        store.set(&portal(), [Cookie::new("PHPSESSID", "good")]);
        assert!(store.get(&other).is_empty());
        assert_eq!(store.get(&portal()).len(), 1);
    }

    #[test]
    fn test_same_origin_different_path_shares_cookies() {
        let mut store = CookieStore::new(&portal());
        store.set(&portal(), [Cookie::new("PHPSESSID", "abc")]);
        let endpoint = portal().join("/portal/validar.php").unwrap();
        assert_eq!(store.get(&endpoint), vec![Cookie::new("PHPSESSID", "abc")]);
    }

    #[test]
    fn test_header_value_is_sensitive_and_joined() {
        let mut store = CookieStore::new(&portal());
        assert!(store.header_value().is_none());

        store.set(&portal(), [Cookie::new("b", "2"), Cookie::new("a", "1")]);
        let header = store.header_value().unwrap();
        assert!(header.is_sensitive());
        assert_eq!(header.to_str().unwrap(), "a=1; b=2");
    }

    #[test]
    fn test_debug_does_not_leak_values() {
        let mut store = CookieStore::new(&portal());
        store.insert(Cookie::new(SESSION_COOKIE, "topsecret"));
        let rendered = format!("{:?} {:?}", store, Cookie::new("x", "topsecret"));
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains(SESSION_COOKIE));
    }

    // Last write wins and there is at most one value per name
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_last_write_wins(
            writes in prop::collection::vec(("[a-c]", "[a-z0-9]{0,8}"), 1..20),
        ) {
            let mut store = CookieStore::new(&portal());
            for (name, value) in &writes {
                store.set(&portal(), [Cookie::new(name.as_str(), value.as_str())]);
            }

            let mut expected = BTreeMap::new();
            for (name, value) in &writes {
                expected.insert(name.clone(), value.clone());
            }

            prop_assert_eq!(store.len(), expected.len());
            for (name, value) in &expected {
                prop_assert_eq!(store.value(name), Some(value.as_str()));
            }
        }
    }
}
