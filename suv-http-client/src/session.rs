//! Session state and its transitions

use crate::cookies::{Cookie, CookieStore, SESSION_COOKIE};
use crate::error::AuthError;
use reqwest::Url;
use reqwest::header::HeaderValue;
use zeroize::Zeroizing;

/// Whether the client currently holds a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Portal login credentials
#[derive(Clone)]
pub struct Credentials {
    user_code: String,
    password: Zeroizing<String>,
}

impl Credentials {
    pub fn new(user_code: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_code: user_code.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn user_code(&self) -> &str {
        &self.user_code
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_code", &self.user_code)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Mutable per-client session: token, retained credentials and cookies
///
/// A non-empty token always has a matching `PHPSESSID` cookie in the store;
/// every transition below keeps the two in step.
pub(crate) struct Session {
    origin: Url,
    token: Zeroizing<String>,
    credentials: Option<Credentials>,
    cookies: CookieStore,
}

impl Session {
    pub fn new(origin: Url) -> Self {
        Self {
            cookies: CookieStore::new(&origin),
            origin,
            token: Zeroizing::new(String::new()),
            credentials: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.token.is_empty() {
            SessionState::Unauthenticated
        } else {
            SessionState::Authenticated
        }
    }

    pub fn token(&self) -> Option<&str> {
        (!self.token.is_empty()).then_some(self.token.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.origin.host_str()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn retain_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn forget_credentials(&mut self) {
        self.credentials = None;
    }

    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    /// `Cookie` header for the next request, if any cookies are stored
    pub fn cookie_header(&self) -> Option<HeaderValue> {
        self.cookies.header_value()
    }

    /// Cookie header for an operation that requires a session
    pub fn authenticated_cookie_header(&self) -> Result<Option<HeaderValue>, AuthError> {
        match self.state() {
            SessionState::Authenticated => Ok(self.cookie_header()),
            SessionState::Unauthenticated => Err(AuthError::NotAuthenticated),
        }
    }

    /// Merge response cookies while keeping the token in step with `PHPSESSID`
    ///
    /// When authenticated, a fresh `PHPSESSID` replaces the current token and
    /// an emptied one ends the session.
    pub fn absorb_cookies(&mut self, cookies: Vec<Cookie>) {
        if cookies.is_empty() {
            return;
        }
        self.cookies.set(&self.origin, cookies);
        if self.state() != SessionState::Authenticated {
            return;
        }
        match self.cookies.value(SESSION_COOKIE) {
            Some("") => {
                tracing::debug!("session cookie cleared by upstream");
                self.end();
            }
            Some(value) if value != self.token.as_str() => {
                tracing::debug!("session token rotated by upstream");
                self.token = Zeroizing::new(value.to_string());
            }
            _ => {}
        }
    }

    /// Finish a successful login: merge its cookies and adopt `PHPSESSID` as the token
    pub fn complete_login(&mut self, cookies: Vec<Cookie>) -> Result<Zeroizing<String>, AuthError> {
        self.cookies.set(&self.origin, cookies);
        let token = self
            .cookies
            .value(SESSION_COOKIE)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingSessionCookie {
                cookie: SESSION_COOKIE,
            })?
            .to_string();
        self.token = Zeroizing::new(token);
        Ok(self.token.clone())
    }

    /// Adopt a previously issued token without asking the server
    pub fn restore(&mut self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        if !token.bytes().all(is_cookie_octet) {
            return Err(AuthError::InvalidToken);
        }
        self.cookies.insert(Cookie::new(SESSION_COOKIE, token));
        self.token = Zeroizing::new(token.to_string());
        Ok(())
    }

    /// Drop the token and its cookie
    pub fn end(&mut self) {
        self.cookies.remove(SESSION_COOKIE);
        self.token = Zeroizing::new(String::new());
    }
}

/// Octets allowed in a cookie value (RFC 6265 `cookie-octet`)
fn is_cookie_octet(byte: u8) -> bool {
    matches!(byte, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host())
            .field("state", &self.state())
            .field("credentials", &self.credentials)
            .field("cookies", &self.cookies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Url::parse("http://portal.example.edu/portal").unwrap())
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = session();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.token().is_none());
        assert!(session.cookie_header().is_none());
        assert_eq!(session.host(), Some("portal.example.edu"));
        assert_eq!(
            session.authenticated_cookie_header(),
            Err(AuthError::NotAuthenticated)
        );
    }

    #[test]
    fn test_restore_sets_token_and_cookie() {
        let mut session = session();
        assert_eq!(session.restore(""), Err(AuthError::EmptyToken));
        assert_eq!(session.state(), SessionState::Unauthenticated);

        session.restore("abc123").unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.token(), Some("abc123"));
        assert_eq!(session.cookies().value(SESSION_COOKIE), Some("abc123"));
    }

    #[test]
    fn test_complete_login_requires_session_cookie() {
        let mut session = session();
        let result = session.complete_login(vec![Cookie::new("lang", "es")]);
        assert_eq!(
            result,
            Err(AuthError::MissingSessionCookie {
                cookie: SESSION_COOKIE
            })
        );
        assert_eq!(session.state(), SessionState::Unauthenticated);

        let token = session
            .complete_login(vec![Cookie::new(SESSION_COOKIE, "abc123")])
            .unwrap();
        assert_eq!(token.as_str(), "abc123");
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_end_clears_token_and_cookie_only() {
        let mut session = session();
        session.absorb_cookies(vec![Cookie::new("lang", "es")]);
        session.restore("abc123").unwrap();
        session.end();

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.cookies().value(SESSION_COOKIE).is_none());
        assert_eq!(session.cookies().value("lang"), Some("es"));
    }

    #[test]
    fn test_absorb_follows_token_rotation() {
        let mut session = session();
        session.restore("old").unwrap();
        session.absorb_cookies(vec![Cookie::new(SESSION_COOKIE, "new")]);
        assert_eq!(session.token(), Some("new"));
    }

    #[test]
    fn test_restore_rejects_token_unfit_for_cookie_header() {
        let mut session = session();
        for token in ["abc\n123", "abc;lang=es", "abc 123", "ab\"c"] {
            assert_eq!(session.restore(token), Err(AuthError::InvalidToken));
        }
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.cookie_header().is_none());
    }

    #[test]
    fn test_absorb_cleared_session_cookie_ends_session() {
        let mut session = session();
        session.absorb_cookies(vec![Cookie::new("lang", "es")]);
        session.restore("abc123").unwrap();
        session.absorb_cookies(vec![Cookie::new(SESSION_COOKIE, "")]);

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.token().is_none());
        assert!(session.cookies().value(SESSION_COOKIE).is_none());
        assert_eq!(session.cookies().value("lang"), Some("es"));
    }

    #[test]
    fn test_absorb_does_not_authenticate() {
        let mut session = session();
        session.absorb_cookies(vec![Cookie::new(SESSION_COOKIE, "anonymous")]);
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("12345", "secret");
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("12345"));
        assert!(!rendered.contains("secret"));
    }
}
