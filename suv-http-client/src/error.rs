//! Error types for the SUV HTTP client

use thiserror::Error;

/// Errors that can occur when using the SUV HTTP client
#[derive(Error, Debug)]
pub enum SuvError {
    /// Network-level failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The upstream answered, but not with a usable API response
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The response body did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Session or credential failure
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A base URL or endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Client initialization failed
    #[error("Client initialization failed: {0}")]
    ClientInit(String),
}

/// Failures before a complete response was received
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request did not complete within the configured timeout
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Connection or DNS failure
    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// Any other failure while sending the request
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The response body could not be read
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else if err.is_connect() {
            TransportError::Connect(err)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err)
        } else {
            TransportError::Request(err)
        }
    }
}

/// The upstream replied with something other than an API response
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Status code other than 200 OK
    #[error("unexpected response status: {status}")]
    UnexpectedStatus {
        /// The status code that was received
        status: reqwest::StatusCode,
    },

    /// The body contains the upstream's internal error page marker
    #[error("upstream replied with an error page (marker {marker:?}); check the session or log in again")]
    UpstreamError {
        /// The marker that matched
        marker: String,
    },
}

/// The response body did not match the expected encoding
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body is not valid JSON at all
    #[error("malformed JSON body: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Body is not valid UTF-8 where text was expected
    #[error("response body is not valid UTF-8")]
    Encoding,

    /// Positional array has the wrong number of elements
    #[error("expected {expected} elements in positional array, got {actual}")]
    UnexpectedArity {
        /// Required element count
        expected: usize,
        /// Element count that was received
        actual: usize,
    },

    /// A positional element (or the whole body, when `index` is `None`) has the wrong JSON type
    #[error("unexpected type for {field}{}: expected {expected}, found {found}", index_suffix(.index))]
    UnexpectedType {
        /// Position in the top-level array
        index: Option<usize>,
        /// Name of the field stored at that position
        field: &'static str,
        /// JSON type that was required
        expected: &'static str,
        /// JSON type that was found
        found: &'static str,
    },

    /// A keyed record did not match its schema
    #[error("schema mismatch in {context}: {source}")]
    SchemaMismatch {
        /// What was being decoded
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Session lifecycle failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Upstream rejected the login
    #[error("login rejected: {reason}")]
    Rejected {
        /// Why the login was considered rejected
        reason: String,
    },

    /// Login succeeded but no session cookie is available
    #[error("login succeeded but no {cookie} cookie was received")]
    MissingSessionCookie {
        /// Name of the expected cookie
        cookie: &'static str,
    },

    /// Attempted to restore an empty session token
    #[error("session token is empty")]
    EmptyToken,

    /// Attempted to restore a token that cannot be sent as a cookie value
    #[error("session token contains characters not allowed in a cookie")]
    InvalidToken,

    /// Logout response lacked the confirmation phrase
    #[error("logout failed: unexpected response")]
    LogoutFailed,

    /// Authenticated operation attempted without a session
    #[error("not authenticated: log in or restore a session first")]
    NotAuthenticated,

    /// Re-login requested but no credentials were retained
    #[error("no credentials retained for re-login")]
    MissingCredentials,
}

fn index_suffix(index: &Option<usize>) -> String {
    index.map(|i| format!(" at index {i}")).unwrap_or_default()
}
