//! Form request construction, execution and response validation

use crate::cookies::Cookie;
use crate::error::{DecodeError, ProtocolError, TransportError};
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, SET_COOKIE, USER_AGENT};
use reqwest::{StatusCode, Url};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// `User-Agent` sent with every request
pub const CLIENT_USER_AGENT: &str = "suvctl/0.1";

/// Substring the upstream's internal failure page contains
///
/// This is a filesystem path leaked by one deployment's error page. It carries
/// no meaning beyond "this body is not an API response"; override it with
/// [`crate::SuvClientBuilder::error_marker`] if the deployment changes.
pub const DEFAULT_ERROR_MARKER: &str = r"C:\wamp64\www\SistemaSUV2";

/// Bound applied to every request unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP method of a portal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Ordered form parameters; a key may carry several values
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    entries: Vec<(String, Vec<String>)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `key`, keeping first-insertion order of keys
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
        self
    }

    /// Builder-style [`FormParams::append`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `application/x-www-form-urlencoded` serialization
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.entries {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = FormParams::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

impl fmt::Debug for FormParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Credentials travel in form params; only show the keys
        f.debug_list()
            .entries(self.entries.iter().map(|(k, _)| k))
            .finish()
    }
}

/// A request to one portal endpoint
///
/// Built once and consumed by [`Pipeline::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    params: FormParams,
}

impl RequestDescriptor {
    /// Build a form request; POST sends `params` as the body, GET as the query
    pub fn form(method: Method, path: impl Into<String>, params: FormParams) -> Self {
        Self {
            method,
            path: path.into(),
            params,
        }
    }

    pub fn post(path: impl Into<String>, params: FormParams) -> Self {
        Self::form(Method::Post, path, params)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::form(Method::Get, path, FormParams::new())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &FormParams {
        &self.params
    }

    /// Encoded body for POST requests, `None` for GET
    pub fn body(&self) -> Option<String> {
        match self.method {
            Method::Post => Some(self.params.encode()),
            Method::Get => None,
        }
    }

    /// Full URL of this request below `base_url`
    pub fn url(&self, base_url: &Url) -> Result<Url, url::ParseError> {
        let joined = format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)?;
        if self.method == Method::Get && !self.params.is_empty() {
            url.set_query(Some(&self.params.encode()));
        }
        Ok(url)
    }
}

/// A fully buffered response
#[derive(Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> Result<&str, DecodeError> {
        std::str::from_utf8(&self.body).map_err(|_| DecodeError::Encoding)
    }

    /// Whether the body contains `needle` as a byte substring
    pub fn body_contains(&self, needle: &str) -> bool {
        let needle = needle.as_bytes();
        !needle.is_empty() && self.body.windows(needle.len()).any(|w| w == needle)
    }

    /// Cookies set by this response, in header order
    pub fn set_cookies(&self) -> Vec<Cookie> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(Cookie::parse_set_cookie)
            .collect()
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Diagnostic callback run before a request is sent
pub type RequestHook = Arc<dyn Fn(&RequestDescriptor, &Url) + Send + Sync>;

/// Diagnostic callback run after a response is buffered
pub type ResponseHook = Arc<dyn Fn(&RawResponse) + Send + Sync>;

/// Sends portal requests and screens responses for upstream failures
///
/// The pipeline never reads or writes cookies itself: the caller passes the
/// `Cookie` header in and inspects `Set-Cookie` on the way out.
#[derive(Clone)]
pub struct Pipeline {
    http: reqwest::blocking::Client,
    base_url: Url,
    timeout: Duration,
    error_marker: String,
    detailed: bool,
    on_request: RequestHook,
    on_response: ResponseHook,
}

impl Pipeline {
    pub(crate) fn new(
        http: reqwest::blocking::Client,
        base_url: Url,
        timeout: Duration,
        error_marker: String,
        detailed: bool,
        on_request: Option<RequestHook>,
        on_response: Option<ResponseHook>,
    ) -> Self {
        Self {
            http,
            base_url,
            timeout,
            error_marker,
            detailed,
            on_request: on_request.unwrap_or_else(|| Arc::new(trace_request)),
            on_response: on_response.unwrap_or_else(|| Arc::new(trace_response)),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn error_marker(&self) -> &str {
        &self.error_marker
    }

    pub fn is_detailed(&self) -> bool {
        self.detailed
    }

    /// Send `request` with the given `Cookie` header and buffer the response
    ///
    /// # Errors
    ///
    /// [`crate::SuvError::Transport`] on connection, DNS, timeout, or body read
    /// failure; [`crate::SuvError::InvalidUrl`] if the path does not form a URL.
    /// Non-success statuses are not errors here; see [`Pipeline::validate`].
    pub fn execute(
        &self,
        request: RequestDescriptor,
        cookies: Option<HeaderValue>,
    ) -> Result<RawResponse, crate::SuvError> {
        let url = request.url(&self.base_url)?;

        if self.detailed {
            (self.on_request)(&request, &url);
        }

        let mut builder = self
            .http
            .request(request.method.as_reqwest(), url.clone())
            .timeout(self.timeout)
            .header(USER_AGENT, CLIENT_USER_AGENT);

        if let Some(cookie_header) = cookies {
            builder = builder.header(COOKIE, cookie_header);
        }

        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(body);
        }

        tracing::debug!(method = %request.method, %url, "sending request");
        let response = builder.send().map_err(TransportError::from)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().map_err(TransportError::from)?;
        let raw = RawResponse::new(status, headers, body.to_vec());
        tracing::debug!(%status, bytes = raw.body.len(), "received response");

        if self.detailed {
            (self.on_response)(&raw);
        }

        Ok(raw)
    }

    /// Screen a response for upstream failures, handing it back untouched
    ///
    /// # Errors
    ///
    /// * [`ProtocolError::UpstreamError`] if the body contains the error marker,
    ///   whatever the status code
    /// * [`ProtocolError::UnexpectedStatus`] if the status is not 200 OK
    pub fn validate(&self, response: RawResponse) -> Result<RawResponse, ProtocolError> {
        validate_response(response, &self.error_marker)
    }

    /// The error-marker half of [`Pipeline::validate`]; any status passes
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UpstreamError`] if the body contains the error marker
    pub fn screen(&self, response: RawResponse) -> Result<RawResponse, ProtocolError> {
        screen_error_page(response, &self.error_marker)
    }

    /// [`Pipeline::execute`] followed by [`Pipeline::validate`]
    pub fn send(
        &self,
        request: RequestDescriptor,
        cookies: Option<HeaderValue>,
    ) -> Result<RawResponse, crate::SuvError> {
        let response = self.execute(request, cookies)?;
        Ok(self.validate(response)?)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("error_marker", &self.error_marker)
            .field("detailed", &self.detailed)
            .finish_non_exhaustive()
    }
}

fn screen_error_page(response: RawResponse, marker: &str) -> Result<RawResponse, ProtocolError> {
    if response.body_contains(marker) {
        return Err(ProtocolError::UpstreamError {
            marker: marker.to_string(),
        });
    }
    Ok(response)
}

pub(crate) fn validate_response(
    response: RawResponse,
    marker: &str,
) -> Result<RawResponse, ProtocolError> {
    let response = screen_error_page(response, marker)?;
    if response.status != StatusCode::OK {
        return Err(ProtocolError::UnexpectedStatus {
            status: response.status,
        });
    }
    Ok(response)
}

/// Default request dump for detailed mode
fn trace_request(request: &RequestDescriptor, url: &Url) {
    let body = match request.body() {
        // The login form carries the password
        Some(_) if request.params.get("pass").is_some() => "<form with credentials>".to_string(),
        Some(body) => body,
        None => String::new(),
    };
    tracing::info!(
        target: "suv_http_client::trace",
        method = %request.method,
        %url,
        user_agent = CLIENT_USER_AGENT,
        %body,
        "[Request]"
    );
}

/// Default response dump for detailed mode
fn trace_response(response: &RawResponse) {
    let headers = response
        .headers
        .iter()
        .map(|(name, value)| {
            if value.is_sensitive() || *name == SET_COOKIE {
                format!("{}: <redacted>", name)
            } else {
                format!("{}: {}", name, value.to_str().unwrap_or("<binary>"))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    tracing::info!(
        target: "suv_http_client::trace",
        status = %response.status,
        %headers,
        body = %String::from_utf8_lossy(&response.body),
        "[Response]"
    );
}
