//! SUV portal client implementation

use crate::cookies::Cookie;
use crate::decoder::{self, GradesSnapshot, ProfessorSummary, StudentSummary};
use crate::error::{AuthError, SuvError};
use crate::request::{
    DEFAULT_ERROR_MARKER, DEFAULT_TIMEOUT, FormParams, Pipeline, RawResponse, RequestDescriptor,
    RequestHook, ResponseHook,
};
use crate::session::{Credentials, Session, SessionState};
use reqwest::Url;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use zeroize::Zeroizing;

/// Credential check endpoint
pub const LOGIN_PATH: &str = "/validar.php";
/// Session teardown endpoint
pub const LOGOUT_PATH: &str = "/desconectar.php";
/// Student controller, serves the current-period grades
pub const STUDENT_CONTROLLER_PATH: &str = "/controller/alumnoController.php";
pub const STUDENT_SEARCH_CONTROLLER_PATH: &str = "/controller/buscarAlumnoController.php";
pub const PROFESSOR_SEARCH_CONTROLLER_PATH: &str = "/controller/buscarDocenteController.php";

/// Phrase the logout page shows once the session is closed
pub const LOGOUT_CONFIRMATION: &str = "Su sesion ha culminado";

/// Path below the host where the portal is mounted
const PORTAL_PATH: &str = "/portal";

/// Connection settings as a host application stores them
#[derive(Clone, Default)]
pub struct SuvConfig {
    /// Portal host, optionally with port (`portal.example.edu:8080`)
    pub host: String,
    /// Previously issued session token; empty for none
    pub session_token: Zeroizing<String>,
    pub user_code: String,
    pub password: Zeroizing<String>,
    /// Run the request/response trace hooks
    pub detailed: bool,
}

impl std::fmt::Debug for SuvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuvConfig")
            .field("host", &self.host)
            .field("has_session_token", &!self.session_token.is_empty())
            .field("user_code", &self.user_code)
            .field("detailed", &self.detailed)
            .finish_non_exhaustive()
    }
}

/// Student search criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentQuery {
    /// Search by first name(s) and last name(s)
    Name { name: String, lastname: String },
    /// Search by student code
    Code(String),
    /// Search by national ID number
    Dni(String),
}

impl StudentQuery {
    /// Pick a query from loose criteria
    ///
    /// A code wins over a full name, which wins over a DNI. Blank values are
    /// ignored; `None` means no usable criterion was given.
    pub fn from_criteria(code: &str, name: &str, lastname: &str, dni: &str) -> Option<Self> {
        let (code, name, lastname, dni) = (code.trim(), name.trim(), lastname.trim(), dni.trim());
        if !code.is_empty() {
            Some(StudentQuery::Code(code.to_string()))
        } else if !name.is_empty() && !lastname.is_empty() {
            Some(StudentQuery::Name {
                name: name.to_string(),
                lastname: lastname.to_string(),
            })
        } else if !dni.is_empty() {
            Some(StudentQuery::Dni(dni.to_string()))
        } else {
            None
        }
    }

    fn params(&self) -> FormParams {
        match self {
            StudentQuery::Name { name, lastname } => FormParams::new()
                .with("task", "buscarAlumno")
                .with("nombre", name.as_str())
                .with("apellido", lastname.as_str()),
            StudentQuery::Code(code) => FormParams::new()
                .with("task", "buscarCodigo")
                .with("codigo", code.as_str()),
            StudentQuery::Dni(dni) => FormParams::new()
                .with("task", "buscarDNI")
                .with("dni", dni.as_str()),
        }
    }
}

/// The main SUV portal client
///
/// Owns its HTTP client, cookie store and session, so several independent
/// sessions can coexist in one process. All methods take `&self`; session
/// updates are serialized through an internal mutex that is never held
/// across network I/O.
///
/// Operations that need a session fail with [`AuthError::NotAuthenticated`]
/// before touching the network when no token is held.
///
/// # Example
///
/// ```no_run
/// use suv_http_client::SuvClient;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SuvClient::builder().host("portal.example.edu")?.build()?;
///
/// let token = client.login("12345", "secret")?;
/// println!("Session: {}", token.as_str());
///
/// let grades = client.grades()?;
/// for course in &grades.courses {
///     println!("{}: {}", course.name, course.final_average);
/// }
///
/// client.logout()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SuvClient {
    pipeline: Pipeline,
    session: Mutex<Session>,
}

impl SuvClient {
    /// Create a client for the portal on `host` with default settings
    pub fn new(host: &str) -> Result<Self, SuvError> {
        Self::builder().host(host)?.build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> SuvClientBuilder {
        SuvClientBuilder::new()
    }

    /// Create a client from stored settings
    ///
    /// Credentials are retained for [`SuvClient::relogin`] when a user code is
    /// set, and a non-empty session token is restored without contacting the
    /// server.
    pub fn from_config(config: &SuvConfig) -> Result<Self, SuvError> {
        let client = Self::builder()
            .host(&config.host)?
            .detailed(config.detailed)
            .build()?;

        if !config.user_code.is_empty() {
            client.lock().retain_credentials(Credentials::new(
                config.user_code.as_str(),
                config.password.as_str(),
            ));
        }
        if !config.session_token.is_empty() {
            client.restore_session(&config.session_token)?;
        }

        Ok(client)
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn base_url(&self) -> &Url {
        self.pipeline.base_url()
    }

    /// The request pipeline, for endpoints this client does not wrap
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    /// Current session token, if authenticated
    pub fn token(&self) -> Option<Zeroizing<String>> {
        self.lock().token().map(|t| Zeroizing::new(t.to_string()))
    }

    /// Cookies currently replayed to the portal
    pub fn cookies(&self) -> Vec<Cookie> {
        self.lock().cookies().get(self.pipeline.base_url())
    }

    /// User code of the retained credentials
    pub fn user_code(&self) -> Option<String> {
        self.lock()
            .credentials()
            .map(|c| c.user_code().to_string())
    }

    /// Drop retained credentials; the session itself is unaffected
    pub fn forget_credentials(&self) {
        self.lock().forget_credentials();
    }

    /// Log in with a user code and password
    ///
    /// The credentials are retained for [`SuvClient::relogin`]. On success the
    /// `PHPSESSID` cookie from the response becomes the session token and is
    /// returned.
    ///
    /// # Errors
    ///
    /// * [`AuthError::Rejected`] if the portal answers with an empty array or `"0"`;
    ///   the session is left as it was and no cookie is stored
    /// * [`AuthError::MissingSessionCookie`] if no `PHPSESSID` is available afterwards
    /// * Transport, protocol and decode errors from the request itself
    pub fn login(&self, user_code: &str, password: &str) -> Result<Zeroizing<String>, SuvError> {
        self.lock()
            .retain_credentials(Credentials::new(user_code, password));

        let params = FormParams::new()
            .with("user", user_code)
            .with("pass", password);
        let cookies = self.lock().cookie_header();
        let response = self
            .pipeline
            .send(RequestDescriptor::post(LOGIN_PATH, params), cookies)?;

        let result = decoder::decode_login(response.body())?;
        if !result.success {
            tracing::debug!(user_code, "login rejected");
            return Err(AuthError::Rejected {
                reason: result.reason.unwrap_or_default(),
            }
            .into());
        }

        let token = self.lock().complete_login(response.set_cookies())?;
        tracing::debug!(user_code, "logged in");
        Ok(token)
    }

    /// Log in again with the retained credentials
    pub fn relogin(&self) -> Result<Zeroizing<String>, SuvError> {
        let credentials = self
            .lock()
            .credentials()
            .cloned()
            .ok_or(AuthError::MissingCredentials)?;
        self.login(credentials.user_code(), credentials.password())
    }

    /// Adopt a previously issued session token
    ///
    /// The token is not checked against the server; a stale token surfaces as
    /// an error on the next authenticated call.
    pub fn restore_session(&self, token: &str) -> Result<(), AuthError> {
        self.lock().restore(token)?;
        tracing::debug!("session restored from token");
        Ok(())
    }

    /// Close the session on the portal
    ///
    /// The request is sent even without a session, since the endpoint is
    /// stateless. The token is cleared only once the portal confirms.
    ///
    /// The status code is not checked; only the confirmation phrase counts.
    ///
    /// # Errors
    ///
    /// * [`AuthError::LogoutFailed`] if the response lacks the confirmation
    ///   phrase; the token is left untouched
    /// * [`ProtocolError::UpstreamError`](crate::ProtocolError::UpstreamError)
    ///   if the portal answers with its error page
    pub fn logout(&self) -> Result<(), SuvError> {
        let cookies = self.lock().cookie_header();
        let response = self
            .pipeline
            .execute(RequestDescriptor::get(LOGOUT_PATH), cookies)?;
        let response = self.pipeline.screen(response)?;

        if !response.body_contains(LOGOUT_CONFIRMATION) {
            return Err(AuthError::LogoutFailed.into());
        }

        self.lock().end();
        tracing::debug!("logged out");
        Ok(())
    }

    /// Send a request that requires a session and return the validated response
    ///
    /// This is the primitive the endpoint wrappers are built on. Cookies set by
    /// the response are merged into the store.
    pub fn authenticated_request(
        &self,
        request: RequestDescriptor,
    ) -> Result<RawResponse, SuvError> {
        let cookies = self.lock().authenticated_cookie_header()?;
        let response = self.pipeline.send(request, cookies)?;
        self.lock().absorb_cookies(response.set_cookies());
        Ok(response)
    }

    /// Fetch the current period's grades
    pub fn grades(&self) -> Result<GradesSnapshot, SuvError> {
        let params = FormParams::new().with("task", "verNotasPeriodoActual");
        let response =
            self.authenticated_request(RequestDescriptor::post(STUDENT_CONTROLLER_PATH, params))?;
        Ok(decoder::decode_grades(response.body())?)
    }

    /// Search students
    pub fn search_student(&self, query: &StudentQuery) -> Result<Vec<StudentSummary>, SuvError> {
        let response = self.authenticated_request(RequestDescriptor::post(
            STUDENT_SEARCH_CONTROLLER_PATH,
            query.params(),
        ))?;
        Ok(decoder::decode_json(response.body(), "student search")?)
    }

    pub fn search_student_by_name(
        &self,
        name: &str,
        lastname: &str,
    ) -> Result<Vec<StudentSummary>, SuvError> {
        self.search_student(&StudentQuery::Name {
            name: name.to_string(),
            lastname: lastname.to_string(),
        })
    }

    pub fn search_student_by_code(&self, code: &str) -> Result<Vec<StudentSummary>, SuvError> {
        self.search_student(&StudentQuery::Code(code.to_string()))
    }

    pub fn search_student_by_dni(&self, dni: &str) -> Result<Vec<StudentSummary>, SuvError> {
        self.search_student(&StudentQuery::Dni(dni.to_string()))
    }

    /// Search professors by name and last name
    pub fn search_professor(
        &self,
        name: &str,
        lastname: &str,
    ) -> Result<Vec<ProfessorSummary>, SuvError> {
        let params = FormParams::new()
            .with("task", "buscarDocente")
            .with("nombre", name)
            .with("apellido", lastname);
        let response = self.authenticated_request(RequestDescriptor::post(
            PROFESSOR_SEARCH_CONTROLLER_PATH,
            params,
        ))?;
        Ok(decoder::decode_json(response.body(), "professor search")?)
    }
}

/// Builder for configuring a SUV client
///
/// # Example
///
/// ```no_run
/// use suv_http_client::SuvClient;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Portal mounted at http://portal.example.edu/portal
/// let client = SuvClient::builder().host("portal.example.edu")?.build()?;
///
/// // Full base URL, e.g. a mock server
/// let client = SuvClient::builder()
///     .base_url("http://localhost:1234")?
///     .timeout(Duration::from_secs(10))
///     .detailed(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SuvClientBuilder {
    base_url: Option<Url>,
    client_builder: Option<reqwest::blocking::ClientBuilder>,
    timeout: Duration,
    error_marker: String,
    detailed: bool,
    on_request: Option<RequestHook>,
    on_response: Option<ResponseHook>,
}

impl SuvClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            base_url: None,
            client_builder: None,
            timeout: DEFAULT_TIMEOUT,
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            detailed: false,
            on_request: None,
            on_response: None,
        }
    }

    /// Target the portal on `host` (`http://{host}/portal`)
    pub fn host(mut self, host: &str) -> Result<Self, SuvError> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(SuvError::ClientInit("host is empty".to_string()));
        }
        self.base_url = Some(Url::parse(&format!("http://{}{}", host, PORTAL_PATH))?);
        Ok(self)
    }

    /// Set the full base URL that endpoint paths are appended to
    pub fn base_url(mut self, url: impl reqwest::IntoUrl) -> Result<Self, SuvError> {
        self.base_url = Some(
            url.into_url()
                .map_err(|e| SuvError::ClientInit(e.to_string()))?,
        );
        Ok(self)
    }

    /// Set a custom HTTP client builder (proxies, TLS settings, ...)
    pub fn client_builder(mut self, builder: reqwest::blocking::ClientBuilder) -> Self {
        self.client_builder = Some(builder);
        self
    }

    /// Bound every request by `timeout`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the upstream error page marker
    pub fn error_marker(mut self, marker: impl Into<String>) -> Self {
        self.error_marker = marker.into();
        self
    }

    /// Run the trace hooks around every request
    pub fn detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }

    /// Replace the default before-send trace hook
    pub fn on_request(
        mut self,
        hook: impl Fn(&RequestDescriptor, &Url) + Send + Sync + 'static,
    ) -> Self {
        self.on_request = Some(Arc::new(hook));
        self
    }

    /// Replace the default after-receive trace hook
    pub fn on_response(mut self, hook: impl Fn(&RawResponse) + Send + Sync + 'static) -> Self {
        self.on_response = Some(Arc::new(hook));
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// `SuvError::ClientInit` if no host or base URL was set, the error marker
    /// is empty, or the HTTP client cannot be initialized.
    pub fn build(self) -> Result<SuvClient, SuvError> {
        let base_url = self
            .base_url
            .ok_or_else(|| SuvError::ClientInit("no host or base URL configured".to_string()))?;

        if self.error_marker.is_empty() {
            return Err(SuvError::ClientInit("error marker is empty".to_string()));
        }

        let builder = self
            .client_builder
            .unwrap_or_else(|| reqwest::blocking::Client::builder().use_rustls_tls());

        // Cookies are managed by the session, never by reqwest
        let http = builder
            .timeout(self.timeout)
            .build()
            .map_err(|e| SuvError::ClientInit(e.to_string()))?;

        let pipeline = Pipeline::new(
            http,
            base_url.clone(),
            self.timeout,
            self.error_marker,
            self.detailed,
            self.on_request,
            self.on_response,
        );

        Ok(SuvClient {
            pipeline,
            session: Mutex::new(Session::new(base_url)),
        })
    }
}

impl Default for SuvClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SuvClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuvClientBuilder")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("timeout", &self.timeout)
            .field("error_marker", &self.error_marker)
            .field("detailed", &self.detailed)
            .finish_non_exhaustive()
    }
}
