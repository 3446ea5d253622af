//! SUV portal HTTP client library
//!
//! A blocking client for the internal web API of the SUV academic portal. It
//! logs in, keeps the `PHPSESSID` session cookie, sends form-encoded requests
//! and decodes the portal's JSON answers into typed records.
//!
//! # Features
//!
//! - Session lifecycle: login, restore from a saved token, logout
//! - Detection of the upstream's internal error page in otherwise successful responses
//! - Strict decoding of the positional grades array, with errors naming the offending position
//! - Student and professor search
//! - Per-request timeouts, no automatic retries
//! - Secure TLS using rustls (no OpenSSL dependencies)
//! - Well-typed errors using thiserror
//!
//! # Example
//!
//! ```no_run
//! use suv_http_client::{StudentQuery, SuvClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SuvClient::new("portal.example.edu")?;
//!
//! // Reuse a saved session, or log in
//! match std::env::var("SUV_SESSION") {
//!     Ok(token) => client.restore_session(&token)?,
//!     Err(_) => {
//!         client.login("12345", "secret")?;
//!     }
//! }
//!
//! let grades = client.grades()?;
//! println!("{} ({})", grades.semester, grades.payment_status);
//!
//! if let Some(query) = StudentQuery::from_criteria("", "Ana", "Perez", "") {
//!     for student in client.search_student(&query)? {
//!         println!("{} {}", student.id, student.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod cookies;
mod decoder;
mod error;
mod request;
mod session;

pub use client::{
    LOGIN_PATH, LOGOUT_CONFIRMATION, LOGOUT_PATH, PROFESSOR_SEARCH_CONTROLLER_PATH,
    STUDENT_CONTROLLER_PATH, STUDENT_SEARCH_CONTROLLER_PATH, StudentQuery, SuvClient,
    SuvClientBuilder, SuvConfig,
};
pub use cookies::{Cookie, CookieStore, SESSION_COOKIE};
pub use decoder::{
    CourseGrade, GRADES_ARITY, GradesSnapshot, LOGIN_REJECTED, LoginResult, ProfessorSummary,
    StudentSummary, decode_grades, decode_json, decode_login,
};
pub use error::{AuthError, DecodeError, ProtocolError, SuvError, TransportError};
pub use request::{
    CLIENT_USER_AGENT, DEFAULT_ERROR_MARKER, DEFAULT_TIMEOUT, FormParams, Method, Pipeline,
    RawResponse, RequestDescriptor, RequestHook, ResponseHook,
};
pub use session::{Credentials, SessionState};
