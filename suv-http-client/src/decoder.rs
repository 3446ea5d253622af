//! Response body decoding
//!
//! Most endpoints answer with plain JSON arrays of keyed objects and go through
//! [`decode_json`]. The grades endpoint instead packs a heterogeneous record
//! into a fixed-length array; [`decode_grades`] is the only place that knows
//! that layout.

use crate::error::DecodeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Literal the login endpoint returns as its first element on rejection
pub const LOGIN_REJECTED: &str = "0";

/// Number of elements in the grades positional array
pub const GRADES_ARITY: usize = 4;

const PAYMENT_STATUS_INDEX: usize = 0;
const ENROLLMENT_TYPE_INDEX: usize = 1;
const COURSES_INDEX: usize = 2;
const SEMESTER_INDEX: usize = 3;

/// Outcome of a login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub success: bool,
    /// Why the login failed, `None` on success
    pub reason: Option<String>,
}

/// Current-period grades
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradesSnapshot {
    pub payment_status: String,
    pub enrollment_type: String,
    pub semester: String,
    pub courses: Vec<CourseGrade>,
}

/// Grades of one course in the current period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseGrade {
    #[serde(rename = "idcurso", default, deserialize_with = "nullable_string")]
    pub course_id: String,
    #[serde(rename = "curso", default, deserialize_with = "nullable_string")]
    pub name: String,
    /// Attempt number ("vez")
    #[serde(rename = "vez", default, deserialize_with = "nullable_string")]
    pub attempt: String,
    #[serde(rename = "promedio1", default, deserialize_with = "nullable_string")]
    pub partial_average_1: String,
    #[serde(rename = "promedio2", default, deserialize_with = "nullable_string")]
    pub partial_average_2: String,
    #[serde(rename = "promedio3", default, deserialize_with = "nullable_string")]
    pub partial_average_3: String,
    #[serde(rename = "promedio4", default, deserialize_with = "nullable_string")]
    pub partial_average_4: String,
    #[serde(rename = "promedio5", default, deserialize_with = "nullable_string")]
    pub partial_average_5: String,
    #[serde(rename = "promedio6", default, deserialize_with = "nullable_string")]
    pub partial_average_6: String,
    #[serde(rename = "sustitutorio", default, deserialize_with = "nullable_string")]
    pub substitute_exam: String,
    #[serde(rename = "promedio", default, deserialize_with = "nullable_string")]
    pub average: String,
    /// Deferred-exam flag ("aplazado")
    #[serde(rename = "aplazado", default, deserialize_with = "nullable_string")]
    pub deferred: String,
    #[serde(rename = "pfinal", default, deserialize_with = "nullable_string")]
    pub final_average: String,
    /// Disqualified-for-attendance flag ("inh")
    #[serde(rename = "inh", default, deserialize_with = "nullable_string")]
    pub disqualified: String,
    #[serde(rename = "pesos", default, deserialize_with = "nullable_strings")]
    pub weights: Vec<String>,
    #[serde(rename = "estados", default, deserialize_with = "nullable_strings")]
    pub period_statuses: Vec<String>,
    #[serde(rename = "estado_final", default, deserialize_with = "nullable_string")]
    pub final_status: String,
}

impl CourseGrade {
    /// The six partial-average slots in order
    pub fn partial_averages(&self) -> [&str; 6] {
        [
            &self.partial_average_1,
            &self.partial_average_2,
            &self.partial_average_3,
            &self.partial_average_4,
            &self.partial_average_5,
            &self.partial_average_6,
        ]
    }
}

/// Student row of a search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    #[serde(rename = "idalumno")]
    pub id: String,
    #[serde(rename = "alumno")]
    pub name: String,
    pub dni: String,
}

/// Professor row of a search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessorSummary {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "docente")]
    pub name: String,
    pub dni: String,
    #[serde(rename = "idtrabajador")]
    pub worker_id: String,
}

/// `null` and missing decode as an empty string; other non-strings are errors
fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a body against a fixed schema
///
/// # Errors
///
/// * [`DecodeError::Malformed`] if the body is not JSON
/// * [`DecodeError::SchemaMismatch`] if it is JSON of the wrong shape
pub fn decode_json<T: DeserializeOwned>(body: &[u8], context: &str) -> Result<T, DecodeError> {
    let value: Value = serde_json::from_slice(body).map_err(DecodeError::Malformed)?;
    serde_json::from_value(value).map_err(|source| DecodeError::SchemaMismatch {
        context: context.to_string(),
        source,
    })
}

/// Decode the login endpoint's `[status, ...]` array
///
/// An empty array or a first element equal to [`LOGIN_REJECTED`] is a failed
/// login. The first element may arrive as a JSON string or number.
pub fn decode_login(body: &[u8]) -> Result<LoginResult, DecodeError> {
    let values: Vec<Value> = decode_json(body, "login response")?;

    let status = match values.first() {
        None => {
            return Ok(LoginResult {
                success: false,
                reason: Some("empty login response".to_string()),
            });
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(DecodeError::UnexpectedType {
                index: Some(0),
                field: "login status",
                expected: "string",
                found: json_type(other),
            });
        }
    };

    if status == LOGIN_REJECTED {
        return Ok(LoginResult {
            success: false,
            reason: Some("invalid credentials".to_string()),
        });
    }

    Ok(LoginResult {
        success: true,
        reason: None,
    })
}

/// Decode the grades endpoint's positional array
///
/// The upstream sends `[payment_status, enrollment_type, [course, ...], semester]`.
/// The three strings are trimmed of whitespace and stray `"` left by double
/// encoding. Nothing is returned unless every element checks out.
///
/// # Errors
///
/// * [`DecodeError::Malformed`] if the body is not JSON
/// * [`DecodeError::UnexpectedType`] with `index: None` if the body is not an array
/// * [`DecodeError::UnexpectedArity`] if the array does not have [`GRADES_ARITY`] elements
/// * [`DecodeError::UnexpectedType`] naming the index of a mistyped element
/// * [`DecodeError::SchemaMismatch`] naming the course whose fields do not match
pub fn decode_grades(body: &[u8]) -> Result<GradesSnapshot, DecodeError> {
    let value: Value = serde_json::from_slice(body).map_err(DecodeError::Malformed)?;
    let elements = match value {
        Value::Array(elements) => elements,
        other => {
            return Err(DecodeError::UnexpectedType {
                index: None,
                field: "grades response",
                expected: "array",
                found: json_type(&other),
            });
        }
    };

    if elements.len() != GRADES_ARITY {
        return Err(DecodeError::UnexpectedArity {
            expected: GRADES_ARITY,
            actual: elements.len(),
        });
    }

    let payment_status = positional_string(&elements, PAYMENT_STATUS_INDEX, "payment status")?;
    let enrollment_type = positional_string(&elements, ENROLLMENT_TYPE_INDEX, "enrollment type")?;
    let semester = positional_string(&elements, SEMESTER_INDEX, "semester")?;

    let courses = match &elements[COURSES_INDEX] {
        Value::Array(courses) => courses,
        other => {
            return Err(DecodeError::UnexpectedType {
                index: Some(COURSES_INDEX),
                field: "courses",
                expected: "array",
                found: json_type(other),
            });
        }
    };

    let courses = courses
        .iter()
        .enumerate()
        .map(|(i, course)| {
            CourseGrade::deserialize(course).map_err(|source| DecodeError::SchemaMismatch {
                context: format!("course {} at index {}", i, COURSES_INDEX),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GradesSnapshot {
        payment_status,
        enrollment_type,
        semester,
        courses,
    })
}

fn positional_string(
    elements: &[Value],
    index: usize,
    field: &'static str,
) -> Result<String, DecodeError> {
    match &elements[index] {
        Value::String(s) => Ok(clean(s).to_string()),
        other => Err(DecodeError::UnexpectedType {
            index: Some(index),
            field,
            expected: "string",
            found: json_type(other),
        }),
    }
}

/// Strip surrounding whitespace and literal quotes
fn clean(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '"')
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
