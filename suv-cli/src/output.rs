//! Output formatting for portal records

use crate::error::CliError;
use serde_json::json;
use suv_http_client::{GradesSnapshot, ProfessorSummary, StudentSummary};

/// Output formatter for portal records
pub struct OutputFormatter {
    json: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn print_grades(&self, grades: &GradesSnapshot) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(grades)?);
            return Ok(());
        }
        print!("{}", format_grades(grades));
        Ok(())
    }

    pub fn print_students(&self, students: &[StudentSummary]) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(students)?);
            return Ok(());
        }
        if students.is_empty() {
            println!("No students found.");
        }
        for student in students {
            println!("{:<12} {:<10} {}", student.id, student.dni, student.name);
        }
        Ok(())
    }

    pub fn print_professors(&self, professors: &[ProfessorSummary]) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(professors)?);
            return Ok(());
        }
        if professors.is_empty() {
            println!("No professors found.");
        }
        for professor in professors {
            println!(
                "{:<10} {:<10} {}",
                professor.code, professor.dni, professor.name
            );
        }
        Ok(())
    }

    /// Print saved-session status
    pub fn print_status(&self, host: &str, session_saved: bool) -> Result<(), CliError> {
        if self.json {
            let status = json!({ "host": host, "session_saved": session_saved });
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }
        let state = if session_saved {
            "session saved"
        } else {
            "no session"
        };
        println!("{}: {}", host, state);
        Ok(())
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

/// Plain-text grades table
fn format_grades(grades: &GradesSnapshot) -> String {
    let mut out = format!(
        "Semester {} | {} | {}\n",
        grades.semester, grades.enrollment_type, grades.payment_status
    );
    if grades.courses.is_empty() {
        out.push_str("No courses.\n");
        return out;
    }
    for course in &grades.courses {
        let partials = course
            .partial_averages()
            .iter()
            .map(|p| or_dash(p))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!(
            "{:<8} {:<40} [{}] avg {} final {} {}\n",
            course.course_id,
            course.name,
            partials,
            or_dash(&course.average),
            or_dash(&course.final_average),
            or_dash(&course.final_status),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use suv_http_client::CourseGrade;

    #[test]
    fn test_format_grades_lists_courses() {
        let grades = GradesSnapshot {
            payment_status: "PAGADO".to_string(),
            enrollment_type: "REGULAR".to_string(),
            semester: "2024-I".to_string(),
            courses: vec![CourseGrade {
                course_id: "1".to_string(),
                name: "Calculus".to_string(),
                partial_average_1: "15".to_string(),
                average: "15".to_string(),
                ..Default::default()
            }],
        };

        let text = format_grades(&grades);
        assert!(text.starts_with("Semester 2024-I | REGULAR | PAGADO"));
        assert!(text.contains("Calculus"));
        assert!(text.contains("[15 - - - - -]"));
        assert!(text.contains("avg 15 final -"));
    }

    #[test]
    fn test_format_grades_without_courses() {
        let grades = GradesSnapshot {
            payment_status: "PENDIENTE".to_string(),
            enrollment_type: "REGULAR".to_string(),
            semester: "2024-II".to_string(),
            courses: Vec::new(),
        };
        assert!(format_grades(&grades).ends_with("No courses.\n"));
    }
}
