//! Corrective guidance for tool calls rejected by input validation.
//!
//! Record-creation tools get a field-by-field breakdown of their schema and
//! a worked example; other tools get a single remediation line.

use crate::application::tooling::catalogue;
use crate::constants::GUIDANCE_ERROR_WINDOW;
use crate::domain::{FieldSpec, SessionState, ToolDescriptor};

const VALIDATION_MARKER: &str = "invalid input for tool ";
const RECORD_CREATION_TOOLS: &[&str] = &["create_book", "add_book"];

/// The part of a failed call that guidance is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCall {
    pub name: String,
    pub error: String,
}

impl FailedCall {
    /// Recognises `Invalid input for tool NAME: ...` within an error line.
    pub fn from_validation_error(error: &str) -> Option<Self> {
        let lowered = error.to_ascii_lowercase();
        let start = lowered.find(VALIDATION_MARKER)? + VALIDATION_MARKER.len();
        let rest = &error[start..];
        let name = rest.split(':').next()?.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            error: error.to_string(),
        })
    }
}

/// Most recent validation failure naming a tool the session knows about.
pub fn recent_validation_failure(state: &SessionState) -> Option<FailedCall> {
    let known = |name: &str| {
        state.available_tools.iter().any(|tool| tool.name == name)
            || RECORD_CREATION_TOOLS.contains(&name)
    };
    state
        .recent_errors(GUIDANCE_ERROR_WINDOW)
        .iter()
        .rev()
        .filter_map(|error| FailedCall::from_validation_error(error))
        .find(|failed| known(&failed.name))
}

/// Last recorded tool call, when it failed with an input complaint.
pub fn last_rejected_call(state: &SessionState) -> Option<FailedCall> {
    let last = state.tool_calls.last()?;
    let error = last.error()?;
    error.to_lowercase().contains("invalid").then(|| FailedCall {
        name: last.name.clone(),
        error: error.to_string(),
    })
}

/// Guidance for `failed`, or `None` when the error is not an input
/// validation problem.
pub fn enhanced_error_guidance(tools: &[ToolDescriptor], failed: &FailedCall) -> Option<String> {
    if !failed.error.to_lowercase().contains("invalid") {
        return None;
    }
    if RECORD_CREATION_TOOLS.contains(&failed.name.as_str()) {
        if let Some(tool) = schema_source(tools, &failed.name) {
            return Some(record_creation_guidance(&tool));
        }
    }
    Some(format!(
        "I encountered a validation error with the {} tool: {}\n\nPlease check that all required fields are provided in the correct format and try again.",
        failed.name, failed.error
    ))
}

fn schema_source(tools: &[ToolDescriptor], name: &str) -> Option<ToolDescriptor> {
    tools
        .iter()
        .find(|tool| tool.name == name)
        .cloned()
        .or_else(|| {
            catalogue::supplemental_tools()
                .into_iter()
                .find(|tool| tool.name == name)
        })
        .filter(|tool| !tool.input_schema.fields.is_empty())
}

fn record_creation_guidance(tool: &ToolDescriptor) -> String {
    let mut lines = vec![
        "I was unable to add a book to your library due to input validation issues.".to_string(),
        String::new(),
        "To successfully add a book, please provide the following information:".to_string(),
    ];
    for field in &tool.input_schema.fields {
        let marker = if tool.input_schema.is_required(&field.name) {
            "required"
        } else {
            "optional"
        };
        lines.push(format!(
            "• **{}**: {} ({marker})",
            field_label(&field.name),
            field_requirement(field)
        ));
    }
    lines.extend(
        [
            "",
            "**Example format:**",
            "Title: The Great Gatsby",
            "Author: F. Scott Fitzgerald",
            "Genre: Classic Literature",
            "Year: 1925",
            "ISBN: 978-0-7432-7356-5",
            "",
            "Please try again with the correct format, ensuring the publication year is entered as a number without quotes.",
        ]
        .map(String::from),
    );
    lines.join("\n")
}

fn field_requirement(field: &FieldSpec) -> String {
    match field.name.as_str() {
        "year" | "publishedYear" | "published_year" => {
            "Must be an integer representing the publication year (e.g., 1997, 2024)".to_string()
        }
        "title" => "Text string with the book's title".to_string(),
        "author" => "Text string with the author's name".to_string(),
        "genre" => "Text string describing the book's genre".to_string(),
        "isbn" => "Text string with the ISBN number".to_string(),
        _ => {
            let kind = field
                .field_type
                .as_ref()
                .map(|t| t.as_str().to_string())
                .unwrap_or_else(|| "string".to_string());
            match field.description.as_deref().filter(|d| !d.is_empty()) {
                Some(description) => format!("{kind} - {description}"),
                None => kind,
            }
        }
    }
}

/// `publishedYear` -> `Published Year`, `book_id` -> `Book Id`, `isbn` -> `ISBN`.
fn field_label(name: &str) -> String {
    if name.eq_ignore_ascii_case("isbn") {
        return "ISBN".to_string();
    }
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
            current.push(ch);
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
