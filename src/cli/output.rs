use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::core::TestSampleMapping;
use crate::error::{ErrorCode, Result, StructuredError, TsmError};
use crate::lifecycle::MappingState;

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    /// Rich error with structured information
    #[serde(rename = "error")]
    StructuredError {
        /// Error code enum value (e.g., "MAPPING_NOT_FOUND")
        code: ErrorCode,
        numeric_code: u16,
        /// HTTP-style status hint
        http_status: u16,
        message: String,
        suggestion: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
        recoverable: bool,
        category: String,
    },
}

impl From<StructuredError> for RobotStatus {
    fn from(err: StructuredError) -> Self {
        Self::StructuredError {
            code: err.code,
            numeric_code: err.numeric_code,
            http_status: err.http_status,
            message: err.message,
            suggestion: err.suggestion,
            context: err.context,
            recoverable: err.recoverable,
            category: err.category,
        }
    }
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

/// Create a robot error response from a `TsmError` with structured information.
pub fn robot_error_structured(err: &TsmError) -> RobotResponse<serde_json::Value> {
    RobotResponse {
        status: err.to_structured().into(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
        warnings: Vec::new(),
    }
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

pub fn state_label(state: &MappingState) -> ColoredString {
    match state {
        MappingState::Active => state.name().green(),
        MappingState::RecollectionPending { .. } => state.name().red().bold(),
        MappingState::Resolved { .. } => state.name().yellow(),
        MappingState::Unreconciled => state.name().magenta(),
        MappingState::Deleted { .. } => state.name().dimmed(),
    }
}

/// Multi-line detail view of one mapping.
pub fn print_mapping(mapping: &TestSampleMapping) {
    let state = MappingState::of(mapping);
    println!("{} {}", "Mapping".bold(), mapping.id.to_string().bold());
    println!("{}: {}", "Order".dimmed(), mapping.oms_order_id);
    println!("{}: {}", "Test".dimmed(), mapping.oms_test_id);
    println!(
        "{}: {} (#{})",
        "Sample".dimmed(),
        mapping.sample_id,
        mapping.sample_number
    );
    println!("{}: {}", "Vial type".dimmed(), mapping.vial_type_id);
    if !mapping.oms_city_code.is_empty() {
        println!("{}: {}", "City".dimmed(), mapping.oms_city_code);
    }
    println!("{}: {}", "State".dimmed(), state_label(&state));
    if let Some(reason) = &mapping.rejection_reason {
        println!("{}: {}", "Reason".dimmed(), reason);
    }
    println!(
        "{}: {} by {}",
        "Created".dimmed(),
        mapping.created_at.to_rfc3339(),
        mapping.created_by
    );
    println!(
        "{}: {} by {}",
        "Updated".dimmed(),
        mapping.updated_at.to_rfc3339(),
        mapping.updated_by
    );
    if let MappingState::Deleted { at, by } = state {
        println!("{}: {} by {}", "Deleted".dimmed(), at.to_rfc3339(), by);
    }
}

/// One line per mapping.
pub fn print_mapping_rows(mappings: &[TestSampleMapping]) {
    if mappings.is_empty() {
        println!("{}", "No mappings.".dimmed());
        return;
    }
    println!(
        "{:>6}  {:<14} {:<14} {:>10} {:>3}  {}",
        "ID".bold(),
        "ORDER".bold(),
        "TEST".bold(),
        "SAMPLE".bold(),
        "#".bold(),
        "STATE".bold()
    );
    for mapping in mappings {
        let state = MappingState::of(mapping);
        println!(
            "{:>6}  {:<14} {:<14} {:>10} {:>3}  {}",
            mapping.id,
            mapping.oms_order_id,
            mapping.oms_test_id,
            mapping.sample_id,
            mapping.sample_number,
            state_label(&state)
        );
    }
}

/// Human rendering of an error with its recovery hint.
pub fn print_error(err: &TsmError) {
    let structured = err.to_structured();
    eprintln!("{} {}", "Error:".red().bold(), structured);
    eprintln!("{} {}", "Hint:".dimmed(), structured.suggestion);
}
