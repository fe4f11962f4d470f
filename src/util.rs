use crate::config::{DEFAULT_BREAK_MINUTES, MAX_BREAK_MINUTES};
use crate::errors::{FlowError, FlowResult};

/// Render seconds as `H:MM:SS`, the way the history and timer show them
pub fn format_hms(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{}:{:02}:{:02}", h, m, s)
}

/// `MM:SS` for the break countdown
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One minute of break per five minutes of focus, never below the default
pub fn suggested_break_minutes(work_seconds: u64) -> u64 {
    let work_minutes = work_seconds / 60;
    (work_minutes / 5).clamp(DEFAULT_BREAK_MINUTES, MAX_BREAK_MINUTES)
}

pub fn parse_break_minutes(input: &str) -> FlowResult<u64> {
    let trimmed = input.trim();
    match trimmed.parse::<u64>() {
        Ok(0) => Err(FlowError::Validation(
            "Break length must be at least one minute".to_string(),
        )),
        Ok(minutes) if minutes > MAX_BREAK_MINUTES => Err(FlowError::Validation(format!(
            "Break length must be at most {} minutes",
            MAX_BREAK_MINUTES
        ))),
        Ok(minutes) => Ok(minutes),
        Err(_) => Err(FlowError::Validation(format!(
            "Break length must be a number of minutes, got '{}'",
            trimmed
        ))),
    }
}
