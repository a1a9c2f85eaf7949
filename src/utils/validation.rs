use crate::utils::error::{Result, SpecError};
use std::fmt::Display;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> SpecError {
    SpecError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 資料目錄路徑: 不可為空白，不可含 NUL
pub fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "Path cannot be empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path.escape_debug(), "Path contains null bytes"));
    }
    Ok(())
}

pub fn validate_min(field: &str, value: usize, min: usize) -> Result<()> {
    if value < min {
        return Err(invalid(field, value, format!("Value must be at least {}", min)));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display + Copy>(
    field: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(invalid(
            field,
            value,
            format!("Valid values: {}", allowed.join(", ")),
        ));
    }
    Ok(())
}

/// 選擇器的每一段必須是單純的名稱，不能跳出資料目錄
pub fn validate_selector_segment(selector: &str, segment: &str) -> Result<()> {
    let reason = if segment.trim().is_empty() {
        Some("empty segment")
    } else if segment == "." || segment == ".." {
        Some("relative path segments are not allowed")
    } else if segment.contains(['/', '\\', '\0']) {
        Some("segment contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SpecError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("data.dir", "./data").is_ok());
        assert!(validate_path("data.dir", "  ").is_err());
        assert!(validate_path("data.dir", "da\0ta").is_err());
    }

    #[test]
    fn test_validate_min() {
        assert!(validate_min("analysis.resamples", 5, 2).is_ok());
        assert!(validate_min("analysis.resamples", 1, 2).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("analysis.max_iterations", 500, 1, 100_000).is_ok());
        assert!(validate_range("analysis.max_iterations", 0, 1, 100_000).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        let err = validate_one_of("output.format", "xml", &["table", "csv", "json"]).unwrap_err();
        assert!(matches!(
            err,
            SpecError::InvalidConfigValueError { ref field, .. } if field == "output.format"
        ));
        assert!(validate_one_of("output.format", "csv", &["table", "csv", "json"]).is_ok());
    }

    #[test]
    fn test_validate_selector_segment() {
        assert!(validate_selector_segment("H1-1/2024_01_15/SPAM", "H1-1").is_ok());
        assert!(validate_selector_segment("../x/y", "..").is_err());
        assert!(validate_selector_segment("a//b", "").is_err());
        assert!(validate_selector_segment("a\\b", "a\\b").is_err());
    }
}
