use crate::utils::error::{ConsultError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ConsultError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| ConsultError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ConsultError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn measurement_error(field: &str, value: impl ToString, reason: &str) -> ConsultError {
    ConsultError::InvalidMeasurement {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// 屈光度必須為有限且不大於 0 的數值
pub fn validate_diopter(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(measurement_error(field_name, value, "must be a finite number"));
    }
    if value > 0.0 {
        return Err(measurement_error(field_name, value, "must be zero or negative"));
    }
    Ok(())
}

pub fn validate_thickness(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(measurement_error(
            field_name,
            value,
            "must be a positive number of micrometres",
        ));
    }
    Ok(())
}

pub fn validate_pupil_size(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..10.0).contains(&value) {
        return Err(measurement_error(field_name, value, "must be within [0, 10) mm"));
    }
    Ok(())
}

/// 目標視力格式: `1.0` 或 `1.0-1`
pub fn validate_target_vision(field_name: &str, value: &str) -> Result<()> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+(\.\d+)?)(-\d+)?$").expect("target vision pattern is valid")
    });

    if !re.is_match(value) {
        return Err(measurement_error(
            field_name,
            value,
            "expected a decimal acuity such as 1.0 or 1.0-1",
        ));
    }
    Ok(())
}
