//! Request validation from resolved column rules.

use crate::config::{ValidationRule, ValueType};
use crate::error::{AppError, MISSING_FIELDS};
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. Every required field must be present and non-null.
    pub fn validate(
        body: &HashMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        let missing = rules.iter().any(|(col, rule)| {
            rule.required == Some(true) && body.get(col).map_or(true, Value::is_null)
        });
        if missing {
            return Err(AppError::BadRequest(MISSING_FIELDS.into()));
        }
        for (col, rule) in rules {
            if let Some(v) = body.get(col) {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PUT). A required field may be omitted but not nulled.
    pub fn validate_partial(
        body: &HashMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (col, v) in body {
            let Some(rule) = rules.get(col) else { continue };
            if v.is_null() && rule.required == Some(true) {
                return Err(AppError::Validation(format!("{} must not be null", col)));
            }
            validate_field(col, v, rule)?;
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(ty) = rule.value_type {
        let ok = match ty {
            ValueType::String => v.is_string(),
            ValueType::Integer => v.is_i64() || v.is_u64(),
            ValueType::Number => v.is_number(),
        };
        if !ok {
            return Err(AppError::Validation(format!(
                "{} must be of type {}",
                col,
                match ty {
                    ValueType::String => "string",
                    ValueType::Integer => "integer",
                    ValueType::Number => "number",
                }
            )));
        }
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    if format.eq_ignore_ascii_case("email") {
        if let Some(s) = v.as_str() {
            let valid = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
                .unwrap_or(false);
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
    }
    Ok(())
}
