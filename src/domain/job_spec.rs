//! Job submission spec resolution

use std::path::Path;

use serde_json::Value;

use crate::domain::DomainError;

/// Resolve a job spec argument.
///
/// If `arg` names an existing file, its contents are parsed as JSON;
/// otherwise `arg` itself is parsed as literal JSON. The spec must be a
/// JSON object.
pub fn resolve_job_spec(arg: &str) -> Result<Value, DomainError> {
    let path = Path::new(arg);
    let (source, text) = if path.is_file() {
        let text = std::fs::read_to_string(path).map_err(|e| DomainError::InvalidJobSpec {
            message: format!("read {}: {}", path.display(), e),
        })?;
        (path.display().to_string(), text)
    } else {
        ("argument".to_string(), arg.to_string())
    };
    parse_job_spec(&source, &text)
}

fn parse_job_spec(source: &str, text: &str) -> Result<Value, DomainError> {
    let value: Value = serde_json::from_str(text).map_err(|e| DomainError::InvalidJobSpec {
        message: format!("parse {}: {}", source, e),
    })?;
    if !value.is_object() {
        return Err(DomainError::InvalidJobSpec {
            message: format!("{} must be a JSON object", source),
        });
    }
    Ok(value)
}
