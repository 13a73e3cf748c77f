//! Template filters for Kubernetes manifests
//!
//! A small Helm-compatible set, enough for overlay manifests and values files.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};

/// Every filter registered by [`crate::Engine`]
pub const AVAILABLE_FILTERS: &[&str] = &[
    "toyaml",
    "tojson",
    "b64encode",
    "b64decode",
    "quote",
    "squote",
    "nindent",
    "indent",
    "required",
    "sha256",
    "trunc",
    "trimprefix",
    "trimsuffix",
];

fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    serde_json::to_value(value).map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Convert a value to YAML format
///
/// Usage: {{ Custom.config | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value = to_json(&value)?;

    let yaml = serde_yaml::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Convert a value to JSON format
pub fn tojson(value: Value) -> Result<String, Error> {
    let json_value = to_json(&value)?;
    serde_json::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| {
            Error::new(ErrorKind::InvalidOperation, format!("base64 decode error: {}", e))
        })?;

    String::from_utf8(decoded).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, format!("UTF-8 decode error: {}", e))
    })
}

fn as_plain_string(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Quote a string with double quotes
///
/// Usage: {{ InstallNamespace | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let s = as_plain_string(&value);
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[must_use]
pub fn squote(value: Value) -> String {
    let s = as_plain_string(&value);
    format!("'{}'", s.replace('\'', "''"))
}

/// Indent text with a newline prefix (like Helm's nindent)
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Indent every non-empty line by `spaces`
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let prefix = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Require a value, fail if undefined, none or empty
///
/// Usage: {{ Custom.token | required("token is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    let missing = value.is_undefined()
        || value.is_none()
        || value.as_str().is_some_and(str::is_empty);
    if missing {
        let msg = message.unwrap_or_else(|| "required value is missing".to_string());
        Err(Error::new(ErrorKind::InvalidOperation, msg))
    } else {
        Ok(value)
    }
}

pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Truncate a string to at most `length` characters
pub fn trunc(value: String, length: usize) -> String {
    value.chars().take(length).collect()
}

pub fn trimprefix(value: String, prefix: String) -> String {
    value.strip_prefix(&prefix).unwrap_or(&value).to_string()
}

pub fn trimsuffix(value: String, suffix: String) -> String {
    value.strip_suffix(&suffix).unwrap_or(&value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toyaml() {
        let value = Value::from_serialize(serde_json::json!({"a": {"b": 1}}));
        assert_eq!(toyaml(value).unwrap(), "a:\n  b: 1");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("istio-system")), "\"istio-system\"");
        assert_eq!(quote(Value::from(3)), "\"3\"");
        assert_eq!(squote(Value::from("it's")), "'it''s'");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a: 1\nb: 2".to_string(), 2), "  a: 1\n  b: 2");
        assert_eq!(nindent("a: 1".to_string(), 4), "\n    a: 1");
    }

    #[test]
    fn test_b64_round_trip() {
        let encoded = b64encode("admin".to_string());
        assert_eq!(encoded, "YWRtaW4=");
        assert_eq!(b64decode(encoded).unwrap(), "admin");
        assert!(b64decode("!!!".to_string()).is_err());
    }

    #[test]
    fn test_required() {
        assert!(required(Value::UNDEFINED, None).is_err());
        assert!(required(Value::from(""), Some("token".to_string())).is_err());
        assert!(required(Value::from("x"), None).is_ok());
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(trunc("service-mesh-hub".to_string(), 7), "service");
        assert_eq!(trimprefix("v1.5.0".to_string(), "v".to_string()), "1.5.0");
        assert_eq!(trimsuffix("app.yaml".to_string(), ".yaml".to_string()), "app");
        assert_eq!(sha256sum("".to_string()).len(), 64);
    }
}
