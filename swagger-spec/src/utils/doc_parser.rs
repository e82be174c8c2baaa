use crate::utils::error::{Result, SpecError};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Parse raw document bytes as JSON, falling back to YAML.
///
/// `origin` names the source in error messages.
pub fn parse_document(bytes: &[u8], origin: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Ok(value);
    }

    let text = std::str::from_utf8(bytes)
        .map_err(|e| SpecError::parse(format!("{} is not valid UTF-8: {}", origin, e)))?;

    match serde_yaml::from_str::<Value>(text) {
        Ok(val) => Ok(val),
        Err(err) => {
            if let Some(loc) = err.location() {
                Err(SpecError::parse(format!(
                    "YAML parse error at {}:{} in {}: {}",
                    loc.line(),
                    loc.column(),
                    origin,
                    err
                )))
            } else {
                Err(SpecError::parse(format!("YAML parse error in {}: {}", origin, err)))
            }
        }
    }
}

/// Load a JSON or YAML file into a `serde_json::Value`.
pub fn load_document_file<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();

    let content = fs::read(path)
        .map_err(|e| SpecError::io(format!("failed to read {}: {}", path.display(), e)))?;

    parse_document(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_json_and_yaml() {
        let json = parse_document(br#"{"swagger": "2.0", "paths": {}}"#, "inline").unwrap();
        assert_eq!(json["swagger"], "2.0");

        let yaml = parse_document(b"swagger: '2.0'\npaths:\n  /pets: {}\n", "inline").unwrap();
        assert_eq!(yaml["swagger"], "2.0");
        assert!(yaml["paths"]["/pets"].is_object());
    }

    #[test]
    fn test_load_valid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a: 1\nb: [2, 3]").unwrap();
        let path = file.path();

        let value = load_document_file(path).expect("should parse valid YAML");
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_load_invalid_yaml_has_filename_and_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a: [1, 2\nb: 2").unwrap();
        let path = file.path();

        let err = load_document_file(path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(&path.display().to_string()));
        assert!(msg.contains("YAML parse error"));
        assert!(matches!(err, SpecError::ParseError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_document_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SpecError::IoError(_)));
    }
}
