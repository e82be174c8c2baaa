//! Specification documents as loaded from disk or over HTTP.

use crate::business::expander::{expand_spec, ExpandOptions};
use crate::business::loader::{DocLoader, HttpFileLoader};
use crate::business::resolver::SchemaLoader;
use crate::reference::{Pointer, Ref};
use crate::utils::config::FetchConfig;
use crate::utils::doc_parser::{load_document_file, parse_document};
use crate::utils::error::{Result, SpecError};
use serde_json::Value;
use url::Url;

const INLINE_ORIGIN: &str = "<inline>";

/// A raw specification document and the location it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    raw: Value,
    location: Option<String>,
}

impl Document {
    /// Load from a local path or an http(s)/file URL.
    pub fn load(source: &str) -> Result<Self> {
        Self::load_with(source, &FetchConfig::default())
    }

    pub fn load_with(source: &str, config: &FetchConfig) -> Result<Self> {
        let location = canonical_location(source)?;
        let raw = if location.scheme() == "file" {
            let path = location
                .to_file_path()
                .map_err(|_| SpecError::io(format!("not a local file: {}", location)))?;
            load_document_file(path)?
        } else {
            let bytes = HttpFileLoader::new(config).load(location.as_str())?;
            parse_document(&bytes, location.as_str())?
        };
        tracing::info!("Loaded specification from {}", location);

        Ok(Self {
            raw,
            location: Some(location.to_string()),
        })
    }

    pub fn from_value(raw: Value) -> Self {
        Self { raw, location: None }
    }

    /// Parse JSON or YAML bytes; `location` becomes the base for relative
    /// references.
    pub fn from_bytes(bytes: &[u8], location: Option<&str>) -> Result<Self> {
        let raw = parse_document(bytes, location.unwrap_or(INLINE_ORIGIN))?;
        Ok(Self {
            raw,
            location: location.map(str::to_string),
        })
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// The `swagger` version field, e.g. `"2.0"`.
    pub fn spec_version(&self) -> Option<&str> {
        self.raw.get("swagger").and_then(Value::as_str)
    }

    pub fn get(&self, pointer: &str) -> Result<&Value> {
        let parsed = parse_pointer(pointer)?;
        let (value, _) = parsed
            .get(&self.raw)
            .map_err(|err| SpecError::lookup(pointer, self.label(), err))?;
        Ok(value)
    }

    /// Replace the value at `pointer`, returning the previous one.
    pub fn set(&mut self, pointer: &str, value: Value) -> Result<Value> {
        let parsed = parse_pointer(pointer)?;
        let label = self.label();
        parsed
            .set(&mut self.raw, value)
            .map_err(|err| SpecError::lookup(pointer, label, err))
    }

    /// A resolver over this document, rooted at its own location.
    pub fn resolver(&self) -> Result<SchemaLoader> {
        self.resolver_with(&ExpandOptions::default())
    }

    pub fn resolver_with(&self, options: &ExpandOptions) -> Result<SchemaLoader> {
        let base = options
            .relative_base
            .as_deref()
            .or(self.location.as_deref())
            .map(Ref::parse)
            .transpose()?;
        Ok(SchemaLoader::with_base(self.raw.clone(), None, base)?.with_options(options.clone()))
    }

    /// A fully expanded copy of this document; `self` is left untouched.
    pub fn expanded(&self) -> Result<Document> {
        self.expanded_with(&ExpandOptions::default(), HttpFileLoader::default())
    }

    pub fn expanded_with<L: DocLoader + 'static>(&self, options: &ExpandOptions, loader: L) -> Result<Document> {
        let mut resolver = self.resolver_with(options)?.with_loader(loader);
        let mut raw = self.raw.clone();
        expand_spec(&mut raw, &mut resolver)?;
        Ok(Document {
            raw,
            location: self.location.clone(),
        })
    }

    fn label(&self) -> String {
        self.location.clone().unwrap_or_else(|| INLINE_ORIGIN.to_string())
    }
}

fn parse_pointer(pointer: &str) -> Result<Pointer> {
    let trimmed = pointer.strip_prefix('#').unwrap_or(pointer);
    Pointer::parse(trimmed)
        .map_err(|err| SpecError::parse(format!("invalid JSON pointer '{}': {}", pointer, err)))
}

/// `file://` URL for local paths; http(s) and file URLs are kept as given.
fn canonical_location(source: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(source) {
        if matches!(url.scheme(), "http" | "https" | "file") {
            return Ok(url);
        }
    }
    let path = std::fs::canonicalize(source)
        .map_err(|e| SpecError::io(format!("cannot open {}: {}", source, e)))?;
    Url::from_file_path(&path)
        .map_err(|_| SpecError::io(format!("cannot express {} as a file URL", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn no_fetch(uri: &str) -> Result<Vec<u8>> {
        Err(SpecError::fetch(uri, "unexpected fetch"))
    }

    #[test]
    fn test_from_bytes_and_accessors() {
        let doc = Document::from_bytes(b"swagger: '2.0'\ninfo:\n  title: pets\n", None).unwrap();
        assert_eq!(doc.spec_version(), Some("2.0"));
        assert_eq!(doc.get("/info/title").unwrap(), "pets");
        assert_eq!(doc.get("#/info/title").unwrap(), "pets");
        assert!(doc.location().is_none());
        assert!(matches!(doc.get("info"), Err(SpecError::ParseError(_))));
        assert!(matches!(doc.get("/info/nope"), Err(SpecError::LookupError { .. })));
    }

    #[test]
    fn test_set_replaces_value() {
        let mut doc = Document::from_value(json!({"info": {"version": "1"}}));
        let old = doc.set("/info/version", json!("2")).unwrap();
        assert_eq!(old, json!("1"));
        assert_eq!(doc.get("/info/version").unwrap(), "2");
    }

    #[test]
    fn test_expanded_leaves_original_untouched() {
        let doc = Document::from_value(json!({
            "swagger": "2.0",
            "definitions": {
                "Pet": {"properties": {"category": {"$ref": "#/definitions/Category"}}},
                "Category": {"type": "string"}
            },
            "paths": {}
        }));

        let expanded = doc.expanded_with(&ExpandOptions::default(), no_fetch).unwrap();
        assert_eq!(
            expanded.get("/definitions/Pet/properties/category").unwrap(),
            &json!({"type": "string"})
        );
        assert_eq!(
            doc.get("/definitions/Pet/properties/category/$ref").unwrap(),
            "#/definitions/Category"
        );
    }

    #[test]
    fn test_load_resolves_sibling_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("api.yaml"),
            "swagger: '2.0'\npaths:\n  /pets:\n    get:\n      responses:\n        '200':\n          description: ok\n          schema:\n            $ref: 'models/pet.json#/Pet'\n",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("models")).unwrap();
        std::fs::write(
            dir.path().join("models/pet.json"),
            r##"{"Pet": {"type": "object", "properties": {"tag": {"$ref": "#/Tag"}}}, "Tag": {"type": "string"}}"##,
        )
        .unwrap();

        let source = dir.path().join("api.yaml");
        let doc = Document::load(source.to_str().unwrap()).unwrap();
        assert!(doc.location().unwrap().starts_with("file:///"));

        let expanded = doc.expanded().unwrap();
        let schema = expanded.get("/paths/~1pets/get/responses/200/schema").unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["tag"], json!({"type": "string"}));
    }

    #[test]
    fn test_relative_base_option_overrides_location() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("common.json"), r#"{"Id": {"type": "integer"}}"#).unwrap();
        let base = Url::from_directory_path(dir.path()).unwrap();

        let doc = Document::from_value(json!({
            "definitions": {"Pet": {"properties": {"id": {"$ref": "common.json#/Id"}}}}
        }));
        assert!(doc.expanded_with(&ExpandOptions::default(), no_fetch).is_err());

        let options = ExpandOptions {
            relative_base: Some(base.to_string()),
            ..ExpandOptions::default()
        };
        let expanded = doc.expanded_with(&options, HttpFileLoader::default()).unwrap();
        assert_eq!(expanded.get("/definitions/Pet/properties/id/type").unwrap(), "integer");
    }

    #[test]
    fn test_load_missing_path() {
        assert!(matches!(
            Document::load("/definitely/not/here.json"),
            Err(SpecError::IoError(_))
        ));
    }
}
