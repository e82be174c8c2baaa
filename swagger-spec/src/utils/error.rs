use crate::reference::PointerError;

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Parsing error: {0}")]
    ParseError(String),

    #[error("Lookup error: {source} (pointer '{pointer}' in '{uri}')")]
    LookupError {
        pointer: String,
        uri: String,
        #[source]
        source: PointerError,
    },

    #[error("Fetch error: failed to load {uri}: {reason}")]
    FetchError { uri: String, reason: String },

    #[error("Cyclic reference: {0}")]
    CyclicReference(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to expand '{reference}' at '{location}': {source}")]
    ExpansionError {
        reference: String,
        location: String,
        #[source]
        source: Box<SpecError>,
    },
}

impl From<std::io::Error> for SpecError {
    fn from(err: std::io::Error) -> Self {
        SpecError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SpecError {
    fn from(err: serde_json::Error) -> Self {
        SpecError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for SpecError {
    fn from(err: serde_yaml::Error) -> Self {
        SpecError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for SpecError {
    fn from(err: url::ParseError) -> Self {
        SpecError::ParseError(err.to_string())
    }
}

impl From<reqwest::Error> for SpecError {
    fn from(err: reqwest::Error) -> Self {
        let uri = err.url().map(|u| u.to_string()).unwrap_or_default();
        SpecError::FetchError {
            uri,
            reason: err.to_string(),
        }
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SpecError>;

// Helper functions for creating common errors
impl SpecError {
    /// Shortcut method to create a parsing error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        SpecError::ParseError(msg.into())
    }

    /// Shortcut method to create a lookup error for a pointer inside a document
    pub fn lookup<P: Into<String>, U: Into<String>>(pointer: P, uri: U, source: PointerError) -> Self {
        SpecError::LookupError {
            pointer: pointer.into(),
            uri: uri.into(),
            source,
        }
    }

    /// Shortcut method to create a fetch error
    pub fn fetch<U: Into<String>, R: Into<String>>(uri: U, reason: R) -> Self {
        SpecError::FetchError {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Shortcut method to create a cyclic reference error
    pub fn cyclic<S: Into<String>>(reference: S) -> Self {
        SpecError::CyclicReference(reference.into())
    }

    /// Shortcut method to create an IO error
    pub fn io<S: Into<String>>(msg: S) -> Self {
        SpecError::IoError(msg.into())
    }

    /// Shortcut method to create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SpecError::ConfigError(msg.into())
    }

    /// Wraps an error with the `$ref` and the location it was found at.
    pub fn expansion<R: Into<String>, L: Into<String>>(reference: R, location: L, source: SpecError) -> Self {
        SpecError::ExpansionError {
            reference: reference.into(),
            location: location.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping any expansion context.
    pub fn root_cause(&self) -> &SpecError {
        match self {
            SpecError::ExpansionError { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self.root_cause(), SpecError::CyclicReference(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SpecError::parse("Invalid JSON");
        assert!(matches!(err, SpecError::ParseError(_)));
        assert_eq!(err.to_string(), "Parsing error: Invalid JSON");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let spec_err = SpecError::from(io_err);
        assert!(matches!(spec_err, SpecError::IoError(_)));
    }

    #[test]
    fn test_root_cause_skips_expansion_context() {
        let inner = SpecError::cyclic("#/definitions/A");
        let outer = SpecError::expansion(
            "#/definitions/B",
            "/definitions/A",
            SpecError::expansion("#/definitions/A", "/definitions/B", inner),
        );
        assert!(outer.is_cyclic());
        assert_eq!(outer.root_cause().to_string(), "Cyclic reference: #/definitions/A");
        assert!(outer.to_string().contains("at '/definitions/A'"));
    }

    #[test]
    fn test_lookup_error_mentions_pointer_and_uri() {
        let err = SpecError::lookup(
            "/definitions/NotThere",
            "http://host/refed.json",
            PointerError::NoSuchKey("NotThere".to_string()),
        );
        let msg = err.to_string();
        assert!(msg.contains("/definitions/NotThere"));
        assert!(msg.contains("http://host/refed.json"));
    }
}
