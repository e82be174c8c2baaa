//! Resolution cache for documents fetched while resolving references.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Canonical location of the Swagger 2.0 meta-schema.
pub const SWAGGER_SCHEMA_URL: &str = "http://swagger.io/v2/schema.json";
/// Canonical location of the JSON-Schema draft-04 meta-schema.
pub const JSON_SCHEMA_URL: &str = "http://json-schema.org/draft-04/schema";

static SWAGGER_SCHEMA: Lazy<Arc<Value>> = Lazy::new(|| {
    let raw = include_str!("../../assets/swagger-2.0-schema.json");
    Arc::new(serde_json::from_str(raw).expect("bundled Swagger 2.0 meta-schema is valid JSON"))
});

static JSON_SCHEMA: Lazy<Arc<Value>> = Lazy::new(|| {
    let raw = include_str!("../../assets/draft-04-schema.json");
    Arc::new(serde_json::from_str(raw).expect("bundled draft-04 meta-schema is valid JSON"))
});

/// Storage for parsed documents, keyed by document URI without fragment.
pub trait ResolutionCache {
    fn get(&self, uri: &str) -> Option<&Value>;
    fn set(&mut self, uri: &str, document: Value);
}

/// In-memory cache. `Default` pre-seeds it with the bundled meta-schemas.
#[derive(Debug, Clone)]
pub struct SimpleCache {
    store: HashMap<String, Arc<Value>>,
}

impl SimpleCache {
    /// A cache with no entries at all.
    pub fn empty() -> Self {
        Self {
            store: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.store.contains_key(uri)
    }
}

impl Default for SimpleCache {
    fn default() -> Self {
        default_resolution_cache()
    }
}

impl ResolutionCache for SimpleCache {
    fn get(&self, uri: &str) -> Option<&Value> {
        self.store.get(uri).map(|doc| doc.as_ref())
    }

    fn set(&mut self, uri: &str, document: Value) {
        self.store.insert(uri.to_string(), Arc::new(document));
    }
}

/// A cache holding the Swagger 2.0 and JSON-Schema draft-04 meta-schemas.
///
/// The bundled documents are parsed once per process and shared between
/// caches.
pub fn default_resolution_cache() -> SimpleCache {
    let mut store = HashMap::new();
    store.insert(SWAGGER_SCHEMA_URL.to_string(), Arc::clone(&SWAGGER_SCHEMA));
    store.insert(JSON_SCHEMA_URL.to_string(), Arc::clone(&JSON_SCHEMA));
    SimpleCache { store }
}
