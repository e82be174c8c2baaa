// Resolution and expansion of references
pub mod cache;
pub mod expander;
pub mod loader;
pub mod resolver;

pub use cache::{default_resolution_cache, ResolutionCache, SimpleCache, JSON_SCHEMA_URL, SWAGGER_SCHEMA_URL};
pub use expander::{
    expand_operation, expand_parameter, expand_path_item, expand_response, expand_schema,
    expand_schema_with, expand_spec, ExpandOptions,
};
pub use loader::{DocLoader, HttpFileLoader};
pub use resolver::{Resolved, SchemaLoader};
