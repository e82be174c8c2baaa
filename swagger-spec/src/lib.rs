//! Swagger 2.0 reference resolution and specification expansion

pub mod business;
pub mod reference;
pub mod spec;
pub mod utils;

pub use business::{
    expand_operation, expand_parameter, expand_path_item, expand_response, expand_schema,
    expand_schema_with, expand_spec, DocLoader, ExpandOptions, HttpFileLoader, ResolutionCache,
    SchemaLoader, SimpleCache,
};
pub use reference::{Pointer, PointerError, Ref};
pub use spec::Document;
pub use utils::{Config, FetchConfig, Result, SpecError};
