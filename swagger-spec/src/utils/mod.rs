pub mod config;
pub mod doc_parser;
pub mod error;
pub mod logger;

pub use config::{Config, FetchConfig};
pub use doc_parser::{load_document_file, parse_document};
pub use error::{Result, SpecError};
pub use logger::init_logger;
