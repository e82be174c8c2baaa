// JSON pointer and JSON reference primitives
pub mod json_ref;
pub mod pointer;

pub use json_ref::Ref;
pub use pointer::{escape, unescape, Pointer, PointerError, ValueKind};
