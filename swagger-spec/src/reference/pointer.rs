//! JSON pointer (RFC 6901) addressing over `serde_json::Value` trees.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '/';

const ENCODED_TILDE: &str = "~0";
const ENCODED_SLASH: &str = "~1";

/// Failure to parse a pointer or to follow it through a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointerError {
    #[error("JSON pointer must be empty or start with a \"/\": '{0}'")]
    InvalidStart(String),

    #[error("object has no key '{0}'")]
    NoSuchKey(String),

    #[error("invalid array index '{0}'")]
    InvalidIndex(String),

    #[error("index out of bounds array[0,{len}] index '{index}'")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid token reference '{0}'")]
    InvalidReferenceTarget(String),
}

/// Kind of the node a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// An ordered sequence of unescaped reference tokens.
///
/// The empty pointer addresses the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pointer {
    tokens: Vec<String>,
}

impl Pointer {
    /// Parse an escaped pointer string such as `/definitions/a~1b`.
    pub fn parse(pointer: &str) -> Result<Self, PointerError> {
        if pointer.is_empty() {
            return Ok(Self::default());
        }
        let Some(rest) = pointer.strip_prefix(SEPARATOR) else {
            return Err(PointerError::InvalidStart(pointer.to_string()));
        };
        let tokens = rest.split(SEPARATOR).map(unescape).collect();
        Ok(Self { tokens })
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Decoded tokens, root first.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.tokens.pop()
    }

    /// Follow the pointer through `document`.
    pub fn get<'a>(&self, document: &'a Value) -> Result<(&'a Value, ValueKind), PointerError> {
        let mut node = document;
        for token in &self.tokens {
            node = step(node, token)?;
        }
        Ok((node, ValueKind::of(node)))
    }

    /// Mutable counterpart of [`Pointer::get`].
    pub fn get_mut<'a>(&self, document: &'a mut Value) -> Result<&'a mut Value, PointerError> {
        let mut node = document;
        for token in &self.tokens {
            node = step_mut(node, token)?;
        }
        Ok(node)
    }

    /// Replace the node addressed by the pointer, returning the previous value.
    ///
    /// The addressed node must already exist; the empty pointer replaces the
    /// whole document.
    pub fn set(&self, document: &mut Value, value: Value) -> Result<Value, PointerError> {
        let slot = self.get_mut(document)?;
        Ok(std::mem::replace(slot, value))
    }
}

/// Look up a single decoded token in an object or array node.
pub(crate) fn child<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    step(node, token).ok()
}

fn step<'a>(node: &'a Value, token: &str) -> Result<&'a Value, PointerError> {
    match node {
        Value::Object(map) => map
            .get(token)
            .ok_or_else(|| PointerError::NoSuchKey(token.to_string())),
        Value::Array(list) => {
            let index = parse_index(token)?;
            list.get(index).ok_or(PointerError::IndexOutOfRange {
                index,
                len: list.len(),
            })
        }
        _ => Err(PointerError::InvalidReferenceTarget(token.to_string())),
    }
}

fn step_mut<'a>(node: &'a mut Value, token: &str) -> Result<&'a mut Value, PointerError> {
    match node {
        Value::Object(map) => map
            .get_mut(token)
            .ok_or_else(|| PointerError::NoSuchKey(token.to_string())),
        Value::Array(list) => {
            let index = parse_index(token)?;
            let len = list.len();
            list.get_mut(index)
                .ok_or(PointerError::IndexOutOfRange { index, len })
        }
        _ => Err(PointerError::InvalidReferenceTarget(token.to_string())),
    }
}

/// Array index token: `0` or digits without a leading zero.
fn parse_index(token: &str) -> Result<usize, PointerError> {
    let invalid = || PointerError::InvalidIndex(token.to_string());
    if token.is_empty()
        || !token.bytes().all(|b| b.is_ascii_digit())
        || (token.len() > 1 && token.starts_with('0'))
    {
        return Err(invalid());
    }
    token.parse::<usize>().map_err(|_| invalid())
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}{}", SEPARATOR, escape(token))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pointer::parse(s)
    }
}

/// Escape a reference token: `~` becomes `~0`, then `/` becomes `~1`.
pub fn escape(token: &str) -> String {
    token.replace('~', ENCODED_TILDE).replace('/', ENCODED_SLASH)
}

/// Unescape a reference token: `~1` becomes `/`, then `~0` becomes `~`.
pub fn unescape(token: &str) -> String {
    token.replace(ENCODED_SLASH, "/").replace(ENCODED_TILDE, "~")
}
