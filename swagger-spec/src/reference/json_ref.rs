//! JSON references: a document URI plus a JSON pointer fragment.

use crate::reference::pointer::Pointer;
use crate::utils::error::{Result, SpecError};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

const FRAGMENT_CHAR: char = '#';

/// Relative references are checked against this base so that syntax errors
/// surface at parse time even without a real base.
const SYNTAX_CHECK_BASE: &str = "http://syntax-check.invalid/";

#[derive(Debug, Clone)]
enum Location {
    /// Carries a scheme; resolvable with the `url` crate.
    Absolute(Url),
    /// Relative reference, split at the first `#`.
    Relative {
        path: String,
        fragment: Option<String>,
    },
}

/// A parsed `$ref` (or `id`) value.
#[derive(Debug, Clone)]
pub struct Ref {
    location: Location,
    pointer: Pointer,
    has_full_url: bool,
    has_url_path_only: bool,
    has_fragment_only: bool,
    has_file_scheme: bool,
    has_full_file_path: bool,
}

impl Ref {
    pub fn parse(reference: &str) -> Result<Self> {
        match Url::parse(reference) {
            Ok(url) => Self::from_url(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Self::parse_relative(reference),
            Err(err) => Err(SpecError::parse(format!(
                "invalid reference '{}': {}",
                reference, err
            ))),
        }
    }

    pub fn from_url(url: Url) -> Result<Self> {
        let pointer = pointer_from_fragment(url.fragment().unwrap_or(""), url.as_str())?;
        let has_full_url = url.host_str().map_or(false, |host| !host.is_empty());
        let has_url_path_only = !has_full_url && !url.path().is_empty();
        let has_fragment_only = !has_full_url
            && !has_url_path_only
            && url.query().is_none()
            && url.fragment().map_or(false, |f| !f.is_empty());
        let has_file_scheme = url.scheme() == "file";
        let has_full_file_path = url.path().starts_with('/');

        Ok(Self {
            location: Location::Absolute(url),
            pointer,
            has_full_url,
            has_url_path_only,
            has_fragment_only,
            has_file_scheme,
            has_full_file_path,
        })
    }

    fn parse_relative(reference: &str) -> Result<Self> {
        let base = Url::parse(SYNTAX_CHECK_BASE)?;
        base.join(reference).map_err(|err| {
            SpecError::parse(format!("invalid reference '{}': {}", reference, err))
        })?;

        let (path, fragment) = match reference.split_once(FRAGMENT_CHAR) {
            Some((path, fragment)) => (path.to_string(), Some(fragment.to_string())),
            None => (reference.to_string(), None),
        };
        Self::from_parts(path, fragment)
    }

    fn from_parts(path: String, fragment: Option<String>) -> Result<Self> {
        let raw_fragment = fragment.as_deref().unwrap_or("");
        let pointer = pointer_from_fragment(raw_fragment, &path)?;
        let path_only = path.split('?').next().unwrap_or("");
        let has_query = path.contains('?');
        let has_url_path_only = !path_only.is_empty();
        let has_fragment_only = !has_url_path_only && !has_query && !raw_fragment.is_empty();
        let has_full_file_path = path_only.starts_with('/');

        Ok(Self {
            location: Location::Relative { path, fragment },
            pointer,
            has_full_url: false,
            has_url_path_only,
            has_fragment_only,
            has_file_scheme: false,
            has_full_file_path,
        })
    }

    /// Parse the `$ref` member of `node`, if it carries a non-empty one.
    pub fn from_node(node: &Value) -> Result<Option<Self>> {
        match node.get("$ref") {
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(Self::parse(s)?)),
            _ => Ok(None),
        }
    }

    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.location {
            Location::Absolute(url) => Some(url),
            Location::Relative { .. } => None,
        }
    }

    pub fn has_full_url(&self) -> bool {
        self.has_full_url
    }

    pub fn has_url_path_only(&self) -> bool {
        self.has_url_path_only
    }

    pub fn has_fragment_only(&self) -> bool {
        self.has_fragment_only
    }

    pub fn has_file_scheme(&self) -> bool {
        self.has_file_scheme
    }

    pub fn has_full_file_path(&self) -> bool {
        self.has_full_file_path
    }

    /// True when the reference can be dereferenced without any further base.
    pub fn is_canonical(&self) -> bool {
        (self.has_file_scheme && self.has_full_file_path)
            || (!self.has_file_scheme && self.has_full_url)
    }

    /// The reference with its fragment removed.
    pub fn document_uri(&self) -> String {
        match &self.location {
            Location::Absolute(url) => {
                let mut url = url.clone();
                url.set_fragment(None);
                url.to_string()
            }
            Location::Relative { path, .. } => path.clone(),
        }
    }

    /// True when the reference names no document, only a fragment (or nothing).
    pub fn is_same_document(&self) -> bool {
        match &self.location {
            Location::Absolute(_) => false,
            Location::Relative { path, .. } => path.is_empty(),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(&self.location, Location::Relative { path, fragment: None } if path.is_empty())
    }

    /// Resolve `child` against `self` as base, the way a relative link
    /// resolves against the page it appears on.
    ///
    /// The result carries the child's fragment, or the parent's when the
    /// child is empty.
    pub fn inherits(&self, child: &Ref) -> Result<Ref> {
        if child.is_empty() {
            return Ok(self.clone());
        }
        match (&self.location, &child.location) {
            (_, Location::Absolute(_)) => Ok(child.clone()),
            (Location::Absolute(base), Location::Relative { .. }) => {
                let joined = base.join(&child.to_string()).map_err(|err| {
                    SpecError::parse(format!(
                        "cannot resolve '{}' against '{}': {}",
                        child, self, err
                    ))
                })?;
                Ref::from_url(joined)
            }
            (
                Location::Relative { path: base_path, .. },
                Location::Relative { path, fragment },
            ) => {
                if path.is_empty() {
                    return Ref::from_parts(base_path.clone(), fragment.clone());
                }
                if path.starts_with('/') {
                    return Ok(child.clone());
                }
                Ref::from_parts(merge_paths(base_path, path), fragment.clone())
            }
        }
    }
}

fn pointer_from_fragment(fragment: &str, context: &str) -> Result<Pointer> {
    let decoded = percent_decode_str(fragment).decode_utf8().map_err(|err| {
        SpecError::parse(format!("invalid fragment in '{}': {}", context, err))
    })?;
    Pointer::parse(&decoded).map_err(|err| {
        SpecError::parse(format!("invalid JSON pointer in '{}': {}", context, err))
    })
}

/// Merge a relative path onto the directory of `base`, dropping dot segments.
fn merge_paths(base: &str, child: &str) -> String {
    let base = base.split('?').next().unwrap_or("");
    let dir = match base.rfind('/') {
        Some(i) => &base[..=i],
        None => "",
    };
    let absolute = dir.starts_with('/');
    let joined = format!("{}{}", dir, child);
    let trimmed = if absolute { &joined[1..] } else { joined.as_str() };

    let mut stack: Vec<&str> = Vec::new();
    let mut segments = trimmed.split('/').peekable();
    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        match segment {
            "." => {}
            ".." => match stack.last() {
                Some(&top) if top != ".." => {
                    stack.pop();
                }
                _ if !absolute => stack.push(".."),
                _ => {}
            },
            other => stack.push(other),
        }
        if last && (segment == "." || segment == "..") {
            stack.push("");
        }
    }

    let body = stack.join("/");
    if absolute {
        format!("/{}", body)
    } else {
        body
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Location::Absolute(url) => write!(f, "{}", url),
            Location::Relative { path, fragment } => {
                write!(f, "{}", path)?;
                if let Some(fragment) = fragment {
                    write!(f, "{}{}", FRAGMENT_CHAR, fragment)?;
                }
                Ok(())
            }
        }
    }
}

/// The empty reference: same document, whole document.
impl Default for Ref {
    fn default() -> Self {
        Self {
            location: Location::Relative {
                path: String::new(),
                fragment: None,
            },
            pointer: Pointer::default(),
            has_full_url: false,
            has_url_path_only: false,
            has_fragment_only: false,
            has_file_scheme: false,
            has_full_file_path: false,
        }
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Ref {}

impl Hash for Ref {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification() {
        let full = Ref::parse("http://example.com/specs/refed.json#/definitions/pet").unwrap();
        assert!(full.has_full_url());
        assert!(full.is_canonical());
        assert_eq!(full.pointer().to_string(), "/definitions/pet");
        assert_eq!(full.document_uri(), "http://example.com/specs/refed.json");

        let local = Ref::parse("#/definitions/Category").unwrap();
        assert!(local.has_fragment_only());
        assert!(!local.is_canonical());
        assert!(local.is_same_document());
        assert_eq!(local.to_string(), "#/definitions/Category");

        let path = Ref::parse("refed.json#/parameters/idParam").unwrap();
        assert!(path.has_url_path_only());
        assert!(!path.is_canonical());
        assert!(!path.is_same_document());
        assert_eq!(path.document_uri(), "refed.json");

        let file = Ref::parse("file:///tmp/specs/refed.json").unwrap();
        assert!(file.has_file_scheme());
        assert!(file.has_full_file_path());
        assert!(!file.has_full_url());
        assert!(file.is_canonical());

        let rooted = Ref::parse("/abs/refed.json").unwrap();
        assert!(rooted.has_full_file_path());
        assert!(!rooted.is_canonical());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Ref::parse("http://[::1"),
            Err(SpecError::ParseError(_))
        ));
        assert!(matches!(
            Ref::parse("#definitions/pet"),
            Err(SpecError::ParseError(_))
        ));
    }

    #[test]
    fn test_escaped_fragment_is_decoded() {
        let r = Ref::parse("http://host/refed.json#/paths/~1pets~1%7Bid%7D").unwrap();
        assert_eq!(r.pointer().tokens(), &["paths".to_string(), "/pets/{id}".to_string()]);
    }

    #[test]
    fn test_inherits_fragment_against_absolute_parent() {
        let parent = Ref::parse("http://example.com/specs/refed.json#/definitions/pet").unwrap();
        let child = Ref::parse("#/definitions/Category").unwrap();
        let result = parent.inherits(&child).unwrap();
        assert_eq!(
            result.to_string(),
            "http://example.com/specs/refed.json#/definitions/Category"
        );
        assert_eq!(result.pointer().to_string(), "/definitions/Category");
    }

    #[test]
    fn test_inherits_relative_path_against_absolute_parent() {
        let parent = Ref::parse("http://example.com/specs/refed.json").unwrap();
        let child = Ref::parse("deeper/stringProp.json#/items").unwrap();
        assert_eq!(
            parent.inherits(&child).unwrap().to_string(),
            "http://example.com/specs/deeper/stringProp.json#/items"
        );

        let up = Ref::parse("../other.json").unwrap();
        assert_eq!(
            parent.inherits(&up).unwrap().to_string(),
            "http://example.com/other.json"
        );
    }

    #[test]
    fn test_inherits_keeps_parent_for_empty_child() {
        let parent = Ref::parse("http://example.com/a.json#/definitions/pet").unwrap();
        let child = Ref::parse("").unwrap();
        assert_eq!(parent.inherits(&child).unwrap(), parent);
    }

    #[test]
    fn test_inherits_absolute_child_wins() {
        let parent = Ref::parse("http://example.com/a.json").unwrap();
        let child = Ref::parse("http://other.org/b.json#/x").unwrap();
        assert_eq!(parent.inherits(&child).unwrap(), child);
    }

    #[test]
    fn test_inherits_between_relative_references() {
        let parent = Ref::parse("specs/api.json#/definitions/pet").unwrap();

        let sibling = parent.inherits(&Ref::parse("refed.json#/x").unwrap()).unwrap();
        assert_eq!(sibling.to_string(), "specs/refed.json#/x");

        let fragment = parent.inherits(&Ref::parse("#/definitions/tag").unwrap()).unwrap();
        assert_eq!(fragment.to_string(), "specs/api.json#/definitions/tag");

        let up = parent.inherits(&Ref::parse("../../common.json").unwrap()).unwrap();
        assert_eq!(up.to_string(), "../common.json");
    }

    #[test]
    fn test_merge_paths() {
        assert_eq!(merge_paths("specs/a.json", "b.json"), "specs/b.json");
        assert_eq!(merge_paths("specs/a.json", "../c.json"), "c.json");
        assert_eq!(merge_paths("a.json", "../c.json"), "../c.json");
        assert_eq!(merge_paths("/x/y/a.json", "./z/b.json"), "/x/y/z/b.json");
        assert_eq!(merge_paths("/a.json", "../../b.json"), "/b.json");
    }

    #[test]
    fn test_from_node() {
        let node = json!({"$ref": "#/definitions/pet", "description": "ignored"});
        let r = Ref::from_node(&node).unwrap().unwrap();
        assert_eq!(r.to_string(), "#/definitions/pet");

        assert!(Ref::from_node(&json!({"$ref": ""})).unwrap().is_none());
        assert!(Ref::from_node(&json!({"type": "string"})).unwrap().is_none());
        assert!(Ref::from_node(&json!({"$ref": {"type": "object"}})).unwrap().is_none());
    }
}
