//! Resolution of single `$ref` values against a root document and the
//! documents it points to.

use crate::business::cache::{default_resolution_cache, ResolutionCache};
use crate::business::expander::ExpandOptions;
use crate::business::loader::{DocLoader, HttpFileLoader};
use crate::reference::pointer::child;
use crate::reference::{Pointer, Ref};
use crate::utils::doc_parser::parse_document;
use crate::utils::error::{Result, SpecError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// A resolved reference target and the resolution scope in force at it.
///
/// `scope` includes every `id` above the target but not the target's own.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    pub scope: Ref,
}

/// Memo key: `document` is `None` for the root document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolvedKey {
    document: Option<String>,
    pointer: String,
}

/// Resolves references found in `root`, fetching and caching any other
/// document they point to.
///
/// The loader keeps its own copy of the root, so callers are free to mutate
/// their tree while resolving against it.
pub struct SchemaLoader {
    root: Value,
    /// Location the root was loaded from, if known.
    base: Option<Ref>,
    /// `base` adjusted by the root's own `id`.
    root_location: Option<Ref>,
    loading_ref: Option<Ref>,
    starting_ref: Ref,
    /// Scope above the node at `starting_ref`, before its own `id`.
    entry_scope: Ref,
    current_ref: Ref,
    cache: Box<dyn ResolutionCache>,
    loader: Box<dyn DocLoader>,
    options: ExpandOptions,
    memo: HashMap<ResolvedKey, Resolved>,
    circular_refs: Vec<String>,
}

impl SchemaLoader {
    /// Loader over a root with no known location.
    pub fn new(root: Value, loading_ref: Option<Ref>) -> Result<Self> {
        Self::with_base(root, loading_ref, None)
    }

    /// Loader over a root that was loaded from `base`; relative references
    /// are resolved against it.
    pub fn with_base(root: Value, loading_ref: Option<Ref>, base: Option<Ref>) -> Result<Self> {
        let root_id = id_from_node(&root)?;
        let root_location = match (&base, root_id) {
            (Some(base), Some(id)) => Some(base.inherits(&id)?),
            (Some(base), None) => Some(base.clone()),
            (None, id) => id,
        };

        let requested = loading_ref.clone().unwrap_or_else(empty_ref);
        let starting_ref = match &root_location {
            Some(location) => location.inherits(&requested)?,
            None => requested,
        };

        let mut loader = Self {
            root,
            base,
            root_location,
            loading_ref,
            starting_ref,
            entry_scope: empty_ref(),
            current_ref: empty_ref(),
            cache: Box::new(default_resolution_cache()),
            loader: Box::new(HttpFileLoader::default()),
            options: ExpandOptions::default(),
            memo: HashMap::new(),
            circular_refs: Vec::new(),
        };
        let (entry_scope, current_ref) = loader.initial_scope()?;
        loader.entry_scope = entry_scope;
        loader.current_ref = current_ref;
        Ok(loader)
    }

    pub fn with_cache<C: ResolutionCache + 'static>(mut self, cache: C) -> Self {
        self.cache = Box::new(cache);
        self
    }

    pub fn with_loader<L: DocLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    pub fn loading_ref(&self) -> Option<&Ref> {
        self.loading_ref.as_ref()
    }

    pub fn starting_ref(&self) -> &Ref {
        &self.starting_ref
    }

    /// Resolution scope at the position the loader was created for.
    pub fn current_ref(&self) -> &Ref {
        &self.current_ref
    }

    /// Like [`SchemaLoader::current_ref`], minus the `id` of the node itself.
    pub fn entry_scope(&self) -> &Ref {
        &self.entry_scope
    }

    /// References left unexpanded because they were circular.
    pub fn circular_refs(&self) -> &[String] {
        &self.circular_refs
    }

    pub(crate) fn record_circular(&mut self, reference: String) {
        if !self.circular_refs.contains(&reference) {
            self.circular_refs.push(reference);
        }
    }

    /// Scope for the root node itself, before its own `id` applies.
    pub fn root_scope(&self) -> Ref {
        self.base.clone().unwrap_or_else(empty_ref)
    }

    /// Resolve `reference` in the loader's current scope.
    pub fn resolve(&mut self, reference: &Ref) -> Result<Value> {
        let scope = self.current_ref.clone();
        Ok(self.resolve_in(reference, &scope)?.value)
    }

    /// Resolve `reference` and deserialize the target into `T`.
    pub fn resolve_into<T: DeserializeOwned>(&mut self, reference: &Ref) -> Result<T> {
        let value = self.resolve(reference)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Resolve `reference` as written at a node whose scope is `scope`.
    ///
    /// Targets that are themselves `$ref` nodes are followed until a plain
    /// value is reached.
    pub fn resolve_in(&mut self, reference: &Ref, scope: &Ref) -> Result<Resolved> {
        let mut chain = Vec::new();
        self.resolve_chain(reference, scope, &mut chain)
    }

    fn resolve_chain(&mut self, reference: &Ref, scope: &Ref, chain: &mut Vec<String>) -> Result<Resolved> {
        let target = scope.inherits(reference)?;
        let canonical = target.to_string();
        debug!("Resolving {} (written as {})", canonical, reference);

        let key = ResolvedKey {
            document: self.document_for(&target)?,
            pointer: target.pointer().to_string(),
        };
        if let Some(hit) = self.memo.get(&key) {
            debug!("Resolved value cached for {}", canonical);
            return Ok(hit.clone());
        }

        if chain.contains(&canonical) {
            return Err(SpecError::cyclic(canonical));
        }
        chain.push(canonical);

        let (value, node_scope) = self.lookup(key.document.as_deref(), target.pointer())?;
        let resolved = match Ref::from_node(&value)? {
            Some(next) => self.resolve_chain(&next, &node_scope, chain)?,
            None => Resolved {
                value,
                scope: node_scope,
            },
        };

        self.memo.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Which document `target` lives in; `None` is the root. Remote
    /// documents are fetched into the cache on first use.
    fn document_for(&mut self, target: &Ref) -> Result<Option<String>> {
        if self.is_root_document(target) {
            return Ok(None);
        }
        if target.url().is_none() {
            return Err(SpecError::parse(format!(
                "cannot resolve relative reference '{}' without a base location",
                target
            )));
        }
        let uri = target.document_uri();
        self.ensure_document(&uri)?;
        Ok(Some(uri))
    }

    /// True when `target` lives in the root document rather than a fetched one.
    pub(crate) fn is_root_document(&self, target: &Ref) -> bool {
        if target.is_same_document() {
            return true;
        }
        let uri = target.document_uri();
        [&self.base, &self.root_location]
            .into_iter()
            .flatten()
            .any(|location| location.document_uri() == uri)
    }

    fn ensure_document(&mut self, uri: &str) -> Result<()> {
        if self.cache.get(uri).is_some() {
            debug!("Cache hit for {}", uri);
            return Ok(());
        }
        debug!("Cache miss for {}", uri);

        info!("Fetching remote document {}", uri);
        let bytes = self.loader.load(uri)?;
        let document = parse_document(&bytes, uri)?;
        self.cache.set(uri, document);
        Ok(())
    }

    fn lookup(&self, document: Option<&str>, pointer: &Pointer) -> Result<(Value, Ref)> {
        let (tree, base, label) = match document {
            None => (&self.root, self.root_scope(), self.root_label()),
            Some(uri) => {
                let tree = self
                    .cache
                    .get(uri)
                    .ok_or_else(|| SpecError::fetch(uri, "document missing from cache"))?;
                (tree, Ref::parse(uri)?, uri.to_string())
            }
        };

        let (node, _) = pointer
            .get(tree)
            .map_err(|err| SpecError::lookup(pointer.to_string(), label, err))?;
        let scope = scope_along(tree, base, pointer.tokens(), false)?;
        Ok((node.clone(), scope))
    }

    fn root_label(&self) -> String {
        self.root_location
            .as_ref()
            .map(|location| location.document_uri())
            .filter(|uri| !uri.is_empty())
            .unwrap_or_else(|| "<root>".to_string())
    }

    /// Scopes at the starting reference, inheriting through every `id` and
    /// `$ref` met on the way down from the root. Returns the scope above the
    /// target node and the scope including the target's own `id`.
    fn initial_scope(&self) -> Result<(Ref, Ref)> {
        if !self.is_root_document(&self.starting_ref) {
            return Ok((self.starting_ref.clone(), self.starting_ref.clone()));
        }
        let pointer = self.starting_ref.pointer();
        let entry = scope_along(&self.root, self.root_scope(), pointer.tokens(), true)?;
        let own_id = match pointer.get(&self.root) {
            Ok((node, _)) => id_from_node(node)?,
            Err(_) => None,
        };
        let current = match own_id {
            Some(id) => entry.inherits(&id)?,
            None => entry.clone(),
        };
        Ok((entry, current))
    }
}

/// Inherit `base` through the root and every strict ancestor of the node
/// addressed by `tokens`. Stops early if the path does not exist.
fn scope_along(document: &Value, base: Ref, tokens: &[String], follow_refs: bool) -> Result<Ref> {
    let mut scope = base;
    let mut node = document;
    for token in tokens {
        if let Some(id) = id_from_node(node)? {
            scope = scope.inherits(&id)?;
        }
        if follow_refs {
            if let Some(reference) = Ref::from_node(node)? {
                scope = scope.inherits(&reference)?;
            }
        }
        node = match child(node, token) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(scope)
}

/// The `$id` (or draft-04 `id`) a node declares, if any.
pub(crate) fn id_from_node(node: &Value) -> Result<Option<Ref>> {
    for key in ["$id", "id"] {
        if let Some(Value::String(id)) = node.get(key) {
            if !id.is_empty() {
                return Ok(Some(Ref::parse(id)?));
            }
        }
    }
    Ok(None)
}

fn empty_ref() -> Ref {
    Ref::default()
}
