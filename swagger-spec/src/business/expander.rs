//! Depth-first expansion of `$ref` nodes in Swagger 2.0 documents.

use crate::business::resolver::{id_from_node, SchemaLoader};
use crate::reference::{Pointer, Ref};
use crate::utils::error::{Result, SpecError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Keywords holding a list of schemas.
const SCHEMA_LISTS: [&str; 3] = ["allOf", "anyOf", "oneOf"];
/// Keywords holding a map of name to schema.
const SCHEMA_MAPS: [&str; 3] = ["properties", "patternProperties", "definitions"];
/// Keywords holding either a boolean or a schema.
const SCHEMA_OR_BOOL: [&str; 2] = ["additionalProperties", "additionalItems"];

const EXTENSION_PREFIX: &str = "x-";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandOptions {
    /// Leave circular `$ref` nodes in place instead of failing.
    pub keep_circular_refs: bool,
    /// Base location for relative references, overriding the document's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_base: Option<String>,
}

/// Expand every definition, parameter, response and path item of a full
/// specification in place.
pub fn expand_spec(spec: &mut Value, resolver: &mut SchemaLoader) -> Result<()> {
    let scope = resolver.entry_scope().clone();
    Walker::new(resolver).spec(spec, &scope)
}

/// Expand a single schema. References resolve against `root`, or against the
/// schema itself when no root is given.
pub fn expand_schema(schema: &mut Value, root: Option<&Value>) -> Result<()> {
    let root = match root {
        Some(root) => root.clone(),
        None => schema.clone(),
    };
    let mut resolver = SchemaLoader::new(root, None)?;
    expand_schema_with(schema, &mut resolver)
}

pub fn expand_schema_with(schema: &mut Value, resolver: &mut SchemaLoader) -> Result<()> {
    let scope = resolver.entry_scope().clone();
    Walker::new(resolver).schema(schema, &scope)
}

pub fn expand_parameter(parameter: &mut Value, resolver: &mut SchemaLoader) -> Result<()> {
    let scope = resolver.entry_scope().clone();
    Walker::new(resolver).parameter(parameter, &scope)
}

pub fn expand_response(response: &mut Value, resolver: &mut SchemaLoader) -> Result<()> {
    let scope = resolver.entry_scope().clone();
    Walker::new(resolver).response(response, &scope)
}

pub fn expand_path_item(path_item: &mut Value, resolver: &mut SchemaLoader) -> Result<()> {
    let scope = resolver.entry_scope().clone();
    Walker::new(resolver).path_item(path_item, &scope)
}

pub fn expand_operation(operation: &mut Value, resolver: &mut SchemaLoader) -> Result<()> {
    let scope = resolver.entry_scope().clone();
    Walker::new(resolver).operation(operation, &scope)
}

/// Outcome of looking at a node's own `$ref`.
enum Step {
    /// No reference; expand the node as it is.
    Inline,
    /// Node replaced by the target of `key`, which lives in `scope`.
    Replaced { key: String, scope: Ref },
    /// Circular reference left in place.
    Kept,
}

struct Walker<'r> {
    resolver: &'r mut SchemaLoader,
    /// Canonical references being expanded on the current path.
    expanding: Vec<String>,
    /// Position of the current node, for error reports.
    location: Pointer,
}

impl<'r> Walker<'r> {
    fn new(resolver: &'r mut SchemaLoader) -> Self {
        Self {
            resolver,
            expanding: Vec::new(),
            location: Pointer::default(),
        }
    }

    fn spec(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        let scope = self.own_scope(node, scope)?;
        let Value::Object(map) = node else {
            return Err(SpecError::parse("specification root must be an object"));
        };

        if let Some(Value::Object(definitions)) = map.get_mut("definitions") {
            self.at("definitions", |w| {
                for (name, schema) in definitions.iter_mut() {
                    w.at(name, |w| w.schema(schema, &scope))?;
                }
                Ok(())
            })?;
        }
        if let Some(Value::Object(parameters)) = map.get_mut("parameters") {
            self.at("parameters", |w| {
                for (name, parameter) in parameters.iter_mut() {
                    w.at(name, |w| w.parameter(parameter, &scope))?;
                }
                Ok(())
            })?;
        }
        if let Some(Value::Object(responses)) = map.get_mut("responses") {
            self.at("responses", |w| {
                for (name, response) in responses.iter_mut() {
                    w.at(name, |w| w.response(response, &scope))?;
                }
                Ok(())
            })?;
        }
        if let Some(Value::Object(paths)) = map.get_mut("paths") {
            self.at("paths", |w| {
                for (path, item) in paths.iter_mut() {
                    if path.starts_with(EXTENSION_PREFIX) {
                        continue;
                    }
                    w.at(path, |w| w.path_item(item, &scope))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn schema(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        self.expand_with(node, scope, |w, node, scope| w.schema_keywords(node, scope))
    }

    fn schema_keywords(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        let scope = self.own_scope(node, scope)?;
        let Value::Object(map) = node else {
            return Ok(());
        };

        if let Some(items) = map.get_mut("items") {
            self.at("items", |w| match items {
                Value::Array(list) => w.schema_list(list, &scope),
                _ => w.schema(items, &scope),
            })?;
        }
        for keyword in SCHEMA_LISTS {
            if let Some(Value::Array(list)) = map.get_mut(keyword) {
                self.at(keyword, |w| w.schema_list(list, &scope))?;
            }
        }
        if let Some(not) = map.get_mut("not") {
            self.at("not", |w| w.schema(not, &scope))?;
        }
        for keyword in SCHEMA_MAPS {
            if let Some(Value::Object(schemas)) = map.get_mut(keyword) {
                self.at(keyword, |w| {
                    for (name, schema) in schemas.iter_mut() {
                        w.at(name, |w| w.schema(schema, &scope))?;
                    }
                    Ok(())
                })?;
            }
        }
        for keyword in SCHEMA_OR_BOOL {
            match map.get_mut(keyword) {
                Some(schema) if schema.is_object() => {
                    self.at(keyword, |w| w.schema(schema, &scope))?;
                }
                _ => {}
            }
        }
        if let Some(Value::Object(dependencies)) = map.get_mut("dependencies") {
            self.at("dependencies", |w| {
                for (name, dependency) in dependencies.iter_mut() {
                    // Property dependencies are plain lists of names.
                    if dependency.is_object() {
                        w.at(name, |w| w.schema(dependency, &scope))?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn schema_list(&mut self, list: &mut [Value], scope: &Ref) -> Result<()> {
        for (index, schema) in list.iter_mut().enumerate() {
            self.at(&index.to_string(), |w| w.schema(schema, scope))?;
        }
        Ok(())
    }

    fn parameter(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        self.expand_with(node, scope, |w, node, scope| w.body_schema(node, scope))
    }

    fn response(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        self.expand_with(node, scope, |w, node, scope| w.body_schema(node, scope))
    }

    fn body_schema(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        match node.get_mut("schema") {
            Some(schema) => self.at("schema", |w| w.schema(schema, scope)),
            None => Ok(()),
        }
    }

    fn parameter_list(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        let Value::Array(list) = node else {
            return Ok(());
        };
        for (index, parameter) in list.iter_mut().enumerate() {
            self.at(&index.to_string(), |w| w.parameter(parameter, scope))?;
        }
        Ok(())
    }

    fn path_item(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        self.expand_with(node, scope, |w, node, scope| {
            if let Some(parameters) = node.get_mut("parameters") {
                w.at("parameters", |w| w.parameter_list(parameters, scope))?;
            }
            let Value::Object(map) = node else {
                return Ok(());
            };
            for method in HTTP_METHODS {
                if let Some(operation) = map.get_mut(method) {
                    w.at(method, |w| w.operation(operation, scope))?;
                }
            }
            Ok(())
        })
    }

    fn operation(&mut self, node: &mut Value, scope: &Ref) -> Result<()> {
        if let Some(parameters) = node.get_mut("parameters") {
            self.at("parameters", |w| w.parameter_list(parameters, scope))?;
        }
        if let Some(Value::Object(responses)) = node.get_mut("responses") {
            self.at("responses", |w| {
                for (code, response) in responses.iter_mut() {
                    if code.starts_with(EXTENSION_PREFIX) {
                        continue;
                    }
                    w.at(code, |w| w.response(response, scope))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Replace `node` if it is a reference, then run `body` on the result
    /// with the reference marked as in progress.
    fn expand_with<F>(&mut self, node: &mut Value, scope: &Ref, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &mut Value, &Ref) -> Result<()>,
    {
        match self.resolve_node(node, scope)? {
            Step::Kept => Ok(()),
            Step::Inline => body(self, node, scope),
            Step::Replaced { key, scope } => {
                self.expanding.push(key);
                let result = body(self, node, &scope);
                self.expanding.pop();
                result
            }
        }
    }

    fn resolve_node(&mut self, node: &mut Value, scope: &Ref) -> Result<Step> {
        let raw = match node.get("$ref") {
            Some(Value::String(raw)) if !raw.is_empty() => raw.clone(),
            _ => return Ok(Step::Inline),
        };
        let reference = Ref::parse(&raw).map_err(|err| self.fail(&raw, err))?;
        let target = scope
            .inherits(&reference)
            .map_err(|err| self.fail(&raw, err))?;
        let key = target.to_string();

        if self.expanding.contains(&key) {
            let err = SpecError::cyclic(key);
            return self.circular(node, &raw, &target, err);
        }

        match self.resolver.resolve_in(&reference, scope) {
            Ok(resolved) => {
                debug!("Expanded {} at #{}", raw, self.location);
                *node = resolved.value;
                Ok(Step::Replaced {
                    key,
                    scope: resolved.scope,
                })
            }
            Err(err) if err.is_cyclic() => self.circular(node, &raw, &target, err),
            Err(err) => Err(self.fail(&raw, err)),
        }
    }

    /// Leave a cyclic reference in place. A reference written inside another
    /// document is rewritten to its canonical form so that it still points
    /// there once it sits in the root.
    fn circular(&mut self, node: &mut Value, raw: &str, target: &Ref, err: SpecError) -> Result<Step> {
        if !self.resolver.options().keep_circular_refs {
            return Err(self.fail(raw, err));
        }
        let key = target.to_string();
        warn!("Keeping circular reference {} at #{}", raw, self.location);
        if !self.resolver.is_root_document(target) {
            *node = json!({ "$ref": key.clone() });
        }
        self.resolver.record_circular(key);
        Ok(Step::Kept)
    }

    /// Scope for the children of `node`, taking its own `id` into account.
    fn own_scope(&self, node: &Value, scope: &Ref) -> Result<Ref> {
        let Some(id) = id_from_node(node).map_err(|err| self.fail("id", err))? else {
            return Ok(scope.clone());
        };
        scope.inherits(&id).map_err(|err| self.fail(&id.to_string(), err))
    }

    fn at<F>(&mut self, token: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.location.push(token);
        let result = f(self);
        self.location.pop();
        result
    }

    fn fail(&self, reference: &str, err: SpecError) -> SpecError {
        SpecError::expansion(reference, format!("#{}", self.location), err)
    }
}
