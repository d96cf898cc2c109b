//! Whole-document dereferencing.
//!
//! [`Normalizer`] replaces every `$ref` node with the (recursively normalized) value it points
//! at, possibly across documents, and folds path-level parameters into each operation.

use crate::error::{Result, SpecError};
use crate::loader::DocumentLoader;
use crate::params::{HTTP_METHODS, merge_parameters};
use crate::pointer::unescape_token;
use crate::resolver::{ReferenceResolver, SourceDocument};
use serde_json::{Map, Value};
use std::collections::HashMap;

const REF_KEY: &str = "$ref";
const PARAMETERS_KEY: &str = "parameters";
const PROPERTY_MAP_KEYS: [&str; 2] = ["properties", "patternProperties"];

fn is_property_map(parent: Option<&str>) -> bool {
    parent.is_some_and(|key| PROPERTY_MAP_KEYS.contains(&key))
}

#[derive(Debug)]
pub struct Normalizer<'a> {
    resolver: ReferenceResolver<'a>,
    /// `url#pointer` keys of references currently being expanded, outermost first.
    active: Vec<String>,
    /// Fully expanded reference targets.
    expanded: HashMap<String, Value>,
}

impl<'a> Normalizer<'a> {
    #[must_use]
    pub fn new(loader: &'a DocumentLoader) -> Self {
        Self {
            resolver: ReferenceResolver::new(loader),
            active: Vec::new(),
            expanded: HashMap::new(),
        }
    }

    /// Normalize a whole document.
    ///
    /// # Errors
    ///
    /// Returns the first resolution failure; the partial result is discarded.
    pub fn normalize_document(&mut self, document: &SourceDocument) -> Result<Value> {
        self.normalize(&document.root, document)
    }

    /// Normalize `node`, which was found in `document`.
    ///
    /// # Errors
    ///
    /// Returns an error on dangling, circular, malformed or unloadable references.
    pub fn normalize(&mut self, node: &Value, document: &SourceDocument) -> Result<Value> {
        self.normalize_node(node, document, None)
    }

    /// `parent` is the key under which `node` sits in its enclosing mapping.
    fn normalize_node(
        &mut self,
        node: &Value,
        document: &SourceDocument,
        parent: Option<&str>,
    ) -> Result<Value> {
        match node {
            Value::Object(map) => match map.get(REF_KEY) {
                // Siblings of `$ref` are ignored.
                Some(Value::String(reference)) => self.expand_reference(reference, document),
                // Keys of a schema's `properties` are property names: `$ref` may be a field.
                Some(_) if is_property_map(parent) => self.normalize_map(map, document),
                Some(other) => Err(SpecError::InvalidReference {
                    reference: other.to_string(),
                    message: "'$ref' must be a string".to_string(),
                }),
                None => self.normalize_map(map, document),
            },
            Value::Array(items) => items
                .iter()
                .map(|item| self.normalize_node(item, document, None))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    fn expand_reference(&mut self, reference: &str, document: &SourceDocument) -> Result<Value> {
        let key = self.resolver.target_key(reference, document)?;

        if let Some(done) = self.expanded.get(&key) {
            return Ok(done.clone());
        }

        if let Some(start) = self.active.iter().position(|k| *k == key) {
            let mut chain = self.active[start..].to_vec();
            chain.push(key);
            return Err(SpecError::CircularReference {
                reference: reference.to_string(),
                chain,
            });
        }

        let resolved = self.resolver.resolve(reference, document)?;
        let parent = resolved.pointer.rsplit('/').next().map(unescape_token);
        self.active.push(key.clone());
        let normalized =
            self.normalize_node(&resolved.value, &resolved.document, parent.as_deref());
        self.active.pop();

        let normalized = normalized?;
        self.expanded.insert(key, normalized.clone());
        Ok(normalized)
    }

    fn normalize_map(&mut self, map: &Map<String, Value>, document: &SourceDocument) -> Result<Value> {
        let mut out = Map::with_capacity(map.len());
        for (k, v) in map {
            out.insert(k.clone(), self.normalize_node(v, document, Some(k.as_str()))?);
        }
        inherit_parameters(&mut out);
        Ok(Value::Object(out))
    }
}

/// Fold a Path Item's `parameters` into each of its operations.
///
/// Applies only when the mapping declares a `parameters` list and an HTTP-verb child declares one
/// too; both lists are already normalized at this point.
fn inherit_parameters(path_item: &mut Map<String, Value>) {
    let Some(Value::Array(defaults)) = path_item.get(PARAMETERS_KEY) else {
        return;
    };
    let defaults = defaults.clone();

    for method in HTTP_METHODS {
        let Some(Value::Object(operation)) = path_item.get_mut(method) else {
            continue;
        };
        if let Some(Value::Array(overrides)) = operation.get_mut(PARAMETERS_KEY) {
            *overrides = merge_parameters(&defaults, overrides);
        }
    }
}

/// Normalize the document at `document` using a fresh [`Normalizer`].
///
/// # Errors
///
/// See [`Normalizer::normalize`].
pub fn normalize_document(loader: &DocumentLoader, document: &SourceDocument) -> Result<Value> {
    Normalizer::new(loader).normalize_document(document)
}

/// Whether any mapping in `value` still has a `$ref` key that is not a property name.
#[must_use]
pub fn contains_reference(value: &Value) -> bool {
    fn scan(value: &Value, parent: Option<&str>) -> bool {
        match value {
            Value::Object(map) => {
                let unresolved = match map.get(REF_KEY) {
                    Some(Value::String(_)) => true,
                    Some(_) => !is_property_map(parent),
                    None => false,
                };
                unresolved || map.iter().any(|(k, v)| scan(v, Some(k.as_str())))
            }
            Value::Array(items) => items.iter().any(|item| scan(item, None)),
            _ => false,
        }
    }
    scan(value, None)
}
