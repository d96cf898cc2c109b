//! Version-agnostic query surface over a normalized API description.
//!
//! [`SpecAdapter::load`] is the entry point: load the root document, pick the variant from its
//! `swagger`/`openapi` marker, normalize, wrap. The variant is fixed at construction.

use crate::config::{LoaderConfig, parse_location};
use crate::error::{Result, SpecError};
use crate::loader::DocumentLoader;
use crate::normalize::normalize_document;
use crate::openapi3::OpenApi3Adapter;
use crate::params::{HTTP_METHODS, ParamLocation, merge_parameters};
use crate::resolver::SourceDocument;
use crate::swagger2::Swagger2Adapter;
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

/// Which specification family a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecVersion {
    Swagger2,
    OpenApi3,
}

impl SpecVersion {
    /// Inspect the top-level markers of a decoded (not yet normalized) root document.
    #[must_use]
    pub fn detect(root: &Value) -> Option<Self> {
        let root = root.as_object()?;
        if root.contains_key("swagger") {
            Some(SpecVersion::Swagger2)
        } else if root.contains_key("openapi") {
            Some(SpecVersion::OpenApi3)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpecVersion::Swagger2 => "Swagger 2.0",
            SpecVersion::OpenApi3 => "OpenAPI 3.x",
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Questions every specification version can answer.
///
/// Implementors provide the version-specific parts; path, operation and parameter lookups are
/// shared. Every returned structure is an independent copy of the normalized tree.
pub trait ApiDescription {
    fn version(&self) -> SpecVersion;

    /// The normalized document (no `$ref` left).
    fn document(&self) -> &Value;

    /// URL the root document was loaded from; relative server URLs resolve against it.
    fn root_url(&self) -> &Url;

    /// Base URLs for requests, without trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::InvalidUrl`] if a declared base cannot be resolved.
    fn server_urls(&self) -> Result<Vec<String>>;

    /// Whether a request to this operation carries a body.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn has_payload(&self, path: &str, operation: &str) -> Result<bool>;

    /// Whether the body is form data.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn has_formdata(&self, path: &str, operation: &str) -> Result<bool>;

    /// Media types the operation accepts for its body.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn payload_mimes(&self, path: &str, operation: &str) -> Result<Vec<String>>;

    /// Keys of the top-level `paths` map, in document order.
    fn paths(&self) -> Vec<String> {
        self.document()
            .get("paths")
            .and_then(Value::as_object)
            .map(|paths| paths.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The Path Item Object for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::UnknownPath`] if the document does not declare `path`.
    fn path_item(&self, path: &str) -> Result<&Map<String, Value>> {
        self.document()
            .get("paths")
            .and_then(|paths| paths.get(path))
            .and_then(Value::as_object)
            .ok_or_else(|| SpecError::UnknownPath {
                path: path.to_string(),
            })
    }

    /// The Operation Object for `operation` (an HTTP verb) under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is unknown, or if `operation` is not a declared HTTP verb.
    fn operation(&self, path: &str, operation: &str) -> Result<&Map<String, Value>> {
        let item = self.path_item(path)?;
        if !HTTP_METHODS.contains(&operation) {
            return Err(unknown_operation(path, operation));
        }
        item.get(operation)
            .and_then(Value::as_object)
            .ok_or_else(|| unknown_operation(path, operation))
    }

    /// HTTP verbs declared under `path`, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::UnknownPath`] if the document does not declare `path`.
    fn operations(&self, path: &str) -> Result<Vec<String>> {
        let item = self.path_item(path)?;
        Ok(item
            .iter()
            .filter(|(key, _)| HTTP_METHODS.contains(&key.as_str()))
            .filter_map(|(key, value)| {
                if value.is_object() {
                    Some(key.clone())
                } else {
                    tracing::warn!("Skipping '{} {}': operation is not a mapping", key, path);
                    None
                }
            })
            .collect())
    }

    /// Path-level parameters merged with operation-level ones (operation wins per `(name, in)`).
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        let item = self.path_item(path)?;
        let op = self.operation(path, operation)?;
        Ok(merge_parameters(parameter_list(item), parameter_list(op)))
    }

    /// [`Self::parameters`] filtered by `in`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn parameters_in(
        &self,
        path: &str,
        operation: &str,
        location: ParamLocation,
    ) -> Result<Vec<Value>> {
        Ok(self
            .parameters(path, operation)?
            .into_iter()
            .filter(|p| location.matches(p))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn path_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        self.parameters_in(path, operation, ParamLocation::Path)
    }

    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn query_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        self.parameters_in(path, operation, ParamLocation::Query)
    }

    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn header_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        self.parameters_in(path, operation, ParamLocation::Header)
    }

    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn body_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        self.parameters_in(path, operation, ParamLocation::Body)
    }

    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    fn formdata_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        self.parameters_in(path, operation, ParamLocation::FormData)
    }
}

pub(crate) fn unknown_operation(path: &str, operation: &str) -> SpecError {
    SpecError::UnknownOperation {
        path: path.to_string(),
        operation: operation.to_string(),
    }
}

fn parameter_list(object: &Map<String, Value>) -> &[Value] {
    object
        .get("parameters")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Collect string items of an array value.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve `reference` against `root` and strip trailing `/`.
pub(crate) fn join_base(root: &Url, reference: &str) -> Result<String> {
    let url = root.join(reference).map_err(|source| SpecError::InvalidUrl {
        url: reference.to_string(),
        source,
    })?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// A normalized API description of either supported version.
#[derive(Debug, Clone)]
pub enum SpecAdapter {
    Swagger2(Swagger2Adapter),
    OpenApi3(OpenApi3Adapter),
}

impl SpecAdapter {
    /// Load the root document at `root`, normalize it and wrap it in the matching variant.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::UnrecognizedSpecification`] before any reference is resolved if the
    /// root lacks both markers; otherwise any loading or resolution failure.
    pub fn load(root: &Url, loader: &DocumentLoader) -> Result<Self> {
        let source = SourceDocument::load(root, loader)?;
        let version = SpecVersion::detect(&source.root).ok_or_else(|| {
            SpecError::UnrecognizedSpecification {
                url: source.url.to_string(),
            }
        })?;
        tracing::debug!("Detected {} document at {}", version, source.url);

        let document = normalize_document(loader, &source)?;
        let adapter = match version {
            SpecVersion::Swagger2 => {
                SpecAdapter::Swagger2(Swagger2Adapter::new(document, source.url))
            }
            SpecVersion::OpenApi3 => {
                SpecAdapter::OpenApi3(OpenApi3Adapter::new(document, source.url))
            }
        };
        Ok(adapter)
    }

    /// Build an HTTP loader from `config` and [`Self::load`] the document at `location`
    /// (URL or file path).
    ///
    /// # Errors
    ///
    /// See [`Self::load`]; also fails on an invalid location or configuration.
    pub fn from_location(location: &str, config: &LoaderConfig) -> Result<Self> {
        let root = parse_location(location)?;
        let loader = DocumentLoader::http(config)?;
        Self::load(&root, &loader)
    }

    fn inner(&self) -> &dyn ApiDescription {
        match self {
            SpecAdapter::Swagger2(a) => a,
            SpecAdapter::OpenApi3(a) => a,
        }
    }

    #[must_use]
    pub fn as_openapi3(&self) -> Option<&OpenApi3Adapter> {
        match self {
            SpecAdapter::OpenApi3(a) => Some(a),
            SpecAdapter::Swagger2(_) => None,
        }
    }

    /// Cookie parameters (OpenAPI 3 only).
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Unsupported`] for Swagger 2 documents, or a lookup error.
    pub fn cookie_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        match self {
            SpecAdapter::OpenApi3(a) => a.cookie_parameters(path, operation),
            SpecAdapter::Swagger2(_) => Err(SpecError::Unsupported {
                version: SpecVersion::Swagger2.as_str(),
                query: "cookie parameters",
            }),
        }
    }

    /// Request body, or one of its media types (OpenAPI 3 only).
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Unsupported`] for Swagger 2 documents, or a lookup error.
    pub fn request_body(
        &self,
        path: &str,
        operation: &str,
        mime: Option<&str>,
    ) -> Result<Option<Value>> {
        match self {
            SpecAdapter::OpenApi3(a) => a.request_body(path, operation, mime),
            SpecAdapter::Swagger2(_) => Err(SpecError::Unsupported {
                version: SpecVersion::Swagger2.as_str(),
                query: "requestBody",
            }),
        }
    }
}

impl ApiDescription for SpecAdapter {
    fn version(&self) -> SpecVersion {
        self.inner().version()
    }

    fn document(&self) -> &Value {
        self.inner().document()
    }

    fn root_url(&self) -> &Url {
        self.inner().root_url()
    }

    fn server_urls(&self) -> Result<Vec<String>> {
        self.inner().server_urls()
    }

    fn has_payload(&self, path: &str, operation: &str) -> Result<bool> {
        self.inner().has_payload(path, operation)
    }

    fn has_formdata(&self, path: &str, operation: &str) -> Result<bool> {
        self.inner().has_formdata(path, operation)
    }

    fn payload_mimes(&self, path: &str, operation: &str) -> Result<Vec<String>> {
        self.inner().payload_mimes(path, operation)
    }
}
