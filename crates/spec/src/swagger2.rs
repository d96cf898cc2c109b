//! Swagger 2.0 variant of [`ApiDescription`].

use crate::adapter::{ApiDescription, SpecVersion, join_base, string_list};
use crate::error::Result;
use crate::params::ParamLocation;
use serde_json::Value;
use url::Url;

#[derive(Debug, Clone)]
pub struct Swagger2Adapter {
    document: Value,
    root_url: Url,
}

impl Swagger2Adapter {
    /// Wrap an already normalized Swagger 2.0 document.
    #[must_use]
    pub fn new(document: Value, root_url: Url) -> Self {
        Self { document, root_url }
    }

    fn schemes(&self) -> Vec<String> {
        let schemes = string_list(self.document.get("schemes"));
        if schemes.is_empty() {
            // Swagger 2.0: default to the scheme the definition itself was fetched with.
            vec![self.root_url.scheme().to_string()]
        } else {
            schemes
        }
    }
}

impl ApiDescription for Swagger2Adapter {
    fn version(&self) -> SpecVersion {
        SpecVersion::Swagger2
    }

    fn document(&self) -> &Value {
        &self.document
    }

    fn root_url(&self) -> &Url {
        &self.root_url
    }

    fn server_urls(&self) -> Result<Vec<String>> {
        let base_path = self
            .document
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("/");

        let Some(host) = self.document.get("host").and_then(Value::as_str) else {
            return Ok(vec![join_base(&self.root_url, base_path)?]);
        };

        Ok(self
            .schemes()
            .into_iter()
            .map(|scheme| {
                format!("{scheme}://{host}{base_path}")
                    .trim_end_matches('/')
                    .to_string()
            })
            .collect())
    }

    fn has_payload(&self, path: &str, operation: &str) -> Result<bool> {
        Ok(self
            .parameters(path, operation)?
            .iter()
            .any(|p| ParamLocation::Body.matches(p) || ParamLocation::FormData.matches(p)))
    }

    fn has_formdata(&self, path: &str, operation: &str) -> Result<bool> {
        Ok(self
            .parameters(path, operation)?
            .iter()
            .any(|p| ParamLocation::FormData.matches(p)))
    }

    /// Operation-level `consumes`, falling back to the document-level list.
    fn payload_mimes(&self, path: &str, operation: &str) -> Result<Vec<String>> {
        let op = self.operation(path, operation)?;
        let consumes = op
            .get("consumes")
            .or_else(|| self.document.get("consumes"));
        Ok(string_list(consumes))
    }
}
