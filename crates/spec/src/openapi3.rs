//! OpenAPI 3.x variant of [`ApiDescription`].

use crate::adapter::{ApiDescription, SpecVersion, join_base};
use crate::error::Result;
use crate::params::ParamLocation;
use serde_json::{Map, Value};
use url::Url;

/// Media types that carry form fields.
const FORM_MIMES: [&str; 2] = ["multipart/form-data", "application/x-www-form-urlencoded"];

#[derive(Debug, Clone)]
pub struct OpenApi3Adapter {
    document: Value,
    root_url: Url,
}

impl OpenApi3Adapter {
    /// Wrap an already normalized OpenAPI 3.x document.
    #[must_use]
    pub fn new(document: Value, root_url: Url) -> Self {
        Self { document, root_url }
    }

    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    pub fn cookie_parameters(&self, path: &str, operation: &str) -> Result<Vec<Value>> {
        self.parameters_in(path, operation, ParamLocation::Cookie)
    }

    /// The operation's `requestBody`, or its Media Type Object for `mime`.
    ///
    /// `None` when the operation declares no body, or not that media type.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown paths or operations.
    pub fn request_body(
        &self,
        path: &str,
        operation: &str,
        mime: Option<&str>,
    ) -> Result<Option<Value>> {
        let Some(body) = self.operation(path, operation)?.get("requestBody") else {
            return Ok(None);
        };
        Ok(match mime {
            Some(mime) => body.get("content").and_then(|c| c.get(mime)).cloned(),
            None => Some(body.clone()),
        })
    }

    fn content<'a>(&'a self, path: &str, operation: &str) -> Result<Option<&'a Map<String, Value>>> {
        Ok(self
            .operation(path, operation)?
            .get("requestBody")
            .and_then(|body| body.get("content"))
            .and_then(Value::as_object))
    }
}

/// Substitute `{name}` placeholders with the server variable defaults.
fn expand_server_url(server: &Value) -> Option<String> {
    let mut url = server.get("url").and_then(Value::as_str)?.to_string();
    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
        for (name, variable) in variables {
            if let Some(default) = variable.get("default").and_then(Value::as_str) {
                url = url.replace(&format!("{{{name}}}"), default);
            }
        }
    }
    Some(url)
}

impl ApiDescription for OpenApi3Adapter {
    fn version(&self) -> SpecVersion {
        SpecVersion::OpenApi3
    }

    fn document(&self) -> &Value {
        &self.document
    }

    fn root_url(&self) -> &Url {
        &self.root_url
    }

    fn server_urls(&self) -> Result<Vec<String>> {
        let mut urls: Vec<String> = self
            .document
            .get("servers")
            .and_then(Value::as_array)
            .map(|servers| servers.iter().filter_map(expand_server_url).collect())
            .unwrap_or_default();
        if urls.is_empty() {
            urls.push("/".to_string());
        }

        urls.iter()
            .map(|u| join_base(&self.root_url, u))
            .collect()
    }

    fn has_payload(&self, path: &str, operation: &str) -> Result<bool> {
        Ok(self
            .content(path, operation)?
            .is_some_and(|content| !content.is_empty()))
    }

    fn has_formdata(&self, path: &str, operation: &str) -> Result<bool> {
        Ok(self.content(path, operation)?.is_some_and(|content| {
            content.keys().any(|m| {
                m.parse::<mime::Mime>()
                    .is_ok_and(|m| FORM_MIMES.contains(&m.essence_str()))
            })
        }))
    }

    /// Keys of `requestBody.content`.
    fn payload_mimes(&self, path: &str, operation: &str) -> Result<Vec<String>> {
        Ok(self
            .content(path, operation)?
            .map(|content| content.keys().cloned().collect())
            .unwrap_or_default())
    }
}
