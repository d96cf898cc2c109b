//! Printable summary of the request surface an API description declares.

use opensqli_spec::{ApiDescription, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceReport {
    pub version: String,
    pub root: String,
    pub servers: Vec<String>,
    pub endpoints: Vec<EndpointReport>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReport {
    pub method: String,
    pub path: String,
    pub parameters: Vec<ParameterReport>,
    pub has_payload: bool,
    pub has_formdata: bool,
    pub payload_mimes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParameterReport {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
}

impl ParameterReport {
    fn from_value(param: &Value) -> Self {
        let field = |f: &str| {
            param
                .get(f)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            name: field("name"),
            location: field("in"),
            required: param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

impl SurfaceReport {
    pub fn build<A: ApiDescription + ?Sized>(spec: &A) -> Result<Self> {
        let mut endpoints = Vec::new();
        for path in spec.paths() {
            for method in spec.operations(&path)? {
                endpoints.push(EndpointReport {
                    parameters: spec
                        .parameters(&path, &method)?
                        .iter()
                        .map(ParameterReport::from_value)
                        .collect(),
                    has_payload: spec.has_payload(&path, &method)?,
                    has_formdata: spec.has_formdata(&path, &method)?,
                    payload_mimes: spec.payload_mimes(&path, &method)?,
                    method,
                    path: path.clone(),
                });
            }
        }

        Ok(Self {
            version: spec.version().to_string(),
            root: spec.root_url().to_string(),
            servers: spec.server_urls()?,
            endpoints,
        })
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} document at {}", self.version, self.root);
        let _ = writeln!(out, "servers:");
        for server in &self.servers {
            let _ = writeln!(out, "  {server}");
        }

        for ep in &self.endpoints {
            let _ = writeln!(out, "{} {}", ep.method.to_uppercase(), ep.path);
            for param in &ep.parameters {
                let marker = if param.required { " (required)" } else { "" };
                let _ = writeln!(out, "  {:<8} {}{marker}", param.location, param.name);
            }
            if ep.has_payload {
                let kind = if ep.has_formdata { "form" } else { "body" };
                let mimes = if ep.payload_mimes.is_empty() {
                    "-".to_string()
                } else {
                    ep.payload_mimes.join(", ")
                };
                let _ = writeln!(out, "  {kind:<8} {mimes}");
            }
        }
        out
    }
}
