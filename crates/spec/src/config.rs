//! Loader settings and the parsing of command-line style inputs (headers, spec locations).

use crate::error::{Result, SpecError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;

/// `User-Agent` sent with every document fetch unless overridden.
pub const USER_AGENT: &str = concat!("opensqli/", env!("CARGO_PKG_VERSION"));

/// Settings applied to every document fetch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Identifying client header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Static request headers (e.g. `Authorization`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Add (or replace) a static header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a static header, replacing any existing one whose name differs only in case.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }
}

/// Split a `Name: value` header line.
///
/// # Errors
///
/// Returns [`SpecError::Config`] if the line has no `:` or the name is empty.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err(SpecError::Config(format!(
            "Invalid header '{raw}': expected 'Name: value'",
        )));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(SpecError::Config(format!(
            "Invalid header '{raw}': empty name",
        )));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Turn a root spec location (URL or file path) into a URL.
///
/// # Errors
///
/// Returns an error if the location looks like a URL but does not parse, or if a path cannot be
/// expressed as a `file://` URL.
pub fn parse_location(location: &str) -> Result<Url> {
    if location.starts_with("http://")
        || location.starts_with("https://")
        || location.starts_with("file://")
    {
        let mut url = Url::parse(location).map_err(|source| SpecError::InvalidUrl {
            url: location.to_string(),
            source,
        })?;
        url.set_fragment(None);
        return Ok(url);
    }

    let path = PathBuf::from(location);
    let path = std::fs::canonicalize(&path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&path))
                .unwrap_or(path)
        }
    });
    Url::from_file_path(&path).map_err(|()| {
        SpecError::Config(format!(
            "Cannot express '{}' as a file URL",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Authorization: Bearer token").unwrap(),
            ("Authorization".to_string(), "Bearer token".to_string())
        );
        assert_eq!(
            parse_header("X-Empty:").unwrap(),
            ("X-Empty".to_string(), String::new())
        );
        // Only the first colon separates name and value.
        assert_eq!(
            parse_header("X-Url: http://a:1").unwrap().1,
            "http://a:1".to_string()
        );
        assert!(parse_header("no colon").is_err());
        assert!(parse_header(" : value").is_err());
    }

    #[test]
    fn test_parse_location_urls_and_paths() {
        let url = parse_location("https://example.test/api/swagger.json#frag").unwrap();
        assert_eq!(url.as_str(), "https://example.test/api/swagger.json");

        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("spec.yaml");
        std::fs::write(&spec, "openapi: 3.0.0").unwrap();
        let url = parse_location(spec.to_str().unwrap()).unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/spec.yaml"));

        assert!(parse_location("http://[broken").is_err());
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let cfg = LoaderConfig::default()
            .with_header("authorization", "Bearer file")
            .with_header("X-Keep", "1")
            .with_header("Authorization", "Bearer cli");
        assert_eq!(
            cfg.headers,
            BTreeMap::from([
                ("Authorization".to_string(), "Bearer cli".to_string()),
                ("X-Keep".to_string(), "1".to_string()),
            ])
        );
    }

    #[test]
    fn test_loader_config_defaults_from_json() {
        let cfg: LoaderConfig =
            serde_json::from_str(r#"{"headers":{"Authorization":"Bearer t"}}"#).unwrap();
        assert_eq!(cfg.user_agent, USER_AGENT);
        assert_eq!(cfg.headers.get("Authorization").unwrap(), "Bearer t");
    }
}
