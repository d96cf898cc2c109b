//! Document loading.
//!
//! A [`DocumentLoader`] fetches API description documents through a [`Transport`], decodes them as
//! JSON or YAML and memoizes the decoded tree per URL for its whole lifetime. The cache is never
//! evicted; one loader is meant to live as long as the adapters built from it.

use crate::config::LoaderConfig;
use crate::error::{Result, SpecError};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Media types that select the YAML decoder.
pub const YAML_MIMES: [&str; 4] = [
    "text/vnd.yaml",
    "application/yaml",
    "application/x-yaml",
    "text/x-yaml",
];

/// URL path suffixes that select the YAML decoder.
pub const YAML_EXTENSIONS: [&str; 2] = [".yml", ".yaml"];

/// Raw response of a [`Transport`] fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// `Content-Type` header, if the transport has one.
    pub content_type: Option<String>,
    pub body: String,
}

/// Fetches raw documents by URL.
pub trait Transport: Send + Sync {
    /// Fetch the document at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Transport`] if the document cannot be retrieved.
    fn fetch(&self, url: &Url) -> Result<FetchedDocument>;
}

/// Decoder choice for a fetched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => f.write_str("JSON"),
            DocumentFormat::Yaml => f.write_str("YAML"),
        }
    }
}

impl DocumentFormat {
    /// Pick a decoder from the response media type (parameters ignored) or the URL extension.
    #[must_use]
    pub fn detect(content_type: Option<&str>, url: &Url) -> Self {
        let yaml_mime = content_type
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .is_some_and(|m| YAML_MIMES.contains(&m.essence_str()));
        if yaml_mime {
            DocumentFormat::Yaml
        } else {
            Self::for_path(url.path())
        }
    }

    /// Pick a decoder from a path's extension alone.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        if YAML_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            DocumentFormat::Yaml
        } else {
            DocumentFormat::Json
        }
    }

    /// Decode `body` into a document tree.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Decode`] if the body is malformed.
    pub fn decode(self, url: &Url, body: &str) -> Result<Value> {
        self.parse(body).map_err(|message| SpecError::Decode {
            url: url.to_string(),
            format: self,
            message,
        })
    }

    /// [`Self::decode`] without a source URL; the error is the decoder's message.
    ///
    /// # Errors
    ///
    /// Returns the decoder's message if the body is malformed.
    pub fn parse(self, body: &str) -> std::result::Result<Value, String> {
        match self {
            DocumentFormat::Json => serde_json::from_str(body).map_err(|e| e.to_string()),
            DocumentFormat::Yaml => {
                // Going through `serde_yaml::Value` lets non-string keys (`200:`) become strings.
                let mut yaml: serde_yaml::Value =
                    serde_yaml::from_str(body).map_err(|e| e.to_string())?;
                yaml.apply_merge().map_err(|e| e.to_string())?;
                serde_json::to_value(yaml).map_err(|e| e.to_string())
            }
        }
    }
}

/// Blocking HTTP transport (with `file://` support).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport that sends the configured `User-Agent` and static headers on every fetch.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Config`] if a header is invalid or the client cannot be built.
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SpecError::Config(format!("Invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                SpecError::Config(format!("Invalid value for header '{name}': {e}"))
            })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| SpecError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn read_file(url: &Url) -> Result<FetchedDocument> {
        let path = url.to_file_path().map_err(|()| SpecError::Transport {
            url: url.to_string(),
            message: "not a local file path".to_string(),
        })?;
        let body = std::fs::read_to_string(&path).map_err(|e| SpecError::Transport {
            url: url.to_string(),
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Ok(FetchedDocument {
            content_type: None,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
        if url.scheme() == "file" {
            return Self::read_file(url);
        }

        let transport_err = |message: String| SpecError::Transport {
            url: url.to_string(),
            message,
        };

        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| transport_err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(transport_err(format!("HTTP {status}")));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .text()
            .map_err(|e| transport_err(format!("failed to read body: {e}")))?;

        Ok(FetchedDocument { content_type, body })
    }
}

/// In-memory transport serving canned documents.
///
/// Useful for offline use and tests: every fetch is counted per URL.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    documents: HashMap<String, FetchedDocument>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url` with an optional `Content-Type`.
    #[must_use]
    pub fn with_document(mut self, url: &str, content_type: Option<&str>, body: &str) -> Self {
        self.documents.insert(
            url.to_string(),
            FetchedDocument {
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            },
        );
        self
    }

    /// Serve a JSON value at `url` as `application/json`.
    #[must_use]
    pub fn with_json(self, url: &str, value: &Value) -> Self {
        self.with_document(url, Some("application/json"), &value.to_string())
    }

    /// Number of fetches issued for `url` so far.
    #[must_use]
    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().get(url).copied().unwrap_or(0)
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
        *self.fetches.lock().entry(url.to_string()).or_insert(0) += 1;
        self.documents
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| SpecError::Transport {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn fetch(&self, url: &Url) -> Result<FetchedDocument> {
        (**self).fetch(url)
    }
}

/// Fetches, decodes and caches documents by URL.
pub struct DocumentLoader {
    transport: Box<dyn Transport>,
    // Held across the fetch: each URL is fetched at most once, even when shared between threads.
    cache: Mutex<HashMap<String, Arc<Value>>>,
}

impl fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("cached", &self.cache.lock().len())
            .finish_non_exhaustive()
    }
}

impl DocumentLoader {
    #[must_use]
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loader backed by an [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from `config`.
    pub fn http(config: &LoaderConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }

    /// Load the document at `url`, fetching it only on the first call.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the fetch fails, or a decode error if the body is malformed.
    /// Failed loads are not cached.
    pub fn load(&self, url: &Url) -> Result<Arc<Value>> {
        let key = cache_key(url);
        let mut cache = self.cache.lock();
        if let Some(doc) = cache.get(&key) {
            tracing::debug!("Document cache hit for {}", key);
            return Ok(Arc::clone(doc));
        }

        tracing::info!("Fetching document {}", key);
        let fetched = self.transport.fetch(url)?;
        let format = DocumentFormat::detect(fetched.content_type.as_deref(), url);
        let doc = Arc::new(format.decode(url, &fetched.body)?);
        cache.insert(key, Arc::clone(&doc));
        Ok(doc)
    }

    /// Whether `url` has already been loaded.
    #[must_use]
    pub fn is_cached(&self, url: &Url) -> bool {
        self.cache.lock().contains_key(&cache_key(url))
    }
}

fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_detect_format() {
        let json_url = url("https://example.test/api/spec.json");
        let plain_url = url("https://example.test/api/spec");
        assert_eq!(
            DocumentFormat::detect(Some("application/json"), &json_url),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::detect(Some("application/x-yaml; charset=utf-8"), &plain_url),
            DocumentFormat::Yaml
        );
        for mime in YAML_MIMES {
            assert_eq!(
                DocumentFormat::detect(Some(mime), &plain_url),
                DocumentFormat::Yaml,
                "{mime}"
            );
        }
        assert_eq!(
            DocumentFormat::detect(Some("application/yaml"), &json_url),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::detect(Some("text/plain"), &url("https://example.test/spec.yml")),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::detect(None, &url("https://example.test/spec.yaml?raw=1")),
            DocumentFormat::Yaml
        );
        assert_eq!(DocumentFormat::detect(None, &plain_url), DocumentFormat::Json);
        assert_eq!(
            DocumentFormat::detect(Some("not a mime"), &plain_url),
            DocumentFormat::Json
        );
    }

    #[test]
    fn test_yaml_integer_keys_become_strings() {
        let doc = DocumentFormat::Yaml
            .decode(
                &url("https://example.test/spec.yaml"),
                "responses:\n  200:\n    description: ok\n",
            )
            .unwrap();
        assert_eq!(doc["responses"]["200"]["description"], json!("ok"));
    }

    #[test]
    fn test_yaml_merge_keys_are_applied() {
        let doc = DocumentFormat::Yaml
            .decode(
                &url("https://example.test/schemas.yaml"),
                "base: &b\n  type: string\nderived:\n  <<: *b\n  format: uuid\n",
            )
            .unwrap();
        assert_eq!(doc["derived"], json!({"type": "string", "format": "uuid"}));
        assert_eq!(doc["base"], json!({"type": "string"}));

        let err = DocumentFormat::Yaml
            .decode(&url("https://example.test/bad.yaml"), "a:\n  <<: 1\n")
            .unwrap_err();
        assert!(matches!(err, SpecError::Decode { format: DocumentFormat::Yaml, .. }));
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(DocumentFormat::for_path("/etc/opensqli/config.yml"), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path("config.yaml"), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path("config.json"), DocumentFormat::Json);
        assert_eq!(DocumentFormat::for_path("config"), DocumentFormat::Json);
    }

    #[test]
    fn test_load_is_memoized() {
        let transport = Arc::new(
            MemoryTransport::new()
                .with_json("https://example.test/spec.json", &json!({"swagger": "2.0"})),
        );
        let loader = DocumentLoader::new(Arc::clone(&transport));
        let u = url("https://example.test/spec.json");

        assert!(!loader.is_cached(&u));
        let first = loader.load(&u).unwrap();
        let second = loader.load(&u).unwrap();

        assert_eq!(first, second);
        assert_eq!(*first, json!({"swagger": "2.0"}));
        assert!(loader.is_cached(&u));
        assert_eq!(transport.fetch_count("https://example.test/spec.json"), 1);
    }

    #[test]
    fn test_load_ignores_fragment_for_caching() {
        let transport = Arc::new(
            MemoryTransport::new().with_json("https://example.test/a.json", &json!({"a": 1})),
        );
        let loader = DocumentLoader::new(Arc::clone(&transport));
        loader.load(&url("https://example.test/a.json")).unwrap();
        loader
            .load(&url("https://example.test/a.json#/a"))
            .unwrap();
        assert_eq!(transport.fetch_count("https://example.test/a.json"), 1);
    }

    #[test]
    fn test_decode_errors_propagate_and_are_not_cached() {
        let transport = Arc::new(MemoryTransport::new().with_document(
            "https://example.test/broken.json",
            Some("application/json"),
            "{not json",
        ));
        let loader = DocumentLoader::new(Arc::clone(&transport));
        let u = url("https://example.test/broken.json");

        let err = loader.load(&u).unwrap_err();
        assert!(matches!(
            err,
            SpecError::Decode {
                format: DocumentFormat::Json,
                ..
            }
        ));
        assert!(!loader.is_cached(&u));
        let _ = loader.load(&u);
        assert_eq!(transport.fetch_count("https://example.test/broken.json"), 2);
    }

    #[test]
    fn test_missing_document_is_transport_error() {
        let loader = DocumentLoader::new(MemoryTransport::new());
        let err = loader.load(&url("https://example.test/nope.json")).unwrap_err();
        assert!(matches!(err, SpecError::Transport { .. }));
    }

    #[test]
    fn test_http_transport_reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.yaml");
        std::fs::write(&path, "openapi: 3.0.0\npaths: {}\n").unwrap();

        let loader = DocumentLoader::http(&LoaderConfig::default()).unwrap();
        let doc = loader.load(&Url::from_file_path(&path).unwrap()).unwrap();
        assert_eq!(doc["openapi"], json!("3.0.0"));

        let missing = Url::from_file_path(dir.path().join("missing.json")).unwrap();
        assert!(matches!(
            loader.load(&missing).unwrap_err(),
            SpecError::Transport { .. }
        ));
    }

    #[test]
    fn test_http_transport_rejects_invalid_headers() {
        let cfg = LoaderConfig::default().with_header("Bad Header", "x");
        assert!(matches!(
            HttpTransport::new(&cfg).unwrap_err(),
            SpecError::Config(_)
        ));
    }
}
