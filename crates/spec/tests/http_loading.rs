use anyhow::Context as _;
use opensqli_spec::{
    ApiDescription, DocumentLoader, LoaderConfig, SpecAdapter, SpecError, SpecVersion,
};
use opensqli_test_support::{DocumentServer, ServedDocument};
use serde_json::json;

const SWAGGER_ROOT: &str = r##"{
  "swagger": "2.0",
  "basePath": "/v1",
  "consumes": ["application/json"],
  "paths": {
    "/widgets": {
      "parameters": [{"$ref": "common/params.yaml#/Limit"}],
      "get": {"parameters": [{"$ref": "common/params.yaml#/Offset"}]},
      "post": {"parameters": [{"name": "body", "in": "body", "schema": {"$ref": "#/definitions/Widget"}}]}
    }
  },
  "definitions": {
    "Widget": {"type": "object", "properties": {"id": {"$ref": "common/params.yaml#/Id"}}}
  }
}"##;

const PARAMS_YAML: &str = r"
Limit:
  name: limit
  in: query
  type: integer
Offset:
  name: offset
  in: query
  type: integer
Id:
  type: string
";

#[test]
fn swagger_document_with_external_refs_over_http() -> anyhow::Result<()> {
    let server = DocumentServer::start(vec![
        ServedDocument::json("/api/swagger.json", SWAGGER_ROOT),
        // No YAML media type: the extension selects the decoder.
        ServedDocument::new("/api/common/params.yaml", Some("text/plain"), PARAMS_YAML),
    ])?;

    let config = LoaderConfig::default().with_header("Authorization", "Bearer token");
    let loader = DocumentLoader::http(&config)?;
    let root = server.url("/api/swagger.json");
    let adapter = SpecAdapter::load(&root, &loader).context("load adapter")?;

    assert_eq!(adapter.version(), SpecVersion::Swagger2);
    let host = root.host_str().context("host")?;
    let port = root.port().context("port")?;
    assert_eq!(
        adapter.server_urls()?,
        vec![format!("http://{host}:{port}/v1")]
    );
    assert_eq!(adapter.paths(), vec!["/widgets".to_string()]);
    assert_eq!(
        adapter.operations("/widgets")?,
        vec!["get".to_string(), "post".to_string()]
    );
    assert_eq!(
        adapter.query_parameters("/widgets", "get")?,
        vec![
            json!({"name": "limit", "in": "query", "type": "integer"}),
            json!({"name": "offset", "in": "query", "type": "integer"}),
        ]
    );
    assert!(adapter.has_payload("/widgets", "post")?);
    assert_eq!(
        adapter.body_parameters("/widgets", "post")?[0]["schema"]["properties"]["id"],
        json!({"type": "string"})
    );

    // Three refs into the same external document, one fetch each.
    assert_eq!(server.hits("/api/swagger.json"), 1);
    assert_eq!(server.hits("/api/common/params.yaml"), 1);

    assert_eq!(
        server.last_header("/api/common/params.yaml", "authorization"),
        Some("Bearer token".to_string())
    );
    assert_eq!(
        server.last_header("/api/swagger.json", "user-agent"),
        Some(opensqli_spec::config::USER_AGENT.to_string())
    );
    Ok(())
}

#[test]
fn later_header_wins_over_differently_cased_earlier_one() -> anyhow::Result<()> {
    let server = DocumentServer::start(vec![ServedDocument::json(
        "/spec.json",
        r#"{"openapi": "3.0.0"}"#,
    )])?;
    let config = LoaderConfig::default()
        .with_header("authorization", "Bearer file")
        .with_header("Authorization", "Bearer cli");
    let loader = DocumentLoader::http(&config)?;

    loader.load(&server.url("/spec.json"))?;
    assert_eq!(
        server.last_header("/spec.json", "authorization"),
        Some("Bearer cli".to_string())
    );
    Ok(())
}

#[test]
fn yaml_media_type_selects_yaml_decoder() -> anyhow::Result<()> {
    let server = DocumentServer::start(vec![ServedDocument::new(
        "/openapi",
        Some("application/x-yaml; charset=utf-8"),
        "openapi: 3.0.0\nservers:\n  - url: /api/v3/\npaths:\n  /pets:\n    post:\n      requestBody:\n        content:\n          application/json: {}\n",
    )])?;

    let loader = DocumentLoader::http(&LoaderConfig::default())?;
    let adapter = SpecAdapter::load(&server.url("/openapi"), &loader)?;

    assert_eq!(adapter.version(), SpecVersion::OpenApi3);
    assert_eq!(
        adapter.server_urls()?,
        vec![server.url("/api/v3").to_string()]
    );
    assert_eq!(
        adapter.payload_mimes("/pets", "post")?,
        vec!["application/json".to_string()]
    );
    Ok(())
}

#[test]
fn loading_the_same_url_twice_fetches_once() -> anyhow::Result<()> {
    let server = DocumentServer::start(vec![ServedDocument::json(
        "/spec.json",
        r#"{"openapi": "3.0.0"}"#,
    )])?;
    let loader = DocumentLoader::http(&LoaderConfig::default())?;
    let url = server.url("/spec.json");

    let first = loader.load(&url)?;
    let second = loader.load(&url)?;
    assert_eq!(first, second);
    assert_eq!(server.hits("/spec.json"), 1);
    Ok(())
}

#[test]
fn non_success_status_is_a_transport_error() -> anyhow::Result<()> {
    let server = DocumentServer::start(vec![
        ServedDocument::json("/private.json", "{}").with_status(401),
        ServedDocument::json(
            "/root.json",
            r##"{"swagger": "2.0", "paths": {"/a": {"$ref": "missing.json#/A"}}}"##,
        ),
    ])?;
    let loader = DocumentLoader::http(&LoaderConfig::default())?;

    let err = SpecAdapter::load(&server.url("/private.json"), &loader).unwrap_err();
    assert!(
        matches!(&err, SpecError::Transport { message, .. } if message.contains("401")),
        "unexpected error: {err}"
    );

    // A failing external document aborts the whole load.
    let err = SpecAdapter::load(&server.url("/root.json"), &loader).unwrap_err();
    assert!(
        matches!(&err, SpecError::Transport { url, .. } if url.ends_with("/missing.json")),
        "unexpected error: {err}"
    );
    Ok(())
}

#[test]
fn malformed_json_is_a_decode_error() -> anyhow::Result<()> {
    let server = DocumentServer::start(vec![ServedDocument::json("/bad.json", "{\"swagger\": ")])?;
    let loader = DocumentLoader::http(&LoaderConfig::default())?;

    let err = loader.load(&server.url("/bad.json")).unwrap_err();
    assert!(matches!(err, SpecError::Decode { .. }), "unexpected error: {err}");
    Ok(())
}

#[test]
fn unreachable_host_is_a_transport_error() -> anyhow::Result<()> {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let loader = DocumentLoader::http(&LoaderConfig::default())?;
    let url = url::Url::parse(&format!("http://127.0.0.1:{port}/spec.json"))?;

    let err = loader.load(&url).unwrap_err();
    assert!(matches!(err, SpecError::Transport { .. }), "unexpected error: {err}");
    Ok(())
}
