use anyhow::Context as _;
use opensqli_spec::config::{USER_AGENT, parse_header};
use opensqli_spec::{DocumentFormat, LoaderConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Headers sent with every document fetch.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CliConfig {
    /// Combine the file settings with `--header` values (which win, whatever their case).
    pub fn into_loader_config(self, cli_headers: &[String]) -> anyhow::Result<LoaderConfig> {
        let mut loader = LoaderConfig {
            user_agent: self.user_agent.unwrap_or_else(|| USER_AGENT.to_string()),
            ..LoaderConfig::default()
        };
        for (name, value) in self.headers {
            loader.set_header(name, value);
        }
        for raw in cli_headers {
            let (name, value) = parse_header(raw)?;
            loader.set_header(name, value);
        }
        Ok(loader)
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let base = if let Ok(v) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(v)
    } else {
        let home = std::env::var("HOME").context("HOME is not set")?;
        PathBuf::from(home).join(".config")
    };
    Ok(base.join("opensqli").join("config.json"))
}

/// Read a config file, decoded like a spec document with the same name would be (YAML for
/// `.yaml`/`.yml`, JSON otherwise). A missing file yields the defaults.
pub fn load_config(path: &Path) -> anyhow::Result<CliConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CliConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    let format = DocumentFormat::for_path(&path.to_string_lossy());
    let value = format
        .parse(&text)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("parse {} as {format}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("read settings from {}", path.display()))
}
