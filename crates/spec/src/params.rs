//! Parameter identity and the path/operation inheritance rule.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs that may appear as keys of a Path Item Object.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "head", "post", "put", "patch", "delete", "options", "trace",
];

/// Where a parameter is carried on the wire (`in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    FormData,
}

impl ParamLocation {
    pub const ALL: [ParamLocation; 6] = [
        ParamLocation::Path,
        ParamLocation::Query,
        ParamLocation::Header,
        ParamLocation::Cookie,
        ParamLocation::Body,
        ParamLocation::FormData,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
            ParamLocation::Body => "body",
            ParamLocation::FormData => "formData",
        }
    }

    /// Whether `param` declares this location.
    #[must_use]
    pub fn matches(self, param: &Value) -> bool {
        param.get("in").and_then(Value::as_str) == Some(self.as_str())
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamLocation::ALL
            .into_iter()
            .find(|loc| loc.as_str() == s)
            .ok_or_else(|| format!("unknown parameter location '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    name: Option<String>,
    loc: Option<String>,
}

fn key_for(param: &Value) -> Key {
    let field = |f: &str| param.get(f).and_then(Value::as_str).map(str::to_string);
    Key {
        name: field("name"),
        loc: field("in"),
    }
}

/// Merge operation-level parameters over path-level ones.
///
/// Entries are identified by `(name, in)`. An override replaces the default with the same key in
/// place; new keys are appended in override order. Defaults are never dropped.
#[must_use]
pub fn merge_parameters(defaults: &[Value], overrides: &[Value]) -> Vec<Value> {
    let mut merged: Vec<Value> = Vec::with_capacity(defaults.len() + overrides.len());
    let mut index: HashMap<Key, usize> = HashMap::new();

    for param in defaults.iter().chain(overrides) {
        let k = key_for(param);
        if let Some(i) = index.get(&k).copied() {
            merged[i] = param.clone();
        } else {
            index.insert(k, merged.len());
            merged.push(param.clone());
        }
    }

    merged
}
