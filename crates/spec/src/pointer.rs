//! JSON Pointer helpers for `$ref` strings.

use serde_json::Value;

/// Escape a raw key for use as a pointer token (`~` -> `~0`, `/` -> `~1`).
#[must_use]
pub fn escape_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape_token`]. `~1` is replaced first so `~01` decodes to `~1`.
#[must_use]
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a reference into its document locator and its pointer on the first `#`.
///
/// A reference without `#` addresses the whole document (empty pointer).
#[must_use]
pub fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

/// Build a local reference (`#/k1/k2`) to the value reached by following `keys`.
#[must_use]
pub fn pointer_to<I, S>(keys: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::from("#");
    for key in keys {
        out.push('/');
        out.push_str(&escape_token(key.as_ref()));
    }
    out
}

/// Why a pointer could not be followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    /// Non-empty pointer that does not start with `/`.
    Malformed,
    /// Unescaped token absent from the value reached so far.
    Missing(String),
}

/// Follow `pointer` from `doc`.
///
/// # Errors
///
/// Returns [`PointerError::Malformed`] for a pointer without a leading `/`, or
/// [`PointerError::Missing`] with the token that could not be found.
pub fn lookup<'a>(doc: &'a Value, pointer: &str) -> Result<&'a Value, PointerError> {
    if pointer.is_empty() {
        return Ok(doc);
    }
    let Some(tokens) = pointer.strip_prefix('/') else {
        return Err(PointerError::Malformed);
    };

    let mut current = doc;
    for raw in tokens.split('/') {
        let token = unescape_token(raw);
        let next = match current {
            Value::Object(map) => map.get(&token),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or(PointerError::Missing(token))?;
    }
    Ok(current)
}
