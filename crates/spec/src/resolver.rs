//! `$ref` resolver.
//!
//! Supports local refs (`#/...`), relative refs (`./common.yaml#/...`) and absolute URL refs
//! (`https://example.com/common.yaml#/...`).
//!
//! Key detail: resolution is **relative to the document that contains the `$ref`**, so callers
//! always pass the [`SourceDocument`] the reference was found in.

use crate::error::{Result, SpecError};
use crate::loader::DocumentLoader;
use crate::pointer::{PointerError, lookup, split_reference};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// A decoded document together with the URL it was loaded from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub url: Url,
    pub root: Arc<Value>,
}

impl SourceDocument {
    /// Load `url` through `loader`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or decoded.
    pub fn load(url: &Url, loader: &DocumentLoader) -> Result<Self> {
        let mut url = url.clone();
        url.set_fragment(None);
        let root = loader.load(&url)?;
        Ok(Self { url, root })
    }

    /// Identity of the value at `pointer` in this document (`url#pointer`).
    #[must_use]
    pub fn key_for(&self, pointer: &str) -> String {
        format!("{}#{pointer}", self.url)
    }
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// Document that holds the target; further refs inside `value` are relative to it.
    pub document: SourceDocument,
    pub pointer: String,
    /// The referenced subtree, still possibly containing `$ref`s.
    pub value: Value,
}

impl ResolvedReference {
    /// Identity of the resolved target (`url#pointer`).
    #[must_use]
    pub fn key(&self) -> String {
        self.document.key_for(&self.pointer)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    loader: &'a DocumentLoader,
}

impl<'a> ReferenceResolver<'a> {
    #[must_use]
    pub fn new(loader: &'a DocumentLoader) -> Self {
        Self { loader }
    }

    #[must_use]
    pub fn loader(&self) -> &'a DocumentLoader {
        self.loader
    }

    /// Resolve `reference` found in `current`.
    ///
    /// Does not expand references nested in the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the target document cannot be loaded, if the pointer is malformed or if
    /// it does not exist in the document.
    pub fn resolve(&self, reference: &str, current: &SourceDocument) -> Result<ResolvedReference> {
        tracing::debug!("Resolving reference {} (in {})", reference, current.url);
        let document = self.target_document(reference, current)?;
        let (_, pointer) = split_reference(reference);

        let value = lookup(&document.root, pointer)
            .map_err(|e| match e {
                PointerError::Malformed => SpecError::InvalidReference {
                    reference: reference.to_string(),
                    message: format!("pointer '{pointer}' must start with '/'"),
                },
                PointerError::Missing(token) => SpecError::DanglingReference {
                    reference: reference.to_string(),
                    document: document.url.to_string(),
                    token,
                },
            })?
            .clone();

        Ok(ResolvedReference {
            document,
            pointer: pointer.to_string(),
            value,
        })
    }

    /// Identity (`url#pointer`) of the target of `reference`, without loading anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the document locator cannot be joined against `current`.
    pub fn target_key(&self, reference: &str, current: &SourceDocument) -> Result<String> {
        let (locator, pointer) = split_reference(reference);
        let url = Self::target_url(reference, locator, current)?;
        Ok(format!("{url}#{pointer}"))
    }

    fn target_document(&self, reference: &str, current: &SourceDocument) -> Result<SourceDocument> {
        let (locator, _) = split_reference(reference);
        if locator.is_empty() {
            return Ok(current.clone());
        }
        let url = Self::target_url(reference, locator, current)?;
        SourceDocument::load(&url, self.loader)
    }

    fn target_url(reference: &str, locator: &str, current: &SourceDocument) -> Result<Url> {
        if locator.is_empty() {
            return Ok(current.url.clone());
        }
        let mut url = current
            .url
            .join(locator)
            .map_err(|e| SpecError::InvalidReference {
                reference: reference.to_string(),
                message: format!("cannot resolve '{locator}' against {}: {e}", current.url),
            })?;
        url.set_fragment(None);
        Ok(url)
    }
}
