//! Swagger 2.0 / OpenAPI 3.x description loading for opensqli.
//!
//! Given the URL of an API description, this crate fetches it (and every document it references),
//! replaces all `$ref` nodes with what they point at, folds path-level parameters into operations
//! and exposes one query surface for both specification versions:
//!
//! ```no_run
//! use opensqli_spec::{ApiDescription, LoaderConfig, SpecAdapter};
//!
//! let spec = SpecAdapter::from_location(
//!     "https://petstore.swagger.io/v2/swagger.json",
//!     &LoaderConfig::default(),
//! )?;
//! for path in spec.paths() {
//!     for op in spec.operations(&path)? {
//!         println!("{} {path}: {:?}", op.to_uppercase(), spec.query_parameters(&path, &op)?);
//!     }
//! }
//! # Ok::<(), opensqli_spec::SpecError>(())
//! ```
//!
//! It intentionally contains **no** request generation or testing logic.

pub mod adapter;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod openapi3;
pub mod params;
pub mod pointer;
pub mod resolver;
pub mod swagger2;

pub use adapter::{ApiDescription, SpecAdapter, SpecVersion};
pub use config::LoaderConfig;
pub use error::{Result, SpecError};
pub use loader::{DocumentFormat, DocumentLoader, HttpTransport, MemoryTransport, Transport};
pub use params::ParamLocation;
