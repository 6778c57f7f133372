//! # alm-rag
//!
//! RAG index lifecycle and retrieval context for the Ansible log monitor.
//!
//! A build job (outside this crate) publishes three artifacts to a bucket:
//! `LATEST.json` (the build pointer), `index.usearch` and `metadata.json`.
//! [`RagIndexLoader`] gates on the pointer, downloads and validates the
//! artifacts, and swaps in an immutable [`IndexBundle`]. [`ContextBuilder`]
//! turns a query embedding into prompt context from whatever bundle is
//! currently served.
//!
//! ## Errors
//! All failures are classified into [`RagError`]; only
//! [`RagIndexLoader::check_ready`] degrades errors to `false`.

pub mod bundle;
pub mod context;
pub mod error;
pub mod index;
pub mod loader;
pub mod pointer;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use bundle::{BundleMetadata, IndexBundle};
pub use context::{
    format_context, retrieve_from_bundle, truncate_message, ContextBuilder, RetrievedRecord,
    CONTEXT_DIVIDER, MAX_RECORD_MESSAGE_CHARS, TRUNCATION_MARKER,
};
pub use error::RagError;
pub use index::{IndexParams, Neighbor, NeighborIndex, UsearchIndex};
pub use loader::{LoaderConfig, LoaderState, RagIndexLoader};
pub use pointer::{BuildPointer, INDEX_KEY, METADATA_KEY, POINTER_KEY};
pub use store::{store_from_settings, LocalObjectStore, ObjectStore, S3Config, S3ObjectStore, StoreError};
