//! Storage adapters for bucket-editor
//!
//! Two external collaborators sit behind traits here:
//! - [`BlobStore`] - key-addressed text blobs (the "bucket")
//! - [`SecretStore`] - small named values, used for the API token
//!
//! Implementations:
//! - `MemoryBlobStore` / `MemorySecretStore` - in-process, for tests and embedding
//! - `FsBlobStore` - one file per key under a root directory
//! - `EnvSecretStore` / `FileSecretStore` - secrets from the environment or a directory

mod blob;
mod error;
mod fs_blob;
mod key;
mod secret;

pub use blob::{BlobStore, MemoryBlobStore};
pub use error::{Result, StoreError};
pub use fs_blob::FsBlobStore;
pub use key::validate_key;
pub use secret::{EnvSecretStore, FileSecretStore, MemorySecretStore, SecretStore};
