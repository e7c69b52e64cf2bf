//! Client for the bobyak backend, called through the same-origin proxy.

pub mod client;
pub mod credentials;
pub mod error;
pub mod models;

pub use client::{ApiClient, RequestBody, RequestOptions};
pub use credentials::{CredentialError, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::ApiError;
