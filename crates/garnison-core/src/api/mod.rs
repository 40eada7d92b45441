//! REST client for the training center's Strapi backend.
//!
//! `ApiClient` reads collections (normalized into `models`), logs in through
//! the local auth provider, submits remark batches and downloads uploaded
//! files for reports. Requests carry the session's JWT as a bearer token.

pub mod client;
pub mod error;

pub use client::{validate_batch, ApiClient, BatchReport};
pub use error::{ApiError, BatchError};
