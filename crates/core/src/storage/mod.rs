//! Storage for uploaded document originals, backed by Apache OpenDAL.
//!
//! Confirmed invoices and settlements keep their source scans so the numbers
//! in the books can always be traced back to a document. The store is
//! vendor-agnostic: local filesystem for development, any S3-compatible
//! bucket in production.

mod error;
mod store;

pub use error::StorageError;
pub use store::DocumentStore;
