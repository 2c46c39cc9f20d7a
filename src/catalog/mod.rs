//! Reference catalog of examinations and consultation rooms
//!
//! Catalog entries are the immutable subjects waiting records attach to. The
//! store owns one catalog per record kind and resolves record subjects through
//! the [`SubjectResolver`] capability.

pub mod entry;
pub mod registry;

// Re-export commonly used types
pub use entry::{CatalogEntry, SubjectResolver};
pub use registry::Catalog;
