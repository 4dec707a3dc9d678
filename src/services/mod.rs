//! Service layer for business logic operations.
//!
//! Services own the read-through caching for their data and the
//! invalidation that follows writes to the system of record.

mod catalog;

pub use catalog::{CatalogService, CatalogSource};
