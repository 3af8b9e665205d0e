//! Read side of the index: point lookups and keyset pagination over the store.

mod error;
pub use error::QueryError;

mod service;
pub use service::QueryService;
