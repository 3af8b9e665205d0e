//! JSON-RPC interface of unitscan.
//!
//! Exposes the query and search layers under the `explorer` namespace. Point lookups that find
//! nothing fail with [`RpcError::NotFound`]; list lookups return empty lists.

mod api;
#[cfg(test)]
pub(crate) use api::ExplorerApiClient;
pub use api::ExplorerApiServer;

mod error;
pub use error::RpcError;

mod server;
pub use server::ExplorerRpc;
