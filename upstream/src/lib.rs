pub mod catalog;
pub mod config;
pub mod errors;
pub mod fanout;
pub mod generate;
pub mod metrics_defs;

#[cfg(test)]
mod testutils;

pub use catalog::CatalogClient;
pub use config::{DispatchConfig, GenerativeConfig, SyncConfig};
pub use errors::{CatalogError, DispatchError, GenerateError};
pub use fanout::{DispatchResult, Dispatcher, RequestPayload};
pub use generate::GenerativeClient;
