pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod market;
pub mod registry;

pub use config::Config;
pub use database::connect;
pub use error::{Error, Result};
pub use registry::{SymbolRegistry, TokenRegistry};
