pub mod config;
pub mod errors;

pub use config::{AppPaths, ProviderKind, Settings};
pub use errors::RagError;
