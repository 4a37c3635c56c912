pub mod client;
pub mod common;
pub mod runner;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::NbqError;
pub type Result<T> = std::result::Result<T, Error>;

/// Extension of notebooks produced by the notebook execution tool.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

pub const NBQ_VERSION: &str = env!("CARGO_PKG_VERSION");
