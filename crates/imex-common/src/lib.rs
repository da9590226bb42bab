//! imex Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging setup for the imex workspace.
//!
//! - **Error Handling**: [`ImexError`] and the [`Result`] alias used by
//!   configuration code across crates
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//!
//! # Example
//!
//! ```no_run
//! use imex_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> imex_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{ImexError, Result};
