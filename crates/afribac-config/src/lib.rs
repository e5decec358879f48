//! # Afribac Configuration
//!
//! Configuration for the AI command service.
//!
//! - [`AiConfig`]: server, provider and command settings, loaded from defaults,
//!   an optional TOML file and environment variables (in that order)
//! - [`resolve_model`]: the provider/model decision table applied to every
//!   command request
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use afribac_config::{resolve_model, AiConfig, ModelRequest};
//!
//! let config = AiConfig::load(None)?;
//! let resolved = resolve_model(
//!     &ModelRequest::default(),
//!     config.key_availability(),
//!     &config.model_defaults(),
//! )?;
//! println!("{} / {}", resolved.provider, resolved.model);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod loader;
mod resolver;

pub use config::*;
pub use loader::*;
pub use resolver::*;
