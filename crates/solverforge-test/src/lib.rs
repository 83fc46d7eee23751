//! Shared test fixtures for SolverForge interop crates.
//!
//! - [`translator`] - a [`Translator`](solverforge_interop::Translator) that records units
//! - [`function`] - native functions assembled from real bytecode
//! - [`class`] - native class fixtures
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! solverforge-test = { workspace = true }
//! ```
//!
//! Then import the fixtures you need:
//!
//! ```ignore
//! use solverforge_test::{bridge, FunctionBuilder, RecordingTranslator};
//! ```

use std::sync::Arc;

use solverforge_config::BridgeConfig;
use solverforge_interop::Bridge;

pub mod class;
pub mod function;
pub mod translator;

pub use class::{empty_class, point, point_class};
pub use function::{module_scope, FunctionBuilder};
pub use translator::RecordingTranslator;

/// A bridge with default configuration over `translator`.
pub fn bridge(translator: &Arc<RecordingTranslator>) -> Bridge {
    match Bridge::new(BridgeConfig::default(), translator.clone()) {
        Ok(bridge) => bridge,
        Err(err) => panic!("default configuration rejected: {err}"),
    }
}
