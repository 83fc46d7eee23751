//! SolverForge Interop - cross-runtime bridge for user callables and data
//!
//! This crate moves user code and object graphs from the source interpreter
//! into the foreign runtime:
//! - [`CompiledUnitBuilder`] packages a function or class into a compiled unit
//!   (instructions, exception table, constants, globals, type hints)
//! - [`TypeHintResolver`] maps annotations to foreign type hints
//! - [`marshal`] converts object graphs in both directions, preserving identity
//!   and cycles
//! - [`TranslationContext`] caches class descriptors, function handles and
//!   per-scope globals so each is translated once
//! - [`Bridge`] is the facade hosts embed
//!
//! The foreign compiler itself sits behind the [`Translator`] trait.

pub mod bridge;
pub mod builder;
pub mod console;
pub mod context;
pub mod error;
pub mod foreign;
pub mod hints;
pub mod identity;
pub mod marshal;
pub mod native;
pub mod translator;
pub mod unit;

pub use bridge::Bridge;
pub use builder::{identifier_list, sanitize_identifier, CompiledUnitBuilder};
pub use context::TranslationContext;
pub use error::{
    ConversionError, FallbackReason, ForeignCompilationError, InteropError, Result,
};
pub use foreign::{ForeignRef, ForeignType, ForeignValue};
pub use hints::{ParameterKind, TypeHint, TypeHintResolver};
pub use identity::ObjectId;
pub use marshal::{Fallback, IdentityMemo};
pub use native::{Annotation, BuiltinType, NativeClass, NativeRef, NativeValue};
pub use translator::{CompiledArtifact, ForeignClassDefinition, TargetShape, Translator};
pub use unit::{CompiledClassUnit, CompiledFunctionUnit, GlobalsMap};

pub use solverforge_bytecode::RuntimeVersion;
pub use solverforge_config::BridgeConfig;
