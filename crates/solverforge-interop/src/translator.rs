//! Interface to the external foreign compiler.

use std::fmt;

use crate::error::ForeignCompilationError;
use crate::foreign::ForeignType;
use crate::unit::{CompiledClassUnit, CompiledFunctionUnit};

/// The foreign interface a translated callable must implement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetShape {
    /// Foreign interface name.
    pub interface: String,
    /// Fixed parameter count, or `None` for a variadic interface.
    pub arity: Option<usize>,
}

impl TargetShape {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            arity: None,
        }
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }
}

impl fmt::Display for TargetShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(arity) => write!(f, "{}/{}", self.interface, arity),
            None => f.write_str(&self.interface),
        }
    }
}

/// Result of translating a function unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Binary name of the generated foreign class.
    pub class_name: String,
    pub shape: TargetShape,
    pub generic_args: Vec<ForeignType>,
}

/// Result of compiling a class unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignClassDefinition {
    /// Binary name of the generated foreign class.
    pub binary_name: String,
}

/// The foreign compiler.
///
/// Implementations receive fully built units and never call back into the
/// bridge's caches. The bridge guarantees that a class or (callable, shape,
/// generic arguments) triple is handed over at most once per successful
/// translation.
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        unit: &CompiledFunctionUnit,
        shape: &TargetShape,
        generic_args: &[ForeignType],
    ) -> Result<CompiledArtifact, ForeignCompilationError>;

    fn compile_class(
        &self,
        unit: &CompiledClassUnit,
    ) -> Result<ForeignClassDefinition, ForeignCompilationError>;
}
