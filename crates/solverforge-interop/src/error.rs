//! Error types for the interop bridge

use std::fmt;

use thiserror::Error;

use solverforge_bytecode::BytecodeError;

/// Main error type for bridge operations.
#[derive(Debug, Error)]
pub enum InteropError {
    /// The running interpreter is outside the supported version window.
    ///
    /// Raised once, when the translation context is created.
    #[error("Unsupported interpreter: {0}")]
    UnsupportedVersion(#[source] BytecodeError),

    /// A code object could not be read.
    #[error("Bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),

    /// A value has no representation on the other side.
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The foreign compiler rejected a unit outside a top-level translation.
    #[error("Foreign compilation error: {0}")]
    ForeignCompilation(#[from] ForeignCompilationError),

    /// A top-level function or class translation failed.
    #[error("Failed to translate '{name}': {native}; foreign compiler reported: {foreign}")]
    Translation {
        name: String,
        native: String,
        foreign: ForeignCompilationError,
    },

    /// Invalid operation for the current bridge state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl InteropError {
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, InteropError::UnsupportedVersion(_))
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, InteropError>;

/// A value with no mapping on the target side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// No conversion rule applies and the caller did not supply a default.
    #[error("No native representation for foreign value of type '{type_name}'")]
    NoNativeMapping { type_name: String },

    /// Integer text that is not valid hexadecimal.
    #[error("Invalid integer text '{0}'")]
    InvalidInteger(String),

    /// A foreign value whose parts do not fit its kind.
    #[error("Malformed foreign {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// Failure reported by the external [`crate::Translator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{unit}: {message}")]
pub struct ForeignCompilationError {
    /// Qualified name of the unit being compiled.
    pub unit: String,
    pub message: String,
    /// Raw diagnostics from the foreign compiler.
    pub diagnostics: Vec<String>,
}

impl ForeignCompilationError {
    pub fn new(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            message: message.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostics.push(diagnostic.into());
        self
    }
}

/// Why a class was wrapped opaquely instead of translated structurally.
///
/// Not an error: the decision is recorded on the class descriptor and is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The class is an abstract-base marker type.
    AbstractBase,
    /// The class is defined in a bridge or bootstrap module.
    BridgeModule(String),
    /// The class is a native array type.
    NativeArray,
    /// The class already belongs to the foreign runtime.
    AlreadyForeign(String),
    /// A superclass could not be translated structurally.
    OpaqueSuperclass(String),
    /// A method body could not be built.
    MethodFailed { method: String, reason: String },
    /// The foreign compiler rejected the class.
    CompilationFailed(ForeignCompilationError),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::AbstractBase => write!(f, "abstract base marker"),
            FallbackReason::BridgeModule(module) => write!(f, "defined in bridge module '{module}'"),
            FallbackReason::NativeArray => write!(f, "native array type"),
            FallbackReason::AlreadyForeign(name) => write!(f, "already foreign ({name})"),
            FallbackReason::OpaqueSuperclass(name) => write!(f, "superclass '{name}' is opaque"),
            FallbackReason::MethodFailed { method, reason } => {
                write!(f, "method '{method}' failed: {reason}")
            }
            FallbackReason::CompilationFailed(err) => write!(f, "compilation failed: {err}"),
        }
    }
}
