//! Error types for bytecode extraction

use thiserror::Error;

use crate::version::{RuntimeVersion, VersionWindow};

/// Errors raised while reading or writing code objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    /// The running interpreter is outside the supported version window.
    #[error("Unsupported interpreter version {found}; supported versions are {window}")]
    UnsupportedVersion {
        found: RuntimeVersion,
        window: VersionWindow,
    },

    /// The instruction stream of a code object could not be decoded.
    #[error("Malformed bytecode in '{code}': {reason}")]
    Malformed { code: String, reason: String },

    /// An opcode byte has no entry in the dialect's opcode table.
    #[error("Unknown opcode {opcode} at offset {offset} in '{code}'")]
    UnknownOpcode {
        code: String,
        opcode: u8,
        offset: u32,
    },

    /// No bytecode dialect accepted the running interpreter version.
    #[error("No bytecode dialect accepts interpreter version {0}")]
    NoDialect(RuntimeVersion),

    /// An exception range violates the table invariants.
    #[error("Invalid exception range: {0}")]
    InvalidRange(String),

    /// The assembler was asked for an opcode the dialect does not define.
    #[error("Opcode '{name}' is not defined for {dialect}")]
    UndefinedOpcode { name: String, dialect: &'static str },
}

/// Result type alias for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
