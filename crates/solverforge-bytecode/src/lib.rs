//! SolverForge Bytecode - reading interpreter code objects
//!
//! This crate turns the raw code representation of a source-interpreter
//! callable into version-agnostic data:
//! - [`InstructionExtractor`] decodes the instruction stream of a code object
//! - [`exception_table`] decodes and encodes the variable-length exception table
//! - [`CodeAssembler`] builds raw code objects (used by fixtures and tests)
//!
//! Offsets on [`Instruction`] are instruction indices, never raw byte offsets,
//! so downstream consumers do not care which bytecode dialect produced them.

pub mod assembler;
pub mod code;
pub mod error;
pub mod exception_table;
pub mod extractor;
pub mod instruction;
pub mod opcode;
pub mod version;

pub use assembler::CodeAssembler;
pub use code::{LineStart, RawCode};
pub use error::{BytecodeError, Result};
pub use exception_table::ExceptionRange;
pub use extractor::{Dialect, InstructionExtractor, INSTRUCTION_WIDTH};
pub use instruction::Instruction;
pub use opcode::{JumpKind, OpcodeInfo, OpcodeTag};
pub use version::{RuntimeVersion, VersionWindow};
