//! Builder for raw code objects.
//!
//! Produces byte-exact code in the dialect of a given interpreter version:
//! operands wider than a byte get `EXTENDED_ARG` prefixes and, in the
//! caches-shown dialect, each instruction is followed by its cache words.

use crate::code::{LineStart, RawCode};
use crate::error::{BytecodeError, Result};
use crate::exception_table::{self, ExceptionRange};
use crate::extractor::{Dialect, INSTRUCTION_WIDTH};
use crate::opcode::{CACHE, EXTENDED_ARG};
use crate::version::RuntimeVersion;

/// Incrementally assembles a [`RawCode`].
#[derive(Debug, Clone)]
pub struct CodeAssembler {
    dialect: Dialect,
    name: String,
    bytes: Vec<u8>,
    exception_table: Vec<u8>,
    line_starts: Vec<LineStart>,
    pending_line: Option<u32>,
}

impl CodeAssembler {
    /// Creates an assembler using the dialect of `version`.
    ///
    /// Versions newer than any known dialect use the caches-shown layout;
    /// older ones use the simple layout.
    pub fn new(version: RuntimeVersion, name: impl Into<String>) -> Self {
        let dialect = Dialect::for_version(version).unwrap_or(if version > RuntimeVersion::PY_3_11 {
            Dialect::CachesShown
        } else {
            Dialect::Simple
        });
        Self {
            dialect,
            name: name.into(),
            bytes: Vec::new(),
            exception_table: Vec::new(),
            line_starts: Vec::new(),
            pending_line: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Index the next emitted word will occupy.
    pub fn position(&self) -> u32 {
        self.bytes.len() as u32 / INSTRUCTION_WIDTH
    }

    /// Marks the next emitted instruction as the start of `line`.
    pub fn line(mut self, line: u32) -> Self {
        self.pending_line = Some(line);
        self
    }

    /// Emits `name` with operand `arg`, plus prefixes and cache words.
    pub fn emit(mut self, name: &str, arg: u32) -> Result<Self> {
        let table = self.dialect.table();
        let info = *table
            .by_name(name)
            .ok_or_else(|| BytecodeError::UndefinedOpcode {
                name: name.to_string(),
                dialect: table.name(),
            })?;

        if let Some(line) = self.pending_line.take() {
            self.line_starts.push(LineStart {
                byte_offset: self.bytes.len() as u32,
                line,
            });
        }

        for shift in [24u32, 16, 8] {
            if arg >> shift != 0 {
                self.bytes.push(EXTENDED_ARG);
                self.bytes.push((arg >> shift) as u8);
            }
        }
        self.bytes.push(info.tag.code);
        self.bytes.push(arg as u8);
        for _ in 0..info.caches {
            self.bytes.push(CACHE);
            self.bytes.push(0);
        }
        Ok(self)
    }

    /// Adds an exception range, given in instruction indices with an inclusive end.
    pub fn protect(
        mut self,
        start: u32,
        end: u32,
        target: u32,
        stack_depth: u32,
        push_last_instr: bool,
    ) -> Result<Self> {
        let range = ExceptionRange::new(
            start * INSTRUCTION_WIDTH,
            end * INSTRUCTION_WIDTH,
            target * INSTRUCTION_WIDTH,
            stack_depth,
            push_last_instr,
        );
        let encoded = exception_table::encode(&[range])?;
        self.exception_table.extend_from_slice(&encoded);
        Ok(self)
    }

    pub fn finish(self) -> RawCode {
        RawCode {
            name: self.name,
            bytes: self.bytes,
            exception_table: self.exception_table,
            line_starts: self.line_starts,
        }
    }
}
