//! Instruction extraction across bytecode dialects.
//!
//! Two dialects are understood:
//!
//! - **Caches-shown**: inline cache words follow some instructions and are
//!   reported as `CACHE` instructions; jumps are relative.
//! - **Simple**: no inline caches; conditional jumps are absolute.
//!
//! The extractor does not ask the caller which dialect to use. It tries the
//! caches-shown decoder first and falls back to the simple decoder when the
//! first one reports a dialect mismatch.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::code::RawCode;
use crate::error::{BytecodeError, Result};
use crate::exception_table;
use crate::instruction::Instruction;
use crate::opcode::{self, JumpKind, OpcodeTable, EXTENDED_ARG, HAVE_ARGUMENT};
use crate::version::{RuntimeVersion, VersionWindow};

/// Width in bytes of one instruction word.
pub const INSTRUCTION_WIDTH: u32 = 2;

/// A bytecode layout understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    CachesShown,
    Simple,
}

/// Signal that a dialect does not apply to the running interpreter.
#[derive(Debug)]
struct DialectMismatch {
    dialect: Dialect,
    version: RuntimeVersion,
}

impl Dialect {
    /// Order in which dialects are attempted.
    pub const CANDIDATES: [Dialect; 2] = [Dialect::CachesShown, Dialect::Simple];

    pub fn table(self) -> &'static OpcodeTable {
        match self {
            Dialect::CachesShown => opcode::caches_shown_table(),
            Dialect::Simple => opcode::simple_table(),
        }
    }

    pub fn shows_caches(self) -> bool {
        matches!(self, Dialect::CachesShown)
    }

    pub fn accepts(self, version: RuntimeVersion) -> bool {
        match self {
            Dialect::CachesShown => version >= RuntimeVersion::PY_3_11,
            Dialect::Simple => version <= RuntimeVersion::PY_3_10,
        }
    }

    /// Picks the dialect for `version` the same way extraction does.
    pub fn for_version(version: RuntimeVersion) -> Option<Dialect> {
        Self::CANDIDATES.into_iter().find(|d| d.accepts(version))
    }

    fn decode(
        self,
        version: RuntimeVersion,
        code: &RawCode,
    ) -> std::result::Result<Result<Vec<Instruction>>, DialectMismatch> {
        if !self.accepts(version) {
            return Err(DialectMismatch {
                dialect: self,
                version,
            });
        }
        Ok(decode_words(self, code))
    }
}

fn malformed(code: &RawCode, reason: impl Into<String>) -> BytecodeError {
    BytecodeError::Malformed {
        code: code.name.clone(),
        reason: reason.into(),
    }
}

fn decode_words(dialect: Dialect, code: &RawCode) -> Result<Vec<Instruction>> {
    if code.bytes.len() % INSTRUCTION_WIDTH as usize != 0 {
        return Err(malformed(code, "odd number of code bytes"));
    }

    let table = dialect.table();
    let word_count = code.word_count();
    let lines: HashMap<u32, u32> = code
        .line_starts
        .iter()
        .map(|ls| (ls.byte_offset, ls.line))
        .collect();

    let mut instructions = Vec::with_capacity(word_count);
    let mut extended: i64 = 0;

    for (index, word) in code.bytes.chunks_exact(2).enumerate() {
        let (op, arg) = (word[0], word[1]);
        let offset = index as u32;
        let info = table.get(op).ok_or_else(|| BytecodeError::UnknownOpcode {
            code: code.name.clone(),
            opcode: op,
            offset,
        })?;

        let full_arg = extended | i64::from(arg);
        extended = if op == EXTENDED_ARG { full_arg << 8 } else { 0 };

        let next = offset + 1 + u32::from(info.caches);
        let jump_target = match info.jump {
            JumpKind::None => None,
            jump => {
                let delta = u32::try_from(full_arg).map_err(|_| {
                    malformed(code, format!("jump argument {full_arg} at {offset} is out of range"))
                })?;
                let target = match jump {
                    JumpKind::Absolute => Some(delta),
                    JumpKind::Forward => next.checked_add(delta),
                    _ => next.checked_sub(delta),
                };
                Some(target.ok_or_else(|| {
                    malformed(code, format!("jump at {offset} leaves the code object"))
                })?)
            }
        };
        if let Some(target) = jump_target {
            if target as usize >= word_count {
                return Err(malformed(
                    code,
                    format!("jump at {offset} targets {target}, past the last instruction"),
                ));
            }
        }

        instructions.push(Instruction {
            offset,
            opcode: info.tag,
            operand: (op >= HAVE_ARGUMENT).then_some(full_arg),
            jump_target,
            is_jump_target: false,
            starts_line: lines.get(&(offset * INSTRUCTION_WIDTH)).copied(),
        });
    }

    let mut targets: HashSet<u32> = instructions.iter().filter_map(|i| i.jump_target).collect();
    if dialect.shows_caches() && !code.exception_table.is_empty() {
        for range in exception_table::decode(&code.exception_table)? {
            targets.insert(range.target_index());
        }
    }
    for instruction in &mut instructions {
        instruction.is_jump_target = targets.contains(&instruction.offset);
    }

    Ok(instructions)
}

/// Decodes code objects of the running interpreter into [`Instruction`]s.
///
/// The interpreter version is checked once, when the extractor is built.
///
/// # Example
///
/// ```
/// use solverforge_bytecode::{CodeAssembler, InstructionExtractor, RuntimeVersion};
///
/// let extractor = InstructionExtractor::new(RuntimeVersion::PY_3_10).unwrap();
/// let code = CodeAssembler::new(RuntimeVersion::PY_3_10, "answer")
///     .emit("LOAD_CONST", 0)
///     .unwrap()
///     .emit("RETURN_VALUE", 0)
///     .unwrap()
///     .finish();
///
/// let instructions = extractor.extract(&code).unwrap();
/// assert_eq!(instructions.len(), 2);
/// assert_eq!(instructions[1].name(), "RETURN_VALUE");
/// assert_eq!(instructions[1].offset, 1);
/// ```
#[derive(Debug, Clone)]
pub struct InstructionExtractor {
    version: RuntimeVersion,
}

impl InstructionExtractor {
    /// Creates an extractor for the default supported window.
    ///
    /// # Errors
    ///
    /// Returns [`BytecodeError::UnsupportedVersion`] if `version` is outside
    /// [`VersionWindow::SUPPORTED`].
    pub fn new(version: RuntimeVersion) -> Result<Self> {
        Self::with_window(version, VersionWindow::SUPPORTED)
    }

    /// Creates an extractor, checking `version` against `window`.
    pub fn with_window(version: RuntimeVersion, window: VersionWindow) -> Result<Self> {
        window.check(version)?;
        debug!(
            event = "extractor_ready",
            version = %version,
            window = %window,
        );
        Ok(Self { version })
    }

    pub fn version(&self) -> RuntimeVersion {
        self.version
    }

    /// Decodes the instruction stream of `code`.
    pub fn extract(&self, code: &RawCode) -> Result<Vec<Instruction>> {
        for dialect in Dialect::CANDIDATES {
            match dialect.decode(self.version, code) {
                Ok(result) => {
                    let instructions = result?;
                    trace!(
                        code = %code.name,
                        dialect = ?dialect,
                        count = instructions.len(),
                        "extracted instructions"
                    );
                    return Ok(instructions);
                }
                Err(mismatch) => {
                    trace!(
                        dialect = ?mismatch.dialect,
                        version = %mismatch.version,
                        "dialect mismatch, falling back"
                    );
                }
            }
        }
        Err(BytecodeError::NoDialect(self.version))
    }
}

#[cfg(test)]
mod tests;
