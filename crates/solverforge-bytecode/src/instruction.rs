//! Decoded instruction type.

use std::fmt;

use crate::opcode::OpcodeTag;

/// One decoded instruction.
///
/// `offset` and `jump_target` are instruction indices (raw byte offset divided
/// by [`crate::INSTRUCTION_WIDTH`]), independent of the dialect that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Instruction {
    pub offset: u32,
    pub opcode: OpcodeTag,
    /// Full operand with any `EXTENDED_ARG` prefixes folded in.
    pub operand: Option<i64>,
    /// Resolved target index for jump opcodes.
    pub jump_target: Option<u32>,
    pub is_jump_target: bool,
    pub starts_line: Option<u32>,
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        self.opcode.name
    }

    pub fn is_jump(&self) -> bool {
        self.jump_target.is_some()
    }

    /// Inline cache slots carry no semantics of their own.
    pub fn is_cache(&self) -> bool {
        self.opcode.name == "CACHE"
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_jump_target { ">>" } else { "  " };
        write!(f, "{marker} {:>4} {}", self.offset, self.opcode.name)?;
        if let Some(operand) = self.operand {
            write!(f, " {operand}")?;
        }
        if let Some(target) = self.jump_target {
            write!(f, " (to {target})")?;
        }
        Ok(())
    }
}
