//! Raw code representation read from the source interpreter.

/// Marks the first instruction of a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStart {
    /// Raw byte offset of the instruction.
    pub byte_offset: u32,
    pub line: u32,
}

/// The byte-level part of a code object.
///
/// Instructions are two-byte words (`opcode`, `arg`). The exception table is
/// kept in its packed varint form; see [`crate::exception_table`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCode {
    /// Qualified name of the owning callable, used in diagnostics.
    pub name: String,
    pub bytes: Vec<u8>,
    pub exception_table: Vec<u8>,
    pub line_starts: Vec<LineStart>,
}

impl RawCode {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            exception_table: Vec::new(),
            line_starts: Vec::new(),
        }
    }

    pub fn with_exception_table(mut self, table: Vec<u8>) -> Self {
        self.exception_table = table;
        self
    }

    pub fn with_line_starts(mut self, line_starts: Vec<LineStart>) -> Self {
        self.line_starts = line_starts;
        self
    }

    /// Number of instruction words, including inline caches.
    pub fn word_count(&self) -> usize {
        self.bytes.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
