//! Codec for the packed exception table of caches-shown code objects.
//!
//! # Format
//!
//! The table is a flat stream of varints. Each byte holds a 6-bit payload
//! (`b & 0x3f`); bit 6 (`0x40`) means another byte of the same varint follows,
//! most significant group first. Bit 7 (`0x80`) flags the first byte of an
//! entry and is ignored when reading.
//!
//! An entry is four varints:
//!
//! ```text
//! start  length  target  depth_and_lasti
//! ```
//!
//! `start`, `length` and `target` are stored in half units and are doubled on
//! decode. The decoded `end` is inclusive: `end = start + length - 2`.
//! `depth_and_lasti` packs `push_last_instr` in bit 0 and the stack depth in
//! the remaining bits.
//!
//! # Example
//!
//! ```
//! use solverforge_bytecode::exception_table::{decode, encode};
//!
//! let raw = [0x80, 0x02, 0x04, 0x02];
//! let ranges = decode(&raw).unwrap();
//!
//! assert_eq!(ranges.len(), 1);
//! assert_eq!(ranges[0].start, 0);
//! assert_eq!(ranges[0].end, 2);
//! assert_eq!(ranges[0].target, 8);
//! assert_eq!(ranges[0].stack_depth, 1);
//! assert!(!ranges[0].push_last_instr);
//!
//! assert_eq!(encode(&ranges).unwrap(), raw);
//! ```

use tracing::trace;

use crate::error::{BytecodeError, Result};
use crate::extractor::INSTRUCTION_WIDTH;

const PAYLOAD_MASK: u8 = 0x3f;
const CONTINUATION_BIT: u8 = 0x40;
const ENTRY_START_BIT: u8 = 0x80;

/// One protected region and its handler.
///
/// Offsets are in byte units (twice the instruction index). `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionRange {
    pub start: u32,
    pub end: u32,
    pub target: u32,
    pub stack_depth: u32,
    pub push_last_instr: bool,
}

impl ExceptionRange {
    pub fn new(start: u32, end: u32, target: u32, stack_depth: u32, push_last_instr: bool) -> Self {
        Self {
            start,
            end,
            target,
            stack_depth,
            push_last_instr,
        }
    }

    /// Encoded length, recovered from the inclusive end.
    pub fn length(&self) -> u32 {
        self.end - self.start + 2
    }

    pub fn covers(&self, byte_offset: u32) -> bool {
        self.start <= byte_offset && byte_offset <= self.end
    }

    pub fn start_index(&self) -> u32 {
        self.start / INSTRUCTION_WIDTH
    }

    pub fn end_index(&self) -> u32 {
        self.end / INSTRUCTION_WIDTH
    }

    pub fn target_index(&self) -> u32 {
        self.target / INSTRUCTION_WIDTH
    }

    fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(BytecodeError::InvalidRange(format!(
                "end {} precedes start {}",
                self.end, self.start
            )));
        }
        if self.start % 2 != 0 || self.end % 2 != 0 || self.target % 2 != 0 {
            return Err(BytecodeError::InvalidRange(format!(
                "offsets must be even, got start={} end={} target={}",
                self.start, self.end, self.target
            )));
        }
        if self.stack_depth > u32::MAX >> 1 {
            return Err(BytecodeError::InvalidRange(format!(
                "stack depth {} does not fit the packed field",
                self.stack_depth
            )));
        }
        Ok(())
    }
}

struct VarintReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> VarintReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    // None at end of stream, including mid-varint.
    fn read(&mut self) -> Option<Result<u32>> {
        let mut b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        let mut value = u32::from(b & PAYLOAD_MASK);
        while b & CONTINUATION_BIT != 0 {
            b = *self.bytes.get(self.pos)?;
            self.pos += 1;
            value = match value.checked_mul(64) {
                Some(v) => v | u32::from(b & PAYLOAD_MASK),
                None => {
                    return Some(Err(BytecodeError::InvalidRange(format!(
                        "varint overflows 32 bits at byte {}",
                        self.pos - 1
                    ))))
                }
            };
        }
        Some(Ok(value))
    }
}

fn doubled(value: u32, field: &str) -> Result<u32> {
    value
        .checked_mul(2)
        .ok_or_else(|| BytecodeError::InvalidRange(format!("{field} {value} overflows")))
}

/// Decodes a packed exception table.
///
/// Reading stops at end of stream; a trailing partial entry is dropped.
pub fn decode(raw: &[u8]) -> Result<Vec<ExceptionRange>> {
    let mut reader = VarintReader::new(raw);
    let mut ranges = Vec::new();

    while !reader.at_end() {
        let mut fields = [0u32; 4];
        for (i, slot) in fields.iter_mut().enumerate() {
            match reader.read() {
                Some(value) => *slot = value?,
                None => {
                    trace!(
                        fields_read = i,
                        entries = ranges.len(),
                        "exception table ended mid-entry"
                    );
                    return Ok(ranges);
                }
            }
        }
        let [start, length, target, depth_and_lasti] = fields;

        let start = doubled(start, "start")?;
        let length = doubled(length, "length")?;
        let target = doubled(target, "target")?;
        if length == 0 {
            return Err(BytecodeError::InvalidRange(format!(
                "zero-length range at offset {start}"
            )));
        }
        let end = start
            .checked_add(length - 2)
            .ok_or_else(|| BytecodeError::InvalidRange(format!("end of range at {start} overflows")))?;

        ranges.push(ExceptionRange {
            start,
            end,
            target,
            stack_depth: depth_and_lasti >> 1,
            push_last_instr: depth_and_lasti & 1 == 1,
        });
    }

    Ok(ranges)
}

fn write_varint(out: &mut Vec<u8>, mut value: u32, first_byte_flags: u8) {
    let mut groups = [0u8; 6];
    let mut count = 0;
    loop {
        groups[count] = (value as u8) & PAYLOAD_MASK;
        count += 1;
        value >>= 6;
        if value == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        let mut b = groups[i];
        if i != 0 {
            b |= CONTINUATION_BIT;
        }
        if i == count - 1 {
            b |= first_byte_flags;
        }
        out.push(b);
    }
}

/// Encodes ranges into the packed table format. Inverse of [`decode`].
pub fn encode(ranges: &[ExceptionRange]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(ranges.len() * 4);
    for range in ranges {
        range.validate()?;
        write_varint(&mut out, range.start / 2, ENTRY_START_BIT);
        write_varint(&mut out, range.length() / 2, 0);
        write_varint(&mut out, range.target / 2, 0);
        write_varint(
            &mut out,
            (range.stack_depth << 1) | u32::from(range.push_last_instr),
            0,
        );
    }
    Ok(out)
}
