//! Tests for instruction extraction.

use super::*;
use crate::assembler::CodeAssembler;
use crate::code::LineStart;

fn names(instructions: &[Instruction]) -> Vec<&'static str> {
    instructions.iter().map(|i| i.name()).collect()
}

#[test]
fn test_rejects_unsupported_version_eagerly() {
    let err = InstructionExtractor::new(RuntimeVersion::new(3, 9)).unwrap_err();
    assert!(matches!(
        err,
        BytecodeError::UnsupportedVersion { found, .. } if found == RuntimeVersion::new(3, 9)
    ));
    assert!(InstructionExtractor::new(RuntimeVersion::new(3, 12)).is_err());
}

#[test]
fn test_custom_window() {
    let window = VersionWindow::new(RuntimeVersion::PY_3_11, RuntimeVersion::PY_3_11);
    assert!(InstructionExtractor::with_window(RuntimeVersion::PY_3_10, window).is_err());
    assert!(InstructionExtractor::with_window(RuntimeVersion::PY_3_11, window).is_ok());
}

#[test]
fn test_simple_dialect_absolute_jump() {
    // 0 LOAD_FAST 0
    // 1 POP_JUMP_IF_FALSE 4
    // 2 LOAD_CONST 0
    // 3 RETURN_VALUE
    // 4 LOAD_CONST 1
    // 5 RETURN_VALUE
    let code = CodeAssembler::new(RuntimeVersion::PY_3_10, "pick")
        .line(1)
        .emit("LOAD_FAST", 0)
        .unwrap()
        .emit("POP_JUMP_IF_FALSE", 4)
        .unwrap()
        .line(2)
        .emit("LOAD_CONST", 0)
        .unwrap()
        .emit("RETURN_VALUE", 0)
        .unwrap()
        .line(3)
        .emit("LOAD_CONST", 1)
        .unwrap()
        .emit("RETURN_VALUE", 0)
        .unwrap()
        .finish();

    let extractor = InstructionExtractor::new(RuntimeVersion::PY_3_10).unwrap();
    let instructions = extractor.extract(&code).unwrap();

    assert_eq!(
        names(&instructions),
        vec![
            "LOAD_FAST",
            "POP_JUMP_IF_FALSE",
            "LOAD_CONST",
            "RETURN_VALUE",
            "LOAD_CONST",
            "RETURN_VALUE"
        ]
    );
    let offsets: Vec<u32> = instructions.iter().map(|i| i.offset).collect();
    assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);

    assert_eq!(instructions[1].jump_target, Some(4));
    assert!(instructions[4].is_jump_target);
    assert!(!instructions[2].is_jump_target);

    assert_eq!(instructions[0].starts_line, Some(1));
    assert_eq!(instructions[1].starts_line, None);
    assert_eq!(instructions[2].starts_line, Some(2));
    assert_eq!(instructions[4].starts_line, Some(3));

    assert_eq!(instructions[3].operand, None);
    assert_eq!(instructions[4].operand, Some(1));
}

#[test]
fn test_caches_shown_dialect_keeps_cache_slots() {
    // 0 RESUME 0
    // 1 LOAD_GLOBAL 1, followed by 5 caches (2..=6)
    // 7 RETURN_VALUE
    let code = CodeAssembler::new(RuntimeVersion::PY_3_11, "glob")
        .emit("RESUME", 0)
        .unwrap()
        .emit("LOAD_GLOBAL", 1)
        .unwrap()
        .emit("RETURN_VALUE", 0)
        .unwrap()
        .finish();

    let extractor = InstructionExtractor::new(RuntimeVersion::PY_3_11).unwrap();
    let instructions = extractor.extract(&code).unwrap();

    assert_eq!(instructions.len(), 8);
    assert_eq!(instructions[1].name(), "LOAD_GLOBAL");
    assert!(instructions[2..7].iter().all(|i| i.is_cache()));
    assert_eq!(instructions[7].name(), "RETURN_VALUE");
    assert_eq!(instructions[7].offset, 7);
}

#[test]
fn test_caches_shown_relative_jumps() {
    // 0 NOP
    // 1 JUMP_FORWARD 1 -> 3
    // 2 NOP
    // 3 NOP
    // 4 JUMP_BACKWARD 5 -> 0
    let code = CodeAssembler::new(RuntimeVersion::PY_3_11, "loop")
        .emit("NOP", 0)
        .unwrap()
        .emit("JUMP_FORWARD", 1)
        .unwrap()
        .emit("NOP", 0)
        .unwrap()
        .emit("NOP", 0)
        .unwrap()
        .emit("JUMP_BACKWARD", 5)
        .unwrap()
        .finish();

    let instructions = InstructionExtractor::new(RuntimeVersion::PY_3_11)
        .unwrap()
        .extract(&code)
        .unwrap();

    assert_eq!(instructions[1].jump_target, Some(3));
    assert_eq!(instructions[4].jump_target, Some(0));
    assert!(instructions[0].is_jump_target);
    assert!(instructions[3].is_jump_target);
    assert!(!instructions[2].is_jump_target);
}

#[test]
fn test_exception_handlers_are_jump_targets() {
    let code = CodeAssembler::new(RuntimeVersion::PY_3_11, "guarded")
        .emit("NOP", 0)
        .unwrap()
        .emit("LOAD_CONST", 0)
        .unwrap()
        .emit("RETURN_VALUE", 0)
        .unwrap()
        .emit("PUSH_EXC_INFO", 0)
        .unwrap()
        .emit("RERAISE", 0)
        .unwrap()
        .protect(1, 2, 3, 0, true)
        .unwrap()
        .finish();

    let instructions = InstructionExtractor::new(RuntimeVersion::PY_3_11)
        .unwrap()
        .extract(&code)
        .unwrap();
    assert!(instructions[3].is_jump_target);
}

#[test]
fn test_extended_arg_folds_into_operand() {
    let code = CodeAssembler::new(RuntimeVersion::PY_3_10, "wide")
        .emit("LOAD_CONST", 0x0102)
        .unwrap()
        .emit("RETURN_VALUE", 0)
        .unwrap()
        .finish();

    let instructions = InstructionExtractor::new(RuntimeVersion::PY_3_10)
        .unwrap()
        .extract(&code)
        .unwrap();

    assert_eq!(names(&instructions), vec!["EXTENDED_ARG", "LOAD_CONST", "RETURN_VALUE"]);
    assert_eq!(instructions[1].operand, Some(0x0102));
    assert_eq!(instructions[1].offset, 1);
}

#[test]
fn test_same_bytes_decode_per_dialect() {
    // Opcode 131 is CALL_FUNCTION in the simple dialect and GET_AWAITABLE otherwise.
    let code = RawCode::new("call", vec![131, 0, 83, 0]);

    let simple = InstructionExtractor::new(RuntimeVersion::PY_3_10)
        .unwrap()
        .extract(&code)
        .unwrap();
    assert_eq!(simple[0].name(), "CALL_FUNCTION");

    let shown = InstructionExtractor::new(RuntimeVersion::PY_3_11)
        .unwrap()
        .extract(&code)
        .unwrap();
    assert_eq!(shown[0].name(), "GET_AWAITABLE");
}

#[test]
fn test_malformed_code() {
    let extractor = InstructionExtractor::new(RuntimeVersion::PY_3_10).unwrap();

    let odd = RawCode::new("odd", vec![83]);
    assert!(matches!(
        extractor.extract(&odd),
        Err(BytecodeError::Malformed { .. })
    ));

    let unknown = RawCode::new("unknown", vec![255, 0]);
    assert!(matches!(
        extractor.extract(&unknown),
        Err(BytecodeError::UnknownOpcode { opcode: 255, offset: 0, .. })
    ));

    let wild_jump = RawCode::new("wild", vec![113, 9, 83, 0]);
    assert!(matches!(
        extractor.extract(&wild_jump),
        Err(BytecodeError::Malformed { .. })
    ));
}

#[test]
fn test_stacked_extended_args_overflowing_a_jump() {
    let extractor = InstructionExtractor::new(RuntimeVersion::PY_3_10).unwrap();

    // EXTENDED_ARG x3 then JUMP_FORWARD: the offset wraps past u32::MAX.
    let wrapping = RawCode::new("wrapping", vec![144, 0xff, 144, 0xff, 144, 0xff, 110, 0xff]);
    assert!(matches!(
        extractor.extract(&wrapping),
        Err(BytecodeError::Malformed { .. })
    ));

    // Four prefixes build an argument wider than 32 bits.
    let wide = RawCode::new(
        "wide",
        vec![144, 1, 144, 0, 144, 0, 144, 0, 113, 0],
    );
    assert!(matches!(
        extractor.extract(&wide),
        Err(BytecodeError::Malformed { .. })
    ));
}

#[test]
fn test_line_starts_use_byte_offsets() {
    let code = RawCode::new("lines", vec![9, 0, 83, 0]).with_line_starts(vec![
        LineStart {
            byte_offset: 0,
            line: 10,
        },
        LineStart {
            byte_offset: 2,
            line: 11,
        },
    ]);
    let instructions = InstructionExtractor::new(RuntimeVersion::PY_3_10)
        .unwrap()
        .extract(&code)
        .unwrap();
    assert_eq!(instructions[0].starts_line, Some(10));
    assert_eq!(instructions[1].starts_line, Some(11));
}
