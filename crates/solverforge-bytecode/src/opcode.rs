//! Opcode tables for the supported bytecode dialects.
//!
//! Each dialect has its own numbering. Tables list only what the dialect
//! defines; an opcode byte missing from a table is malformed input.

use std::sync::OnceLock;

/// First opcode that carries an operand.
pub const HAVE_ARGUMENT: u8 = 90;

/// Prefix opcode that widens the operand of the next instruction.
pub const EXTENDED_ARG: u8 = 144;

/// Inline cache slot, only present in the caches-shown dialect.
pub const CACHE: u8 = 0;

/// How an opcode's operand addresses its jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum JumpKind {
    /// Not a jump.
    None,
    /// Operand is the target instruction index.
    Absolute,
    /// Operand counts instructions forward from the next instruction.
    Forward,
    /// Operand counts instructions backward from the next instruction.
    Backward,
}

/// Name and numeric code of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OpcodeTag {
    pub code: u8,
    pub name: &'static str,
}

impl OpcodeTag {
    pub fn has_argument(&self) -> bool {
        self.code >= HAVE_ARGUMENT
    }
}

/// Static description of one opcode in a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub tag: OpcodeTag,
    pub jump: JumpKind,
    /// Number of inline cache words following the instruction.
    pub caches: u8,
}

const fn op(code: u8, name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        tag: OpcodeTag { code, name },
        jump: JumpKind::None,
        caches: 0,
    }
}

const fn jump(code: u8, name: &'static str, jump: JumpKind) -> OpcodeInfo {
    OpcodeInfo {
        tag: OpcodeTag { code, name },
        jump,
        caches: 0,
    }
}

const fn cached(code: u8, name: &'static str, caches: u8) -> OpcodeInfo {
    OpcodeInfo {
        tag: OpcodeTag { code, name },
        jump: JumpKind::None,
        caches,
    }
}

/// A dense code -> info lookup table.
pub struct OpcodeTable {
    name: &'static str,
    entries: Box<[Option<OpcodeInfo>; 256]>,
}

impl OpcodeTable {
    fn build(name: &'static str, ops: &[OpcodeInfo]) -> Self {
        let mut entries = Box::new([None; 256]);
        for info in ops {
            entries[info.tag.code as usize] = Some(*info);
        }
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, code: u8) -> Option<&OpcodeInfo> {
        self.entries[code as usize].as_ref()
    }

    pub fn by_name(&self, name: &str) -> Option<&OpcodeInfo> {
        self.entries.iter().flatten().find(|info| info.tag.name == name)
    }
}

/// Opcode table of the simple dialect (no inline caches).
pub fn simple_table() -> &'static OpcodeTable {
    static TABLE: OnceLock<OpcodeTable> = OnceLock::new();
    TABLE.get_or_init(|| OpcodeTable::build("simple dialect", SIMPLE_OPS))
}

/// Opcode table of the caches-shown dialect.
pub fn caches_shown_table() -> &'static OpcodeTable {
    static TABLE: OnceLock<OpcodeTable> = OnceLock::new();
    TABLE.get_or_init(|| OpcodeTable::build("caches-shown dialect", CACHES_SHOWN_OPS))
}

use JumpKind::{Absolute, Backward, Forward};

static SIMPLE_OPS: &[OpcodeInfo] = &[
    op(1, "POP_TOP"),
    op(2, "ROT_TWO"),
    op(3, "ROT_THREE"),
    op(4, "DUP_TOP"),
    op(5, "DUP_TOP_TWO"),
    op(6, "ROT_FOUR"),
    op(9, "NOP"),
    op(10, "UNARY_POSITIVE"),
    op(11, "UNARY_NEGATIVE"),
    op(12, "UNARY_NOT"),
    op(15, "UNARY_INVERT"),
    op(16, "BINARY_MATRIX_MULTIPLY"),
    op(17, "INPLACE_MATRIX_MULTIPLY"),
    op(19, "BINARY_POWER"),
    op(20, "BINARY_MULTIPLY"),
    op(22, "BINARY_MODULO"),
    op(23, "BINARY_ADD"),
    op(24, "BINARY_SUBTRACT"),
    op(25, "BINARY_SUBSCR"),
    op(26, "BINARY_FLOOR_DIVIDE"),
    op(27, "BINARY_TRUE_DIVIDE"),
    op(28, "INPLACE_FLOOR_DIVIDE"),
    op(29, "INPLACE_TRUE_DIVIDE"),
    op(30, "GET_LEN"),
    op(31, "MATCH_MAPPING"),
    op(32, "MATCH_SEQUENCE"),
    op(33, "MATCH_KEYS"),
    op(34, "COPY_DICT_WITHOUT_KEYS"),
    op(49, "WITH_EXCEPT_START"),
    op(50, "GET_AITER"),
    op(51, "GET_ANEXT"),
    op(52, "BEFORE_ASYNC_WITH"),
    op(54, "END_ASYNC_FOR"),
    op(55, "INPLACE_ADD"),
    op(56, "INPLACE_SUBTRACT"),
    op(57, "INPLACE_MULTIPLY"),
    op(59, "INPLACE_MODULO"),
    op(60, "STORE_SUBSCR"),
    op(61, "DELETE_SUBSCR"),
    op(62, "BINARY_LSHIFT"),
    op(63, "BINARY_RSHIFT"),
    op(64, "BINARY_AND"),
    op(65, "BINARY_XOR"),
    op(66, "BINARY_OR"),
    op(67, "INPLACE_POWER"),
    op(68, "GET_ITER"),
    op(69, "GET_YIELD_FROM_ITER"),
    op(70, "PRINT_EXPR"),
    op(71, "LOAD_BUILD_CLASS"),
    op(72, "YIELD_FROM"),
    op(73, "GET_AWAITABLE"),
    op(74, "LOAD_ASSERTION_ERROR"),
    op(75, "INPLACE_LSHIFT"),
    op(76, "INPLACE_RSHIFT"),
    op(77, "INPLACE_AND"),
    op(78, "INPLACE_XOR"),
    op(79, "INPLACE_OR"),
    op(82, "LIST_TO_TUPLE"),
    op(83, "RETURN_VALUE"),
    op(84, "IMPORT_STAR"),
    op(85, "SETUP_ANNOTATIONS"),
    op(86, "YIELD_VALUE"),
    op(87, "POP_BLOCK"),
    op(89, "POP_EXCEPT"),
    op(90, "STORE_NAME"),
    op(91, "DELETE_NAME"),
    op(92, "UNPACK_SEQUENCE"),
    jump(93, "FOR_ITER", Forward),
    op(94, "UNPACK_EX"),
    op(95, "STORE_ATTR"),
    op(96, "DELETE_ATTR"),
    op(97, "STORE_GLOBAL"),
    op(98, "DELETE_GLOBAL"),
    op(99, "ROT_N"),
    op(100, "LOAD_CONST"),
    op(101, "LOAD_NAME"),
    op(102, "BUILD_TUPLE"),
    op(103, "BUILD_LIST"),
    op(104, "BUILD_SET"),
    op(105, "BUILD_MAP"),
    op(106, "LOAD_ATTR"),
    op(107, "COMPARE_OP"),
    op(108, "IMPORT_NAME"),
    op(109, "IMPORT_FROM"),
    jump(110, "JUMP_FORWARD", Forward),
    jump(111, "JUMP_IF_FALSE_OR_POP", Absolute),
    jump(112, "JUMP_IF_TRUE_OR_POP", Absolute),
    jump(113, "JUMP_ABSOLUTE", Absolute),
    jump(114, "POP_JUMP_IF_FALSE", Absolute),
    jump(115, "POP_JUMP_IF_TRUE", Absolute),
    op(116, "LOAD_GLOBAL"),
    op(117, "IS_OP"),
    op(118, "CONTAINS_OP"),
    op(119, "RERAISE"),
    jump(121, "JUMP_IF_NOT_EXC_MATCH", Absolute),
    jump(122, "SETUP_FINALLY", Forward),
    op(124, "LOAD_FAST"),
    op(125, "STORE_FAST"),
    op(126, "DELETE_FAST"),
    op(129, "GEN_START"),
    op(130, "RAISE_VARARGS"),
    op(131, "CALL_FUNCTION"),
    op(132, "MAKE_FUNCTION"),
    op(133, "BUILD_SLICE"),
    op(135, "LOAD_CLOSURE"),
    op(136, "LOAD_DEREF"),
    op(137, "STORE_DEREF"),
    op(138, "DELETE_DEREF"),
    op(141, "CALL_FUNCTION_KW"),
    op(142, "CALL_FUNCTION_EX"),
    jump(143, "SETUP_WITH", Forward),
    op(144, "EXTENDED_ARG"),
    op(145, "LIST_APPEND"),
    op(146, "SET_ADD"),
    op(147, "MAP_ADD"),
    op(148, "LOAD_CLASSDEREF"),
    op(152, "MATCH_CLASS"),
    jump(154, "SETUP_ASYNC_WITH", Forward),
    op(155, "FORMAT_VALUE"),
    op(156, "BUILD_CONST_KEY_MAP"),
    op(157, "BUILD_STRING"),
    op(160, "LOAD_METHOD"),
    op(161, "CALL_METHOD"),
    op(162, "LIST_EXTEND"),
    op(163, "SET_UPDATE"),
    op(164, "DICT_MERGE"),
    op(165, "DICT_UPDATE"),
];

static CACHES_SHOWN_OPS: &[OpcodeInfo] = &[
    op(0, "CACHE"),
    op(1, "POP_TOP"),
    op(2, "PUSH_NULL"),
    op(9, "NOP"),
    op(10, "UNARY_POSITIVE"),
    op(11, "UNARY_NEGATIVE"),
    op(12, "UNARY_NOT"),
    op(15, "UNARY_INVERT"),
    cached(25, "BINARY_SUBSCR", 4),
    op(30, "GET_LEN"),
    op(31, "MATCH_MAPPING"),
    op(32, "MATCH_SEQUENCE"),
    op(33, "MATCH_KEYS"),
    op(35, "PUSH_EXC_INFO"),
    op(36, "CHECK_EXC_MATCH"),
    op(37, "CHECK_EG_MATCH"),
    op(49, "WITH_EXCEPT_START"),
    op(50, "GET_AITER"),
    op(51, "GET_ANEXT"),
    op(52, "BEFORE_ASYNC_WITH"),
    op(53, "BEFORE_WITH"),
    op(54, "END_ASYNC_FOR"),
    cached(60, "STORE_SUBSCR", 1),
    op(61, "DELETE_SUBSCR"),
    op(68, "GET_ITER"),
    op(69, "GET_YIELD_FROM_ITER"),
    op(70, "PRINT_EXPR"),
    op(71, "LOAD_BUILD_CLASS"),
    op(74, "LOAD_ASSERTION_ERROR"),
    op(75, "RETURN_GENERATOR"),
    op(82, "LIST_TO_TUPLE"),
    op(83, "RETURN_VALUE"),
    op(84, "IMPORT_STAR"),
    op(85, "SETUP_ANNOTATIONS"),
    op(86, "YIELD_VALUE"),
    op(87, "ASYNC_GEN_WRAP"),
    op(88, "PREP_RERAISE_STAR"),
    op(89, "POP_EXCEPT"),
    op(90, "STORE_NAME"),
    op(91, "DELETE_NAME"),
    cached(92, "UNPACK_SEQUENCE", 1),
    jump(93, "FOR_ITER", Forward),
    op(94, "UNPACK_EX"),
    cached(95, "STORE_ATTR", 4),
    op(96, "DELETE_ATTR"),
    op(97, "STORE_GLOBAL"),
    op(98, "DELETE_GLOBAL"),
    op(99, "SWAP"),
    op(100, "LOAD_CONST"),
    op(101, "LOAD_NAME"),
    op(102, "BUILD_TUPLE"),
    op(103, "BUILD_LIST"),
    op(104, "BUILD_SET"),
    op(105, "BUILD_MAP"),
    cached(106, "LOAD_ATTR", 4),
    cached(107, "COMPARE_OP", 2),
    op(108, "IMPORT_NAME"),
    op(109, "IMPORT_FROM"),
    jump(110, "JUMP_FORWARD", Forward),
    jump(111, "JUMP_IF_FALSE_OR_POP", Forward),
    jump(112, "JUMP_IF_TRUE_OR_POP", Forward),
    jump(114, "POP_JUMP_FORWARD_IF_FALSE", Forward),
    jump(115, "POP_JUMP_FORWARD_IF_TRUE", Forward),
    cached(116, "LOAD_GLOBAL", 5),
    op(117, "IS_OP"),
    op(118, "CONTAINS_OP"),
    op(119, "RERAISE"),
    op(120, "COPY"),
    cached(122, "BINARY_OP", 1),
    jump(123, "SEND", Forward),
    op(124, "LOAD_FAST"),
    op(125, "STORE_FAST"),
    op(126, "DELETE_FAST"),
    jump(128, "POP_JUMP_FORWARD_IF_NOT_NONE", Forward),
    jump(129, "POP_JUMP_FORWARD_IF_NONE", Forward),
    op(130, "RAISE_VARARGS"),
    op(131, "GET_AWAITABLE"),
    op(132, "MAKE_FUNCTION"),
    op(133, "BUILD_SLICE"),
    jump(134, "JUMP_BACKWARD_NO_INTERRUPT", Backward),
    op(135, "MAKE_CELL"),
    op(136, "LOAD_CLOSURE"),
    op(137, "LOAD_DEREF"),
    op(138, "STORE_DEREF"),
    op(139, "DELETE_DEREF"),
    jump(140, "JUMP_BACKWARD", Backward),
    op(142, "CALL_FUNCTION_EX"),
    op(144, "EXTENDED_ARG"),
    op(145, "LIST_APPEND"),
    op(146, "SET_ADD"),
    op(147, "MAP_ADD"),
    op(148, "LOAD_CLASSDEREF"),
    op(149, "COPY_FREE_VARS"),
    op(151, "RESUME"),
    op(152, "MATCH_CLASS"),
    op(155, "FORMAT_VALUE"),
    op(156, "BUILD_CONST_KEY_MAP"),
    op(157, "BUILD_STRING"),
    cached(160, "LOAD_METHOD", 10),
    op(162, "LIST_EXTEND"),
    op(163, "SET_UPDATE"),
    op(164, "DICT_MERGE"),
    op(165, "DICT_UPDATE"),
    cached(166, "PRECALL", 1),
    cached(171, "CALL", 4),
    op(172, "KW_NAMES"),
    jump(173, "POP_JUMP_BACKWARD_IF_NOT_NONE", Backward),
    jump(174, "POP_JUMP_BACKWARD_IF_NONE", Backward),
    jump(175, "POP_JUMP_BACKWARD_IF_FALSE", Backward),
    jump(176, "POP_JUMP_BACKWARD_IF_TRUE", Backward),
];
