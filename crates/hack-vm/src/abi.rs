//! Hack memory map and VM frame layout.
//!
//! This module centralizes every fixed address the translator relies on so
//! the generators, the bootstrap, and the test harness agree on one layout.
//!
//! ```text
//! RAM:
//!   0          SP    stack pointer
//!   1          LCL   base of the current function's locals
//!   2          ARG   base of the current function's arguments
//!   3          THIS  base of the `this` segment (pointer 0)
//!   4          THAT  base of the `that` segment (pointer 1)
//!   5  - 12    temp segment
//!   13 - 15    R13..R15 scratch cells
//!   16 - 255   static variables (allocated by the assembler)
//!   256 - 2047 stack
//!   16384      SCREEN
//!   24576      KBD
//! ```

// ── Pointer cells ──

/// Stack pointer: address of the next free stack slot.
pub const SP: u16 = 0;

/// Base pointer of the `local` segment.
pub const LCL: u16 = 1;

/// Base pointer of the `argument` segment.
pub const ARG: u16 = 2;

/// Base pointer of the `this` segment.
pub const THIS: u16 = 3;

/// Base pointer of the `that` segment.
pub const THAT: u16 = 4;

// ── Fixed segments ──

/// First word of the `temp` segment.
pub const TEMP_BASE: u16 = 5;

/// Number of words in the `temp` segment.
pub const TEMP_SIZE: u16 = 8;

/// Base of the `pointer` segment: `pointer 0` is THIS, `pointer 1` is THAT.
pub const POINTER_BASE: u16 = THIS;

/// Number of words in the `pointer` segment.
pub const POINTER_SIZE: u16 = 2;

/// First address the assembler hands out to variables (`Unit.index` statics).
pub const STATIC_BASE: u16 = 16;

/// Initial stack pointer set by the bootstrap.
pub const STACK_BASE: u16 = 256;

/// Largest value an A-instruction can load directly.
pub const MAX_CONSTANT: u16 = 0x7FFF;

// ── Scratch cells ──

/// Scratch cell used by `pop` for the destination address and by `return`
/// for the saved frame pointer.
pub const R13: u16 = 13;

/// Scratch cell holding the return address during `return`, and the callee
/// address while a shared call body runs.
pub const R14: u16 = 14;

/// Scratch cell threading the resume address of a shared subroutine.
/// Only subroutine linkage writes it.
pub const R15: u16 = 15;

// ── Frame layout ──

/// Words pushed by a call between the arguments and the callee's locals:
/// return address, LCL, ARG, THIS, THAT.
pub const FRAME_SAVED_WORDS: u16 = 5;

/// Saved pointers in push order, with their offset below the callee's LCL.
///
/// Return restores them in reverse (THAT at `frame - 1` first).
pub const SAVED_POINTERS: [(&str, u16); 4] = [("LCL", 4), ("ARG", 3), ("THIS", 2), ("THAT", 1)];

/// Offset of the return address below the callee's LCL.
pub const RETURN_ADDRESS_OFFSET: u16 = FRAME_SAVED_WORDS;

/// Predefined assembler symbols and their addresses.
pub const PREDEFINED_SYMBOLS: [(&str, u16); 23] = [
    ("SP", SP),
    ("LCL", LCL),
    ("ARG", ARG),
    ("THIS", THIS),
    ("THAT", THAT),
    ("R0", 0),
    ("R1", 1),
    ("R2", 2),
    ("R3", 3),
    ("R4", 4),
    ("R5", 5),
    ("R6", 6),
    ("R7", 7),
    ("R8", 8),
    ("R9", 9),
    ("R10", 10),
    ("R11", 11),
    ("R12", 12),
    ("R13", R13),
    ("R14", R14),
    ("R15", R15),
    ("SCREEN", 0x4000),
    ("KBD", 0x6000),
];
