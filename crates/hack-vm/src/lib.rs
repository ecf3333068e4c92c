#![allow(
    clippy::cast_possible_truncation, // intentional: Hack words are 16-bit, host indices are usize
    clippy::cast_possible_wrap, // intentional: Hack words are reinterpreted as two's complement
    clippy::cast_sign_loss, // intentional: same, in the other direction
    clippy::missing_errors_doc // every fallible function returns crate::Error
)]

pub mod abi;
pub mod error;
pub mod hack;
pub mod translate;
pub mod vm;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use error::{Error, Location, Result};
pub use hack::{AsmProgram, Instruction};
pub use translate::{OptimizationFlags, SourceUnit, TranslateOptions, Translator, translate};
pub use vm::{ArithmeticOp, Command, Segment};
