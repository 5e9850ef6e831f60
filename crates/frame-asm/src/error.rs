//! Assembler error types.
//!
//! Every error carries the source line and column it was raised at. An error
//! aborts the current assembly; nothing is partially committed to the caller.

use thiserror::Error;

use crate::opcode::Mnemonic;

/// An assembly error with source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    // Lex errors
    #[error("{line}:{col}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, line: usize, col: usize },

    #[error("{line}:{col}: unterminated character literal")]
    UnterminatedChar { line: usize, col: usize },

    #[error("{line}:{col}: invalid escape sequence '\\{ch}'")]
    BadEscape { ch: char, line: usize, col: usize },

    #[error("{line}:{col}: invalid number literal '{text}'")]
    BadNumber {
        text: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: address {value:#x} does not fit in 16 bits")]
    AddressRange {
        value: u32,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: zero-page address {value:#x} does not fit in 8 bits")]
    ZeroPageRange {
        value: u32,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: invalid register '${ch}'")]
    BadRegister { ch: char, line: usize, col: usize },

    // Parse errors
    #[error("{line}:{col}: unexpected {found}")]
    UnexpectedToken {
        found: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: expected {expected}, found {found}")]
    ExpectedToken {
        expected: &'static str,
        found: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: unknown directive '.{name}'")]
    UnknownDirective {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: {mnemonic} does not take these arguments (supported: {supported})")]
    UnsupportedMode {
        mnemonic: Mnemonic,
        supported: String,
        line: usize,
        col: usize,
    },

    // Semantic errors
    #[error("{line}:{col}: label '@{name}' is already defined")]
    LabelRedefined {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("unresolved label '@{name}' at end of input")]
    UnresolvedLabel { name: String },

    #[error("{line}:{col}: '{name}' is not defined")]
    UndefinedName {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: immediate {value:#x} does not fit in 8 bits")]
    ImmediateRange {
        value: u16,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: register $s cannot be packed into a register pair")]
    SpPacked { line: usize, col: usize },
}

/// Result type for assembler operations.
pub type Result<T> = std::result::Result<T, AsmError>;
