//! Token definitions for FRAME assembly.

use std::fmt;

use crate::opcode::Mnemonic;

/// Register index of the stack pointer (`$s`).
pub const SP: u8 = 16;

/// An immediate operand value.
///
/// Label-byte references (`@<name`, `@>name`) are deferred: they occupy an
/// immediate slot but resolve to a byte of the label's address during
/// back-patching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Imm {
    /// A literal value. Stored wide; range-checked where it is used
    /// (8 bits in operand slots and `.byte`, 16 bits in `.word`/`.addr`).
    Value(u16),
    /// Low byte of a label's address (`@<name`).
    LabelLow(String),
    /// High byte of a label's address (`@>name`).
    LabelHigh(String),
}

/// What a token is, with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A known mnemonic.
    Instruction(Mnemonic),
    /// Any other bare word (a define reference, or the name in `.def`).
    Identifier(String),
    /// `@name` — a label definition or a whole-address reference,
    /// depending on position.
    Label(String),
    /// A number, character literal, or label-byte reference.
    Immediate(Imm),
    /// `$0`–`$f`, or `$s` for the stack pointer (index 16).
    Register(u8),
    /// Word after `.`.
    Directive(String),
    /// `%hex`, at most 16 bits.
    Address(u16),
    /// `(hex`, at most 8 bits. The closing paren is its own token.
    Indirect(u8),
    /// `,`
    Comma,
    /// `)`
    RightParen,
    /// End of input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Instruction(m) => write!(f, "instruction '{m}'"),
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Label(name) => write!(f, "label '@{name}'"),
            TokenKind::Immediate(Imm::Value(v)) => write!(f, "immediate {v:#x}"),
            TokenKind::Immediate(Imm::LabelLow(name)) => write!(f, "immediate '@<{name}'"),
            TokenKind::Immediate(Imm::LabelHigh(name)) => write!(f, "immediate '@>{name}'"),
            TokenKind::Register(SP) => write!(f, "register '$s'"),
            TokenKind::Register(r) => write!(f, "register '${r:x}'"),
            TokenKind::Directive(name) => write!(f, "directive '.{name}'"),
            TokenKind::Address(a) => write!(f, "address '%{a:x}'"),
            TokenKind::Indirect(z) => write!(f, "indirect '({z:x})'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with its source position (both 1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}
