//! The assembler driver.
//!
//! Single pass over the token stream with back-patching: forward label
//! references are recorded as emission offsets keyed by label name and
//! patched the moment the label is defined. Whole-address references record
//! the offset of the opcode byte and recover the operand layout from it;
//! low/high byte references record the offset of the byte itself.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AsmError, Result};
use crate::lexer::Lexer;
use crate::mode::{ArgKind, Mode};
use crate::opcode::{Mnemonic, Opcode};
use crate::token::{Imm, Token, TokenKind, SP};

/// Size of the output image: the full address space.
pub const IMAGE_SIZE: usize = 0x1_0000;

/// An assembled program.
pub struct Program {
    /// The 64 KiB output image.
    pub image: Box<[u8; IMAGE_SIZE]>,
    /// Address of the `main` label, or 0 if absent.
    pub start: u16,
    /// Emission offset → printable instruction text.
    pub listing: BTreeMap<u16, String>,
    /// Final label table (including any seeded labels).
    pub labels: HashMap<String, u16>,
    /// Final define table (including any seeded defines).
    pub defines: HashMap<String, TokenKind>,
}

/// A parsed instruction argument.
#[derive(Debug, Clone)]
enum Arg {
    Register(u8),
    Immediate(Imm),
    Address(AddrRef),
    Indirect(u8),
}

#[derive(Debug, Clone)]
enum AddrRef {
    Abs(u16),
    Label(String),
}

impl Arg {
    fn kind(&self) -> ArgKind {
        match self {
            Arg::Register(_) => ArgKind::Register,
            Arg::Immediate(_) => ArgKind::Immediate,
            Arg::Address(_) => ArgKind::Address,
            Arg::Indirect(_) => ArgKind::Indirect,
        }
    }
}

impl std::fmt::Display for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Register(SP) => write!(f, "$s"),
            Arg::Register(r) => write!(f, "${r:x}"),
            Arg::Immediate(Imm::Value(v)) => write!(f, "{v:#x}"),
            Arg::Immediate(Imm::LabelLow(name)) => write!(f, "@<{name}"),
            Arg::Immediate(Imm::LabelHigh(name)) => write!(f, "@>{name}"),
            Arg::Address(AddrRef::Abs(a)) => write!(f, "%{a:x}"),
            Arg::Address(AddrRef::Label(name)) => write!(f, "@{name}"),
            Arg::Indirect(z) => write!(f, "({z:x})"),
        }
    }
}

/// The FRAME assembler.
///
/// An `Assembler` carries the symbols an assembly starts from; the kernel's
/// label and define tables are seeded here so user programs can name kernel
/// routines. `assemble()` itself is pure: same source, same output.
#[derive(Default)]
pub struct Assembler {
    seed_labels: HashMap<String, u16>,
    seed_defines: HashMap<String, TokenKind>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the assembly with existing label and define tables.
    pub fn with_symbols(
        labels: HashMap<String, u16>,
        defines: HashMap<String, TokenKind>,
    ) -> Self {
        Self {
            seed_labels: labels,
            seed_defines: defines,
        }
    }

    /// Assemble a source file into a 64 KiB image.
    pub fn assemble(&self, source: &str) -> Result<Program> {
        let driver = Driver {
            lexer: Lexer::new(source),
            lookahead: None,
            image: Box::new([0u8; IMAGE_SIZE]),
            cursor: 0,
            labels: self.seed_labels.clone(),
            defines: self.seed_defines.clone(),
            fix_addr: HashMap::new(),
            fix_lo: HashMap::new(),
            fix_hi: HashMap::new(),
            listing: BTreeMap::new(),
        };
        driver.run()
    }
}

struct Driver {
    lexer: Lexer,
    lookahead: Option<Token>,
    image: Box<[u8; IMAGE_SIZE]>,
    cursor: u16,
    labels: HashMap<String, u16>,
    defines: HashMap<String, TokenKind>,
    /// Label → offsets of opcode bytes whose address operand awaits patching.
    fix_addr: HashMap<String, Vec<u16>>,
    /// Label → offsets of bytes awaiting the address low byte.
    fix_lo: HashMap<String, Vec<u16>>,
    /// Label → offsets of bytes awaiting the address high byte.
    fix_hi: HashMap<String, Vec<u16>>,
    listing: BTreeMap<u16, String>,
}

impl Driver {
    fn run(mut self) -> Result<Program> {
        loop {
            let token = self.bump()?;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Label(name) => self.define_label(name, token.line, token.col)?,
                TokenKind::Directive(name) => self.directive(&name, token.line, token.col)?,
                TokenKind::Instruction(mnemonic) => {
                    self.instruction(mnemonic, token.line, token.col)?;
                }
                kind => {
                    return Err(AsmError::UnexpectedToken {
                        found: kind.to_string(),
                        line: token.line,
                        col: token.col,
                    });
                }
            }
        }

        // Anything still pending is a reference to a label that never came.
        let mut unresolved: Vec<&String> = self
            .fix_addr
            .keys()
            .chain(self.fix_lo.keys())
            .chain(self.fix_hi.keys())
            .collect();
        unresolved.sort();
        if let Some(name) = unresolved.first() {
            return Err(AsmError::UnresolvedLabel {
                name: (*name).clone(),
            });
        }

        let start = self.labels.get("main").copied().unwrap_or(0);
        Ok(Program {
            image: self.image,
            start,
            listing: self.listing,
            labels: self.labels,
            defines: self.defines,
        })
    }

    // -----------------------------------------------------------------------
    // Token plumbing
    // -----------------------------------------------------------------------

    fn bump(&mut self) -> Result<Token> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self) -> Result<&Token> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token()?);
        }
        Ok(self.lookahead.as_ref().expect("lookahead just filled"))
    }

    fn eat_comma(&mut self) -> Result<bool> {
        if self.peek()?.kind == TokenKind::Comma {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // -----------------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------------

    fn emit(&mut self, byte: u8) {
        self.image[usize::from(self.cursor)] = byte;
        self.cursor = self.cursor.wrapping_add(1);
    }

    fn emit_imm(&mut self, imm: &Imm, line: usize, col: usize) -> Result<()> {
        match imm {
            Imm::Value(v) => {
                if *v > 0xFF {
                    return Err(AsmError::ImmediateRange {
                        value: *v,
                        line,
                        col,
                    });
                }
                self.emit(*v as u8);
            }
            Imm::LabelLow(name) => match self.labels.get(name) {
                Some(addr) => {
                    let lo = (*addr & 0xFF) as u8;
                    self.emit(lo);
                }
                None => {
                    self.fix_lo.entry(name.clone()).or_default().push(self.cursor);
                    self.emit(0);
                }
            },
            Imm::LabelHigh(name) => match self.labels.get(name) {
                Some(addr) => {
                    let hi = (*addr >> 8) as u8;
                    self.emit(hi);
                }
                None => {
                    self.fix_hi.entry(name.clone()).or_default().push(self.cursor);
                    self.emit(0);
                }
            },
        }
        Ok(())
    }

    /// Emit the two address bytes (little-endian), deferring unresolved
    /// labels against the opcode byte at `opcode_offset`.
    fn emit_addr(&mut self, opcode_offset: u16, addr: &AddrRef) {
        match addr {
            AddrRef::Abs(a) => {
                self.emit((*a & 0xFF) as u8);
                self.emit((*a >> 8) as u8);
            }
            AddrRef::Label(name) => match self.labels.get(name).copied() {
                Some(a) => {
                    self.emit((a & 0xFF) as u8);
                    self.emit((a >> 8) as u8);
                }
                None => {
                    self.fix_addr
                        .entry(name.clone())
                        .or_default()
                        .push(opcode_offset);
                    self.emit(0);
                    self.emit(0);
                }
            },
        }
    }

    /// Single-byte register operand: the full index, 0–16.
    fn reg_byte(r: u8) -> u8 {
        r
    }

    /// Packed register pair: `a` in the low nibble, `b` in the high nibble.
    /// The stack pointer (index 16) does not fit a nibble.
    fn reg_pair(a: u8, b: u8, line: usize, col: usize) -> Result<u8> {
        if a == SP || b == SP {
            return Err(AsmError::SpPacked { line, col });
        }
        Ok(a | (b << 4))
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn define_label(&mut self, name: String, line: usize, col: usize) -> Result<()> {
        if self.labels.contains_key(&name) && !name.starts_with('_') {
            return Err(AsmError::LabelRedefined { name, line, col });
        }
        let addr = self.cursor;
        self.labels.insert(name.clone(), addr);

        // Patch everything that was waiting on this name. Underscore labels
        // run through here on every redefinition, so pending references bind
        // to the nearest following definition.
        if let Some(offsets) = self.fix_addr.remove(&name) {
            for offset in offsets {
                self.patch_addr(offset, addr);
            }
        }
        if let Some(offsets) = self.fix_lo.remove(&name) {
            for offset in offsets {
                self.image[usize::from(offset)] = (addr & 0xFF) as u8;
            }
        }
        if let Some(offsets) = self.fix_hi.remove(&name) {
            for offset in offsets {
                self.image[usize::from(offset)] = (addr >> 8) as u8;
            }
        }
        Ok(())
    }

    /// Write a resolved address into the operand bytes of the instruction
    /// whose opcode sits at `offset`.
    fn patch_addr(&mut self, offset: u16, addr: u16) {
        let opcode = Opcode::from_byte(self.image[usize::from(offset)])
            .expect("patch offset holds an emitted opcode");
        let rel = opcode
            .mode()
            .addr_offset()
            .expect("patched opcode has an address operand");
        let pos = offset.wrapping_add(1).wrapping_add(rel);
        self.image[usize::from(pos)] = (addr & 0xFF) as u8;
        self.image[usize::from(pos.wrapping_add(1))] = (addr >> 8) as u8;
    }

    fn instruction(&mut self, mnemonic: Mnemonic, line: usize, col: usize) -> Result<()> {
        let args = self.parse_args(mnemonic)?;
        let kinds: Vec<ArgKind> = args.iter().map(Arg::kind).collect();

        let opcode = Mode::from_args(&kinds)
            .and_then(|mode| mnemonic.opcode(mode))
            .ok_or_else(|| AsmError::UnsupportedMode {
                mnemonic,
                supported: mnemonic
                    .modes()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                line,
                col,
            })?;

        let text = if args.is_empty() {
            mnemonic.to_string()
        } else {
            let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
            format!("{mnemonic} {}", rendered.join(", "))
        };
        self.listing.insert(self.cursor, text);

        let opcode_offset = self.cursor;
        self.emit(opcode.byte());
        self.encode(opcode.mode(), opcode_offset, &args, line, col)
    }

    fn encode(
        &mut self,
        mode: Mode,
        opcode_offset: u16,
        args: &[Arg],
        line: usize,
        col: usize,
    ) -> Result<()> {
        // Pull the typed payload out of an argument slot. Mode resolution
        // already fixed the kinds, so the accessors cannot miss.
        let reg = |i: usize| match &args[i] {
            Arg::Register(r) => *r,
            _ => unreachable!("mode guarantees a register in slot {i}"),
        };
        let imm = |i: usize| match &args[i] {
            Arg::Immediate(v) => v.clone(),
            _ => unreachable!("mode guarantees an immediate in slot {i}"),
        };
        let addr = |i: usize| match &args[i] {
            Arg::Address(a) => a.clone(),
            _ => unreachable!("mode guarantees an address in slot {i}"),
        };
        let zp = |i: usize| match &args[i] {
            Arg::Indirect(z) => *z,
            _ => unreachable!("mode guarantees an indirect in slot {i}"),
        };

        match mode {
            Mode::O => {}
            Mode::A => self.emit(Self::reg_byte(reg(0))),
            Mode::K => self.emit_imm(&imm(0), line, col)?,
            Mode::P => self.emit_addr(opcode_offset, &addr(0)),
            Mode::Ab => {
                let pair = Self::reg_pair(reg(0), reg(1), line, col)?;
                self.emit(pair);
            }
            Mode::Ak => {
                self.emit(Self::reg_byte(reg(0)));
                self.emit_imm(&imm(1), line, col)?;
            }
            Mode::Ka => {
                self.emit_imm(&imm(0), line, col)?;
                self.emit(Self::reg_byte(reg(1)));
            }
            Mode::Kk => {
                self.emit_imm(&imm(0), line, col)?;
                self.emit_imm(&imm(1), line, col)?;
            }
            Mode::Ap => {
                self.emit(Self::reg_byte(reg(0)));
                self.emit_addr(opcode_offset, &addr(1));
            }
            Mode::Pa => {
                self.emit_addr(opcode_offset, &addr(0));
                self.emit(Self::reg_byte(reg(1)));
            }
            Mode::Pk => {
                self.emit_addr(opcode_offset, &addr(0));
                self.emit_imm(&imm(1), line, col)?;
            }
            Mode::Abc => {
                let pair = Self::reg_pair(reg(0), reg(1), line, col)?;
                self.emit(pair);
                self.emit(Self::reg_byte(reg(2)));
            }
            Mode::Abk => {
                let pair = Self::reg_pair(reg(0), reg(1), line, col)?;
                self.emit(pair);
                self.emit_imm(&imm(2), line, col)?;
            }
            // APB reorders to the PAB layout: address first, then the pair.
            Mode::Apb => {
                let pair = Self::reg_pair(reg(0), reg(2), line, col)?;
                self.emit_addr(opcode_offset, &addr(1));
                self.emit(pair);
            }
            Mode::Pab => {
                let pair = Self::reg_pair(reg(1), reg(2), line, col)?;
                self.emit_addr(opcode_offset, &addr(0));
                self.emit(pair);
            }
            Mode::Apk => {
                self.emit_addr(opcode_offset, &addr(1));
                self.emit(Self::reg_byte(reg(0)));
                self.emit_imm(&imm(2), line, col)?;
            }
            Mode::Pak => {
                self.emit_addr(opcode_offset, &addr(0));
                self.emit(Self::reg_byte(reg(1)));
                self.emit_imm(&imm(2), line, col)?;
            }
            // AIB borrows the ABK layout with the indirect byte in the K slot.
            Mode::Aib => {
                let pair = Self::reg_pair(reg(0), reg(2), line, col)?;
                self.emit(pair);
                self.emit(zp(1));
            }
            Mode::Aik => {
                self.emit(Self::reg_byte(reg(0)));
                self.emit(zp(1));
                self.emit_imm(&imm(2), line, col)?;
            }
        }
        Ok(())
    }

    /// Does the upcoming token begin an argument for this mnemonic?
    ///
    /// A label token is ambiguous: `jmp @end` takes it as an address
    /// argument, while `ret` followed by `@loop` starts a new statement.
    /// The mnemonic's mode table decides: labels are arguments only for
    /// mnemonics that can take an address at all.
    fn starts_argument(&mut self, mnemonic: Mnemonic) -> Result<bool> {
        let takes_address = mnemonic
            .modes()
            .iter()
            .any(|mode| mode.addr_offset().is_some());
        Ok(match &self.peek()?.kind {
            TokenKind::Register(_)
            | TokenKind::Immediate(_)
            | TokenKind::Indirect(_)
            | TokenKind::Identifier(_) => true,
            TokenKind::Address(_) => true,
            TokenKind::Label(_) => takes_address,
            _ => false,
        })
    }

    fn parse_args(&mut self, mnemonic: Mnemonic) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        if !self.starts_argument(mnemonic)? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_arg()?);
            if !self.eat_comma()? {
                return Ok(args);
            }
        }
    }

    fn parse_arg(&mut self) -> Result<Arg> {
        let token = self.bump()?;
        self.arg_from_kind(token.kind, token.line, token.col)
    }

    fn arg_from_kind(&mut self, kind: TokenKind, line: usize, col: usize) -> Result<Arg> {
        match kind {
            TokenKind::Register(r) => Ok(Arg::Register(r)),
            TokenKind::Immediate(imm) => Ok(Arg::Immediate(imm)),
            TokenKind::Address(a) => Ok(Arg::Address(AddrRef::Abs(a))),
            TokenKind::Label(name) => Ok(Arg::Address(AddrRef::Label(name))),
            TokenKind::Indirect(z) => {
                self.expect_right_paren()?;
                Ok(Arg::Indirect(z))
            }
            TokenKind::Identifier(name) => match self.defines.get(&name).cloned() {
                Some(TokenKind::Indirect(z)) => Ok(Arg::Indirect(z)),
                Some(replacement) => self.arg_from_kind(replacement, line, col),
                None => Err(AsmError::UndefinedName { name, line, col }),
            },
            other => Err(AsmError::ExpectedToken {
                expected: "an argument",
                found: other.to_string(),
                line,
                col,
            }),
        }
    }

    fn expect_right_paren(&mut self) -> Result<()> {
        let token = self.bump()?;
        if token.kind == TokenKind::RightParen {
            Ok(())
        } else {
            Err(AsmError::ExpectedToken {
                expected: "')'",
                found: token.kind.to_string(),
                line: token.line,
                col: token.col,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Directives
    // -----------------------------------------------------------------------

    fn directive(&mut self, name: &str, line: usize, col: usize) -> Result<()> {
        match name {
            "addr" => {
                let value = self.directive_value()?;
                self.cursor = value;
                Ok(())
            }
            "byte" => {
                loop {
                    let token = self.bump()?;
                    let arg = self.arg_from_kind(token.kind, token.line, token.col)?;
                    match arg {
                        Arg::Immediate(imm) => {
                            self.emit_imm(&imm, token.line, token.col)?;
                        }
                        other => {
                            return Err(AsmError::ExpectedToken {
                                expected: "a byte value",
                                found: other.to_string(),
                                line: token.line,
                                col: token.col,
                            });
                        }
                    }
                    if !self.eat_comma()? {
                        return Ok(());
                    }
                }
            }
            "word" => {
                loop {
                    let value = self.directive_value()?;
                    self.emit((value & 0xFF) as u8);
                    self.emit((value >> 8) as u8);
                    if !self.eat_comma()? {
                        return Ok(());
                    }
                }
            }
            "def" => {
                let name_token = self.bump()?;
                let TokenKind::Identifier(def_name) = name_token.kind else {
                    return Err(AsmError::ExpectedToken {
                        expected: "a name",
                        found: name_token.kind.to_string(),
                        line: name_token.line,
                        col: name_token.col,
                    });
                };
                let value_token = self.bump()?;
                match value_token.kind {
                    TokenKind::Register(_)
                    | TokenKind::Immediate(_)
                    | TokenKind::Address(_)
                    | TokenKind::Label(_) => {
                        self.defines.insert(def_name, value_token.kind);
                    }
                    TokenKind::Indirect(_) => {
                        self.expect_right_paren()?;
                        self.defines.insert(def_name, value_token.kind);
                    }
                    other => {
                        return Err(AsmError::ExpectedToken {
                            expected: "a token to bind",
                            found: other.to_string(),
                            line: value_token.line,
                            col: value_token.col,
                        });
                    }
                }
                Ok(())
            }
            _ => Err(AsmError::UnknownDirective {
                name: name.to_string(),
                line,
                col,
            }),
        }
    }

    /// Read one numeric directive argument: an immediate, an address, or a
    /// define resolving to one. The lexer already range-checks to 16 bits.
    fn directive_value(&mut self) -> Result<u16> {
        let token = self.bump()?;
        let arg = self.arg_from_kind(token.kind, token.line, token.col)?;
        match arg {
            Arg::Immediate(Imm::Value(v)) => Ok(v),
            Arg::Address(AddrRef::Abs(a)) => Ok(a),
            other => Err(AsmError::ExpectedToken {
                expected: "a value",
                found: other.to_string(),
                line: token.line,
                col: token.col,
            }),
        }
    }
}
