//! Source text → token stream.
//!
//! Whitespace is insignificant; `#` starts a line comment. Every token
//! carries the line/column where it began.

use crate::error::{AsmError, Result};
use crate::token::{Imm, Token, TokenKind, SP};

/// The FRAME assembly lexer.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, line: usize, col: usize) -> Token {
        Token { kind, line, col }
    }

    /// Produce the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let (line, col) = (self.line, self.col);
        let Some(c) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, line, col));
        };

        match c {
            ',' => {
                self.advance();
                Ok(self.token(TokenKind::Comma, line, col))
            }
            ')' => {
                self.advance();
                Ok(self.token(TokenKind::RightParen, line, col))
            }
            '$' => {
                self.advance();
                let kind = self.scan_register(line, col)?;
                Ok(self.token(kind, line, col))
            }
            '%' => {
                self.advance();
                let value = self.scan_radix_digits(16, line, col)?;
                if value > 0xFFFF {
                    return Err(AsmError::AddressRange { value, line, col });
                }
                Ok(self.token(TokenKind::Address(value as u16), line, col))
            }
            '(' => {
                self.advance();
                let value = self.scan_radix_digits(16, line, col)?;
                if value > 0xFF {
                    return Err(AsmError::ZeroPageRange { value, line, col });
                }
                Ok(self.token(TokenKind::Indirect(value as u8), line, col))
            }
            '@' => {
                self.advance();
                let kind = match self.peek() {
                    Some('<') => {
                        self.advance();
                        TokenKind::Immediate(Imm::LabelLow(self.scan_name(line, col)?))
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::Immediate(Imm::LabelHigh(self.scan_name(line, col)?))
                    }
                    _ => TokenKind::Label(self.scan_name(line, col)?),
                };
                Ok(self.token(kind, line, col))
            }
            '.' => {
                self.advance();
                let name = self.scan_name(line, col)?;
                Ok(self.token(TokenKind::Directive(name), line, col))
            }
            '\'' => {
                self.advance();
                let value = self.scan_char_literal(line, col)?;
                Ok(self.token(
                    TokenKind::Immediate(Imm::Value(u16::from(value))),
                    line,
                    col,
                ))
            }
            c if c.is_ascii_digit() => {
                let value = self.scan_number(line, col)?;
                Ok(self.token(TokenKind::Immediate(Imm::Value(value)), line, col))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word = self.scan_name(line, col)?;
                let kind = match word.parse() {
                    Ok(mnemonic) => TokenKind::Instruction(mnemonic),
                    Err(()) => TokenKind::Identifier(word),
                };
                Ok(self.token(kind, line, col))
            }
            c => Err(AsmError::UnexpectedChar { ch: c, line, col }),
        }
    }

    /// Collect the whole token stream.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn scan_register(&mut self, line: usize, col: usize) -> Result<TokenKind> {
        match self.advance() {
            Some('s') => Ok(TokenKind::Register(SP)),
            Some(c) => match c.to_digit(16) {
                Some(r) => Ok(TokenKind::Register(r as u8)),
                None => Err(AsmError::BadRegister { ch: c, line, col }),
            },
            None => Err(AsmError::UnexpectedChar {
                ch: '$',
                line,
                col,
            }),
        }
    }

    fn scan_name(&mut self, line: usize, col: usize) -> Result<String> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() {
            match self.peek() {
                Some(c) => Err(AsmError::UnexpectedChar { ch: c, line, col }),
                None => Err(AsmError::UnexpectedToken {
                    found: "end of input".to_string(),
                    line,
                    col,
                }),
            }
        } else {
            Ok(name)
        }
    }

    fn scan_radix_digits(&mut self, radix: u32, line: usize, col: usize) -> Result<u32> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if text.is_empty() || self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return Err(AsmError::BadNumber { text, line, col });
        }
        // Cannot overflow u32: at most 4 hex / 16 binary digits pass the
        // range checks downstream, and we cap parsing errors above.
        match u32::from_str_radix(&text, radix) {
            Ok(v) => Ok(v),
            Err(_) => Err(AsmError::BadNumber { text, line, col }),
        }
    }

    fn scan_number(&mut self, line: usize, col: usize) -> Result<u16> {
        let radix = if self.peek() == Some('0') {
            self.advance();
            match self.peek() {
                Some('x') | Some('X') => {
                    self.advance();
                    16
                }
                Some('o') | Some('O') => {
                    self.advance();
                    8
                }
                Some('b') | Some('B') => {
                    self.advance();
                    2
                }
                Some(c) if c.is_ascii_digit() => 10,
                Some(c) if c.is_ascii_alphanumeric() => {
                    return Err(AsmError::BadNumber {
                        text: format!("0{c}"),
                        line,
                        col,
                    });
                }
                _ => return Ok(0),
            }
        } else {
            10
        };

        let value = self.scan_radix_digits(radix, line, col)?;
        if value > 0xFFFF {
            return Err(AsmError::BadNumber {
                text: format!("{value}"),
                line,
                col,
            });
        }
        Ok(value as u16)
    }

    fn scan_char_literal(&mut self, line: usize, col: usize) -> Result<u8> {
        let value = match self.advance() {
            Some('\\') => match self.advance() {
                Some('n') => b'\n',
                Some('r') => b'\r',
                Some('t') => b'\t',
                Some('0') => 0,
                Some('\\') => b'\\',
                Some('\'') => b'\'',
                Some(c) => return Err(AsmError::BadEscape { ch: c, line, col }),
                None => return Err(AsmError::UnterminatedChar { line, col }),
            },
            Some('\'') | Some('\n') | None => {
                return Err(AsmError::UnterminatedChar { line, col });
            }
            Some(c) => {
                if !c.is_ascii() {
                    return Err(AsmError::UnexpectedChar { ch: c, line, col });
                }
                c as u8
            }
        };
        match self.advance() {
            Some('\'') => Ok(value),
            _ => Err(AsmError::UnterminatedChar { line, col }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Mnemonic;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_instruction_line() {
        assert_eq!(
            kinds("mov $1, 0x2A"),
            vec![
                TokenKind::Instruction(Mnemonic::Mov),
                TokenKind::Register(1),
                TokenKind::Comma,
                TokenKind::Immediate(Imm::Value(0x2A)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_all_number_bases() {
        assert_eq!(
            kinds("0x10 0o17 0b101 42 0"),
            vec![
                TokenKind::Immediate(Imm::Value(16)),
                TokenKind::Immediate(Imm::Value(15)),
                TokenKind::Immediate(Imm::Value(5)),
                TokenKind::Immediate(Imm::Value(42)),
                TokenKind::Immediate(Imm::Value(0)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_char_literals() {
        assert_eq!(
            kinds("'A' '\\n' '\\0'"),
            vec![
                TokenKind::Immediate(Imm::Value(0x41)),
                TokenKind::Immediate(Imm::Value(0x0A)),
                TokenKind::Immediate(Imm::Value(0)),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_registers_and_sp() {
        assert_eq!(
            kinds("$0 $f $s"),
            vec![
                TokenKind::Register(0),
                TokenKind::Register(15),
                TokenKind::Register(SP),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_address_and_indirect() {
        assert_eq!(
            kinds("%e7c0 (10)"),
            vec![
                TokenKind::Address(0xE7C0),
                TokenKind::Indirect(0x10),
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_labels_and_byte_refs() {
        assert_eq!(
            kinds("@main @<msg @>msg"),
            vec![
                TokenKind::Label("main".to_string()),
                TokenKind::Immediate(Imm::LabelLow("msg".to_string())),
                TokenKind::Immediate(Imm::LabelHigh("msg".to_string())),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("# a comment\nhlt # trailing\n"),
            vec![TokenKind::Instruction(Mnemonic::Hlt), TokenKind::Eof]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::new("hlt\n  mov $1, 2").tokenize().expect("lexes");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (2, 3));
        assert_eq!((tokens[2].line, tokens[2].col), (2, 7));
    }

    #[test]
    fn address_out_of_range() {
        let err = Lexer::new("%10000").tokenize().unwrap_err();
        assert!(matches!(err, AsmError::AddressRange { value: 0x10000, .. }));
    }

    #[test]
    fn indirect_out_of_range() {
        let err = Lexer::new("(100)").tokenize().unwrap_err();
        assert!(matches!(err, AsmError::ZeroPageRange { value: 0x100, .. }));
    }

    #[test]
    fn rejects_bad_escape_and_unterminated_char() {
        assert!(matches!(
            Lexer::new("'\\q'").tokenize().unwrap_err(),
            AsmError::BadEscape { ch: 'q', .. }
        ));
        assert!(matches!(
            Lexer::new("'a").tokenize().unwrap_err(),
            AsmError::UnterminatedChar { .. }
        ));
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(
            Lexer::new("mov $1, !").tokenize().unwrap_err(),
            AsmError::UnexpectedChar { ch: '!', .. }
        ));
    }

    #[test]
    fn identifier_vs_instruction() {
        assert_eq!(
            kinds("mov cursor"),
            vec![
                TokenKind::Instruction(Mnemonic::Mov),
                TokenKind::Identifier("cursor".to_string()),
                TokenKind::Eof,
            ]
        );
    }
}
