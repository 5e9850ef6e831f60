//! Mnemonics, opcodes, and the maps between them.
//!
//! Opcodes are a dense enumeration. Each mnemonic owns one opcode per
//! supported mode; the reverse map (opcode → mode) drives both the CPU's
//! operand decoding and the assembler's label back-patching.

use std::fmt;
use std::str::FromStr;

use crate::mode::Mode;

/// The 24 FRAME mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Hlt,
    Mov,
    Jmp,
    Brt,
    Brf,
    Equ,
    Lss,
    And,
    Or,
    Xor,
    Not,
    Lsh,
    Rsh,
    Rol,
    Ror,
    Add,
    Inc,
    Dec,
    Call,
    Ret,
    Push,
    Pop,
    Sei,
    Chy,
}

impl Mnemonic {
    /// The modes this mnemonic supports, in diagnostic order.
    pub fn modes(self) -> &'static [Mode] {
        match self {
            Mnemonic::Hlt => &[Mode::O, Mode::A, Mode::K],
            Mnemonic::Mov => &[
                Mode::Ab,
                Mode::Ak,
                Mode::Ap,
                Mode::Pa,
                Mode::Pk,
                Mode::Apb,
                Mode::Apk,
                Mode::Pab,
                Mode::Pak,
                Mode::Aib,
                Mode::Aik,
            ],
            Mnemonic::Jmp | Mnemonic::Brt | Mnemonic::Brf => &[Mode::P, Mode::Pa, Mode::Pk],
            Mnemonic::Equ | Mnemonic::Lss => &[Mode::Ab, Mode::Ak, Mode::Ka, Mode::Kk],
            Mnemonic::And | Mnemonic::Or | Mnemonic::Xor | Mnemonic::Add => {
                &[Mode::Ab, Mode::Ak, Mode::Abc, Mode::Abk]
            }
            Mnemonic::Not => &[Mode::O, Mode::A, Mode::Ab, Mode::Ak],
            Mnemonic::Lsh | Mnemonic::Rsh | Mnemonic::Rol | Mnemonic::Ror => &[Mode::A],
            Mnemonic::Inc | Mnemonic::Dec => &[Mode::A],
            Mnemonic::Call => &[Mode::P],
            Mnemonic::Ret | Mnemonic::Chy => &[Mode::O],
            Mnemonic::Push => &[Mode::A, Mode::K],
            Mnemonic::Pop => &[Mode::O, Mode::A],
            Mnemonic::Sei => &[Mode::O, Mode::A, Mode::K],
        }
    }

    /// The opcode for this mnemonic in the given mode, if supported.
    pub fn opcode(self, mode: Mode) -> Option<Opcode> {
        use Opcode::*;

        Some(match (self, mode) {
            (Mnemonic::Hlt, Mode::O) => HltO,
            (Mnemonic::Hlt, Mode::A) => HltA,
            (Mnemonic::Hlt, Mode::K) => HltK,
            (Mnemonic::Mov, Mode::Ab) => MovAb,
            (Mnemonic::Mov, Mode::Ak) => MovAk,
            (Mnemonic::Mov, Mode::Ap) => MovAp,
            (Mnemonic::Mov, Mode::Pa) => MovPa,
            (Mnemonic::Mov, Mode::Pk) => MovPk,
            (Mnemonic::Mov, Mode::Apb) => MovApb,
            (Mnemonic::Mov, Mode::Apk) => MovApk,
            (Mnemonic::Mov, Mode::Pab) => MovPab,
            (Mnemonic::Mov, Mode::Pak) => MovPak,
            (Mnemonic::Mov, Mode::Aib) => MovAib,
            (Mnemonic::Mov, Mode::Aik) => MovAik,
            (Mnemonic::Jmp, Mode::P) => JmpP,
            (Mnemonic::Jmp, Mode::Pa) => JmpPa,
            (Mnemonic::Jmp, Mode::Pk) => JmpPk,
            (Mnemonic::Brt, Mode::P) => BrtP,
            (Mnemonic::Brt, Mode::Pa) => BrtPa,
            (Mnemonic::Brt, Mode::Pk) => BrtPk,
            (Mnemonic::Brf, Mode::P) => BrfP,
            (Mnemonic::Brf, Mode::Pa) => BrfPa,
            (Mnemonic::Brf, Mode::Pk) => BrfPk,
            (Mnemonic::Equ, Mode::Ab) => EquAb,
            (Mnemonic::Equ, Mode::Ak) => EquAk,
            (Mnemonic::Equ, Mode::Ka) => EquKa,
            (Mnemonic::Equ, Mode::Kk) => EquKk,
            (Mnemonic::Lss, Mode::Ab) => LssAb,
            (Mnemonic::Lss, Mode::Ak) => LssAk,
            (Mnemonic::Lss, Mode::Ka) => LssKa,
            (Mnemonic::Lss, Mode::Kk) => LssKk,
            (Mnemonic::And, Mode::Ab) => AndAb,
            (Mnemonic::And, Mode::Ak) => AndAk,
            (Mnemonic::And, Mode::Abc) => AndAbc,
            (Mnemonic::And, Mode::Abk) => AndAbk,
            (Mnemonic::Or, Mode::Ab) => OrAb,
            (Mnemonic::Or, Mode::Ak) => OrAk,
            (Mnemonic::Or, Mode::Abc) => OrAbc,
            (Mnemonic::Or, Mode::Abk) => OrAbk,
            (Mnemonic::Xor, Mode::Ab) => XorAb,
            (Mnemonic::Xor, Mode::Ak) => XorAk,
            (Mnemonic::Xor, Mode::Abc) => XorAbc,
            (Mnemonic::Xor, Mode::Abk) => XorAbk,
            (Mnemonic::Not, Mode::O) => NotO,
            (Mnemonic::Not, Mode::A) => NotA,
            (Mnemonic::Not, Mode::Ab) => NotAb,
            (Mnemonic::Not, Mode::Ak) => NotAk,
            (Mnemonic::Lsh, Mode::A) => LshA,
            (Mnemonic::Rsh, Mode::A) => RshA,
            (Mnemonic::Rol, Mode::A) => RolA,
            (Mnemonic::Ror, Mode::A) => RorA,
            (Mnemonic::Add, Mode::Ab) => AddAb,
            (Mnemonic::Add, Mode::Ak) => AddAk,
            (Mnemonic::Add, Mode::Abc) => AddAbc,
            (Mnemonic::Add, Mode::Abk) => AddAbk,
            (Mnemonic::Inc, Mode::A) => IncA,
            (Mnemonic::Dec, Mode::A) => DecA,
            (Mnemonic::Call, Mode::P) => CallP,
            (Mnemonic::Ret, Mode::O) => RetO,
            (Mnemonic::Push, Mode::A) => PushA,
            (Mnemonic::Push, Mode::K) => PushK,
            (Mnemonic::Pop, Mode::O) => PopO,
            (Mnemonic::Pop, Mode::A) => PopA,
            (Mnemonic::Sei, Mode::O) => SeiO,
            (Mnemonic::Sei, Mode::A) => SeiA,
            (Mnemonic::Sei, Mode::K) => SeiK,
            (Mnemonic::Chy, Mode::O) => ChyO,
            _ => return None,
        })
    }
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "hlt" => Mnemonic::Hlt,
            "mov" => Mnemonic::Mov,
            "jmp" => Mnemonic::Jmp,
            "brt" => Mnemonic::Brt,
            "brf" => Mnemonic::Brf,
            "equ" => Mnemonic::Equ,
            "lss" => Mnemonic::Lss,
            "and" => Mnemonic::And,
            "or" => Mnemonic::Or,
            "xor" => Mnemonic::Xor,
            "not" => Mnemonic::Not,
            "lsh" => Mnemonic::Lsh,
            "rsh" => Mnemonic::Rsh,
            "rol" => Mnemonic::Rol,
            "ror" => Mnemonic::Ror,
            "add" => Mnemonic::Add,
            "inc" => Mnemonic::Inc,
            "dec" => Mnemonic::Dec,
            "call" => Mnemonic::Call,
            "ret" => Mnemonic::Ret,
            "push" => Mnemonic::Push,
            "pop" => Mnemonic::Pop,
            "sei" => Mnemonic::Sei,
            "chy" => Mnemonic::Chy,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mnemonic::Hlt => "hlt",
            Mnemonic::Mov => "mov",
            Mnemonic::Jmp => "jmp",
            Mnemonic::Brt => "brt",
            Mnemonic::Brf => "brf",
            Mnemonic::Equ => "equ",
            Mnemonic::Lss => "lss",
            Mnemonic::And => "and",
            Mnemonic::Or => "or",
            Mnemonic::Xor => "xor",
            Mnemonic::Not => "not",
            Mnemonic::Lsh => "lsh",
            Mnemonic::Rsh => "rsh",
            Mnemonic::Rol => "rol",
            Mnemonic::Ror => "ror",
            Mnemonic::Add => "add",
            Mnemonic::Inc => "inc",
            Mnemonic::Dec => "dec",
            Mnemonic::Call => "call",
            Mnemonic::Ret => "ret",
            Mnemonic::Push => "push",
            Mnemonic::Pop => "pop",
            Mnemonic::Sei => "sei",
            Mnemonic::Chy => "chy",
        };
        f.write_str(name)
    }
}

/// One opcode per (mnemonic, mode) pair, densely numbered.
///
/// The byte values are the FRAME instruction encoding; the assembler emits
/// them and the CPU dispatches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    HltO = 0x00,
    HltA = 0x01,
    HltK = 0x02,
    MovAb = 0x03,
    MovAk = 0x04,
    MovAp = 0x05,
    MovPa = 0x06,
    MovPk = 0x07,
    MovApb = 0x08,
    MovApk = 0x09,
    MovPab = 0x0A,
    MovPak = 0x0B,
    MovAib = 0x0C,
    MovAik = 0x0D,
    JmpP = 0x0E,
    JmpPa = 0x0F,
    JmpPk = 0x10,
    BrtP = 0x11,
    BrtPa = 0x12,
    BrtPk = 0x13,
    BrfP = 0x14,
    BrfPa = 0x15,
    BrfPk = 0x16,
    EquAb = 0x17,
    EquAk = 0x18,
    EquKa = 0x19,
    EquKk = 0x1A,
    LssAb = 0x1B,
    LssAk = 0x1C,
    LssKa = 0x1D,
    LssKk = 0x1E,
    AndAb = 0x1F,
    AndAk = 0x20,
    AndAbc = 0x21,
    AndAbk = 0x22,
    OrAb = 0x23,
    OrAk = 0x24,
    OrAbc = 0x25,
    OrAbk = 0x26,
    XorAb = 0x27,
    XorAk = 0x28,
    XorAbc = 0x29,
    XorAbk = 0x2A,
    NotO = 0x2B,
    NotA = 0x2C,
    NotAb = 0x2D,
    NotAk = 0x2E,
    LshA = 0x2F,
    RshA = 0x30,
    RolA = 0x31,
    RorA = 0x32,
    AddAb = 0x33,
    AddAk = 0x34,
    AddAbc = 0x35,
    AddAbk = 0x36,
    IncA = 0x37,
    DecA = 0x38,
    CallP = 0x39,
    RetO = 0x3A,
    PushA = 0x3B,
    PushK = 0x3C,
    PopO = 0x3D,
    PopA = 0x3E,
    SeiO = 0x3F,
    SeiA = 0x40,
    SeiK = 0x41,
    ChyO = 0x42,
}

impl Opcode {
    /// Decode an opcode byte. Returns `None` for bytes outside the table
    /// (an invalid opcode, which stops the VM).
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;

        Some(match byte {
            0x00 => HltO,
            0x01 => HltA,
            0x02 => HltK,
            0x03 => MovAb,
            0x04 => MovAk,
            0x05 => MovAp,
            0x06 => MovPa,
            0x07 => MovPk,
            0x08 => MovApb,
            0x09 => MovApk,
            0x0A => MovPab,
            0x0B => MovPak,
            0x0C => MovAib,
            0x0D => MovAik,
            0x0E => JmpP,
            0x0F => JmpPa,
            0x10 => JmpPk,
            0x11 => BrtP,
            0x12 => BrtPa,
            0x13 => BrtPk,
            0x14 => BrfP,
            0x15 => BrfPa,
            0x16 => BrfPk,
            0x17 => EquAb,
            0x18 => EquAk,
            0x19 => EquKa,
            0x1A => EquKk,
            0x1B => LssAb,
            0x1C => LssAk,
            0x1D => LssKa,
            0x1E => LssKk,
            0x1F => AndAb,
            0x20 => AndAk,
            0x21 => AndAbc,
            0x22 => AndAbk,
            0x23 => OrAb,
            0x24 => OrAk,
            0x25 => OrAbc,
            0x26 => OrAbk,
            0x27 => XorAb,
            0x28 => XorAk,
            0x29 => XorAbc,
            0x2A => XorAbk,
            0x2B => NotO,
            0x2C => NotA,
            0x2D => NotAb,
            0x2E => NotAk,
            0x2F => LshA,
            0x30 => RshA,
            0x31 => RolA,
            0x32 => RorA,
            0x33 => AddAb,
            0x34 => AddAk,
            0x35 => AddAbc,
            0x36 => AddAbk,
            0x37 => IncA,
            0x38 => DecA,
            0x39 => CallP,
            0x3A => RetO,
            0x3B => PushA,
            0x3C => PushK,
            0x3D => PopO,
            0x3E => PopA,
            0x3F => SeiO,
            0x40 => SeiA,
            0x41 => SeiK,
            0x42 => ChyO,
            _ => return None,
        })
    }

    /// The raw instruction byte.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// The addressing mode this opcode decodes with.
    pub fn mode(self) -> Mode {
        use Opcode::*;

        match self {
            HltO | NotO | RetO | PopO | SeiO | ChyO => Mode::O,
            HltA | NotA | LshA | RshA | RolA | RorA | IncA | DecA | PushA | PopA | SeiA => Mode::A,
            HltK | PushK | SeiK => Mode::K,
            JmpP | BrtP | BrfP | CallP => Mode::P,
            MovAb | EquAb | LssAb | AndAb | OrAb | XorAb | NotAb | AddAb => Mode::Ab,
            MovAk | EquAk | LssAk | AndAk | OrAk | XorAk | NotAk | AddAk => Mode::Ak,
            MovAp => Mode::Ap,
            EquKa | LssKa => Mode::Ka,
            EquKk | LssKk => Mode::Kk,
            MovPa | JmpPa | BrtPa | BrfPa => Mode::Pa,
            MovPk | JmpPk | BrtPk | BrfPk => Mode::Pk,
            AndAbc | OrAbc | XorAbc | AddAbc => Mode::Abc,
            AndAbk | OrAbk | XorAbk | AddAbk => Mode::Abk,
            MovApb => Mode::Apb,
            MovApk => Mode::Apk,
            MovAib => Mode::Aib,
            MovAik => Mode::Aik,
            MovPab => Mode::Pab,
            MovPak => Mode::Pak,
        }
    }

    /// The mnemonic this opcode belongs to.
    pub fn mnemonic(self) -> Mnemonic {
        use Opcode::*;

        match self {
            HltO | HltA | HltK => Mnemonic::Hlt,
            MovAb | MovAk | MovAp | MovPa | MovPk | MovApb | MovApk | MovPab | MovPak | MovAib
            | MovAik => Mnemonic::Mov,
            JmpP | JmpPa | JmpPk => Mnemonic::Jmp,
            BrtP | BrtPa | BrtPk => Mnemonic::Brt,
            BrfP | BrfPa | BrfPk => Mnemonic::Brf,
            EquAb | EquAk | EquKa | EquKk => Mnemonic::Equ,
            LssAb | LssAk | LssKa | LssKk => Mnemonic::Lss,
            AndAb | AndAk | AndAbc | AndAbk => Mnemonic::And,
            OrAb | OrAk | OrAbc | OrAbk => Mnemonic::Or,
            XorAb | XorAk | XorAbc | XorAbk => Mnemonic::Xor,
            NotO | NotA | NotAb | NotAk => Mnemonic::Not,
            LshA => Mnemonic::Lsh,
            RshA => Mnemonic::Rsh,
            RolA => Mnemonic::Rol,
            RorA => Mnemonic::Ror,
            AddAb | AddAk | AddAbc | AddAbk => Mnemonic::Add,
            IncA => Mnemonic::Inc,
            DecA => Mnemonic::Dec,
            CallP => Mnemonic::Call,
            RetO => Mnemonic::Ret,
            PushA => Mnemonic::Push,
            PushK => Mnemonic::Push,
            PopO | PopA => Mnemonic::Pop,
            SeiO | SeiA | SeiK => Mnemonic::Sei,
            ChyO => Mnemonic::Chy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every opcode byte round-trips through the decode table.
    #[test]
    fn opcode_byte_round_trip() {
        for byte in 0x00..=0x42u8 {
            let op = Opcode::from_byte(byte).expect("dense range decodes");
            assert_eq!(op.byte(), byte);
        }
        assert_eq!(Opcode::from_byte(0x43), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    /// Every (mnemonic, supported mode) pair maps to an opcode that maps back.
    #[test]
    fn mnemonic_mode_opcode_consistency() {
        let mnemonics = [
            Mnemonic::Hlt,
            Mnemonic::Mov,
            Mnemonic::Jmp,
            Mnemonic::Brt,
            Mnemonic::Brf,
            Mnemonic::Equ,
            Mnemonic::Lss,
            Mnemonic::And,
            Mnemonic::Or,
            Mnemonic::Xor,
            Mnemonic::Not,
            Mnemonic::Lsh,
            Mnemonic::Rsh,
            Mnemonic::Rol,
            Mnemonic::Ror,
            Mnemonic::Add,
            Mnemonic::Inc,
            Mnemonic::Dec,
            Mnemonic::Call,
            Mnemonic::Ret,
            Mnemonic::Push,
            Mnemonic::Pop,
            Mnemonic::Sei,
            Mnemonic::Chy,
        ];
        for m in mnemonics {
            for &mode in m.modes() {
                let op = m.opcode(mode).expect("supported mode has an opcode");
                assert_eq!(op.mode(), mode, "{m} {mode}");
                assert_eq!(op.mnemonic(), m, "{m} {mode}");
            }
        }
    }

    #[test]
    fn unsupported_modes_have_no_opcode() {
        assert_eq!(Mnemonic::Hlt.opcode(Mode::P), None);
        assert_eq!(Mnemonic::Ret.opcode(Mode::A), None);
        assert_eq!(Mnemonic::Mov.opcode(Mode::Kk), None);
    }

    #[test]
    fn mnemonic_from_str() {
        assert_eq!("mov".parse(), Ok(Mnemonic::Mov));
        assert_eq!("chy".parse(), Ok(Mnemonic::Chy));
        assert!("nop".parse::<Mnemonic>().is_err());
    }
}
